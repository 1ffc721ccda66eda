#![forbid(unsafe_code)]
//! Loopback test for the TCP transport: a minimal in-process array
//! server speaks the frame protocol on one connection.

use std::net::TcpListener;
use std::thread;

use jbod_proto::command::Command;
use jbod_proto::frame;
use jbod_proto::{BlockTransport, TcpTransport};
use jbod_types::{Block, BlockIndex, DiskId, Geometry, BLOCK_SIZE};

fn serve_one_connection(listener: TcpListener, geom: Geometry) {
    let (mut stream, _) = listener.accept().expect("accept");
    let mut disks = vec![vec![0_u8; geom.disk_size() as usize]; geom.num_disks() as usize];
    let mut disk = 0_usize;
    let mut block = 0_usize;

    loop {
        let request = match frame::read_frame(&mut stream) {
            Ok(request) => request,
            Err(_) => break, // client hung up
        };
        let command = Command::decode(request.op).expect("known opcode");
        let mut payload: Option<Block> = None;
        match command {
            Command::Mount | Command::Unmount => {}
            Command::SeekToDisk(d) => {
                disk = d.0 as usize;
                block = 0;
            }
            Command::SeekToBlock(b) => block = b.0 as usize,
            Command::ReadBlock => {
                let start = block * BLOCK_SIZE;
                let mut out = [0_u8; BLOCK_SIZE];
                out.copy_from_slice(&disks[disk][start..start + BLOCK_SIZE]);
                payload = Some(out);
                block += 1;
            }
            Command::WriteBlock => {
                let data = request.payload.expect("write carries payload");
                let start = block * BLOCK_SIZE;
                disks[disk][start..start + BLOCK_SIZE].copy_from_slice(&data);
                block += 1;
            }
        }
        frame::write_frame(&mut stream, request.op, 0, payload.as_ref()).expect("respond");
        if command == Command::Unmount {
            break;
        }
    }
}

fn failing_server(listener: TcpListener) {
    let (mut stream, _) = listener.accept().expect("accept");
    let request = frame::read_frame(&mut stream).expect("request");
    // Refuse whatever the client asked for.
    frame::write_frame(&mut stream, request.op, 1, None).expect("respond");
    let _ = stream;
}

fn spawn_server(geom: Geometry) -> (thread::JoinHandle<()>, String) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr").to_string();
    let handle = thread::spawn(move || serve_one_connection(listener, geom));
    (handle, addr)
}

#[test]
fn block_round_trip_over_tcp() {
    let geom = Geometry::new(2, 4).expect("geometry");
    let (server, addr) = spawn_server(geom);

    let mut transport = TcpTransport::connect(&addr).expect("connect");
    transport.mount().expect("mount");

    let mut data = [0_u8; BLOCK_SIZE];
    for (i, byte) in data.iter_mut().enumerate() {
        *byte = (i % 251) as u8;
    }
    transport.seek(DiskId(1), BlockIndex(2)).expect("seek");
    transport.write_block(&data).expect("write");
    transport.seek(DiskId(1), BlockIndex(2)).expect("seek back");
    assert_eq!(transport.read_block().expect("read"), data);

    // A block never written reads back zeroed.
    transport.seek(DiskId(0), BlockIndex(0)).expect("seek");
    assert_eq!(transport.read_block().expect("read"), [0_u8; BLOCK_SIZE]);

    transport.unmount().expect("unmount");
    server.join().expect("server exits");
}

#[test]
fn position_advances_server_side() {
    let geom = Geometry::new(1, 4).expect("geometry");
    let (server, addr) = spawn_server(geom);

    let mut transport = TcpTransport::connect(&addr).expect("connect");
    transport.mount().expect("mount");

    transport.seek(DiskId(0), BlockIndex(0)).expect("seek");
    transport.write_block(&[0x11_u8; BLOCK_SIZE]).expect("write");
    // No re-seek: the server moved on to block 1.
    transport.write_block(&[0x22_u8; BLOCK_SIZE]).expect("write");

    transport.seek(DiskId(0), BlockIndex(1)).expect("seek");
    assert_eq!(transport.read_block().expect("read"), [0x22_u8; BLOCK_SIZE]);

    transport.unmount().expect("unmount");
    server.join().expect("server exits");
}

#[test]
fn nonzero_status_maps_to_transport_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr").to_string();
    let server = thread::spawn(move || failing_server(listener));

    let mut transport = TcpTransport::connect(&addr).expect("connect");
    let err = transport.mount().expect_err("server refuses");
    assert!(matches!(err, jbod_error::JbodError::Transport { .. }));

    server.join().expect("server exits");
}

#[test]
fn connect_to_dead_port_is_an_io_error() {
    // Bind then drop to get a port with nothing listening.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("addr").port()
    };
    let err = TcpTransport::connect(("127.0.0.1", port)).expect_err("nothing listening");
    assert!(matches!(err, jbod_error::JbodError::Io(_)));
}
