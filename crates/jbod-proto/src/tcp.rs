//! TCP client for a remote array server.

use std::net::{TcpStream, ToSocketAddrs};

use jbod_error::{JbodError, Result};
use jbod_types::{Block, BlockIndex, DiskId};
use tracing::{debug, warn};

use crate::command::Command;
use crate::frame;
use crate::BlockTransport;

/// Blocking TCP transport: one request frame out, one response frame in,
/// per operation. Seek is two wire commands (disk, then block) behind the
/// single trait operation.
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Connect to an array server.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;
        debug!(%peer, "connected to array server");
        Ok(Self { stream })
    }

    /// Close the connection. Dropping the transport has the same effect;
    /// this exists for callers that want the shutdown error.
    pub fn disconnect(self) -> Result<()> {
        self.stream.shutdown(std::net::Shutdown::Both)?;
        Ok(())
    }

    fn roundtrip(
        &mut self,
        op_name: &'static str,
        cmd: Command,
        payload: Option<&Block>,
    ) -> Result<Option<Block>> {
        debug_assert_eq!(cmd.carries_payload(), payload.is_some());
        let word = cmd.encode()?;
        frame::write_frame(&mut self.stream, word, 0, payload)?;

        let response = frame::read_frame(&mut self.stream)?;
        if response.status != 0 {
            warn!(op = op_name, status = response.status, "array reported failure");
            return Err(JbodError::transport(
                op_name,
                format!("server returned status {}", response.status),
            ));
        }
        Ok(response.payload)
    }
}

impl BlockTransport for TcpTransport {
    fn mount(&mut self) -> Result<()> {
        self.roundtrip("mount", Command::Mount, None)?;
        Ok(())
    }

    fn unmount(&mut self) -> Result<()> {
        self.roundtrip("unmount", Command::Unmount, None)?;
        Ok(())
    }

    fn seek(&mut self, disk: DiskId, block: BlockIndex) -> Result<()> {
        self.roundtrip("seek_to_disk", Command::SeekToDisk(disk), None)?;
        self.roundtrip("seek_to_block", Command::SeekToBlock(block), None)?;
        Ok(())
    }

    fn read_block(&mut self) -> Result<Block> {
        let payload = self.roundtrip("read_block", Command::ReadBlock, None)?;
        payload.ok_or_else(|| {
            JbodError::Protocol("read_block response carried no payload".to_owned())
        })
    }

    fn write_block(&mut self, data: &Block) -> Result<()> {
        self.roundtrip("write_block", Command::WriteBlock, Some(data))?;
        Ok(())
    }
}
