#![forbid(unsafe_code)]
//! Command-line client for the JBOD aggregation layer.
//!
//! Reads and writes byte ranges of the linear address space, either
//! against a remote array server (`--connect host:port`) or against a
//! fresh in-memory array for local experimentation.

use anyhow::{bail, Context, Result};
use jbod::{BlockTransport, Geometry, Jbod, MemTransport, TcpTransport, MAX_IO_LEN};
use serde::Serialize;
use std::env;

#[derive(Debug)]
enum CliCommand {
    Read { addr: u32, len: usize },
    Write { addr: u32, data: Vec<u8> },
}

#[derive(Debug, Serialize)]
struct ReadOutput {
    addr: u32,
    len: usize,
    data: String,
}

#[derive(Debug, Serialize)]
struct WriteOutput {
    addr: u32,
    bytes_written: usize,
}

#[derive(Debug, Serialize)]
struct GeometryOutput {
    num_disks: u32,
    blocks_per_disk: u32,
    block_size: usize,
    capacity: u64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(error) = run() {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let mut args = env::args().skip(1);
    let Some(command) = args.next() else {
        print_usage();
        return Ok(());
    };
    let rest: Vec<String> = args.collect();

    let mut json = false;
    let mut connect: Option<String> = None;
    let mut cache: Option<usize> = None;
    let mut positional: Vec<String> = Vec::new();
    let mut i = 0;
    while i < rest.len() {
        match rest[i].as_str() {
            "--json" => json = true,
            "--connect" => {
                let Some(value) = rest.get(i + 1) else {
                    bail!("--connect requires host:port");
                };
                connect = Some(value.clone());
                i += 1;
            }
            "--cache" => {
                let Some(value) = rest.get(i + 1) else {
                    bail!("--cache requires an entry count");
                };
                cache = Some(value.parse().context("--cache takes an entry count")?);
                i += 1;
            }
            flag if flag.starts_with("--") => bail!("unknown flag: {flag}"),
            _ => positional.push(rest[i].clone()),
        }
        i += 1;
    }

    match command.as_str() {
        "read" => {
            let [addr, len] = &positional[..] else {
                bail!("read requires <addr> <len>");
            };
            let addr = addr.parse::<u32>().context("addr must be an integer")?;
            let len = len.parse::<usize>().context("len must be an integer")?;
            if len > MAX_IO_LEN {
                bail!("len {len} exceeds the per-call maximum {MAX_IO_LEN}");
            }
            dispatch(connect, cache, json, CliCommand::Read { addr, len })
        }
        "write" => {
            let [addr, hex] = &positional[..] else {
                bail!("write requires <addr> <hex-bytes>");
            };
            let addr = addr.parse::<u32>().context("addr must be an integer")?;
            let data = parse_hex(hex).context("data must be hex bytes, e.g. deadbeef")?;
            if data.len() > MAX_IO_LEN {
                bail!(
                    "write of {} bytes exceeds the per-call maximum {MAX_IO_LEN}",
                    data.len()
                );
            }
            dispatch(connect, cache, json, CliCommand::Write { addr, data })
        }
        "geometry" => {
            let geom = Geometry::default();
            let output = GeometryOutput {
                num_disks: geom.num_disks(),
                blocks_per_disk: geom.blocks_per_disk(),
                block_size: jbod::BLOCK_SIZE,
                capacity: geom.capacity(),
            };
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&output).context("serialize output")?
                );
            } else {
                println!("num_disks: {}", output.num_disks);
                println!("blocks_per_disk: {}", output.blocks_per_disk);
                println!("block_size: {}", output.block_size);
                println!("capacity: {}", output.capacity);
            }
            Ok(())
        }
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(())
        }
        _ => {
            print_usage();
            bail!("unknown command: {command}")
        }
    }
}

fn print_usage() {
    println!("jbod-cli\n");
    println!("USAGE:");
    println!("  jbod-cli read <addr> <len> [--connect host:port] [--cache N] [--json]");
    println!("  jbod-cli write <addr> <hex-bytes> [--connect host:port] [--cache N] [--json]");
    println!("  jbod-cli geometry [--json]");
    println!();
    println!("Without --connect, commands run against a fresh in-memory array.");
}

fn dispatch(
    connect: Option<String>,
    cache: Option<usize>,
    json: bool,
    command: CliCommand,
) -> Result<()> {
    let geom = Geometry::default();
    match connect {
        Some(addr) => {
            let transport = TcpTransport::connect(&addr)
                .with_context(|| format!("failed to connect to array server at {addr}"))?;
            exec(geom, transport, cache, json, command)
        }
        None => exec(geom, MemTransport::new(geom), cache, json, command),
    }
}

fn exec<T: BlockTransport>(
    geom: Geometry,
    transport: T,
    cache: Option<usize>,
    json: bool,
    command: CliCommand,
) -> Result<()> {
    let mut jbod = match cache {
        Some(capacity) => Jbod::with_cache(geom, transport, capacity)?,
        None => Jbod::new(geom, transport),
    };
    jbod.mount().context("mount failed")?;

    match command {
        CliCommand::Read { addr, len } => {
            let mut out = vec![0_u8; len];
            jbod.read(addr, &mut out).context("read failed")?;
            let output = ReadOutput {
                addr,
                len,
                data: to_hex(&out),
            };
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&output).context("serialize output")?
                );
            } else {
                println!("{}", output.data);
            }
        }
        CliCommand::Write { addr, data } => {
            let bytes_written = jbod.write(addr, &data).context("write failed")?;
            let output = WriteOutput {
                addr,
                bytes_written,
            };
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&output).context("serialize output")?
                );
            } else {
                println!("wrote {bytes_written} bytes at {addr}");
            }
        }
    }

    if let Some(cache) = jbod.cache() {
        cache.log_hit_rate();
    }
    jbod.unmount().context("unmount failed")
}

fn parse_hex(input: &str) -> Result<Vec<u8>> {
    if !input.is_ascii() {
        bail!("hex input must be ASCII");
    }
    if input.len() % 2 != 0 {
        bail!("odd number of hex digits");
    }
    (0..input.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&input[i..i + 2], 16).context("invalid hex digit"))
        .collect()
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
