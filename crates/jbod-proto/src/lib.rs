#![forbid(unsafe_code)]
//! Transport boundary for the JBOD array.
//!
//! The core never sees the wire: it drives the array through
//! [`BlockTransport`], whose five operations map one-to-one onto the
//! protocol commands. The bit-packed command word and the frame layout
//! live entirely in [`command`] and [`frame`]; [`TcpTransport`] speaks
//! them to a remote array server and [`MemTransport`] simulates the
//! array in memory for tests and local runs.

pub mod command;
pub mod frame;
mod mem;
mod tcp;

pub use command::Command;
pub use mem::MemTransport;
pub use tcp::TcpTransport;

use jbod_error::Result;
use jbod_types::{Block, BlockIndex, DiskId};

/// Synchronous client interface to a block array.
///
/// Position is transport-side state: `seek` establishes the (disk, block)
/// the next `read_block`/`write_block` acts on, and the array advances
/// its position by one block after each of those. Callers that cannot
/// prove the current position re-seek; the orchestrator does so before
/// every block operation.
pub trait BlockTransport {
    /// Make the array ready for I/O. Fails if already mounted.
    fn mount(&mut self) -> Result<()>;

    /// Release the array. Fails if not mounted.
    fn unmount(&mut self) -> Result<()>;

    /// Position the array at (disk, block).
    fn seek(&mut self, disk: DiskId, block: BlockIndex) -> Result<()>;

    /// Read the block at the current position.
    fn read_block(&mut self) -> Result<Block>;

    /// Write a block at the current position.
    fn write_block(&mut self, data: &Block) -> Result<()>;
}
