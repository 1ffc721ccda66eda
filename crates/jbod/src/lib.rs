#![forbid(unsafe_code)]
//! JBOD aggregation layer public API facade.
//!
//! Re-exports the engine, transports, and shared types through one
//! crate so downstream consumers (CLI, tests, applications) take a
//! single dependency.

pub use jbod_core::{BlockCache, BlockTransport, Jbod, MAX_CACHE_ENTRIES, MIN_CACHE_ENTRIES};
pub use jbod_error::{JbodError, Result};
pub use jbod_proto::{Command, MemTransport, TcpTransport};
pub use jbod_types::{
    Block, BlockAddr, BlockIndex, DiskId, Geometry, BLOCK_SIZE, MAX_IO_LEN,
};
