#![forbid(unsafe_code)]
//! Error types for the JBOD aggregation layer.
//!
//! `JbodError` is the single user-facing error type returned by the
//! orchestrator, the cache, and the transports. Crate-internal errors
//! (e.g. `GeometryError` from `jbod-types`) convert into `JbodError` at
//! their crate boundaries; this crate stays independent of the other
//! workspace members to avoid cyclic dependencies.
//!
//! Propagation policy:
//!
//! - Argument and construction errors (`InvalidArgument`,
//!   `CapacityOutOfRange`) are detected synchronously at the start of a
//!   call, before any transport traffic.
//! - `DuplicateKey` is a cache-internal outcome; the read/write paths
//!   treat it as non-fatal and log it, since opportunistic cache
//!   population is a performance optimization, not a correctness
//!   requirement.
//! - `Transport`, `Protocol`, and `Io` abort the whole read/write call.
//!   No partial-transfer guarantee is made; callers retry the entire
//!   operation.

use thiserror::Error;

/// Unified error type for all JBOD layer operations.
#[derive(Debug, Error)]
pub enum JbodError {
    /// Operating system I/O error (wraps `std::io::Error`).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A caller-supplied argument is out of range: transfer length over
    /// the per-call maximum, address range past the end of the array, or
    /// a (disk, block) key outside the geometry.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Cache capacity outside the supported `[2, 4096]` range.
    #[error("cache capacity {requested} out of range [{min}, {max}]")]
    CapacityOutOfRange {
        requested: usize,
        min: usize,
        max: usize,
    },

    /// Cache insert for a (disk, block) key that is already resident.
    /// Callers wanting overwrite semantics use update or upsert instead.
    #[error("cache entry for disk {disk} block {block} already present")]
    DuplicateKey { disk: u32, block: u32 },

    /// The block array reported failure for an operation.
    #[error("transport failure during {op}: {detail}")]
    Transport { op: &'static str, detail: String },

    /// Malformed traffic on the wire: bad frame length, unknown opcode,
    /// missing payload on a read response.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl JbodError {
    /// Shorthand for a transport failure with a static operation name.
    #[must_use]
    pub fn transport(op: &'static str, detail: impl Into<String>) -> Self {
        Self::Transport {
            op,
            detail: detail.into(),
        }
    }
}

/// Result alias using `JbodError`.
pub type Result<T> = std::result::Result<T, JbodError>;
