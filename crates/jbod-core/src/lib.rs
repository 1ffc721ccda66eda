#![forbid(unsafe_code)]
//! Core read/write engine for the JBOD aggregation layer.
//!
//! [`Jbod`] presents one linear byte address space over an array of
//! fixed-size disks reached through a [`BlockTransport`]. Reads and
//! writes of up to [`MAX_IO_LEN`] bytes are translated into a walk of
//! block-granular transport operations, with read-modify-write merging
//! for partially covered blocks and an optional [`BlockCache`] consulted
//! on every block touched.
//!
//! The engine is single-threaded and synchronous: every cache access,
//! translation, and transport call completes before the next begins.
//! Callers needing concurrent access serialize it externally.

mod cache;

pub use cache::{BlockCache, MAX_CACHE_ENTRIES, MIN_CACHE_ENTRIES};
pub use jbod_proto::BlockTransport;

use jbod_error::{JbodError, Result};
use jbod_types::{Block, BlockIndex, DiskId, Geometry, BLOCK_SIZE, MAX_IO_LEN};
use tracing::debug;

/// The orchestrator: owns the transport and, optionally, the cache.
///
/// The cache is a performance layer only. With no cache configured every
/// block goes straight through the transport, and observable read/write
/// results are identical either way.
#[derive(Debug)]
pub struct Jbod<T: BlockTransport> {
    geom: Geometry,
    transport: T,
    cache: Option<BlockCache>,
}

impl<T: BlockTransport> Jbod<T> {
    /// Build an engine with no cache (direct passthrough mode).
    pub fn new(geom: Geometry, transport: T) -> Self {
        Self {
            geom,
            transport,
            cache: None,
        }
    }

    /// Build an engine with a cache of `capacity` entries.
    pub fn with_cache(geom: Geometry, transport: T, capacity: usize) -> Result<Self> {
        let mut jbod = Self::new(geom, transport);
        jbod.enable_cache(capacity)?;
        Ok(jbod)
    }

    /// Attach a cache. Fails if one is already attached or `capacity`
    /// is outside `[MIN_CACHE_ENTRIES, MAX_CACHE_ENTRIES]`.
    pub fn enable_cache(&mut self, capacity: usize) -> Result<()> {
        if self.cache.is_some() {
            return Err(JbodError::InvalidArgument(
                "cache already enabled".to_owned(),
            ));
        }
        self.cache = Some(BlockCache::new(self.geom, capacity)?);
        Ok(())
    }

    /// Detach and return the cache. Fails if none is attached.
    pub fn disable_cache(&mut self) -> Result<BlockCache> {
        self.cache
            .take()
            .ok_or_else(|| JbodError::InvalidArgument("cache not enabled".to_owned()))
    }

    #[must_use]
    pub fn cache(&self) -> Option<&BlockCache> {
        self.cache.as_ref()
    }

    #[must_use]
    pub fn geometry(&self) -> Geometry {
        self.geom
    }

    /// Make the array ready for I/O.
    pub fn mount(&mut self) -> Result<()> {
        self.transport.mount()
    }

    /// Release the array.
    pub fn unmount(&mut self) -> Result<()> {
        self.transport.unmount()
    }

    /// Read `out.len()` bytes starting at linear address `addr`.
    ///
    /// Returns the number of bytes read (always `out.len()`). Any
    /// transport failure aborts the whole call; no partial result is
    /// reported. Argument errors are detected before any transport
    /// traffic.
    pub fn read(&mut self, addr: u32, out: &mut [u8]) -> Result<usize> {
        let len = out.len();
        self.validate(addr, len)?;
        if len == 0 {
            return Ok(0);
        }

        let first = self.geom.translate(addr);
        self.transport.seek(first.disk, first.block)?;

        let mut copied = 0;
        while copied < len {
            // Translating per block keeps disk crossings exact: offset
            // is non-zero only on the first block.
            let pos = self.geom.translate(addr + copied as u32);
            let n = (len - copied).min(BLOCK_SIZE - pos.offset);
            let block = self.fetch_block(pos.disk, pos.block)?;
            out[copied..copied + n].copy_from_slice(&block[pos.offset..pos.offset + n]);
            copied += n;
        }
        Ok(len)
    }

    /// Write `data` starting at linear address `addr`.
    ///
    /// Partially covered blocks are fetched, merged, and written back;
    /// fully covered interior blocks are overwritten without a prior
    /// read. Returns `data.len()`. Same all-or-nothing failure policy
    /// as [`Jbod::read`].
    pub fn write(&mut self, addr: u32, data: &[u8]) -> Result<usize> {
        let len = data.len();
        self.validate(addr, len)?;
        if len == 0 {
            return Ok(0);
        }

        let first = self.geom.translate(addr);
        self.transport.seek(first.disk, first.block)?;

        // First block: read-merge-write, even when the write happens to
        // cover it entirely.
        let n = len.min(BLOCK_SIZE - first.offset);
        let mut block = self.fetch_block(first.disk, first.block)?;
        block[first.offset..first.offset + n].copy_from_slice(&data[..n]);
        self.store_block(first.disk, first.block, &block)?;
        let mut written = n;

        // Interior blocks fully covered by `data`: no read-before-write.
        while len - written >= BLOCK_SIZE {
            let pos = self.geom.translate(addr + written as u32);
            let mut block = [0_u8; BLOCK_SIZE];
            block.copy_from_slice(&data[written..written + BLOCK_SIZE]);
            self.store_block(pos.disk, pos.block, &block)?;
            written += BLOCK_SIZE;
        }

        // Trailing partial block: read-merge-write at offset zero.
        if written < len {
            let pos = self.geom.translate(addr + written as u32);
            let mut block = self.fetch_block(pos.disk, pos.block)?;
            block[..len - written].copy_from_slice(&data[written..]);
            self.store_block(pos.disk, pos.block, &block)?;
        }
        Ok(len)
    }

    fn validate(&self, addr: u32, len: usize) -> Result<()> {
        if len > MAX_IO_LEN {
            return Err(JbodError::InvalidArgument(format!(
                "transfer length {len} exceeds per-call maximum {MAX_IO_LEN}"
            )));
        }
        if !self.geom.contains(addr, len) {
            return Err(JbodError::InvalidArgument(format!(
                "range [{addr}, {addr} + {len}) exceeds array capacity {}",
                self.geom.capacity()
            )));
        }
        Ok(())
    }

    /// Get one block: cache hit if possible, else a defensive re-seek
    /// and a transport read, opportunistically populating the cache.
    fn fetch_block(&mut self, disk: DiskId, block: BlockIndex) -> Result<Block> {
        if let Some(cache) = self.cache.as_mut() {
            let mut buf = [0_u8; BLOCK_SIZE];
            if cache.lookup(disk, block, &mut buf) {
                return Ok(buf);
            }
        }

        // The transport position may be stale after cache hits skipped
        // block reads; re-seek rather than assume.
        self.transport.seek(disk, block)?;
        let data = self.transport.read_block()?;

        if let Some(cache) = self.cache.as_mut() {
            // Population is best-effort: a failed insert costs a future
            // hit, not correctness.
            if let Err(error) = cache.insert(disk, block, &data) {
                debug!(disk = disk.0, block = block.0, %error, "cache insert after miss failed");
            }
        }
        Ok(data)
    }

    /// Write one block through the transport and keep the cache
    /// coherent for that key.
    fn store_block(&mut self, disk: DiskId, block: BlockIndex, data: &Block) -> Result<()> {
        self.transport.seek(disk, block)?;
        self.transport.write_block(data)?;
        if let Some(cache) = self.cache.as_mut() {
            cache.upsert(disk, block, data);
        }
        Ok(())
    }
}
