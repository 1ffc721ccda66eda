#![forbid(unsafe_code)]
//! Shared types for the JBOD aggregation layer.
//!
//! Defines the array geometry, the unit-carrying index newtypes, and the
//! linear-address-to-block translation that every other crate builds on.
//! No I/O happens here.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bytes per block. Fixed for the whole array; also the unit of transfer
/// on the wire (one block per read/write frame).
pub const BLOCK_SIZE: usize = 256;

/// Largest single read or write a client may issue, in bytes.
pub const MAX_IO_LEN: usize = 1024;

/// Default number of disks in the array.
pub const DEFAULT_NUM_DISKS: u32 = 16;

/// Default number of blocks per disk.
pub const DEFAULT_BLOCKS_PER_DISK: u32 = 256;

/// The wire protocol packs the disk index into a 4-bit field.
pub const MAX_DISKS: u32 = 16;

/// The wire protocol packs the block index into a 22-bit field, but block
/// indices are carried as `u32` and capped well below that.
pub const MAX_BLOCKS_PER_DISK: u32 = 65536;

/// One block of data, owned.
pub type Block = [u8; BLOCK_SIZE];

/// Disk index within the array (`0..num_disks`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DiskId(pub u32);

/// Block index within one disk (`0..blocks_per_disk`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockIndex(pub u32);

/// A fully translated position: which disk, which block, and the byte
/// offset inside that block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockAddr {
    pub disk: DiskId,
    pub block: BlockIndex,
    pub offset: usize,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("invalid disk count {0}: must be in 1..={MAX_DISKS}")]
    DiskCount(u32),
    #[error("invalid blocks-per-disk {0}: must be in 1..={MAX_BLOCKS_PER_DISK}")]
    BlockCount(u32),
}

/// Validated array geometry.
///
/// The geometry is a plain value: constructing one cannot allocate and a
/// copy is handed to whoever needs to translate addresses. The wire
/// protocol bounds the ranges (4-bit disk field, 22-bit block field), so
/// validation happens once here instead of at every encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    num_disks: u32,
    blocks_per_disk: u32,
}

impl Geometry {
    pub fn new(num_disks: u32, blocks_per_disk: u32) -> Result<Self, GeometryError> {
        if num_disks == 0 || num_disks > MAX_DISKS {
            return Err(GeometryError::DiskCount(num_disks));
        }
        if blocks_per_disk == 0 || blocks_per_disk > MAX_BLOCKS_PER_DISK {
            return Err(GeometryError::BlockCount(blocks_per_disk));
        }
        Ok(Self {
            num_disks,
            blocks_per_disk,
        })
    }

    #[must_use]
    pub fn num_disks(self) -> u32 {
        self.num_disks
    }

    #[must_use]
    pub fn blocks_per_disk(self) -> u32 {
        self.blocks_per_disk
    }

    /// Bytes per disk.
    #[must_use]
    pub fn disk_size(self) -> u64 {
        u64::from(self.blocks_per_disk) * BLOCK_SIZE as u64
    }

    /// Total addressable bytes across the whole array.
    #[must_use]
    pub fn capacity(self) -> u64 {
        u64::from(self.num_disks) * self.disk_size()
    }

    /// True iff `[addr, addr + len)` lies inside the array.
    #[must_use]
    pub fn contains(self, addr: u32, len: usize) -> bool {
        match u64::from(addr).checked_add(len as u64) {
            Some(end) => end <= self.capacity(),
            None => false,
        }
    }

    /// Map a linear byte address to its (disk, block, offset) triple.
    ///
    /// Pure and total over valid addresses; callers validate the range
    /// (via [`Geometry::contains`]) before translating.
    #[must_use]
    pub fn translate(self, addr: u32) -> BlockAddr {
        debug_assert!(u64::from(addr) < self.capacity());
        let disk = u64::from(addr) / self.disk_size();
        let rem = u64::from(addr) % self.disk_size();
        let block = rem / BLOCK_SIZE as u64;
        let offset = rem % BLOCK_SIZE as u64;
        BlockAddr {
            disk: DiskId(disk as u32),
            block: BlockIndex(block as u32),
            offset: offset as usize,
        }
    }

    /// True iff (disk, block) names a real block of this array.
    #[must_use]
    pub fn contains_block(self, disk: DiskId, block: BlockIndex) -> bool {
        disk.0 < self.num_disks && block.0 < self.blocks_per_disk
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            num_disks: DEFAULT_NUM_DISKS,
            blocks_per_disk: DEFAULT_BLOCKS_PER_DISK,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_rejects_out_of_range() {
        assert!(Geometry::new(0, 256).is_err());
        assert!(Geometry::new(17, 256).is_err());
        assert!(Geometry::new(16, 0).is_err());
        assert!(Geometry::new(16, MAX_BLOCKS_PER_DISK + 1).is_err());
        assert!(Geometry::new(1, 1).is_ok());
        assert!(Geometry::new(16, 65536).is_ok());
    }

    #[test]
    fn default_geometry_capacity() {
        let geom = Geometry::default();
        assert_eq!(geom.disk_size(), 256 * 256);
        assert_eq!(geom.capacity(), 16 * 256 * 256);
    }

    #[test]
    fn translate_round_trips() {
        let geom = Geometry::new(8, 256).expect("geometry");
        // Every translated triple must reassemble to the original address
        // and stay inside the per-disk / per-block bounds.
        for addr in (0..geom.capacity() as u32).step_by(97) {
            let pos = geom.translate(addr);
            assert!(pos.disk.0 < geom.num_disks());
            assert!(pos.block.0 < geom.blocks_per_disk());
            assert!(pos.offset < BLOCK_SIZE);
            let back = u64::from(pos.disk.0) * geom.disk_size()
                + u64::from(pos.block.0) * BLOCK_SIZE as u64
                + pos.offset as u64;
            assert_eq!(back, u64::from(addr));
        }
    }

    #[test]
    fn translate_block_boundaries() {
        let geom = Geometry::new(8, 256).expect("geometry");
        let pos = geom.translate(500);
        assert_eq!(pos.disk, DiskId(0));
        assert_eq!(pos.block, BlockIndex(1));
        assert_eq!(pos.offset, 244);

        let disk_size = geom.disk_size() as u32;
        let pos = geom.translate(disk_size);
        assert_eq!(pos.disk, DiskId(1));
        assert_eq!(pos.block, BlockIndex(0));
        assert_eq!(pos.offset, 0);

        let pos = geom.translate(disk_size - 1);
        assert_eq!(pos.disk, DiskId(0));
        assert_eq!(pos.block, BlockIndex(255));
        assert_eq!(pos.offset, 255);
    }

    #[test]
    fn contains_block_matches_geometry() {
        let geom = Geometry::new(2, 2).expect("geometry");
        assert!(geom.contains_block(DiskId(1), BlockIndex(1)));
        assert!(!geom.contains_block(DiskId(2), BlockIndex(0)));
        assert!(!geom.contains_block(DiskId(0), BlockIndex(2)));
    }

    #[test]
    fn contains_checks_end_of_range() {
        let geom = Geometry::new(1, 4).expect("geometry");
        assert!(geom.contains(0, 1024));
        assert!(!geom.contains(1, 1024));
        assert!(geom.contains(1023, 1));
        assert!(geom.contains(1024, 0));
        assert!(!geom.contains(u32::MAX, usize::MAX));
    }
}
