//! Bounded block cache with approximate-LRU eviction.
//!
//! A fixed vector of slots keyed by (disk, block). Recency is tracked
//! with a logical clock that ticks on every lookup, update, and insert;
//! eviction picks the first invalid slot, else the valid slot with the
//! smallest access time. A linear scan is deliberate: capacity is capped
//! at 4096 and the clock gives an O(1)-space recency order without a
//! linked LRU list.
//!
//! Callers always receive copies of block data, never references into
//! the slot storage.

use jbod_error::{JbodError, Result};
use jbod_types::{Block, BlockIndex, DiskId, Geometry, BLOCK_SIZE};
use tracing::debug;

/// Smallest allowed cache capacity, in entries.
pub const MIN_CACHE_ENTRIES: usize = 2;

/// Largest allowed cache capacity, in entries.
pub const MAX_CACHE_ENTRIES: usize = 4096;

#[derive(Debug, Clone)]
struct Slot {
    valid: bool,
    disk: DiskId,
    block: BlockIndex,
    access_time: u64,
    data: Block,
}

impl Slot {
    fn empty() -> Self {
        Self {
            valid: false,
            disk: DiskId(0),
            block: BlockIndex(0),
            access_time: 0,
            data: [0_u8; BLOCK_SIZE],
        }
    }

    fn matches(&self, disk: DiskId, block: BlockIndex) -> bool {
        self.valid && self.disk == disk && self.block == block
    }
}

/// Fixed-capacity cache of block contents keyed by (disk, block).
///
/// At most one valid entry exists per key: `insert` rejects keys that
/// are already resident, so overwriting goes through [`BlockCache::update`]
/// or [`BlockCache::upsert`].
#[derive(Debug)]
pub struct BlockCache {
    geom: Geometry,
    slots: Vec<Slot>,
    clock: u64,
    queries: u64,
    hits: u64,
}

impl BlockCache {
    /// Create a cache with `capacity` entries, all initially invalid.
    pub fn new(geom: Geometry, capacity: usize) -> Result<Self> {
        if !(MIN_CACHE_ENTRIES..=MAX_CACHE_ENTRIES).contains(&capacity) {
            return Err(JbodError::CapacityOutOfRange {
                requested: capacity,
                min: MIN_CACHE_ENTRIES,
                max: MAX_CACHE_ENTRIES,
            });
        }
        Ok(Self {
            geom,
            slots: vec![Slot::empty(); capacity],
            clock: 0,
            queries: 0,
            hits: 0,
        })
    }

    /// Look up (disk, block). On a hit, copies the block into `out`,
    /// refreshes the entry's access time, and returns true. On a miss,
    /// `out` is left untouched.
    pub fn lookup(&mut self, disk: DiskId, block: BlockIndex, out: &mut Block) -> bool {
        self.clock += 1;
        self.queries += 1;
        for slot in &mut self.slots {
            if slot.matches(disk, block) {
                out.copy_from_slice(&slot.data);
                slot.access_time = self.clock;
                self.hits += 1;
                return true;
            }
        }
        false
    }

    /// Overwrite the entry for (disk, block) if one is resident and
    /// refresh its access time. Returns whether an entry was updated;
    /// a miss is a silent no-op.
    pub fn update(&mut self, disk: DiskId, block: BlockIndex, data: &Block) -> bool {
        self.clock += 1;
        for slot in &mut self.slots {
            if slot.matches(disk, block) {
                slot.access_time = self.clock;
                slot.data.copy_from_slice(data);
                return true;
            }
        }
        false
    }

    /// Insert a new entry, evicting the least-recently-accessed valid
    /// slot when no invalid slot remains. Fails with `DuplicateKey` if
    /// the key is already resident and `InvalidArgument` if (disk,
    /// block) is outside the array geometry.
    pub fn insert(&mut self, disk: DiskId, block: BlockIndex, data: &Block) -> Result<()> {
        if !self.geom.contains_block(disk, block) {
            return Err(JbodError::InvalidArgument(format!(
                "disk {} block {} outside array geometry",
                disk.0, block.0
            )));
        }
        if self.slots.iter().any(|slot| slot.matches(disk, block)) {
            return Err(JbodError::DuplicateKey {
                disk: disk.0,
                block: block.0,
            });
        }

        self.clock += 1;

        // First invalid slot wins; otherwise the oldest access time,
        // ties resolved by the first minimum found.
        let mut victim = 0;
        for (i, slot) in self.slots.iter().enumerate() {
            if !slot.valid {
                victim = i;
                break;
            }
            if slot.access_time < self.slots[victim].access_time {
                victim = i;
            }
        }

        let slot = &mut self.slots[victim];
        slot.valid = true;
        slot.disk = disk;
        slot.block = block;
        slot.access_time = self.clock;
        slot.data.copy_from_slice(data);
        Ok(())
    }

    /// Update-if-present, else insert. Keeps the cache coherent after a
    /// write; the insert leg can only fail on a key outside the
    /// geometry, which callers of the write path have already excluded.
    pub fn upsert(&mut self, disk: DiskId, block: BlockIndex, data: &Block) {
        if self.update(disk, block, data) {
            return;
        }
        if let Err(error) = self.insert(disk, block, data) {
            debug!(disk = disk.0, block = block.0, %error, "cache upsert insert failed");
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn queries(&self) -> u64 {
        self.queries
    }

    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Hit rate as a percentage. `None` until the first query, since a
    /// zero-query ratio is undefined.
    #[must_use]
    pub fn hit_rate(&self) -> Option<f64> {
        if self.queries == 0 {
            return None;
        }
        Some(100.0 * self.hits as f64 / self.queries as f64)
    }

    /// Log the current hit rate.
    pub fn log_hit_rate(&self) {
        match self.hit_rate() {
            Some(rate) => tracing::info!(
                hits = self.hits,
                queries = self.queries,
                "cache hit rate: {rate:.1}%"
            ),
            None => tracing::info!("cache hit rate: no queries yet"),
        }
    }

    #[cfg(test)]
    fn resident_keys(&self) -> Vec<(u32, u32)> {
        self.slots
            .iter()
            .filter(|slot| slot.valid)
            .map(|slot| (slot.disk.0, slot.block.0))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geom() -> Geometry {
        Geometry::new(4, 16).expect("geometry")
    }

    fn block_of(byte: u8) -> Block {
        [byte; BLOCK_SIZE]
    }

    #[test]
    fn capacity_bounds_are_enforced() {
        assert!(BlockCache::new(geom(), 1).is_err());
        assert!(BlockCache::new(geom(), 4097).is_err());
        assert!(BlockCache::new(geom(), 2).is_ok());
        assert!(BlockCache::new(geom(), 4096).is_ok());
    }

    #[test]
    fn lookup_miss_leaves_buffer_untouched() {
        let mut cache = BlockCache::new(geom(), 4).expect("cache");
        let mut out = block_of(0x55);
        assert!(!cache.lookup(DiskId(0), BlockIndex(0), &mut out));
        assert_eq!(out, block_of(0x55));
        assert_eq!(cache.queries(), 1);
        assert_eq!(cache.hits(), 0);
    }

    #[test]
    fn insert_then_lookup_hits() {
        let mut cache = BlockCache::new(geom(), 4).expect("cache");
        cache
            .insert(DiskId(1), BlockIndex(2), &block_of(0xAA))
            .expect("insert");

        let mut out = [0_u8; BLOCK_SIZE];
        assert!(cache.lookup(DiskId(1), BlockIndex(2), &mut out));
        assert_eq!(out, block_of(0xAA));
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.queries(), 1);
    }

    #[test]
    fn insert_rejects_duplicate_key() {
        let mut cache = BlockCache::new(geom(), 4).expect("cache");
        cache
            .insert(DiskId(0), BlockIndex(0), &block_of(1))
            .expect("insert");
        let err = cache
            .insert(DiskId(0), BlockIndex(0), &block_of(2))
            .expect_err("duplicate");
        assert!(matches!(err, JbodError::DuplicateKey { disk: 0, block: 0 }));
    }

    #[test]
    fn insert_rejects_keys_outside_geometry() {
        let mut cache = BlockCache::new(geom(), 4).expect("cache");
        assert!(cache
            .insert(DiskId(4), BlockIndex(0), &block_of(0))
            .is_err());
        assert!(cache
            .insert(DiskId(0), BlockIndex(16), &block_of(0))
            .is_err());
        // The bounds are exclusive of the counts themselves.
        assert!(cache
            .insert(DiskId(3), BlockIndex(15), &block_of(0))
            .is_ok());
    }

    #[test]
    fn update_is_silent_on_missing_key() {
        let mut cache = BlockCache::new(geom(), 4).expect("cache");
        assert!(!cache.update(DiskId(0), BlockIndex(0), &block_of(9)));
        // No entry appeared.
        let mut out = [0_u8; BLOCK_SIZE];
        assert!(!cache.lookup(DiskId(0), BlockIndex(0), &mut out));
    }

    #[test]
    fn update_overwrites_resident_entry() {
        let mut cache = BlockCache::new(geom(), 4).expect("cache");
        cache
            .insert(DiskId(0), BlockIndex(3), &block_of(1))
            .expect("insert");
        assert!(cache.update(DiskId(0), BlockIndex(3), &block_of(2)));

        let mut out = [0_u8; BLOCK_SIZE];
        assert!(cache.lookup(DiskId(0), BlockIndex(3), &mut out));
        assert_eq!(out, block_of(2));
    }

    #[test]
    fn eviction_prefers_invalid_slots() {
        let mut cache = BlockCache::new(geom(), 3).expect("cache");
        cache
            .insert(DiskId(0), BlockIndex(0), &block_of(0))
            .expect("insert");
        cache
            .insert(DiskId(0), BlockIndex(1), &block_of(1))
            .expect("insert");
        // One slot still invalid: no valid entry may be evicted.
        cache
            .insert(DiskId(0), BlockIndex(2), &block_of(2))
            .expect("insert");

        let mut keys = cache.resident_keys();
        keys.sort_unstable();
        assert_eq!(keys, vec![(0, 0), (0, 1), (0, 2)]);
    }

    #[test]
    fn eviction_picks_least_recently_accessed() {
        let mut cache = BlockCache::new(geom(), 2).expect("cache");
        cache
            .insert(DiskId(0), BlockIndex(0), &block_of(0))
            .expect("insert");
        cache
            .insert(DiskId(0), BlockIndex(1), &block_of(1))
            .expect("insert");

        // Touch (0,0) so (0,1) becomes the oldest.
        let mut out = [0_u8; BLOCK_SIZE];
        assert!(cache.lookup(DiskId(0), BlockIndex(0), &mut out));

        cache
            .insert(DiskId(0), BlockIndex(2), &block_of(2))
            .expect("insert evicts (0,1)");

        assert!(cache.lookup(DiskId(0), BlockIndex(0), &mut out));
        assert!(!cache.lookup(DiskId(0), BlockIndex(1), &mut out));
        assert!(cache.lookup(DiskId(0), BlockIndex(2), &mut out));
    }

    #[test]
    fn keys_stay_unique_across_upserts() {
        let mut cache = BlockCache::new(geom(), 4).expect("cache");
        cache.upsert(DiskId(1), BlockIndex(1), &block_of(1));
        cache.upsert(DiskId(1), BlockIndex(1), &block_of(2));
        cache.upsert(DiskId(1), BlockIndex(1), &block_of(3));

        assert_eq!(cache.resident_keys(), vec![(1, 1)]);
        let mut out = [0_u8; BLOCK_SIZE];
        assert!(cache.lookup(DiskId(1), BlockIndex(1), &mut out));
        assert_eq!(out, block_of(3));
    }

    #[test]
    fn hit_rate_is_undefined_before_queries() {
        let mut cache = BlockCache::new(geom(), 2).expect("cache");
        assert_eq!(cache.hit_rate(), None);

        cache
            .insert(DiskId(0), BlockIndex(0), &block_of(0))
            .expect("insert");
        let mut out = [0_u8; BLOCK_SIZE];
        assert!(cache.lookup(DiskId(0), BlockIndex(0), &mut out));
        assert!(!cache.lookup(DiskId(0), BlockIndex(1), &mut out));
        let rate = cache.hit_rate().expect("defined after queries");
        assert!((rate - 50.0).abs() < f64::EPSILON);
    }
}
