//! In-memory simulated array.
//!
//! Stands in for a real array server in tests and demo runs. It keeps
//! the server's observable quirks: operations require a mount, the
//! position advances by one block after each read/write, and seeking to
//! a disk resets the block position to zero. Fault injection and
//! operation counters let tests assert exactly what reached the
//! transport.

use std::sync::Arc;

use parking_lot::Mutex;

use jbod_error::{JbodError, Result};
use jbod_types::{Block, BlockIndex, DiskId, Geometry, BLOCK_SIZE};

use crate::BlockTransport;

#[derive(Debug, Default, Clone, Copy)]
struct OpCounts {
    seeks: u64,
    reads: u64,
    writes: u64,
}

#[derive(Debug)]
struct State {
    disks: Vec<Vec<u8>>,
    mounted: bool,
    disk: u32,
    block: u32,
    fail_delay: u32,
    fail_budget: u32,
    counts: OpCounts,
}

/// Simulated array transport. Cloning shares the underlying array, so a
/// test can hold one handle for inspection while the orchestrator owns
/// the other.
#[derive(Debug, Clone)]
pub struct MemTransport {
    geom: Geometry,
    state: Arc<Mutex<State>>,
}

impl MemTransport {
    #[must_use]
    pub fn new(geom: Geometry) -> Self {
        let disk_len = geom.disk_size() as usize;
        let disks = (0..geom.num_disks())
            .map(|_| vec![0_u8; disk_len])
            .collect();
        Self {
            geom,
            state: Arc::new(Mutex::new(State {
                disks,
                mounted: false,
                disk: 0,
                block: 0,
                fail_delay: 0,
                fail_budget: 0,
                counts: OpCounts::default(),
            })),
        }
    }

    /// Make the next `n` operations fail with a transport error.
    pub fn fail_next_ops(&self, n: u32) {
        self.fail_after_ops(0, n);
    }

    /// Let `delay` operations through, then fail the following `n`.
    pub fn fail_after_ops(&self, delay: u32, n: u32) {
        let mut state = self.state.lock();
        state.fail_delay = delay;
        state.fail_budget = n;
    }

    /// Copy a block straight out of the backing store, bypassing the
    /// transport surface. Test-side inspection only.
    #[must_use]
    pub fn block_at(&self, disk: DiskId, block: BlockIndex) -> Block {
        let state = self.state.lock();
        let start = block.0 as usize * BLOCK_SIZE;
        let mut out = [0_u8; BLOCK_SIZE];
        out.copy_from_slice(&state.disks[disk.0 as usize][start..start + BLOCK_SIZE]);
        out
    }

    #[must_use]
    pub fn mounted(&self) -> bool {
        self.state.lock().mounted
    }

    #[must_use]
    pub fn seek_count(&self) -> u64 {
        self.state.lock().counts.seeks
    }

    #[must_use]
    pub fn read_count(&self) -> u64 {
        self.state.lock().counts.reads
    }

    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.state.lock().counts.writes
    }

    fn check_fault(state: &mut State, op: &'static str) -> Result<()> {
        if state.fail_delay > 0 {
            state.fail_delay -= 1;
            return Ok(());
        }
        if state.fail_budget > 0 {
            state.fail_budget -= 1;
            return Err(JbodError::transport(op, "injected fault"));
        }
        Ok(())
    }

    fn check_mounted(state: &State, op: &'static str) -> Result<()> {
        if !state.mounted {
            return Err(JbodError::transport(op, "array not mounted"));
        }
        Ok(())
    }
}

impl BlockTransport for MemTransport {
    fn mount(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        Self::check_fault(&mut state, "mount")?;
        if state.mounted {
            return Err(JbodError::transport("mount", "array already mounted"));
        }
        state.mounted = true;
        state.disk = 0;
        state.block = 0;
        Ok(())
    }

    fn unmount(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        Self::check_fault(&mut state, "unmount")?;
        Self::check_mounted(&state, "unmount")?;
        state.mounted = false;
        Ok(())
    }

    fn seek(&mut self, disk: DiskId, block: BlockIndex) -> Result<()> {
        let mut state = self.state.lock();
        Self::check_fault(&mut state, "seek")?;
        Self::check_mounted(&state, "seek")?;
        if !self.geom.contains_block(disk, block) {
            return Err(JbodError::transport(
                "seek",
                format!("position disk {} block {} outside array", disk.0, block.0),
            ));
        }
        // Seek-to-disk resets the block position; the trait-level seek
        // always lands on an explicit block, so set both.
        state.disk = disk.0;
        state.block = block.0;
        state.counts.seeks += 1;
        Ok(())
    }

    fn read_block(&mut self) -> Result<Block> {
        let mut state = self.state.lock();
        Self::check_fault(&mut state, "read_block")?;
        Self::check_mounted(&state, "read_block")?;
        if state.block >= self.geom.blocks_per_disk() {
            return Err(JbodError::transport(
                "read_block",
                "position ran past the end of the disk",
            ));
        }
        let start = state.block as usize * BLOCK_SIZE;
        let mut out = [0_u8; BLOCK_SIZE];
        out.copy_from_slice(&state.disks[state.disk as usize][start..start + BLOCK_SIZE]);
        state.block += 1;
        state.counts.reads += 1;
        Ok(out)
    }

    fn write_block(&mut self, data: &Block) -> Result<()> {
        let mut state = self.state.lock();
        Self::check_fault(&mut state, "write_block")?;
        Self::check_mounted(&state, "write_block")?;
        if state.block >= self.geom.blocks_per_disk() {
            return Err(JbodError::transport(
                "write_block",
                "position ran past the end of the disk",
            ));
        }
        let start = state.block as usize * BLOCK_SIZE;
        let disk = state.disk as usize;
        state.disks[disk][start..start + BLOCK_SIZE].copy_from_slice(data);
        state.block += 1;
        state.counts.writes += 1;
        Ok(())
    }
}
