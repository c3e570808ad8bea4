//! Per-rigid-body hit lists filled by the occupancy kernel.
//!
//! Each rigid-body slot owns a block of `cells_per_block` records. Workers of
//! the raymarch kernel reserve a record position through an atomic counter and
//! write it without further synchronization. A null record (`cell_index = -1`)
//! terminates a block.

use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};

use super::atomics::SlotCounters;

/// One occupied cell of one rigid body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionData {
    /// Interior sample index, `-1` for the null record
    pub cell_index: i32,
    /// Occupied depth of the detection column, surface local units
    pub occupancy: f32,
    /// Distance from the bottom of the detection column to the occupied interval
    pub distance: f32,
}

impl InteractionData {
    pub const NULL: Self = Self {
        cell_index: -1,
        occupancy: 0.0,
        distance: 0.0,
    };

    #[inline]
    pub fn is_null(&self) -> bool {
        self.cell_index < 0
    }
}

#[derive(Debug)]
struct HitSlot {
    cell_index: AtomicI32,
    occupancy: AtomicU32,
    distance: AtomicU32,
}

impl HitSlot {
    fn null() -> Self {
        Self {
            cell_index: AtomicI32::new(-1),
            occupancy: AtomicU32::new(0),
            distance: AtomicU32::new(0),
        }
    }

    fn store(&self, data: InteractionData) {
        self.occupancy
            .store(data.occupancy.to_bits(), Ordering::Relaxed);
        self.distance.store(data.distance.to_bits(), Ordering::Relaxed);
        self.cell_index.store(data.cell_index, Ordering::Relaxed);
    }

    fn load(&self) -> InteractionData {
        InteractionData {
            cell_index: self.cell_index.load(Ordering::Relaxed),
            occupancy: f32::from_bits(self.occupancy.load(Ordering::Relaxed)),
            distance: f32::from_bits(self.distance.load(Ordering::Relaxed)),
        }
    }
}

/// Fixed-capacity hit blocks, one per rigid-body slot.
#[derive(Debug)]
pub struct InteractionBlocks {
    slots: Vec<HitSlot>,
    cells_per_block: usize,
    counters: SlotCounters,
}

impl InteractionBlocks {
    pub fn new(blocks: usize, cells_per_block: usize) -> Self {
        let cells_per_block = cells_per_block.max(1);
        Self {
            slots: (0..blocks * cells_per_block).map(|_| HitSlot::null()).collect(),
            cells_per_block,
            counters: SlotCounters::new(blocks),
        }
    }

    pub fn block_count(&self) -> usize {
        self.counters.len()
    }

    pub fn cells_per_block(&self) -> usize {
        self.cells_per_block
    }

    #[inline]
    fn slot(&self, block: usize, position: usize) -> &HitSlot {
        &self.slots[block * self.cells_per_block + position]
    }

    /// Empties every block and zeroes the hit counters.
    pub fn reset(&self) {
        self.counters.reset();
        for block in 0..self.block_count() {
            self.slot(block, 0).store(InteractionData::NULL);
            self.slot(block, self.cells_per_block - 1)
                .store(InteractionData::NULL);
        }
    }

    /// Appends a record to `block`. Returns `false` when the block is full and
    /// the record was dropped.
    pub fn add_hit(&self, block: usize, data: InteractionData) -> bool {
        let count = self.counters.fetch_add_int(block);
        if count > self.cells_per_block {
            return false;
        }
        self.slot(block, count - 1).store(data);
        true
    }

    /// Terminates partially filled blocks with a null record.
    pub fn finish(&self) {
        for block in 0..self.block_count() {
            let count = self.counters.get(block);
            if count > 0 && count < self.cells_per_block {
                self.slot(block, count).store(InteractionData::NULL);
            }
        }
    }

    pub fn get(&self, block: usize, position: usize) -> InteractionData {
        self.slot(block, position).load()
    }

    /// Records of `block` up to the first null record.
    pub fn hits(&self, block: usize) -> impl Iterator<Item = InteractionData> + '_ {
        (0..self.cells_per_block)
            .map(move |p| self.get(block, p))
            .take_while(|d| !d.is_null())
    }

    pub fn has_hit(&self, block: usize) -> bool {
        !self.get(block, 0).is_null()
    }

    /// Whether the last position of `block` is used.
    pub fn has_reached_cell_limit(&self, block: usize) -> bool {
        !self.get(block, self.cells_per_block - 1).is_null()
    }

    /// Records dropped from `block` since the last reset.
    pub fn truncated(&self, block: usize) -> usize {
        self.counters.get(block).saturating_sub(self.cells_per_block)
    }
}
