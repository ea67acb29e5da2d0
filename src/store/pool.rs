//! Basic-block pools - fixed-width slot allocation
//!
//! Design: Storage is acquired in basic blocks of `block_slots` slots so
//! that creating an object never costs a system allocation of its own.
//! Occupancy is tracked per block in a bit vector; allocation is first-fit
//! over existing blocks, growing by one block when nothing fits.

use bitvec::prelude::*;

/// A run of contiguous slots inside one basic block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent {
    pub block: u32,
    pub start: u32,
    pub count: u32,
}

impl Extent {
    /// Sub-run of this extent, `offset` slots in
    pub fn sub(&self, offset: usize, count: usize) -> Extent {
        Extent {
            block: self.block,
            start: self.start + offset as u32,
            count: count as u32,
        }
    }
}

/// One block of slots; each slot holds `width` values
struct BasicBlock<T> {
    values: Vec<T>,
    used: BitVec,
}

impl<T: Clone + Default> BasicBlock<T> {
    fn new(slots: usize, width: usize) -> Self {
        Self {
            values: vec![T::default(); slots * width],
            used: bitvec![0; slots],
        }
    }

    fn capacity(&self) -> usize {
        self.used.len()
    }

    /// First run of `count` free slots
    fn find_run(&self, count: usize) -> Option<usize> {
        let mut run = 0;
        for (i, used) in self.used.iter().by_vals().enumerate() {
            if used {
                run = 0;
            } else {
                run += 1;
                if run == count {
                    return Some(i + 1 - count);
                }
            }
        }
        None
    }
}

/// Pool statistics for monitoring and debugging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub blocks: usize,
    pub capacity: usize,
    pub live: usize,
}

pub struct BlockPool<T> {
    width: usize,
    block_slots: usize,
    blocks: Vec<BasicBlock<T>>,
    live: usize,
}

impl<T: Clone + Default> BlockPool<T> {
    /// Pool of slots holding `width` values each
    pub fn new(width: usize, block_slots: usize) -> Self {
        Self {
            width: width.max(1),
            block_slots: block_slots.max(1),
            blocks: Vec::new(),
            live: 0,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Reserve `count` contiguous slots; returns whether a block was added
    pub fn allocate(&mut self, count: usize) -> (Extent, bool) {
        let count = count.max(1);

        for (index, block) in self.blocks.iter_mut().enumerate() {
            if let Some(start) = block.find_run(count) {
                block.used[start..start + count].fill(true);
                self.live += count;
                return (
                    Extent {
                        block: index as u32,
                        start: start as u32,
                        count: count as u32,
                    },
                    false,
                );
            }
        }

        // Slow path: new basic block large enough for this request
        let mut block = BasicBlock::new(self.block_slots.max(count), self.width);
        block.used[..count].fill(true);
        self.blocks.push(block);
        self.live += count;

        (
            Extent {
                block: (self.blocks.len() - 1) as u32,
                start: 0,
                count: count as u32,
            },
            true,
        )
    }

    /// Return slots to the pool, resetting their contents
    pub fn release(&mut self, extent: Extent) {
        let width = self.width;
        if let Some(block) = self.blocks.get_mut(extent.block as usize) {
            let start = extent.start as usize;
            let end = start + extent.count as usize;
            if end > block.capacity() {
                return;
            }
            let freed = block.used[start..end].count_ones();
            block.used[start..end].fill(false);
            block.values[start * width..end * width].fill(T::default());
            self.live -= freed;
        }
    }

    /// Whether every slot of the extent is allocated
    pub fn is_live(&self, extent: Extent) -> bool {
        self.blocks
            .get(extent.block as usize)
            .map(|block| {
                let start = extent.start as usize;
                let end = start + extent.count as usize;
                end <= block.capacity() && block.used[start..end].all()
            })
            .unwrap_or(false)
    }

    pub fn values(&self, extent: Extent) -> &[T] {
        let block = &self.blocks[extent.block as usize];
        let start = extent.start as usize * self.width;
        &block.values[start..start + extent.count as usize * self.width]
    }

    pub fn values_mut(&mut self, extent: Extent) -> &mut [T] {
        let width = self.width;
        let block = &mut self.blocks[extent.block as usize];
        let start = extent.start as usize * width;
        &mut block.values[start..start + extent.count as usize * width]
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            blocks: self.blocks.len(),
            capacity: self.blocks.iter().map(|b| b.capacity()).sum(),
            live: self.live,
        }
    }

    /// Drop every block
    pub fn clear(&mut self) {
        self.blocks.clear();
        self.live = 0;
    }
}
