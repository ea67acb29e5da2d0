//! Object store - handle pool plus per-class instance pools
//!
//! Design: Objects are addressed by `ObjectId`, a slot in the handle pool.
//! - Each handle wraps an `Instance`: a class plus an extent in that
//!   class's instance pool
//! - Instance pools are basic-block pools whose cell type follows the class
//!   storage layout (raw bytes, strings, member slots, component lists)
//! - Arrays occupy one contiguous extent; views share their base extent

pub mod pool;

#[cfg(test)]
mod tests;

pub use pool::{BlockPool, Extent, PoolStats};

use crate::class::ClassId;
use crate::config::StoreConfig;
use crate::handle::{AssocList, Handle};
use crate::mta::{Data, DataMut};
use std::fmt;

/// Identifier of a live object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    block: u32,
    slot: u32,
}

impl ObjectId {
    fn from_extent(extent: Extent) -> Self {
        Self {
            block: extent.block,
            slot: extent.start,
        }
    }

    fn extent(self) -> Extent {
        Extent {
            block: self.block,
            start: self.slot,
            count: 1,
        }
    }

    pub fn block(self) -> u32 {
        self.block
    }

    pub fn slot(self) -> u32 {
        self.slot
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}:{}}}", self.block, self.slot)
    }
}

/// Instance layout of a class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// No storage; cannot be instantiated
    Abstract,
    /// Fixed-size raw elements
    Bytes(usize),
    /// One owned string per element
    Text,
    /// Member slots of a structured class
    Slots(usize),
    /// Dynamic component list (STRUC)
    Components,
}

impl Storage {
    pub fn is_abstract(&self) -> bool {
        matches!(self, Self::Abstract | Self::Slots(0))
    }

    /// Element size in bytes as reported to transfers
    pub fn element_size(&self) -> usize {
        match self {
            Self::Bytes(size) => *size,
            _ => 0,
        }
    }
}

/// Raw instance storage of one class
pub enum Cells {
    Abstract,
    Bytes(BlockPool<u8>),
    Text(BlockPool<String>),
    Slots(BlockPool<Option<ObjectId>>),
    Components(BlockPool<AssocList>),
}

impl Cells {
    fn new(storage: &Storage, block_slots: usize) -> Self {
        match *storage {
            Storage::Abstract | Storage::Slots(0) => Self::Abstract,
            Storage::Bytes(size) => Self::Bytes(BlockPool::new(size, block_slots)),
            Storage::Text => Self::Text(BlockPool::new(1, block_slots)),
            Storage::Slots(n) => Self::Slots(BlockPool::new(n, block_slots)),
            Storage::Components => Self::Components(BlockPool::new(1, block_slots)),
        }
    }

    fn allocate(&mut self, count: usize) -> Option<(Extent, bool)> {
        match self {
            Self::Abstract => None,
            Self::Bytes(pool) => Some(pool.allocate(count)),
            Self::Text(pool) => Some(pool.allocate(count)),
            Self::Slots(pool) => Some(pool.allocate(count)),
            Self::Components(pool) => Some(pool.allocate(count)),
        }
    }

    fn release(&mut self, extent: Extent) {
        match self {
            Self::Abstract => {}
            Self::Bytes(pool) => pool.release(extent),
            Self::Text(pool) => pool.release(extent),
            Self::Slots(pool) => pool.release(extent),
            Self::Components(pool) => pool.release(extent),
        }
    }

    fn stats(&self) -> PoolStats {
        match self {
            Self::Abstract => PoolStats::default(),
            Self::Bytes(pool) => pool.stats(),
            Self::Text(pool) => pool.stats(),
            Self::Slots(pool) => pool.stats(),
            Self::Components(pool) => pool.stats(),
        }
    }

    /// Element data of a primitive instance
    pub fn data(&self, extent: Extent) -> Option<Data<'_>> {
        match self {
            Self::Bytes(pool) => Some(Data::Bytes(pool.values(extent))),
            Self::Text(pool) => Some(Data::Text(pool.values(extent))),
            _ => None,
        }
    }

    pub fn data_mut(&mut self, extent: Extent) -> Option<DataMut<'_>> {
        match self {
            Self::Bytes(pool) => Some(DataMut::Bytes(pool.values_mut(extent))),
            Self::Text(pool) => Some(DataMut::Text(pool.values_mut(extent))),
            _ => None,
        }
    }

    /// Member slots of a structured instance (all elements of an array)
    pub fn slots(&self, extent: Extent) -> Option<&[Option<ObjectId>]> {
        match self {
            Self::Slots(pool) => Some(pool.values(extent)),
            _ => None,
        }
    }

    pub fn slots_mut(&mut self, extent: Extent) -> Option<&mut [Option<ObjectId>]> {
        match self {
            Self::Slots(pool) => Some(pool.values_mut(extent)),
            _ => None,
        }
    }

    /// Component list of a STRUC instance
    pub fn components(&self, extent: Extent) -> Option<&AssocList> {
        match self {
            Self::Components(pool) => pool.values(extent).first(),
            _ => None,
        }
    }

    pub fn components_mut(&mut self, extent: Extent) -> Option<&mut AssocList> {
        match self {
            Self::Components(pool) => pool.values_mut(extent).first_mut(),
            _ => None,
        }
    }

    pub fn components_all(&self, extent: Extent) -> Option<&[AssocList]> {
        match self {
            Self::Components(pool) => Some(pool.values(extent)),
            _ => None,
        }
    }
}

/// A class plus the slots its data occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instance {
    pub class: ClassId,
    pub extent: Extent,
}

impl Instance {
    /// The `index`th element as a single-element instance
    pub fn element(&self, index: usize) -> Instance {
        Instance {
            class: self.class,
            extent: self.extent.sub(index, 1),
        }
    }
}

/// Store statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub handles: usize,
    pub elements: usize,
    pub blocks: usize,
}

pub struct ObjectStore {
    handles: BlockPool<Option<Handle>>,
    pools: Vec<Cells>,
    block_slots: usize,
}

impl ObjectStore {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            handles: BlockPool::new(1, config.handle_block_slots),
            pools: Vec::new(),
            block_slots: config.block_slots,
        }
    }

    /// Create the instance pool for a newly defined class
    pub fn register(&mut self, class: ClassId, storage: &Storage) {
        let index = class.index();
        while self.pools.len() <= index {
            self.pools.push(Cells::Abstract);
        }
        self.pools[index] = Cells::new(storage, self.block_slots);
    }

    /// Reserve `count` contiguous elements; also reports whether a block was added
    pub fn allocate(&mut self, class: ClassId, count: usize) -> Option<(Instance, bool)> {
        let cells = self.pools.get_mut(class.index())?;
        let (extent, grown) = cells.allocate(count)?;
        Some((Instance { class, extent }, grown))
    }

    pub fn release(&mut self, instance: Instance) {
        if let Some(cells) = self.pools.get_mut(instance.class.index()) {
            cells.release(instance.extent);
        }
    }

    pub fn cells(&self, class: ClassId) -> Option<&Cells> {
        self.pools.get(class.index())
    }

    pub fn cells_mut(&mut self, class: ClassId) -> Option<&mut Cells> {
        self.pools.get_mut(class.index())
    }

    pub fn pool_stats(&self, class: ClassId) -> PoolStats {
        self.cells(class).map(Cells::stats).unwrap_or_default()
    }

    /// Allocate a handle slot
    pub fn insert(&mut self, handle: Handle) -> ObjectId {
        let (extent, _) = self.handles.allocate(1);
        self.handles.values_mut(extent)[0] = Some(handle);
        ObjectId::from_extent(extent)
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<Handle> {
        if !self.handles.is_live(id.extent()) {
            return None;
        }
        let handle = self.handles.values_mut(id.extent())[0].take();
        self.handles.release(id.extent());
        handle
    }

    pub fn get(&self, id: ObjectId) -> Option<&Handle> {
        if !self.handles.is_live(id.extent()) {
            return None;
        }
        self.handles.values(id.extent())[0].as_ref()
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Handle> {
        if !self.handles.is_live(id.extent()) {
            return None;
        }
        self.handles.values_mut(id.extent())[0].as_mut()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }

    pub fn live_handles(&self) -> usize {
        self.handles.stats().live
    }

    pub fn stats(&self) -> StoreStats {
        let handles = self.handles.stats();
        let pools = self.pools.iter().map(Cells::stats);

        let (elements, blocks) = pools.fold((0, 0), |(e, b), s| (e + s.live, b + s.blocks));

        StoreStats {
            handles: handles.live,
            elements,
            blocks: blocks + handles.blocks,
        }
    }

    /// Drop every handle and instance pool
    pub fn clear(&mut self) {
        self.handles.clear();
        self.pools.clear();
    }
}
