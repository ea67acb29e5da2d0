//! Handle layer - shared ownership, access control and properties
//!
//! Design: Every object is reached through a `Handle` that adds:
//! - A reference count; the object is destroyed when it reaches zero
//! - Read-only and "data has been set" flags
//! - The name the object was created under in its parent
//! - Active map locks and an alphabetically ordered property list
//!
//! Views (slices and cells) are handles of their own that share the base
//! instance storage and hold a reference to the object they were cut from.

pub mod assoc;
pub mod locate;
pub mod map;

#[cfg(test)]
mod tests;

pub use assoc::{Assoc, AssocList};
pub use locate::{LocateMode, Slot};
pub use map::{AccessMode, MapLock, MapToken};

use crate::class::ClassId;
use crate::intern::Symbol;
use crate::mta::Dims;
use crate::store::{Instance, ObjectId};

/// Shape and placement of an array object
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayDesc {
    /// Storage of the whole underlying array
    pub base: Instance,
    /// Declared extents of the underlying array
    pub ddims: Dims,
    /// Extents visible through this handle
    pub dims: Dims,
    /// 0-based offset of this view in the underlying array
    pub origin: Dims,
}

impl ArrayDesc {
    pub fn elements(&self) -> usize {
        self.dims.iter().product()
    }
}

/// What a handle wraps
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Scalar(Instance),
    Array(ArrayDesc),
}

impl Payload {
    pub fn class(&self) -> ClassId {
        match self {
            Self::Scalar(instance) => instance.class,
            Self::Array(desc) => desc.base.class,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    /// Extents visible through the handle; scalars have none
    pub fn dims(&self) -> &[usize] {
        match self {
            Self::Scalar(_) => &[],
            Self::Array(desc) => &desc.dims,
        }
    }

    /// Number of elements
    pub fn elements(&self) -> usize {
        match self {
            Self::Scalar(_) => 1,
            Self::Array(desc) => desc.elements(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Handle {
    pub payload: Payload,
    pub refs: u32,
    pub readonly: bool,
    pub set: bool,
    /// Slice or cell of another object
    pub view: bool,
    /// Kernel objects are not reference counted
    pub kernel: bool,
    /// Name in the parent the object was created or written under
    pub name: Option<Symbol>,
    /// Object a view was cut from
    pub source: Option<ObjectId>,
    pub locks: Vec<MapLock>,
    pub properties: AssocList,
}

impl Handle {
    /// Fresh handle with a single reference
    pub fn new(payload: Payload) -> Self {
        Self {
            payload,
            refs: 1,
            readonly: false,
            set: false,
            view: false,
            kernel: false,
            name: None,
            source: None,
            locks: Vec::new(),
            properties: AssocList::new(),
        }
    }

    pub fn class(&self) -> ClassId {
        self.payload.class()
    }
}
