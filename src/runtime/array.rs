//! Array views - slices and cells sharing their source's storage

use super::Runtime;
use crate::error::{AdiError, AdiResult};
use crate::handle::{ArrayDesc, Handle, Payload};
use crate::mta::{region_offsets, Dims};
use crate::store::ObjectId;

impl Runtime {
    fn array_desc(&self, id: ObjectId, name: &str) -> AdiResult<(ObjectId, ArrayDesc)> {
        let target = self.target(id, name)?;
        match &self.handle(target)?.payload {
            Payload::Array(desc) => Ok((target, desc.clone())),
            Payload::Scalar(_) => Err(AdiError::illegal("Array object expected")),
        }
    }

    /// View of the inclusive, 1-based section `lower..=upper`
    ///
    /// Axes beyond those given are fixed at index 1 and dropped from the
    /// view's shape.
    pub fn slice(&mut self, id: ObjectId, name: &str, lower: &[usize], upper: &[usize]) -> AdiResult<ObjectId> {
        let (source, desc) = self.array_desc(id, name)?;
        let ndim = desc.dims.len();

        if lower.len() != upper.len() || lower.is_empty() {
            return Err(AdiError::invalid("Slice bounds must name the same number of axes"));
        }
        if lower.len() > ndim {
            return Err(AdiError::invalid("Slice dimensionality exceeds that of object"));
        }

        let mut dims = Dims::new();
        let mut origin = desc.origin.clone();
        for axis in 0..lower.len() {
            let (lo, hi) = (lower[axis], upper[axis]);
            if lo < 1 {
                return Err(AdiError::invalid("Slice lower bound is less than one"));
            }
            if hi > desc.dims[axis] {
                return Err(AdiError::invalid("Slice upper bound is greater than object dimension"));
            }
            if lo > hi {
                return Err(AdiError::invalid("Slice lower bound is higher than upper bound"));
            }
            dims.push(hi - lo + 1);
            origin[axis] += lo - 1;
        }

        let view = Payload::Array(ArrayDesc {
            base: desc.base,
            ddims: desc.ddims,
            dims,
            origin,
        });
        self.insert_view(source, view)
    }

    /// View of the single element at a 1-based index
    pub fn cell(&mut self, id: ObjectId, name: &str, index: &[usize]) -> AdiResult<ObjectId> {
        let (source, desc) = self.array_desc(id, name)?;

        if index.is_empty() || index.len() > desc.dims.len() {
            return Err(AdiError::invalid("Index dimensionality exceeds that of object"));
        }
        let mut origin = desc.origin.clone();
        for (axis, &i) in index.iter().enumerate() {
            if i < 1 {
                return Err(AdiError::invalid("Index value is less than one"));
            }
            if i > desc.dims[axis] {
                return Err(AdiError::invalid("Index value is greater than object dimension"));
            }
            origin[axis] += i - 1;
        }

        let offset = region_offsets(&desc.ddims, &[], &origin)[0];
        self.insert_view(source, Payload::Scalar(desc.base.element(offset)))
    }

    fn insert_view(&mut self, source: ObjectId, payload: Payload) -> AdiResult<ObjectId> {
        self.clone_ref(source)?;
        let (set, readonly) = {
            let handle = self.handle(source)?;
            (handle.set, handle.readonly)
        };

        let mut handle = Handle::new(payload);
        handle.view = true;
        handle.source = Some(source);
        handle.set = set;
        handle.readonly = readonly;
        Ok(self.store.insert(handle))
    }
}
