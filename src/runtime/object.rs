//! Object lifecycle - creation, reference counting and destruction

use super::Runtime;
use crate::class::{ClassId, Disposal, MemberDef};
use crate::error::{AdiError, AdiResult, ErrorKind};
use crate::handle::{ArrayDesc, Handle, Payload};
use crate::logging::{log_block_grown, log_object_created, log_object_destroyed};
use crate::mta::{DataMut, Dims, Element, MAX_DIMS};
use crate::store::{Cells, Instance, ObjectId, Storage};
use smallvec::SmallVec;

fn kernel_error() -> AdiError {
    AdiError::kernel("Illegal operation on kernel object")
}

/// Number of elements spanned by `dims`, at least one for a scalar
pub(super) fn checked_count(dims: &[usize]) -> AdiResult<usize> {
    dims.iter()
        .try_fold(1usize, |n, &d| n.checked_mul(d))
        .map(|n| n.max(1))
        .ok_or_else(|| AdiError::invalid("Array dimensions are too large"))
}

impl Runtime {
    /// Create an object of the named class; `dims` empty for a scalar
    pub fn new_object(&mut self, class: &str, dims: &[usize]) -> AdiResult<ObjectId> {
        let class = self.require_class(class)?;
        self.instantiate(class, dims)
    }

    /// Create an instance of `class`
    ///
    /// Array elements share one contiguous extent. New primitive elements
    /// take the class's default byte pattern; structured instances get
    /// their member constants and auto-constructed members.
    pub fn instantiate(&mut self, class: ClassId, dims: &[usize]) -> AdiResult<ObjectId> {
        let def = self.class_def(class)?;
        if def.storage.is_abstract() {
            return Err(AdiError::new(
                ErrorKind::AbstractClass,
                "Pure abstract class ^CLS cannot be instantiated",
            )
            .token("CLS", &def.name));
        }
        if dims.len() > MAX_DIMS {
            return Err(AdiError::invalid("Objects may have at most ^MAX dimensions")
                .token("MAX", MAX_DIMS));
        }
        if dims.iter().any(|&n| n == 0) {
            return Err(AdiError::invalid("Array dimensions must be greater than zero"));
        }

        let name = def.name.clone();
        let structured = def.is_structured();
        let kernel = def.kernel;
        let pattern = def.pattern.clone();
        let members: Vec<MemberDef> = if def.member_init {
            def.members.clone()
        } else {
            Vec::new()
        };
        let count = checked_count(dims)?;

        let (instance, grown) = self.store.allocate(class, count).ok_or_else(|| {
            AdiError::new(
                ErrorKind::AbstractClass,
                "Pure abstract class ^CLS cannot be instantiated",
            )
            .token("CLS", &name)
        })?;
        if grown {
            let stats = self.store.pool_stats(class);
            log_block_grown(&name, stats.capacity, stats.blocks);
        }

        if let Some(pattern) = &pattern {
            if let Some(DataMut::Bytes(bytes)) = self
                .store
                .cells_mut(class)
                .and_then(|cells| cells.data_mut(instance.extent))
            {
                for element in bytes.chunks_exact_mut(pattern.len()) {
                    element.copy_from_slice(pattern);
                }
            }
        }

        if !members.is_empty() {
            if let Err(err) = self.init_members(instance, &members, count) {
                self.discard_instance(instance);
                return Err(err);
            }
        }

        let payload = if dims.is_empty() {
            Payload::Scalar(instance)
        } else {
            let dims: Dims = SmallVec::from_slice(dims);
            Payload::Array(ArrayDesc {
                base: instance,
                origin: dims.iter().map(|_| 0).collect(),
                ddims: dims.clone(),
                dims,
            })
        };

        let mut handle = Handle::new(payload);
        handle.set = structured;
        handle.kernel = kernel;

        let id = self.store.insert(handle);
        log_object_created(&name, count);
        Ok(id)
    }

    fn init_members(&mut self, instance: Instance, members: &[MemberDef], count: usize) -> AdiResult<()> {
        let nslot = members.len();

        for element in 0..count {
            for (index, member) in members.iter().enumerate() {
                let value = match (member.constant, member.class) {
                    (Some(constant), _) => Some(self.clone_ref(constant)?),
                    (None, Some(class)) if !self.class_def(class)?.storage.is_abstract() => {
                        let id = self.instantiate(class, &[])?;
                        self.handle_mut(id)?.name = Some(member.symbol);
                        Some(id)
                    }
                    _ => None,
                };

                if let Some(slots) = self
                    .store
                    .cells_mut(instance.class)
                    .and_then(|cells| cells.slots_mut(instance.extent))
                {
                    slots[element * nslot + index] = value;
                }
            }
        }
        Ok(())
    }

    /// Free a partly initialised instance
    fn discard_instance(&mut self, instance: Instance) {
        for value in self.member_values(instance) {
            let _ = self.erase(value);
        }
        self.store.release(instance);
    }

    /// Object ids held in an instance's member slots or components
    fn member_values(&self, instance: Instance) -> Vec<ObjectId> {
        match self.store.cells(instance.class) {
            Some(Cells::Slots(_)) => self
                .store
                .cells(instance.class)
                .and_then(|cells| cells.slots(instance.extent))
                .map(|slots| slots.iter().flatten().copied().collect())
                .unwrap_or_default(),
            Some(cells @ Cells::Components(_)) => cells
                .components_all(instance.extent)
                .map(|lists| {
                    lists
                        .iter()
                        .flat_map(|list| list.iter().filter_map(|entry| entry.value))
                        .collect()
                })
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Scalar holding one element
    pub fn new_value<T: Element>(&mut self, value: T) -> AdiResult<ObjectId> {
        self.new_values(&[value], &[])
    }

    /// Object holding `values`, shaped by `dims`
    ///
    /// Empty `dims` give a scalar for one value and a vector otherwise.
    pub fn new_values<T: Element>(&mut self, values: &[T], dims: &[usize]) -> AdiResult<ObjectId> {
        let shape: Vec<usize> = if dims.is_empty() && values.len() != 1 {
            vec![values.len()]
        } else {
            dims.to_vec()
        };
        let id = self.instantiate(ClassId::for_code(T::CODE), &shape)?;
        if let Err(err) = self.put_values(id, "", values, &shape) {
            let _ = self.erase(id);
            return Err(err);
        }
        Ok(id)
    }

    /// CHAR scalar holding `text`
    pub fn new_string(&mut self, text: &str) -> AdiResult<ObjectId> {
        let id = self.instantiate(ClassId::CHAR, &[])?;
        if let Err(err) = self.put_str(id, "", text) {
            let _ = self.erase(id);
            return Err(err);
        }
        Ok(id)
    }

    /// Add a reference; the same id is returned
    pub fn clone_ref(&mut self, id: ObjectId) -> AdiResult<ObjectId> {
        let handle = self.handle_mut(id)?;
        if handle.kernel {
            return Err(kernel_error());
        }
        handle.refs += 1;
        Ok(id)
    }

    pub fn refcount(&self, id: ObjectId) -> AdiResult<u32> {
        let handle = self.handle(id)?;
        if handle.kernel {
            return Err(kernel_error());
        }
        Ok(handle.refs)
    }

    /// Shift the reference count, destroying the object if it reaches zero
    pub fn adjust_refcount(&mut self, id: ObjectId, delta: i32) -> AdiResult<u32> {
        let handle = self.handle_mut(id)?;
        if handle.kernel {
            return Err(kernel_error());
        }

        let refs = i64::from(handle.refs) + i64::from(delta);
        if refs > 0 {
            handle.refs = refs as u32;
            return Ok(handle.refs);
        }

        handle.refs = 0;
        self.destroy(id)?;
        Ok(0)
    }

    /// Drop one reference; the last one destroys the object
    ///
    /// Kernel objects are not counted and are destroyed outright.
    pub fn erase(&mut self, id: ObjectId) -> AdiResult<()> {
        let handle = self.handle_mut(id)?;
        if !handle.kernel && handle.refs > 1 {
            handle.refs -= 1;
            return Ok(());
        }
        handle.refs = 0;
        self.destroy(id)
    }

    fn destroy(&mut self, id: ObjectId) -> AdiResult<()> {
        let handle = self.handle(id)?;
        let class = handle.class();
        let view = handle.view;
        let def = self.class_def(class)?;
        let name = def.name.clone();

        if !view {
            if let Some(destructor) = def.hooks.destructor.clone() {
                if destructor(self, id)? == Disposal::Retained {
                    log_object_destroyed(&name, true);
                    return Ok(());
                }
                let handle = self.store.remove(id);
                if let Some(handle) = handle {
                    self.store.release(payload_instance(&handle.payload));
                    self.release_properties(handle)?;
                }
                log_object_destroyed(&name, false);
                return Ok(());
            }
        }

        let Some(handle) = self.store.remove(id) else {
            return Ok(());
        };
        let mut first_error = None;

        if view {
            if let Some(source) = handle.source {
                if let Err(err) = self.erase(source) {
                    first_error.get_or_insert(err);
                }
            }
        } else {
            let instance = payload_instance(&handle.payload);
            for value in self.member_values(instance) {
                if let Err(err) = self.erase(value) {
                    first_error.get_or_insert(err);
                }
            }
            self.store.release(instance);
        }

        if let Err(err) = self.release_properties(handle) {
            first_error.get_or_insert(err);
        }
        log_object_destroyed(&name, false);

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn release_properties(&mut self, mut handle: Handle) -> AdiResult<()> {
        let mut result = Ok(());
        for entry in handle.properties.take() {
            if let Some(value) = entry.value {
                if let Err(err) = self.erase(value) {
                    if result.is_ok() {
                        result = Err(err);
                    }
                }
            }
        }
        result
    }

    pub fn set_readonly(&mut self, id: ObjectId, readonly: bool) -> AdiResult<()> {
        self.handle_mut(id)?.readonly = readonly;
        Ok(())
    }

    pub fn is_readonly(&self, id: ObjectId) -> AdiResult<bool> {
        Ok(self.handle(id)?.readonly)
    }

    /// Whether the object's data has been written
    pub fn is_set(&self, id: ObjectId) -> AdiResult<bool> {
        Ok(self.handle(id)?.set)
    }

    /// Mark data as written, along with any object a view was cut from
    pub(crate) fn mark_set(&mut self, id: ObjectId) -> AdiResult<()> {
        let mut current = Some(id);
        while let Some(id) = current {
            let handle = self.handle_mut(id)?;
            handle.set = true;
            current = if handle.view { handle.source } else { None };
        }
        Ok(())
    }

    /// Name the object was created or written under in its parent
    pub fn object_name(&self, id: ObjectId) -> AdiResult<String> {
        match self.handle(id)?.name {
            Some(symbol) => Ok(self.strings.resolve(symbol).to_string()),
            None => Err(AdiError::new(ErrorKind::NoName, "Object has no name")),
        }
    }

    /// Whether the class stores member slots
    pub(crate) fn has_slots(&self, class: ClassId) -> bool {
        matches!(
            self.classes.get(class).map(|def| def.storage),
            Some(Storage::Slots(_))
        )
    }
}

/// Storage that belongs to the handle itself
pub(crate) fn payload_instance(payload: &Payload) -> Instance {
    match payload {
        Payload::Scalar(instance) => *instance,
        Payload::Array(desc) => desc.base,
    }
}
