//! Properties, components and whole-slot operations

use super::Runtime;
use crate::error::{AdiError, AdiResult, ErrorKind};
use crate::handle::{AssocList, LocateMode, Payload, Slot};
use crate::intern::Symbol;
use crate::mta::{self, Mta, Scratch};
use crate::store::{Instance, ObjectId, Storage};
use std::sync::Arc;

type Entries = Vec<(Symbol, Arc<str>, Option<ObjectId>)>;

fn entries(list: &AssocList) -> Entries {
    list.iter()
        .map(|entry| (entry.symbol, entry.name.clone(), entry.value))
        .collect()
}

fn bad_index(index: usize, len: usize) -> Option<AdiError> {
    if index == 0 {
        Some(AdiError::invalid("Property index must be greater than zero"))
    } else if index > len {
        Some(AdiError::invalid("Property index is too large"))
    } else {
        None
    }
}

fn empty_value(name: &str) -> AdiError {
    AdiError::new(ErrorKind::NotSet, "Slot ^NAME has no value").token("NAME", name)
}

impl Runtime {
    // ========================================================================
    // Properties
    // ========================================================================

    /// New reference to the value of property `name`
    pub fn locate_property(&mut self, id: ObjectId, name: &str) -> AdiResult<ObjectId> {
        self.find(id, &format!(".{}", name))
    }

    /// Unlink property `name` and drop its value
    pub fn erase_property(&mut self, id: ObjectId, name: &str) -> AdiResult<()> {
        let removed = self.handle_mut(id)?.properties.remove(name).ok_or_else(|| {
            AdiError::new(ErrorKind::NotFound, "Property with name /^PROP/ not found")
                .token("PROP", name)
        })?;
        match removed.value {
            Some(value) => self.erase(value),
            None => Ok(()),
        }
    }

    pub fn count_properties(&self, id: ObjectId) -> AdiResult<usize> {
        Ok(self.handle(id)?.properties.len())
    }

    /// Name and a new reference to the `index`th property (1-based, alphabetical)
    pub fn index_property(&mut self, id: ObjectId, index: usize) -> AdiResult<(Arc<str>, ObjectId)> {
        let properties = &self.handle(id)?.properties;
        if let Some(err) = bad_index(index, properties.len()) {
            return Err(err);
        }
        let entry = properties
            .get(index - 1)
            .ok_or_else(|| AdiError::invalid("Property index is too large"))?;
        let name = entry.name.clone();
        let value = entry.value.ok_or_else(|| empty_value(&name))?;
        Ok((name, self.clone_ref(value)?))
    }

    /// Property names in alphabetical order
    pub fn property_names(&self, id: ObjectId) -> AdiResult<Vec<Arc<str>>> {
        Ok(self.handle(id)?.properties.iter().map(|e| e.name.clone()).collect())
    }

    // ========================================================================
    // Components
    // ========================================================================

    fn component_list(&self, id: ObjectId) -> AdiResult<&AssocList> {
        let instance = self.struc_instance(id)?;
        self.store
            .cells(instance.class)
            .and_then(|cells| cells.components(instance.extent))
            .ok_or_else(|| AdiError::illegal("Object is not of type STRUC"))
    }

    fn struc_instance(&self, id: ObjectId) -> AdiResult<Instance> {
        let handle = self.handle(id)?;
        match (&handle.payload, self.class_def(handle.class())?.storage) {
            (Payload::Scalar(instance), Storage::Components) => Ok(*instance),
            _ => Err(AdiError::illegal("Object is not of type STRUC")),
        }
    }

    /// New reference to component `name` of a STRUC
    pub fn locate_component(&mut self, id: ObjectId, name: &str) -> AdiResult<ObjectId> {
        self.struc_instance(id)?;
        self.find(id, name)
    }

    pub fn erase_component(&mut self, id: ObjectId, name: &str) -> AdiResult<()> {
        let instance = self.struc_instance(id)?;
        let removed = self
            .store
            .cells_mut(instance.class)
            .and_then(|cells| cells.components_mut(instance.extent))
            .and_then(|list| list.remove(name))
            .ok_or_else(|| {
                AdiError::new(ErrorKind::NotFound, "Component with name /^COMP/ not found")
                    .token("COMP", name)
            })?;
        match removed.value {
            Some(value) => self.erase(value),
            None => Ok(()),
        }
    }

    pub fn count_components(&self, id: ObjectId) -> AdiResult<usize> {
        Ok(self.component_list(id)?.len())
    }

    /// Name and a new reference to the `index`th component (1-based, alphabetical)
    pub fn index_component(&mut self, id: ObjectId, index: usize) -> AdiResult<(Arc<str>, ObjectId)> {
        let list = self.component_list(id)?;
        if index == 0 {
            return Err(AdiError::invalid("Component index must be greater than zero"));
        }
        let entry = list
            .get(index - 1)
            .ok_or_else(|| AdiError::invalid("Component index is too large"))?;
        let name = entry.name.clone();
        let value = entry.value.ok_or_else(|| empty_value(&name))?;
        Ok((name, self.clone_ref(value)?))
    }

    pub fn component_names(&self, id: ObjectId) -> AdiResult<Vec<Arc<str>>> {
        Ok(self.component_list(id)?.iter().map(|e| e.name.clone()).collect())
    }

    // ========================================================================
    // Slots
    // ========================================================================

    /// New reference to the object at `name` within `id`
    pub fn find(&mut self, id: ObjectId, name: &str) -> AdiResult<ObjectId> {
        let slot = self.locate(id, name, LocateMode::DEFAULT)?;
        let value = self
            .slot_value(slot)?
            .ok_or_else(|| empty_value(name))?;
        self.clone_ref(value)
    }

    /// Whether `name` within `id` holds an object
    pub fn there(&self, id: ObjectId, name: &str) -> AdiResult<bool> {
        match self.locate(id, name, LocateMode::DEFAULT) {
            Ok(slot) => Ok(self.slot_value(slot)?.is_some()),
            Err(err) if err.is(ErrorKind::NotFound) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Create an object in the member, property or component `name`
    ///
    /// Any object already there is erased. The parent owns the new object;
    /// the returned id stays valid for as long as the parent holds it.
    pub fn new_in(&mut self, parent: ObjectId, name: &str, class: &str, dims: &[usize]) -> AdiResult<ObjectId> {
        let class = self.require_class(class)?;
        let slot = self.named_slot(parent, name)?;
        let created = self.instantiate(class, dims)?;

        match self.attach(slot, created) {
            Ok(Some(previous)) => {
                self.erase(previous)?;
                Ok(created)
            }
            Ok(None) => Ok(created),
            Err(err) => {
                let _ = self.erase(created);
                Err(err)
            }
        }
    }

    /// Store `value` at `name`, taking over the caller's reference
    pub fn put_id(&mut self, id: ObjectId, name: &str, value: ObjectId) -> AdiResult<()> {
        self.handle(value)?;
        let slot = self.named_slot(id, name)?;
        match self.attach(slot, value)? {
            Some(previous) => self.erase(previous),
            None => Ok(()),
        }
    }

    /// Erase the object at `name`, leaving the slot empty
    ///
    /// An empty name erases `id` itself.
    pub fn erase_slot(&mut self, id: ObjectId, name: &str) -> AdiResult<()> {
        match self.locate(id, name, LocateMode::DEFAULT)? {
            Slot::Value(id) => self.erase(id),
            slot => match self.set_slot(slot, None)? {
                Some(previous) => self.erase(previous),
                None => Ok(()),
            },
        }
    }

    fn named_slot(&self, id: ObjectId, name: &str) -> AdiResult<Slot> {
        match self.locate(id, name, LocateMode::CREATE)? {
            Slot::Value(_) => Err(AdiError::invalid("A component or property name is required")),
            slot => Ok(slot),
        }
    }

    // ========================================================================
    // Deep copy
    // ========================================================================

    /// Independent copy of an object, its data, members and properties
    ///
    /// Read-only objects are shared instead: the result is a new reference
    /// to the same object.
    pub fn copy(&mut self, id: ObjectId) -> AdiResult<ObjectId> {
        let handle = self.handle(id)?;
        if handle.readonly {
            return self.clone_ref(id);
        }
        if handle.kernel {
            return Err(AdiError::kernel("Illegal operation on kernel object"));
        }
        let class = handle.class();
        let dims = handle.payload.dims().to_vec();
        let set = handle.set;
        let properties = entries(&handle.properties);

        let copy = self.instantiate(class, &dims)?;
        if let Err(err) = self.fill_copy(id, copy, set, &properties) {
            let _ = self.erase(copy);
            return Err(err);
        }
        Ok(copy)
    }

    fn fill_copy(&mut self, id: ObjectId, copy: ObjectId, set: bool, properties: &Entries) -> AdiResult<()> {
        let storage = self.def_of(id)?.storage;
        match storage {
            Storage::Bytes(_) | Storage::Text if set => self.copy_data(id, copy)?,
            Storage::Slots(n) => self.copy_members(id, copy, n)?,
            Storage::Components => self.copy_components(id, copy)?,
            _ => {}
        }

        for (symbol, _, value) in properties {
            if let Some(value) = value {
                let duplicate = self.copy(*value)?;
                self.attach(Slot::Property { owner: copy, name: *symbol }, duplicate)?;
            }
        }

        self.handle_mut(copy)?.set = set;
        Ok(())
    }

    fn copy_data(&mut self, id: ObjectId, copy: ObjectId) -> AdiResult<()> {
        let src = self.describe(id)?;
        let instance = self.base_instance(id)?;
        let mut buffer = Mta::buffer(src.class, src.name.clone(), src.code, src.size, &src.udims);
        let mut scratch = Scratch::zeroed(src.code, src.size, src.elements());
        {
            let data = self
                .store
                .cells(instance.class)
                .and_then(|cells| cells.data(instance.extent))
                .ok_or_else(|| AdiError::illegal("Cannot copy data of type ^CLS").token("CLS", &src.name))?;
            mta::copy(&src, &data, &mut buffer, &mut scratch.data_mut(), &self.transfer)?;
        }
        self.write_object(copy, &buffer, scratch.data())?;
        Ok(())
    }

    fn copy_members(&mut self, id: ObjectId, copy: ObjectId, nslot: usize) -> AdiResult<()> {
        let (base, offsets) = self.region(id)?;
        let values: Vec<Option<ObjectId>> = {
            let slots = self
                .store
                .cells(base.class)
                .and_then(|cells| cells.slots(base.extent))
                .unwrap_or_default();
            offsets
                .iter()
                .flat_map(|&off| (0..nslot).map(move |i| off * nslot + i))
                .map(|i| slots.get(i).copied().flatten())
                .collect()
        };

        let target = self.base_instance(copy)?;
        for (i, value) in values.into_iter().enumerate() {
            let duplicate = match value {
                Some(value) => Some(self.copy(value)?),
                None => None,
            };
            let previous = self
                .store
                .cells_mut(target.class)
                .and_then(|cells| cells.slots_mut(target.extent))
                .and_then(|slots| slots.get_mut(i))
                .and_then(|slot| std::mem::replace(slot, duplicate));
            if let Some(previous) = previous {
                self.erase(previous)?;
            }
        }
        Ok(())
    }

    fn copy_components(&mut self, id: ObjectId, copy: ObjectId) -> AdiResult<()> {
        let (base, offsets) = self.region(id)?;
        let lists: Vec<Entries> = offsets
            .iter()
            .map(|&off| {
                self.store
                    .cells(base.class)
                    .and_then(|cells| cells.components(base.extent.sub(off, 1)))
                    .map(entries)
                    .unwrap_or_default()
            })
            .collect();

        let target = self.base_instance(copy)?;
        for (i, list) in lists.into_iter().enumerate() {
            for (symbol, name, value) in list {
                let duplicate = match value {
                    Some(value) => Some(self.copy(value)?),
                    None => None,
                };
                if let Some(entry) = self
                    .store
                    .cells_mut(target.class)
                    .and_then(|cells| cells.components_mut(target.extent.sub(i, 1)))
                {
                    entry.insert(symbol, name).value = duplicate;
                }
            }
        }
        Ok(())
    }
}
