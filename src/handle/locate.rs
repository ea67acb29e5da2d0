//! Name resolution within an object
//!
//! A name selects one of three namespaces:
//! - empty: the object's own value
//! - `.name`: a property on the handle
//! - `name`: a component of a STRUC instance, or a member of a structured
//!   class instance
//!
//! Resolution yields a `Slot`; reading and writing the slot are separate
//! steps so that lookups only need shared access to the runtime.

use super::Payload;
use crate::error::{AdiError, AdiResult, ErrorKind};
use crate::intern::Symbol;
use crate::runtime::Runtime;
use crate::store::{Instance, ObjectId, Storage};

/// Resolved location of a named value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// The object itself
    Value(ObjectId),
    /// Member slot `index` of a structured instance
    Member { owner: ObjectId, index: usize },
    /// Property of a handle
    Property { owner: ObjectId, name: Symbol },
    /// Component of a STRUC instance
    Component { owner: ObjectId, name: Symbol },
}

impl Slot {
    /// Object whose namespace holds the slot
    pub fn owner(&self) -> ObjectId {
        match *self {
            Self::Value(id) => id,
            Self::Member { owner, .. }
            | Self::Property { owner, .. }
            | Self::Component { owner, .. } => owner,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocateMode {
    /// Create missing properties and components
    pub create: bool,
    /// The target must be an array
    pub array: bool,
}

impl LocateMode {
    pub const DEFAULT: LocateMode = LocateMode {
        create: false,
        array: false,
    };
    pub const CREATE: LocateMode = LocateMode {
        create: true,
        array: false,
    };
    pub const ARRAY: LocateMode = LocateMode {
        create: false,
        array: true,
    };
}

fn not_struc() -> AdiError {
    AdiError::illegal("Object is not of type STRUC")
}

fn scalar_instance(payload: &Payload) -> AdiResult<Instance> {
    match payload {
        Payload::Scalar(instance) => Ok(*instance),
        Payload::Array(_) => Err(AdiError::illegal(
            "Cannot access named data of an array object",
        )),
    }
}

impl Runtime {
    /// Resolve `name` within object `id`
    pub fn locate(&self, id: ObjectId, name: &str, mode: LocateMode) -> AdiResult<Slot> {
        let handle = self.handle(id)?;
        let name = name.trim();

        if name.is_empty() {
            if mode.array && !handle.payload.is_array() {
                return Err(AdiError::illegal("Array object expected"));
            }
            return Ok(Slot::Value(id));
        }

        if let Some(property) = name.strip_prefix('.') {
            if property.is_empty() {
                return Err(AdiError::invalid("Property name is empty"));
            }
            if !mode.create && !handle.properties.contains(property) {
                return Err(AdiError::new(
                    ErrorKind::NotFound,
                    "Property with name /^PROP/ not found",
                )
                .token("PROP", property));
            }
            return Ok(Slot::Property {
                owner: id,
                name: self.strings.intern(property),
            });
        }

        let def = self.class_def(handle.class())?;
        match def.storage {
            Storage::Components => {
                let instance = scalar_instance(&handle.payload)?;
                let exists = self
                    .store
                    .cells(instance.class)
                    .and_then(|cells| cells.components(instance.extent))
                    .is_some_and(|list| list.contains(name));

                if !mode.create && !exists {
                    return Err(AdiError::new(
                        ErrorKind::NotFound,
                        "Component with name /^COMP/ not found",
                    )
                    .token("COMP", name));
                }
                Ok(Slot::Component {
                    owner: id,
                    name: self.strings.intern(name),
                })
            }
            _ if def.is_structured() => {
                let index = def.member_index(name).ok_or_else(|| {
                    AdiError::unknown_name(
                        ErrorKind::NotFound,
                        "Class ^CLS has no member called ^MEM",
                        name,
                        def.members.iter().map(|m| &*m.name),
                    )
                    .token("CLS", &def.name)
                    .token("MEM", name)
                })?;
                scalar_instance(&handle.payload)?;
                Ok(Slot::Member { owner: id, index })
            }
            _ => Err(not_struc()),
        }
    }

    /// Object currently held by a slot
    pub fn slot_value(&self, slot: Slot) -> AdiResult<Option<ObjectId>> {
        match slot {
            Slot::Value(id) => {
                self.handle(id)?;
                Ok(Some(id))
            }
            Slot::Member { owner, index } => {
                let instance = scalar_instance(&self.handle(owner)?.payload)?;
                Ok(self
                    .store
                    .cells(instance.class)
                    .and_then(|cells| cells.slots(instance.extent))
                    .and_then(|slots| slots.get(index).copied().flatten()))
            }
            Slot::Property { owner, name } => {
                let name = self.strings.resolve(name);
                Ok(self
                    .handle(owner)?
                    .properties
                    .find(&name)
                    .and_then(|entry| entry.value))
            }
            Slot::Component { owner, name } => {
                let instance = scalar_instance(&self.handle(owner)?.payload)?;
                let name = self.strings.resolve(name);
                Ok(self
                    .store
                    .cells(instance.class)
                    .and_then(|cells| cells.components(instance.extent))
                    .and_then(|list| list.find(&name))
                    .and_then(|entry| entry.value))
            }
        }
    }

    /// Store `value` in a slot, creating the property or component entry if
    /// needed; returns the previous occupant
    pub(crate) fn set_slot(&mut self, slot: Slot, value: Option<ObjectId>) -> AdiResult<Option<ObjectId>> {
        match slot {
            Slot::Value(_) => Err(AdiError::illegal("Cannot replace an object by itself")),
            Slot::Member { owner, index } => {
                let instance = scalar_instance(&self.handle(owner)?.payload)?;
                let slots = self
                    .store
                    .cells_mut(instance.class)
                    .and_then(|cells| cells.slots_mut(instance.extent))
                    .ok_or_else(not_struc)?;
                let entry = slots
                    .get_mut(index)
                    .ok_or_else(|| AdiError::invalid("Member index out of range"))?;
                Ok(std::mem::replace(entry, value))
            }
            Slot::Property { owner, name } => {
                let text = self.strings.resolve(name);
                let handle = self.handle_mut(owner)?;
                let entry = handle.properties.insert(name, text);
                Ok(std::mem::replace(&mut entry.value, value))
            }
            Slot::Component { owner, name } => {
                let instance = scalar_instance(&self.handle(owner)?.payload)?;
                let text = self.strings.resolve(name);
                let list = self
                    .store
                    .cells_mut(instance.class)
                    .and_then(|cells| cells.components_mut(instance.extent))
                    .ok_or_else(not_struc)?;
                let entry = list.insert(name, text);
                Ok(std::mem::replace(&mut entry.value, value))
            }
        }
    }

    /// Place `id` in a slot and record the slot's name on its handle
    pub(crate) fn attach(&mut self, slot: Slot, id: ObjectId) -> AdiResult<Option<ObjectId>> {
        let previous = self.set_slot(slot, Some(id))?;
        let name = match slot {
            Slot::Value(_) => None,
            Slot::Member { owner, index } => self
                .def_of(owner)?
                .members
                .get(index)
                .map(|member| member.symbol),
            Slot::Property { name, .. } | Slot::Component { name, .. } => Some(name),
        };
        if name.is_some() {
            self.handle_mut(id)?.name = name;
        }
        Ok(previous)
    }
}
