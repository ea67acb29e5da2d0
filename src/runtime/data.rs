//! Data access - GET and PUT through memory transfer accessors

use super::object::{checked_count, payload_instance};
use super::Runtime;
use crate::class::ClassId;
use crate::error::{AdiError, AdiResult, ErrorKind};
use crate::handle::{LocateMode, Payload, Slot};
use crate::mta::{self, decode_all, encode_all, Data, DataMut, Element, Mta, Transfer, TypeCode};
use crate::store::{Instance, ObjectId, Storage};

fn no_data() -> AdiError {
    AdiError::new(ErrorKind::NotSet, "Object has no data")
}

impl Runtime {
    /// Accessor over the data of object `id`
    pub fn describe(&self, id: ObjectId) -> AdiResult<Mta> {
        let handle = self.handle(id)?;
        if handle.kernel {
            return Err(AdiError::kernel("Cannot construct MTA for kernel object"));
        }
        let def = self.class_def(handle.class())?;

        let base = Mta::buffer(
            handle.class(),
            def.name.clone(),
            def.code,
            def.element_size(),
            &[],
        );
        let mut mta = match &handle.payload {
            Payload::Scalar(_) => base,
            Payload::Array(desc) => Mta {
                ddims: desc.ddims.clone(),
                ..base
            }
            .section(&desc.dims, &desc.origin),
        };
        mta.owner = Some(id);
        Ok(mta)
    }

    /// Storage backing an object's accessor
    pub(crate) fn base_instance(&self, id: ObjectId) -> AdiResult<Instance> {
        Ok(payload_instance(&self.handle(id)?.payload))
    }

    /// Base storage of an object and the offsets of its visible elements
    pub(crate) fn region(&self, id: ObjectId) -> AdiResult<(Instance, Vec<usize>)> {
        match &self.handle(id)?.payload {
            Payload::Scalar(instance) => Ok((*instance, vec![0])),
            Payload::Array(desc) => Ok((
                desc.base,
                mta::region_offsets(&desc.ddims, &desc.dims, &desc.origin),
            )),
        }
    }

    /// Accessor over a caller buffer holding `class` elements
    pub(crate) fn buffer_mta(
        &self,
        class: ClassId,
        text: bool,
        len: usize,
        dims: &[usize],
    ) -> AdiResult<Mta> {
        let def = self.class_def(class)?;
        let count = checked_count(dims)?;

        let size = match (def.code, text) {
            (_, true) => 0,
            (Some(TypeCode::Char), false) => len / count,
            _ => def.element_size(),
        };
        if !text && size == 0 {
            return Err(AdiError::invalid("Cannot transfer data of type ^CLS").token("CLS", &def.name));
        }
        Ok(Mta::buffer(class, def.name.clone(), def.code, size, dims))
    }

    /// Object whose data a GET on `id` reads
    pub(crate) fn readable(&self, id: ObjectId) -> AdiResult<ObjectId> {
        let handle = self.handle(id)?;
        if handle.kernel {
            return Err(AdiError::kernel("Cannot GET data from kernel objects"));
        }
        let def = self.class_def(handle.class())?;

        if def.storage == Storage::Components {
            return Err(AdiError::illegal("Cannot GET data of type ^CLS").token("CLS", &def.name));
        }
        if def.is_structured() {
            let index = def.default_member.ok_or_else(|| {
                AdiError::illegal("Cannot GET data of type ^CLS").token("CLS", &def.name)
            })?;
            let member = self
                .slot_value(Slot::Member { owner: id, index })?
                .ok_or_else(|| AdiError::new(ErrorKind::NotSet, "Default data member has no value"))?;
            return self.readable(member);
        }
        if !handle.set {
            return Err(no_data());
        }
        Ok(id)
    }

    /// Object held at `name` within `id`
    pub(crate) fn target(&self, id: ObjectId, name: &str) -> AdiResult<ObjectId> {
        let slot = self.locate(id, name, LocateMode::DEFAULT)?;
        self.slot_value(slot)?.ok_or_else(no_data)
    }

    /// Read data at `name` within `id` into a caller buffer of `class` elements
    pub fn get(
        &self,
        id: ObjectId,
        name: &str,
        class: &str,
        mut data: DataMut<'_>,
        dims: &[usize],
    ) -> AdiResult<Transfer> {
        let source = self.readable(self.target(id, name)?)?;
        let src = self.describe(source)?;
        let instance = self.base_instance(source)?;

        let class = self.require_class(class)?;
        let len = match &data {
            DataMut::Bytes(bytes) => bytes.len(),
            DataMut::Text(text) => text.len(),
        };
        let mut dst = self.buffer_mta(class, matches!(data, DataMut::Text(_)), len, dims)?;

        let src_data = self
            .store
            .cells(instance.class)
            .and_then(|cells| cells.data(instance.extent))
            .ok_or_else(|| AdiError::illegal("Cannot GET data of type ^CLS").token("CLS", &src.name))?;

        mta::copy(&src, &src_data, &mut dst, &mut data, &self.transfer)
    }

    /// Write a caller buffer of `class` elements to `name` within `id`
    ///
    /// Writing to an empty member, property or component creates an object
    /// of the buffer's class and shape there first.
    pub fn put(
        &mut self,
        id: ObjectId,
        name: &str,
        class: &str,
        data: Data<'_>,
        dims: &[usize],
    ) -> AdiResult<Transfer> {
        let class = self.require_class(class)?;
        let len = match &data {
            Data::Bytes(bytes) => bytes.len(),
            Data::Text(text) => text.len(),
        };
        let src = self.buffer_mta(class, matches!(data, Data::Text(_)), len, dims)?;
        let slot = self.locate(id, name, LocateMode::CREATE)?;
        self.write_slot(slot, &src, data, dims)
    }

    pub(crate) fn write_slot(
        &mut self,
        slot: Slot,
        src: &Mta,
        data: Data<'_>,
        dims: &[usize],
    ) -> AdiResult<Transfer> {
        let target = match self.slot_value(slot)? {
            Some(target) => target,
            None => {
                let created = self.instantiate(src.class, dims)?;
                if let Err(err) = self.attach(slot, created) {
                    let _ = self.erase(created);
                    return Err(err);
                }
                created
            }
        };
        self.write_object(target, src, data)
    }

    /// Copy `data` into object `id`, marking it set
    ///
    /// The object is marked set even when some elements were replaced by
    /// bad values; that aggregate error is still returned.
    pub(crate) fn write_object(&mut self, id: ObjectId, src: &Mta, data: Data<'_>) -> AdiResult<Transfer> {
        let handle = self.handle(id)?;
        if handle.kernel {
            return Err(AdiError::kernel("Cannot PUT data from kernel objects"));
        }
        if handle.readonly {
            return Err(AdiError::new(ErrorKind::ReadOnly, "Illegal write operation attempted"));
        }
        let set = handle.set;
        let class = handle.class();
        let def = self.class_def(class)?;
        let cannot_put = || AdiError::illegal("Cannot PUT to object of type ^CLS").token("CLS", &def.name);

        if def.storage == Storage::Components {
            return Err(cannot_put());
        }
        if def.is_structured() {
            let index = def.default_member.ok_or_else(|| {
                AdiError::illegal("No default member defined for class ^CLS").token("CLS", &def.name)
            })?;
            let dims: Vec<usize> = if src.elements() == 1 {
                Vec::new()
            } else {
                src.udims.to_vec()
            };
            return self.write_slot(Slot::Member { owner: id, index }, src, data, &dims);
        }
        if def.code.is_none() && src.class != class && def.hooks.constructor.is_none() {
            return Err(cannot_put());
        }

        if let Some(constructor) = def.hooks.constructor.clone() {
            if !set {
                constructor(self, id, src, data)?;
                self.mark_set(id)?;
                return Ok(Transfer {
                    truncated: false,
                    elements: src.elements(),
                });
            }
        }

        let mut dst = self.describe(id)?;
        let instance = self.base_instance(id)?;
        let options = self.transfer;
        let result = {
            let mut out = self
                .store
                .cells_mut(instance.class)
                .and_then(|cells| cells.data_mut(instance.extent))
                .ok_or_else(|| AdiError::illegal("Cannot PUT to object of type ^CLS").token("CLS", &dst.name))?;
            mta::copy(src, &data, &mut dst, &mut out, &options)
        };

        match result {
            Ok(transfer) => {
                self.mark_set(id)?;
                Ok(transfer)
            }
            Err(err) if matches!(err.kind(), ErrorKind::Conversion { .. }) => {
                self.mark_set(id)?;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Raw element storage of a byte-layout object
    ///
    /// Class hooks use this to read and write user primitive data without
    /// going back through `put`.
    pub fn raw_bytes(&self, id: ObjectId) -> AdiResult<&[u8]> {
        let instance = self.base_instance(id)?;
        match self.store.cells(instance.class).and_then(|cells| cells.data(instance.extent)) {
            Some(Data::Bytes(bytes)) => Ok(bytes),
            _ => Err(AdiError::illegal("Object has no raw byte storage")),
        }
    }

    pub fn raw_bytes_mut(&mut self, id: ObjectId) -> AdiResult<&mut [u8]> {
        let instance = self.base_instance(id)?;
        match self
            .store
            .cells_mut(instance.class)
            .and_then(|cells| cells.data_mut(instance.extent))
        {
            Some(DataMut::Bytes(bytes)) => Ok(bytes),
            _ => Err(AdiError::illegal("Object has no raw byte storage")),
        }
    }

    /// Used extents of the object at `name`; empty for a scalar
    pub fn shape(&self, id: ObjectId, name: &str) -> AdiResult<Vec<usize>> {
        let target = self.target(id, name)?;
        Ok(self.handle(target)?.payload.dims().to_vec())
    }

    /// Number of elements of the object at `name`
    pub fn element_count(&self, id: ObjectId, name: &str) -> AdiResult<usize> {
        let target = self.target(id, name)?;
        Ok(self.handle(target)?.payload.elements())
    }

    // ========================================================================
    // Typed wrappers
    // ========================================================================

    pub fn put_values<T: Element>(
        &mut self,
        id: ObjectId,
        name: &str,
        values: &[T],
        dims: &[usize],
    ) -> AdiResult<Transfer> {
        let bytes = encode_all(values);
        let shape: &[usize] = if dims.is_empty() && values.len() != 1 {
            &[values.len()]
        } else {
            dims
        };
        self.put(id, name, T::CODE.class_name(), Data::Bytes(&bytes), shape)
    }

    pub fn put_value<T: Element>(&mut self, id: ObjectId, name: &str, value: T) -> AdiResult<Transfer> {
        self.put_values(id, name, &[value], &[])
    }

    /// All elements at `name`, converted to `T`, first axis fastest
    pub fn get_values<T: Element>(&self, id: ObjectId, name: &str) -> AdiResult<Vec<T>> {
        let dims = self.shape(id, name)?;
        let count = checked_count(&dims)?;
        let mut bytes = vec![0u8; count * T::SIZE];
        self.get(id, name, T::CODE.class_name(), DataMut::Bytes(&mut bytes), &dims)?;
        Ok(decode_all(&bytes))
    }

    pub fn get_value<T: Element>(&self, id: ObjectId, name: &str) -> AdiResult<T> {
        let values = self.get_values::<T>(id, name)?;
        values.first().copied().ok_or_else(no_data)
    }

    pub fn put_str(&mut self, id: ObjectId, name: &str, text: &str) -> AdiResult<Transfer> {
        let text = [text.to_string()];
        self.put(id, name, "CHAR", Data::Text(&text), &[])
    }

    pub fn put_strs(&mut self, id: ObjectId, name: &str, texts: &[&str], dims: &[usize]) -> AdiResult<Transfer> {
        let owned: Vec<String> = texts.iter().map(|s| s.to_string()).collect();
        let shape: &[usize] = if dims.is_empty() && owned.len() != 1 {
            &[owned.len()]
        } else {
            dims
        };
        self.put(id, name, "CHAR", Data::Text(&owned), shape)
    }

    /// First element at `name` as text
    pub fn get_string(&self, id: ObjectId, name: &str) -> AdiResult<String> {
        let mut out = [String::new()];
        self.get(id, name, "CHAR", DataMut::Text(&mut out), &[])?;
        let [text] = out;
        Ok(text)
    }

    pub fn get_strings(&self, id: ObjectId, name: &str) -> AdiResult<Vec<String>> {
        let dims = self.shape(id, name)?;
        let count = checked_count(&dims)?;
        let mut out = vec![String::new(); count];
        self.get(id, name, "CHAR", DataMut::Text(&mut out), &dims)?;
        Ok(out)
    }
}
