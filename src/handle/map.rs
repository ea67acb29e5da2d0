//! Mapping - direct or converted buffer access to object data
//!
//! Design: A mapping is a lock recorded on the object's handle:
//! - Same-class mappings of contiguous data expose the object storage
//! - Anything else gets a scratch buffer, converted on map (READ, UPDATE)
//!   and converted back on the final unmap (WRITE, UPDATE)
//! - Repeated READ mappings to one type share a lock and count references;
//!   any other overlap is rejected

use super::LocateMode;
use crate::class::ClassId;
use crate::error::{AdiError, AdiResult, ErrorKind};
use crate::mta::{self, Data, DataMut, Mta, Scratch};
use crate::runtime::Runtime;
use crate::store::{ObjectId, Storage};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
    Update,
}

impl AccessMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "READ",
            Self::Write => "WRITE",
            Self::Update => "UPDATE",
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessMode {
    type Err = AdiError;

    /// Any case-insensitive prefix of READ, WRITE or UPDATE
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        if !wanted.is_empty() {
            for mode in [Self::Read, Self::Write, Self::Update] {
                if mode.as_str().starts_with(&wanted) {
                    return Ok(mode);
                }
            }
        }
        Err(AdiError::invalid("Invalid access mode /^MODE/").token("MODE", s))
    }
}

/// Active mapping on an object
#[derive(Debug, Clone)]
pub struct MapLock {
    pub mode: AccessMode,
    pub class: ClassId,
    pub refs: u32,
    pub serial: u64,
    /// Converted copy; `None` when the object storage is mapped directly
    pub scratch: Option<Scratch>,
    /// Region of the object that is mapped
    pub object: Mta,
    /// Layout of the mapped buffer
    pub buffer: Mta,
}

/// Receipt for a mapping, used to reach the buffer and to unmap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapToken {
    pub object: ObjectId,
    serial: u64,
}

fn window<'a>(data: Data<'a>, size: usize, (offset, count): (usize, usize)) -> Data<'a> {
    match data {
        Data::Bytes(bytes) => Data::Bytes(&bytes[offset * size..(offset + count) * size]),
        Data::Text(text) => Data::Text(&text[offset..offset + count]),
    }
}

fn window_mut(data: DataMut<'_>, size: usize, (offset, count): (usize, usize)) -> DataMut<'_> {
    match data {
        DataMut::Bytes(bytes) => DataMut::Bytes(&mut bytes[offset * size..(offset + count) * size]),
        DataMut::Text(text) => DataMut::Text(&mut text[offset..offset + count]),
    }
}

fn not_mapped() -> AdiError {
    AdiError::illegal("Object is not mapped")
}

impl Runtime {
    /// Map the data at `name` within `id` as elements of `class`
    pub fn map(&mut self, id: ObjectId, name: &str, mode: &str, class: &str) -> AdiResult<MapToken> {
        let mode: AccessMode = mode.parse()?;
        let class = self.require_class(class)?;

        let slot = self.locate(id, name, LocateMode::DEFAULT)?;
        let target = self
            .slot_value(slot)?
            .ok_or_else(|| AdiError::new(ErrorKind::NotSet, "Cannot map an object with no data"))?;
        let target = match mode {
            AccessMode::Write => target,
            AccessMode::Read | AccessMode::Update => self.readable(target)?,
        };

        let handle = self.handle(target)?;
        if mode != AccessMode::Read && handle.readonly {
            return Err(AdiError::new(ErrorKind::ReadOnly, "Illegal write operation attempted"));
        }
        for lock in &handle.locks {
            if mode == AccessMode::Read && lock.mode == AccessMode::Read {
                continue;
            }
            return Err(AdiError::new(
                ErrorKind::AlreadyMapped,
                "Object is already mapped for ^ACC access",
            )
            .token("ACC", lock.mode));
        }
        if let Some(index) = handle
            .locks
            .iter()
            .position(|lock| lock.class == class)
        {
            let lock = &mut self.handle_mut(target)?.locks[index];
            lock.refs += 1;
            return Ok(MapToken {
                object: target,
                serial: lock.serial,
            });
        }

        let object = self.describe(target)?;
        let def = self.class_def(class)?;
        if !matches!(def.storage, Storage::Bytes(_) | Storage::Text) {
            return Err(AdiError::illegal("Cannot map data of type ^CLS").token("CLS", &def.name));
        }

        let (scratch, buffer) = if class == object.class && object.contig {
            (None, object.clone())
        } else {
            let size = def.element_size();
            let mut buffer = Mta::buffer(class, def.name.clone(), def.code, size, &object.udims);
            let mut scratch = Scratch::zeroed(def.code, size, object.elements());

            if mode != AccessMode::Write {
                let instance = self.base_instance(target)?;
                let source = self
                    .store
                    .cells(instance.class)
                    .and_then(|cells| cells.data(instance.extent))
                    .ok_or_else(|| AdiError::illegal("Cannot map data of type ^CLS").token("CLS", &object.name))?;
                mta::copy(&object, &source, &mut buffer, &mut scratch.data_mut(), &self.transfer)?;
            }
            (Some(scratch), buffer)
        };

        let serial = self.next_map_serial();
        self.handle_mut(target)?.locks.push(MapLock {
            mode,
            class,
            refs: 1,
            serial,
            scratch,
            object,
            buffer,
        });
        Ok(MapToken {
            object: target,
            serial,
        })
    }

    fn lock_index(&self, token: &MapToken) -> AdiResult<usize> {
        self.handle(token.object)?
            .locks
            .iter()
            .position(|lock| lock.serial == token.serial)
            .ok_or_else(not_mapped)
    }

    /// Mapped elements, first axis fastest
    pub fn mapped(&self, token: &MapToken) -> AdiResult<Data<'_>> {
        let index = self.lock_index(token)?;
        let lock = &self.handle(token.object)?.locks[index];

        if let Some(scratch) = &lock.scratch {
            return Ok(scratch.data());
        }
        let region = lock.object.window().ok_or_else(not_mapped)?;
        let instance = self.base_instance(token.object)?;
        let data = self
            .store
            .cells(instance.class)
            .and_then(|cells| cells.data(instance.extent))
            .ok_or_else(not_mapped)?;
        Ok(window(data, lock.object.size, region))
    }

    /// Writable mapped elements; READ mappings are refused
    pub fn mapped_mut(&mut self, token: &MapToken) -> AdiResult<DataMut<'_>> {
        let index = self.lock_index(token)?;
        let instance = self.base_instance(token.object)?;
        let lock = &self.handle(token.object)?.locks[index];

        if lock.mode == AccessMode::Read {
            return Err(AdiError::illegal("Object is mapped for READ access only"));
        }
        if lock.scratch.is_none() {
            let region = lock.object.window().ok_or_else(not_mapped)?;
            let size = lock.object.size;
            let data = self
                .store
                .cells_mut(instance.class)
                .and_then(|cells| cells.data_mut(instance.extent))
                .ok_or_else(not_mapped)?;
            return Ok(window_mut(data, size, region));
        }

        self.handle_mut(token.object)?.locks[index]
            .scratch
            .as_mut()
            .map(Scratch::data_mut)
            .ok_or_else(not_mapped)
    }

    /// Release a mapping
    ///
    /// With a token, that mapping loses one reference; without one, the
    /// first mapping of the object is released outright. When the last
    /// reference goes, converted data is copied back to the object.
    pub fn unmap(&mut self, id: ObjectId, name: &str, token: Option<&MapToken>) -> AdiResult<()> {
        let (object, index) = match token {
            Some(token) => (token.object, self.lock_index(token)?),
            None => {
                let slot = self.locate(id, name, LocateMode::DEFAULT)?;
                let target = self.slot_value(slot)?.ok_or_else(not_mapped)?;
                let target = self.readable(target).unwrap_or(target);
                if self.handle(target)?.locks.is_empty() {
                    return Err(not_mapped());
                }
                (target, 0)
            }
        };

        let handle = self.handle_mut(object)?;
        if token.is_some() && handle.locks[index].refs > 1 {
            handle.locks[index].refs -= 1;
            return Ok(());
        }
        let lock = handle.locks.remove(index);

        let mut result = Ok(());
        if let (Some(scratch), true) = (&lock.scratch, lock.mode != AccessMode::Read) {
            let mut object_mta = lock.object.clone();
            let instance = self.base_instance(object)?;
            let options = self.transfer;
            if let Some(mut out) = self
                .store
                .cells_mut(instance.class)
                .and_then(|cells| cells.data_mut(instance.extent))
            {
                result = mta::copy(&lock.buffer, &scratch.data(), &mut object_mta, &mut out, &options)
                    .map(|_| ());
            }
        }

        let conversion = matches!(&result, Err(err) if matches!(err.kind(), ErrorKind::Conversion { .. }));
        if lock.mode != AccessMode::Read && (result.is_ok() || conversion) {
            self.mark_set(object)?;
        }
        result
    }
}
