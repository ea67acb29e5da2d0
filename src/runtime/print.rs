//! Textual rendering of objects

use super::Runtime;
use crate::class::ClassDef;
use crate::error::AdiResult;
use crate::handle::AssocList;
use crate::mta::TypeCode;
use crate::store::{ObjectId, Storage};

const NULL: &str = "<null>";

/// Brace-nest column-major items, last axis outermost
fn nest(items: &[String], dims: &[usize]) -> String {
    match dims.split_last() {
        None => items.first().cloned().unwrap_or_default(),
        Some((_, [])) => format!("{{{}}}", items.join(", ")),
        Some((_, inner)) => {
            let chunk = inner.iter().product::<usize>().max(1);
            let parts: Vec<String> = items.chunks(chunk).map(|c| nest(c, inner)).collect();
            format!("{{{}}}", parts.join(", "))
        }
    }
}

impl Runtime {
    /// Render an object, its members and its properties as text
    pub fn print(&self, id: ObjectId) -> AdiResult<String> {
        let mut out = self.print_value(id)?;

        let properties = &self.handle(id)?.properties;
        if !properties.is_empty() {
            let items = properties
                .iter()
                .map(|entry| Ok(format!("{}={}", entry.name, self.print_slot(entry.value)?)))
                .collect::<AdiResult<Vec<_>>>()?;
            out.push_str(&format!(", props = {{{}}}", items.join(",")));
        }
        Ok(out)
    }

    fn print_slot(&self, value: Option<ObjectId>) -> AdiResult<String> {
        match value {
            Some(value) => self.print(value),
            None => Ok(NULL.to_string()),
        }
    }

    fn print_value(&self, id: ObjectId) -> AdiResult<String> {
        let handle = self.handle(id)?;
        let def = self.class_def(handle.class())?;
        if let Some(printer) = &def.hooks.printer {
            return printer(self, id);
        }

        let items: Vec<String> = match def.storage {
            Storage::Bytes(_) | Storage::Text => {
                if !handle.set {
                    return Ok("<unset>".to_string());
                }
                match def.code {
                    None => vec![format!("<{}>", def.name); handle.payload.elements()],
                    Some(TypeCode::Char) => self
                        .get_strings(id, "")?
                        .into_iter()
                        .map(|text| format!("\"{}\"", text))
                        .collect(),
                    Some(_) => self.get_strings(id, "")?,
                }
            }
            Storage::Slots(n) => {
                let (base, offsets) = self.region(id)?;
                let slots = self
                    .store
                    .cells(base.class)
                    .and_then(|cells| cells.slots(base.extent))
                    .unwrap_or_default();
                offsets
                    .iter()
                    .map(|&off| self.print_members(def, slots.get(off * n..(off + 1) * n).unwrap_or_default()))
                    .collect::<AdiResult<_>>()?
            }
            Storage::Components => {
                let (base, offsets) = self.region(id)?;
                offsets
                    .iter()
                    .map(|&off| {
                        match self
                            .store
                            .cells(base.class)
                            .and_then(|cells| cells.components(base.extent.sub(off, 1)))
                        {
                            Some(list) => self.print_components(list),
                            None => Ok("{ }".to_string()),
                        }
                    })
                    .collect::<AdiResult<_>>()?
            }
            Storage::Abstract => vec![format!("<{}>", def.name)],
        };

        Ok(nest(&items, handle.payload.dims()))
    }

    fn print_members(&self, def: &ClassDef, slots: &[Option<ObjectId>]) -> AdiResult<String> {
        let members = def
            .members
            .iter()
            .zip(slots)
            .map(|(member, value)| Ok(format!("{} = {}", member.name, self.print_slot(*value)?)))
            .collect::<AdiResult<Vec<_>>>()?;
        Ok(format!("< {} | {} >", def.name, members.join(", ")))
    }

    fn print_components(&self, list: &AssocList) -> AdiResult<String> {
        if list.is_empty() {
            return Ok("{ }".to_string());
        }
        let items = list
            .iter()
            .map(|entry| Ok(format!("{} = {}", entry.name, self.print_slot(entry.value)?)))
            .collect::<AdiResult<Vec<_>>>()?;
        Ok(format!("{{ {} }}", items.join(", ")))
    }
}
