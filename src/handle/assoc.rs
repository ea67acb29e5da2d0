//! Alphabetically ordered association lists
//!
//! Used for handle properties and STRUC components. Lookup is a linear scan
//! that stops as soon as the ordering proves the name absent; insertion
//! keeps the order so iteration by index is alphabetical.

use crate::intern::Symbol;
use crate::store::ObjectId;
use std::cmp::Ordering;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct Assoc {
    pub symbol: Symbol,
    pub name: Arc<str>,
    pub value: Option<ObjectId>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssocList {
    entries: Vec<Assoc>,
}

impl AssocList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `name`, or the index it would be inserted at
    fn scan(&self, name: &str) -> Result<usize, usize> {
        for (i, entry) in self.entries.iter().enumerate() {
            match name.cmp(&entry.name) {
                Ordering::Equal => return Ok(i),
                Ordering::Less => return Err(i),
                Ordering::Greater => {}
            }
        }
        Err(self.entries.len())
    }

    pub fn find(&self, name: &str) -> Option<&Assoc> {
        self.scan(name).ok().map(|i| &self.entries[i])
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Assoc> {
        match self.scan(name) {
            Ok(i) => Some(&mut self.entries[i]),
            Err(_) => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scan(name).is_ok()
    }

    /// Entry for `name`, inserted with a null value when absent
    pub fn insert(&mut self, symbol: Symbol, name: Arc<str>) -> &mut Assoc {
        let index = match self.scan(&name) {
            Ok(i) => i,
            Err(i) => {
                self.entries.insert(
                    i,
                    Assoc {
                        symbol,
                        name,
                        value: None,
                    },
                );
                i
            }
        };
        &mut self.entries[index]
    }

    /// Unlink the entry for `name`
    pub fn remove(&mut self, name: &str) -> Option<Assoc> {
        self.scan(name).ok().map(|i| self.entries.remove(i))
    }

    /// Entry at a 0-based position in alphabetical order
    pub fn get(&self, index: usize) -> Option<&Assoc> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Assoc> {
        self.entries.iter()
    }

    /// Remove every entry, returning them in order
    pub fn take(&mut self) -> Vec<Assoc> {
        std::mem::take(&mut self.entries)
    }
}
