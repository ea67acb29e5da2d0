//! Common-string table
//!
//! Maps member, property, class and generic names to compact `Symbol`s.
//! Uses bidirectional hash maps for O(1) lookups in both directions, and
//! interns through `&self` so names can be resolved while other parts of
//! the runtime are borrowed.

use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Interned name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub struct Interner {
    /// Name → Symbol mapping
    name_to_sym: DashMap<Arc<str>, Symbol>,
    /// Symbol → Name mapping
    sym_to_name: DashMap<Symbol, Arc<str>>,
    /// Next available Symbol
    next: AtomicU32,
}

impl Interner {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            name_to_sym: DashMap::with_capacity(capacity),
            sym_to_name: DashMap::with_capacity(capacity),
            next: AtomicU32::new(0),
        }
    }

    /// Intern a name and return its Symbol
    pub fn intern(&self, name: &str) -> Symbol {
        if let Some(sym) = self.name_to_sym.get(name) {
            return *sym;
        }

        let key: Arc<str> = Arc::from(name);
        *self
            .name_to_sym
            .entry(key.clone())
            .or_insert_with(|| {
                let sym = Symbol(self.next.fetch_add(1, Ordering::SeqCst));
                self.sym_to_name.insert(sym, key);
                sym
            })
    }

    /// Symbol for a name, if it was ever interned
    pub fn get(&self, name: &str) -> Option<Symbol> {
        self.name_to_sym.get(name).map(|sym| *sym)
    }

    /// Name for a Symbol; unknown symbols resolve to the empty string
    pub fn resolve(&self, sym: Symbol) -> Arc<str> {
        self.sym_to_name
            .get(&sym)
            .map(|name| name.clone())
            .unwrap_or_else(|| Arc::from(""))
    }

    pub fn len(&self) -> usize {
        self.sym_to_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry (runtime teardown)
    pub fn clear(&self) {
        self.name_to_sym.clear();
        self.sym_to_name.clear();
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::with_capacity(203)
    }
}
