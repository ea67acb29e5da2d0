//! Runtime - the explicit context every operation goes through
//!
//! Design: One `Runtime` owns all state that would otherwise be global:
//! - The common-string table and the class registry
//! - The object store (handles plus per-class instance pools)
//! - Generic functions, methods and method-combination forms
//! - The mark/release context stack
//!
//! Operations are grouped by concern across the submodules; they are all
//! methods on `Runtime` so a caller only ever passes one handle around.

pub mod array;
pub mod data;
pub mod object;
pub mod print;
pub mod props;


use crate::class::{ClassDef, ClassId, ClassRegistry};
use crate::config::RuntimeConfig;
use crate::context::ContextStack;
use crate::dispatch::Dispatcher;
use crate::error::{AdiError, AdiResult};
use crate::handle::Handle;
use crate::intern::Interner;
use crate::logging::{self, log_lifecycle, LogConfig};
use crate::mta::TransferOptions;
use crate::store::{ObjectId, ObjectStore};
use std::sync::Arc;
use tracing::debug;

/// Snapshot of runtime table sizes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    pub classes: usize,
    pub generics: usize,
    pub methods: usize,
    pub strings: usize,
    pub objects: usize,
    pub elements: usize,
    pub blocks: usize,
    pub contexts: usize,
}

pub struct Runtime {
    pub(crate) config: RuntimeConfig,
    pub(crate) strings: Interner,
    pub(crate) classes: ClassRegistry,
    pub(crate) store: ObjectStore,
    pub(crate) dispatch: Dispatcher,
    pub(crate) contexts: ContextStack,
    pub(crate) transfer: TransferOptions,
    map_serial: u64,
}

impl Runtime {
    /// Runtime with default configuration
    pub fn new() -> AdiResult<Self> {
        Self::with_config(RuntimeConfig::default())
    }

    /// Runtime with built-in classes registered
    pub fn with_config(config: RuntimeConfig) -> AdiResult<Self> {
        config.validate()?;

        let mut runtime = Self {
            strings: Interner::with_capacity(config.strings.table_capacity),
            classes: ClassRegistry::new(),
            store: ObjectStore::new(&config.store),
            dispatch: Dispatcher::new(),
            contexts: ContextStack::new(),
            transfer: TransferOptions {
                fortran_exponents: config.transfer.fortran_exponents,
            },
            config,
            map_serial: 0,
        };

        runtime.register_builtins()?;
        runtime.dispatch.register_standard();

        log_lifecycle("start", runtime.classes.len(), 0);
        Ok(runtime)
    }

    /// Install the `tracing` subscriber described by the `[logging]` settings
    pub fn init_logging(&self) {
        logging::init_with_config(LogConfig::from_settings(&self.config.logging));
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn strings(&self) -> &Interner {
        &self.strings
    }

    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatch
    }

    pub fn stats(&self) -> RuntimeStats {
        let store = self.store.stats();
        RuntimeStats {
            classes: self.classes.len(),
            generics: self.dispatch.generic_count(),
            methods: self.dispatch.method_count(),
            strings: self.strings.len(),
            objects: store.handles,
            elements: store.elements,
            blocks: store.blocks,
            contexts: self.contexts.depth(),
        }
    }

    /// Release every context frame and drop all tables
    pub fn shutdown(mut self) -> RuntimeStats {
        while self.release() {}

        let stats = self.stats();
        log_lifecycle("shutdown", stats.classes, stats.objects);

        self.dispatch.clear();
        self.store.clear();
        self.classes.clear();
        self.strings.clear();
        stats
    }

    pub(crate) fn next_map_serial(&mut self) -> u64 {
        self.map_serial += 1;
        self.map_serial
    }

    // ========================================================================
    // Lookup helpers
    // ========================================================================

    pub(crate) fn handle(&self, id: ObjectId) -> AdiResult<&Handle> {
        self.store
            .get(id)
            .ok_or_else(|| AdiError::invalid("Invalid object identifier ^ID").token("ID", id))
    }

    pub(crate) fn handle_mut(&mut self, id: ObjectId) -> AdiResult<&mut Handle> {
        self.store
            .get_mut(id)
            .ok_or_else(|| AdiError::invalid("Invalid object identifier ^ID").token("ID", id))
    }

    /// Whether `id` names a live object
    pub fn is_valid(&self, id: ObjectId) -> bool {
        self.store.contains(id)
    }

    /// Class definition by id
    pub fn class_def(&self, class: ClassId) -> AdiResult<&ClassDef> {
        self.classes
            .get(class)
            .ok_or_else(|| AdiError::invalid("Invalid class identifier"))
    }

    /// Class id by name
    pub fn find_class(&self, name: &str) -> Option<ClassId> {
        self.classes.find(name)
    }

    pub(crate) fn require_class(&self, name: &str) -> AdiResult<ClassId> {
        self.classes.require(name, "Unknown class name /^CLS/", "CLS")
    }

    pub(crate) fn def_of(&self, id: ObjectId) -> AdiResult<&ClassDef> {
        let class = self.handle(id)?.class();
        self.class_def(class)
    }

    pub fn class_of(&self, id: ObjectId) -> AdiResult<ClassId> {
        Ok(self.handle(id)?.class())
    }

    pub fn class_name(&self, id: ObjectId) -> AdiResult<Arc<str>> {
        Ok(self.def_of(id)?.name.clone())
    }

    pub fn is_derived_from(&self, c1: ClassId, c2: ClassId) -> bool {
        self.classes.is_derived_from(c1, c2)
    }

    /// Whether the object's class is `class` or derives from it
    pub fn object_derived_from(&self, id: ObjectId, class: &str) -> AdiResult<bool> {
        let target = self.require_class(class)?;
        let own = self.class_of(id)?;
        debug!(target: "adi::class", object = %id, class = class, "Derivation check");
        Ok(self.classes.is_derived_from(own, target))
    }
}
