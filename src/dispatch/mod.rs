//! Generic functions - multiple dispatch with method combination
//!
//! Design: Dispatch tables are plain vectors addressed by id:
//! - A generic is keyed by name and argument count
//! - Each method records its form and one class per argument
//! - Applicability is a derivation test per argument; ranking orders the
//!   applicable methods most-specific-first, argument by argument
//! - The generic's combination form decides how ranked methods run
//!
//! Method bodies are `Trampoline`s. Native ones take arguments by slice;
//! foreign ones take them by mutable slice so a body may rebind them. A
//! generic may route either kind through an adapter.

pub mod combine;
pub mod rank;
pub mod spec;


pub use spec::{parse_signature, Signature};

use crate::class::{ClassId, ClassRegistry};
use crate::error::{AdiError, AdiResult, ErrorKind};
use crate::logging::log_dispatch;
use crate::runtime::Runtime;
use crate::store::ObjectId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Name of the built-in combination form
pub const STANDARD: &str = "Standard";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GenericId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodId(u32);

impl GenericId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl MethodId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodForm {
    Primary,
    Before,
    After,
    Around,
}

/// Result of running one method body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Final value, possibly the null object
    Value(Option<ObjectId>),
    /// Continue with the next method in the combination
    CallNext,
}

pub type NativeFn = Arc<dyn Fn(&mut Runtime, &[ObjectId]) -> AdiResult<Outcome> + Send + Sync>;
pub type ForeignFn = Arc<dyn Fn(&mut Runtime, &mut [ObjectId]) -> AdiResult<Outcome> + Send + Sync>;

/// Routes native method calls for one generic
pub type NativeAdapter =
    Arc<dyn Fn(&mut Runtime, &NativeFn, &[ObjectId]) -> AdiResult<Outcome> + Send + Sync>;
/// Routes foreign method calls for one generic
pub type ForeignAdapter =
    Arc<dyn Fn(&mut Runtime, &ForeignFn, &mut [ObjectId]) -> AdiResult<Outcome> + Send + Sync>;

/// Executes a generic's applicable methods and produces its result
pub type CombinationFn =
    Arc<dyn Fn(&mut Runtime, GenericId, &mut [ObjectId]) -> AdiResult<Option<ObjectId>> + Send + Sync>;

#[derive(Clone)]
pub enum Trampoline {
    Native(NativeFn),
    Foreign(ForeignFn),
}

impl Trampoline {
    pub fn native<F>(f: F) -> Self
    where
        F: Fn(&mut Runtime, &[ObjectId]) -> AdiResult<Outcome> + Send + Sync + 'static,
    {
        Self::Native(Arc::new(f))
    }

    pub fn foreign<F>(f: F) -> Self
    where
        F: Fn(&mut Runtime, &mut [ObjectId]) -> AdiResult<Outcome> + Send + Sync + 'static,
    {
        Self::Foreign(Arc::new(f))
    }
}

impl fmt::Debug for Trampoline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native(_) => f.write_str("Native"),
            Self::Foreign(_) => f.write_str("Foreign"),
        }
    }
}

/// Settings for a new generic
#[derive(Clone)]
pub struct GenericOptions {
    pub combination: String,
    pub native: Option<NativeAdapter>,
    pub foreign: Option<ForeignAdapter>,
}

impl Default for GenericOptions {
    fn default() -> Self {
        Self {
            combination: STANDARD.to_string(),
            native: None,
            foreign: None,
        }
    }
}

pub struct Generic {
    pub name: Arc<str>,
    pub args: Vec<Arc<str>>,
    pub combination: Arc<str>,
    pub native: Option<NativeAdapter>,
    pub foreign: Option<ForeignAdapter>,
    /// Most recently defined first
    pub methods: Vec<MethodId>,
}

#[derive(Debug, Clone)]
pub struct Method {
    pub generic: GenericId,
    pub form: MethodForm,
    pub classes: Vec<ClassId>,
    pub trampoline: Trampoline,
}

#[derive(Default)]
pub struct Dispatcher {
    generics: Vec<Generic>,
    by_key: HashMap<(Arc<str>, usize), GenericId>,
    methods: Vec<Method>,
    combinations: HashMap<Arc<str>, CombinationFn>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the standard combination form
    pub fn register_standard(&mut self) {
        let standard: CombinationFn = Arc::new(combine::standard);
        self.combinations.insert(Arc::from(STANDARD), standard);
    }

    pub fn generic_count(&self) -> usize {
        self.generics.len()
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    pub fn generic(&self, id: GenericId) -> Option<&Generic> {
        self.generics.get(id.index())
    }

    pub fn method(&self, id: MethodId) -> Option<&Method> {
        self.methods.get(id.index())
    }

    pub fn find_generic(&self, name: &str, nargs: usize) -> Option<GenericId> {
        self.by_key.get(&(Arc::from(name), nargs)).copied()
    }

    pub fn has_combination(&self, name: &str) -> bool {
        self.combinations.contains_key(name)
    }

    /// Methods of `generic` whose classes admit `arg_classes`, in definition order
    pub fn gather_applicable(
        &self,
        classes: &ClassRegistry,
        generic: GenericId,
        arg_classes: &[ClassId],
    ) -> Vec<MethodId> {
        let Some(generic) = self.generic(generic) else {
            return Vec::new();
        };

        generic
            .methods
            .iter()
            .rev()
            .copied()
            .filter(|&id| {
                self.method(id).is_some_and(|method| {
                    method.classes.len() == arg_classes.len()
                        && method
                            .classes
                            .iter()
                            .zip(arg_classes)
                            .all(|(&declared, &actual)| classes.is_derived_from(actual, declared))
                })
            })
            .collect()
    }

    fn add_generic(&mut self, name: &str, args: Vec<Arc<str>>, options: GenericOptions) -> AdiResult<GenericId> {
        let key = (Arc::<str>::from(name), args.len());
        if self.by_key.contains_key(&key) {
            return Err(AdiError::invalid("Generic function ^NAME with ^N arguments already defined")
                .token("NAME", name)
                .token("N", args.len()));
        }
        if !self.has_combination(&options.combination) {
            return Err(AdiError::invalid("Unknown method combination form ^FORM")
                .token("FORM", &options.combination));
        }

        let id = GenericId(self.generics.len() as u32);
        self.generics.push(Generic {
            name: key.0.clone(),
            args,
            combination: Arc::from(options.combination.as_str()),
            native: options.native,
            foreign: options.foreign,
            methods: Vec::new(),
        });
        self.by_key.insert(key, id);
        Ok(id)
    }

    fn add_method(&mut self, method: Method) -> MethodId {
        let id = MethodId(self.methods.len() as u32);
        if let Some(generic) = self.generics.get_mut(method.generic.index()) {
            generic.methods.insert(0, id);
        }
        self.methods.push(method);
        id
    }

    pub fn clear(&mut self) {
        self.generics.clear();
        self.by_key.clear();
        self.methods.clear();
        self.combinations.clear();
    }
}

impl Runtime {
    /// Declare a generic from `name(arg, ...)`
    pub fn define_generic(&mut self, spec: &str) -> AdiResult<GenericId> {
        self.define_generic_with(spec, GenericOptions::default())
    }

    pub fn define_generic_with(&mut self, spec: &str, options: GenericOptions) -> AdiResult<GenericId> {
        let signature = parse_signature(spec, false)?;
        let args = signature.args.iter().map(|a| Arc::from(a.as_str())).collect();
        let id = self.dispatch.add_generic(&signature.name, args, options)?;
        self.strings.intern(&signature.name);

        debug!(
            target: "adi::dispatch",
            event = "generic_defined",
            generic = %signature.name,
            args = signature.args.len(),
            "Generic defined"
        );
        Ok(id)
    }

    /// Add a method from `[+|-|@] name(Class, ...)`
    ///
    /// A generic with that name and argument count is created when none
    /// exists yet.
    pub fn define_method(&mut self, spec: &str, trampoline: Trampoline) -> AdiResult<MethodId> {
        let signature = parse_signature(spec, true)?;

        let classes = signature
            .args
            .iter()
            .map(|name| {
                self.classes.require(
                    name,
                    "Unknown class name /^CLS/ in method specification",
                    "CLS",
                )
            })
            .collect::<AdiResult<Vec<_>>>()?;

        let generic = match self.dispatch.find_generic(&signature.name, classes.len()) {
            Some(generic) => generic,
            None => {
                let args = signature.args.iter().map(|a| Arc::from(a.as_str())).collect();
                self.dispatch
                    .add_generic(&signature.name, args, GenericOptions::default())?
            }
        };

        let id = self.dispatch.add_method(Method {
            generic,
            form: signature.form,
            classes,
            trampoline,
        });
        debug!(
            target: "adi::dispatch",
            event = "method_defined",
            generic = %signature.name,
            form = ?signature.form,
            "Method defined"
        );
        Ok(id)
    }

    /// Register a named method combination form
    pub fn define_combination(&mut self, name: &str, executor: CombinationFn) -> AdiResult<()> {
        if self.dispatch.has_combination(name) {
            return Err(AdiError::invalid("Method combination form already exists"));
        }
        self.dispatch.combinations.insert(Arc::from(name), executor);
        Ok(())
    }

    fn generic_def(&self, generic: GenericId) -> AdiResult<&Generic> {
        self.dispatch
            .generic(generic)
            .ok_or_else(|| AdiError::invalid("Invalid generic function identifier"))
    }

    /// Applicable methods of `generic` for `args`, in definition order
    pub fn gather_applicable(&self, generic: GenericId, args: &[ObjectId]) -> AdiResult<Vec<MethodId>> {
        let arg_classes = args
            .iter()
            .map(|&id| self.class_of(id))
            .collect::<AdiResult<Vec<_>>>()?;

        let applicable = self
            .dispatch
            .gather_applicable(&self.classes, generic, &arg_classes);
        if applicable.is_empty() {
            let names: Vec<Arc<str>> = arg_classes.iter().map(|&c| self.classes.name(c)).collect();
            return Err(AdiError::new(ErrorKind::NoMethod, "No methods matching signature ^SIG")
                .token(
                    "SIG",
                    format!("{}({})", self.generic_def(generic)?.name, names.join(",")),
                ));
        }
        Ok(applicable)
    }

    /// `methods` ordered most specific first
    pub fn rank_by_precedence(&self, methods: &[MethodId]) -> Vec<MethodId> {
        self.dispatch.rank_by_precedence(&self.classes, methods, 0)
    }

    /// Run one method through its generic's adapter, if any
    pub fn execute(&mut self, generic: GenericId, method: MethodId, args: &mut [ObjectId]) -> AdiResult<Outcome> {
        let (native, foreign) = {
            let def = self.generic_def(generic)?;
            (def.native.clone(), def.foreign.clone())
        };
        let trampoline = self
            .dispatch
            .method(method)
            .map(|m| m.trampoline.clone())
            .ok_or_else(|| AdiError::invalid("Invalid method identifier"))?;

        match (trampoline, native, foreign) {
            (Trampoline::Native(body), Some(adapter), _) => adapter(self, &body, &*args),
            (Trampoline::Native(body), None, _) => body(self, &*args),
            (Trampoline::Foreign(body), _, Some(adapter)) => adapter(self, &body, args),
            (Trampoline::Foreign(body), _, None) => body(self, args),
        }
    }

    /// Invoke the generic `name` on `args`
    pub fn exec(&mut self, name: &str, args: &[ObjectId]) -> AdiResult<Option<ObjectId>> {
        let generic = self.dispatch.find_generic(name, args.len()).ok_or_else(|| {
            AdiError::new(ErrorKind::NoMethod, "No generic function ^NAME with ^N arguments")
                .token("NAME", name)
                .token("N", args.len())
        })?;

        let combination = {
            let def = self.generic_def(generic)?;
            self.dispatch
                .combinations
                .get(&def.combination)
                .cloned()
                .ok_or_else(|| {
                    AdiError::invalid("Unknown method combination form ^FORM")
                        .token("FORM", &def.combination)
                })?
        };

        log_dispatch(name, args.len(), self.dispatch.generic(generic).map_or(0, |g| g.methods.len()));
        let mut args = args.to_vec();
        combination(self, generic, &mut args)
    }
}
