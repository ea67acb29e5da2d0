//! Class registry - primitive and structured class definitions
//!
//! Design: Classes are stored densely and addressed by `ClassId`:
//! - Built-in primitives are registered first, so their ids are constants
//! - Structured classes flatten inherited members into their own list at
//!   definition time; there is no live superclass chain to walk for slots
//! - Direct superclass lists are kept for derivation checks and for the
//!   precedence order used by method dispatch

pub mod define;
pub mod parse;
pub mod precedence;


pub use define::PrimitiveClass;
pub use parse::{Constant, MemberSpec};

use crate::error::{AdiError, AdiResult, ErrorKind};
use crate::intern::Symbol;
use crate::mta::{Data, Mta, TypeCode};
use crate::runtime::Runtime;
use crate::store::{ObjectId, Storage};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Identifier of a registered class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub(crate) u32);

impl ClassId {
    pub const UNIVERSAL: ClassId = ClassId(0);
    pub const BYTE: ClassId = ClassId(1);
    pub const UBYTE: ClassId = ClassId(2);
    pub const WORD: ClassId = ClassId(3);
    pub const UWORD: ClassId = ClassId(4);
    pub const INTEGER: ClassId = ClassId(5);
    pub const REAL: ClassId = ClassId(6);
    pub const DOUBLE: ClassId = ClassId(7);
    pub const LOGICAL: ClassId = ClassId(8);
    pub const CHAR: ClassId = ClassId(9);
    pub const POINTER: ClassId = ClassId(10);
    pub const STRUC: ClassId = ClassId(11);
    pub const BASE: ClassId = ClassId(12);

    /// Built-in class holding elements of `code`
    pub const fn for_code(code: TypeCode) -> ClassId {
        ClassId(code as u32 + 1)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Result of a destructor hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposal {
    /// Storage may be reclaimed
    Destroyed,
    /// Object is still referenced internally; keep the handle
    Retained,
}

pub type Destructor = Arc<dyn Fn(&mut Runtime, ObjectId) -> AdiResult<Disposal> + Send + Sync>;
pub type Printer = Arc<dyn Fn(&Runtime, ObjectId) -> AdiResult<String> + Send + Sync>;
pub type MtaConstructor =
    Arc<dyn Fn(&mut Runtime, ObjectId, &Mta, Data<'_>) -> AdiResult<()> + Send + Sync>;

/// Optional per-class behaviour
#[derive(Clone, Default)]
pub struct ClassHooks {
    pub destructor: Option<Destructor>,
    pub printer: Option<Printer>,
    pub constructor: Option<MtaConstructor>,
}

impl fmt::Debug for ClassHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassHooks")
            .field("destructor", &self.destructor.is_some())
            .field("printer", &self.printer.is_some())
            .field("constructor", &self.constructor.is_some())
            .finish()
    }
}

/// One data member of a structured class
#[derive(Debug, Clone, PartialEq)]
pub struct MemberDef {
    pub name: Arc<str>,
    pub symbol: Symbol,
    /// Class auto-constructed into new instances
    pub class: Option<ClassId>,
    /// Read-only constant shared by new instances
    pub constant: Option<ObjectId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuperclassRecord {
    pub name: Arc<str>,
    pub class: ClassId,
}

#[derive(Debug, Clone)]
pub struct ClassDef {
    pub name: Arc<str>,
    pub symbol: Symbol,
    pub primitive: bool,
    pub kernel: bool,
    pub code: Option<TypeCode>,
    pub storage: Storage,
    pub members: Vec<MemberDef>,
    pub supers: Vec<SuperclassRecord>,
    /// Index of the default data member
    pub default_member: Option<usize>,
    pub direct_supers: Vec<ClassId>,
    /// Some member has an initialisation class or constant
    pub member_init: bool,
    /// Byte pattern applied to every new element
    pub pattern: Option<Vec<u8>>,
    pub hooks: ClassHooks,
}

impl ClassDef {
    pub(crate) fn primitive(name: Arc<str>, symbol: Symbol, storage: Storage) -> Self {
        Self {
            name,
            symbol,
            primitive: true,
            kernel: false,
            code: None,
            storage,
            members: Vec::new(),
            supers: Vec::new(),
            default_member: None,
            direct_supers: Vec::new(),
            member_init: false,
            pattern: None,
            hooks: ClassHooks::default(),
        }
    }

    pub fn is_structured(&self) -> bool {
        !self.primitive
    }

    /// Position of the named member
    pub fn member_index(&self, name: &str) -> Option<usize> {
        self.members.iter().position(|m| &*m.name == name)
    }

    pub fn element_size(&self) -> usize {
        self.storage.element_size()
    }
}

#[derive(Default)]
pub struct ClassRegistry {
    classes: Vec<ClassDef>,
    by_name: HashMap<Arc<str>, ClassId>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a class; its name must be new
    pub fn register(&mut self, def: ClassDef) -> AdiResult<ClassId> {
        if self.by_name.contains_key(&def.name) {
            return Err(AdiError::invalid("Class ^CLS already defined").token("CLS", &def.name));
        }

        let id = ClassId(self.classes.len() as u32);
        self.by_name.insert(def.name.clone(), id);
        self.classes.push(def);
        Ok(id)
    }

    /// Definition of a class from this registry
    pub fn get(&self, id: ClassId) -> Option<&ClassDef> {
        self.classes.get(id.index())
    }

    pub(crate) fn get_mut(&mut self, id: ClassId) -> Option<&mut ClassDef> {
        self.classes.get_mut(id.index())
    }

    /// Definition of an id handed out by this registry
    pub(crate) fn def(&self, id: ClassId) -> &ClassDef {
        &self.classes[id.index()]
    }

    pub fn find(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    /// Class by name, or an error naming the lookup context
    pub fn require(&self, name: &str, template: &str, token: &str) -> AdiResult<ClassId> {
        self.find(name).ok_or_else(|| {
            AdiError::unknown_name(ErrorKind::InvalidArgument, template, name, self.names())
                .token(token, name)
        })
    }

    pub fn name(&self, id: ClassId) -> Arc<str> {
        self.get(id)
            .map(|def| def.name.clone())
            .unwrap_or_else(|| Arc::from("?"))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(|def| &*def.name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ClassId> {
        (0..self.classes.len() as u32).map(ClassId)
    }

    /// True when `c2` is `c1` or one of its ancestors
    pub fn is_derived_from(&self, c1: ClassId, c2: ClassId) -> bool {
        if c1 == c2 || c2 == ClassId::UNIVERSAL {
            return true;
        }
        self.get(c1)
            .map(|def| def.direct_supers.iter().any(|&s| self.is_derived_from(s, c2)))
            .unwrap_or(false)
    }

    pub fn clear(&mut self) {
        self.classes.clear();
        self.by_name.clear();
    }
}
