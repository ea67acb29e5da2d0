//! Class definition - built-ins, user primitives and structured classes

use super::parse::{parse_members, parse_supers, Constant};
use super::{
    ClassDef, ClassHooks, ClassId, Destructor, MemberDef, MtaConstructor, Printer,
    SuperclassRecord,
};
use crate::error::{AdiError, AdiResult};
use crate::logging::log_class_defined;
use crate::mta::TypeCode;
use crate::runtime::Runtime;
use crate::store::{ObjectId, Storage};
use std::sync::Arc;

/// Builder for a user primitive class
#[derive(Clone)]
pub struct PrimitiveClass {
    name: String,
    size: usize,
    hooks: ClassHooks,
    pattern: Option<Vec<u8>>,
    kernel: bool,
}

impl PrimitiveClass {
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            size,
            hooks: ClassHooks::default(),
            pattern: None,
            kernel: false,
        }
    }

    pub fn with_destructor(mut self, destructor: Destructor) -> Self {
        self.hooks.destructor = Some(destructor);
        self
    }

    pub fn with_printer(mut self, printer: Printer) -> Self {
        self.hooks.printer = Some(printer);
        self
    }

    pub fn with_constructor(mut self, constructor: MtaConstructor) -> Self {
        self.hooks.constructor = Some(constructor);
        self
    }

    /// Bytes every new element starts out as
    pub fn with_pattern(mut self, pattern: &[u8]) -> Self {
        self.pattern = Some(pattern.to_vec());
        self
    }

    /// Internal class whose objects are not reference counted
    pub fn kernel(mut self) -> Self {
        self.kernel = true;
        self
    }
}

/// Member under construction
struct PendingMember {
    name: Arc<str>,
    class: Option<ClassId>,
    inherited: Option<ObjectId>,
    constant: Option<Constant>,
}

impl Runtime {
    /// Register the universal class and the built-in classes, in id order
    pub(crate) fn register_builtins(&mut self) -> AdiResult<()> {
        self.register_class(ClassDef {
            primitive: false,
            ..ClassDef::primitive(Arc::from("*"), self.strings.intern("*"), Storage::Abstract)
        })?;

        for code in TypeCode::ALL {
            let storage = match code {
                TypeCode::Char => Storage::Text,
                _ => Storage::Bytes(code.size()),
            };
            let name = code.class_name();
            self.register_class(ClassDef {
                code: Some(code),
                ..ClassDef::primitive(Arc::from(name), self.strings.intern(name), storage)
            })?;
        }

        self.register_class(ClassDef::primitive(
            Arc::from("STRUC"),
            self.strings.intern("STRUC"),
            Storage::Components,
        ))?;

        self.register_class(ClassDef {
            primitive: false,
            ..ClassDef::primitive(
                Arc::from("ADIbase"),
                self.strings.intern("ADIbase"),
                Storage::Slots(0),
            )
        })?;

        Ok(())
    }

    fn register_class(&mut self, def: ClassDef) -> AdiResult<ClassId> {
        let storage = def.storage;
        let name = def.name.clone();
        let primitive = def.primitive;
        let slots = def.members.len();

        let id = self.classes.register(def)?;
        self.store.register(id, &storage);
        log_class_defined(&name, primitive, slots);
        Ok(id)
    }

    /// Register a user primitive class
    pub fn define_primitive(&mut self, class: PrimitiveClass) -> AdiResult<ClassId> {
        if self.classes.find(&class.name).is_some() {
            return Err(AdiError::invalid("Class ^CLS already defined").token("CLS", &class.name));
        }
        if class.size == 0 {
            return Err(
                AdiError::invalid("Primitive class ^CLS must have a positive size")
                    .token("CLS", &class.name),
            );
        }
        if let Some(pattern) = &class.pattern {
            if pattern.len() != class.size {
                return Err(AdiError::invalid(
                    "Default pattern for class ^CLS must be ^SIZE bytes long",
                )
                .token("CLS", &class.name)
                .token("SIZE", class.size));
            }
        }

        let symbol = self.strings.intern(&class.name);
        self.register_class(ClassDef {
            kernel: class.kernel,
            pattern: class.pattern,
            hooks: class.hooks,
            ..ClassDef::primitive(Arc::from(class.name.as_str()), symbol, Storage::Bytes(class.size))
        })
    }

    /// Define a structured class from superclass and member specifications
    ///
    /// Inherited members come first, in superclass order, followed by the
    /// class's own members. Redeclaring a member may narrow its
    /// initialisation class but never widen it. Nothing is registered when
    /// any part of the definition is rejected.
    pub fn define_class(&mut self, name: &str, supers: &str, members: &str) -> AdiResult<ClassId> {
        if self.classes.find(name).is_some() {
            return Err(AdiError::invalid("Class ^CLS already defined").token("CLS", name));
        }

        let super_names = parse_supers(supers)?;
        let member_specs = parse_members(members)?;

        let mut records = Vec::with_capacity(super_names.len());
        for super_name in &super_names {
            let class = self.classes.require(
                super_name,
                "Unknown class name /^SCLASS/ in superclass specification",
                "SCLASS",
            )?;
            records.push(SuperclassRecord {
                name: Arc::from(super_name.as_str()),
                class,
            });
        }

        // Flatten inherited members
        let mut layout: Vec<PendingMember> = Vec::new();
        for record in &records {
            let def = self.classes.def(record.class);
            for member in &def.members {
                match layout.iter().position(|p| p.name == member.name) {
                    Some(i) => {
                        let narrowed = self.narrow(&layout[i], member.class)?;
                        layout[i].class = narrowed;
                    }
                    None => layout.push(PendingMember {
                        name: member.name.clone(),
                        class: member.class,
                        inherited: member.constant,
                        constant: None,
                    }),
                }
            }
        }

        let mut default_name = records.first().and_then(|record| {
            let def = self.classes.def(record.class);
            def.default_member.map(|i| def.members[i].name.clone())
        });

        for spec in &member_specs {
            let class = match &spec.class {
                Some(class_name) => Some(self.classes.require(
                    class_name,
                    "Unknown class name /^MCLASS/ in member specification",
                    "MCLASS",
                )?),
                None => None,
            };

            let index = match layout.iter().position(|p| &*p.name == spec.name.as_str()) {
                Some(i) => {
                    let narrowed = self.narrow(&layout[i], class)?;
                    layout[i].class = narrowed;
                    i
                }
                None => {
                    layout.push(PendingMember {
                        name: Arc::from(spec.name.as_str()),
                        class,
                        inherited: None,
                        constant: None,
                    });
                    layout.len() - 1
                }
            };

            if spec.default {
                default_name = Some(layout[index].name.clone());
            }
            if let Some(constant) = &spec.constant {
                layout[index].constant = Some(constant.clone());
                layout[index].inherited = None;
            }
        }

        // Validation is complete; build member constants
        let mut member_defs = Vec::with_capacity(layout.len());
        for pending in layout {
            let constant = match (&pending.constant, pending.inherited) {
                (Some(constant), _) => Some(self.new_constant(constant)?),
                (None, Some(shared)) => Some(self.clone_ref(shared)?),
                (None, None) => None,
            };
            member_defs.push(MemberDef {
                symbol: self.strings.intern(&pending.name),
                name: pending.name,
                class: pending.class,
                constant,
            });
        }

        let default_member = default_name
            .and_then(|wanted| member_defs.iter().position(|m| m.name == wanted));
        let member_init = member_defs
            .iter()
            .any(|m| m.class.is_some() || m.constant.is_some());

        let def = ClassDef {
            name: Arc::from(name),
            symbol: self.strings.intern(name),
            primitive: false,
            kernel: false,
            code: None,
            storage: Storage::Slots(member_defs.len()),
            direct_supers: records.iter().map(|r| r.class).collect(),
            supers: records,
            members: member_defs,
            default_member,
            member_init,
            pattern: None,
            hooks: ClassHooks::default(),
        };

        self.register_class(def)
    }

    /// Class a redeclared member ends up with
    fn narrow(&self, existing: &PendingMember, class: Option<ClassId>) -> AdiResult<Option<ClassId>> {
        match (class, existing.class) {
            (Some(new), Some(old)) if new != old => {
                if self.classes.is_derived_from(new, old) {
                    Ok(Some(new))
                } else {
                    Err(AdiError::invalid(
                        "The initialisation class of member ^MEM must be derived from ^SMEM",
                    )
                    .token("MEM", &existing.name)
                    .token("SMEM", self.classes.name(old)))
                }
            }
            (Some(new), _) => Ok(Some(new)),
            (None, old) => Ok(old),
        }
    }

    /// Read-only object holding a member constant
    fn new_constant(&mut self, constant: &Constant) -> AdiResult<ObjectId> {
        let id = match constant {
            Constant::Integer(v) => self.new_value(*v)?,
            Constant::Double(x) => self.new_value(*x)?,
            Constant::Logical(b) => self.new_value(*b)?,
            Constant::Text(s) => self.new_string(s)?,
        };
        self.set_readonly(id, true)?;
        Ok(id)
    }

    fn class_hooks_mut(&mut self, class: &str) -> AdiResult<&mut ClassHooks> {
        let id = self
            .classes
            .require(class, "Unknown class name /^CLS/", "CLS")?;
        self.classes
            .get_mut(id)
            .map(|def| &mut def.hooks)
            .ok_or_else(|| AdiError::invalid("Unknown class name /^CLS/").token("CLS", class))
    }

    /// Install a destructor on an existing class
    pub fn define_destructor(&mut self, class: &str, destructor: Destructor) -> AdiResult<()> {
        self.class_hooks_mut(class)?.destructor = Some(destructor);
        Ok(())
    }

    /// Install a printer on an existing class
    pub fn define_printer(&mut self, class: &str, printer: Printer) -> AdiResult<()> {
        self.class_hooks_mut(class)?.printer = Some(printer);
        Ok(())
    }

    /// Install an MTA constructor on an existing class
    pub fn define_constructor(&mut self, class: &str, constructor: MtaConstructor) -> AdiResult<()> {
        self.class_hooks_mut(class)?.constructor = Some(constructor);
        Ok(())
    }
}
