//! Method ranking by argument class precedence
//!
//! Methods are grouped by their class at the current argument position.
//! Groups are emitted most-specific class first, using the precedence order
//! of the classes that occur there; a group of several methods is ranked
//! again on the next argument. Within a group definition order is kept.

use super::{Dispatcher, MethodId};
use crate::class::{ClassId, ClassRegistry};

impl Dispatcher {
    /// `methods` ordered most specific first from argument `arg` onward
    pub fn rank_by_precedence(
        &self,
        classes: &ClassRegistry,
        methods: &[MethodId],
        arg: usize,
    ) -> Vec<MethodId> {
        let class_at = |id: MethodId| -> Option<ClassId> {
            self.method(id).and_then(|m| m.classes.get(arg).copied())
        };

        if methods.len() < 2 || methods.iter().any(|&m| class_at(m).is_none()) {
            return methods.to_vec();
        }

        let mut present: Vec<ClassId> = Vec::new();
        for &method in methods {
            if let Some(class) = class_at(method) {
                if !present.contains(&class) {
                    present.push(class);
                }
            }
        }

        let mut ranked = Vec::with_capacity(methods.len());
        for class in classes.precedence(&present) {
            let group: Vec<MethodId> = methods
                .iter()
                .copied()
                .filter(|&m| class_at(m) == Some(class))
                .collect();
            if group.len() > 1 {
                ranked.extend(self.rank_by_precedence(classes, &group, arg + 1));
            } else {
                ranked.extend(group);
            }
        }
        ranked
    }
}
