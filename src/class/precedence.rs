//! Class precedence ordering
//!
//! Orders classes most-specific-first by topologically sorting the local
//! precedence pairs of every class reachable from the inputs: each class
//! precedes its direct superclasses, which precede one another in declared
//! order. Ties go to a direct superclass of the most recently chosen class,
//! then to the leftmost class in depth-first discovery order.

use super::{ClassId, ClassRegistry};

impl ClassRegistry {
    /// Inputs and their ancestors, depth-first, left to right
    fn closure(&self, classes: &[ClassId]) -> Vec<ClassId> {
        let mut seen = Vec::new();
        let mut stack: Vec<ClassId> = classes.iter().rev().copied().collect();

        while let Some(class) = stack.pop() {
            if class == ClassId::UNIVERSAL || seen.contains(&class) {
                continue;
            }
            seen.push(class);
            if let Some(def) = self.get(class) {
                stack.extend(def.direct_supers.iter().rev().copied());
            }
        }
        seen
    }

    /// Total order over the full closure of `classes`
    pub fn linearize(&self, classes: &[ClassId]) -> Vec<ClassId> {
        let pending = self.closure(classes);

        // (before, after) pairs from every local precedence list
        let mut pairs = Vec::new();
        for &class in &pending {
            if let Some(def) = self.get(class) {
                let mut previous = class;
                for &parent in &def.direct_supers {
                    if parent != ClassId::UNIVERSAL {
                        pairs.push((previous, parent));
                        previous = parent;
                    }
                }
            }
        }

        let mut order: Vec<ClassId> = Vec::with_capacity(pending.len());
        let mut remaining = pending;

        while !remaining.is_empty() {
            let candidates: Vec<ClassId> = remaining
                .iter()
                .copied()
                .filter(|&c| {
                    !pairs
                        .iter()
                        .any(|&(before, after)| after == c && remaining.contains(&before))
                })
                .collect();

            // Inconsistent graph: keep what is left in discovery order
            if candidates.is_empty() {
                order.append(&mut remaining);
                break;
            }

            let chosen = order
                .iter()
                .rev()
                .find_map(|&recent| {
                    self.get(recent).and_then(|def| {
                        def.direct_supers
                            .iter()
                            .copied()
                            .find(|s| candidates.contains(s))
                    })
                })
                .unwrap_or(candidates[0]);

            remaining.retain(|&c| c != chosen);
            order.push(chosen);
        }

        if classes.contains(&ClassId::UNIVERSAL) {
            order.push(ClassId::UNIVERSAL);
        }
        order
    }

    /// The given classes, most specific first, without duplicates
    pub fn precedence(&self, classes: &[ClassId]) -> Vec<ClassId> {
        self.linearize(classes)
            .into_iter()
            .filter(|c| classes.contains(c))
            .collect()
    }
}
