//! Standard method combination
//!
//! Run order for the ranked applicable methods:
//! 1. Around methods, most specific first, while each asks for the next
//! 2. Every Before method, most specific first
//! 3. Primary methods, most specific first, until one returns a value
//! 4. Every After method, least specific first
//!
//! The first Primary value is the result; After values are discarded.
//! With no Primary methods, or when every one asks for the next, the result
//! is null and the After methods still run.

use super::{GenericId, MethodForm, MethodId, Outcome};
use crate::error::{AdiError, AdiResult, ErrorKind};
use crate::runtime::Runtime;
use crate::store::ObjectId;

fn combination_error(template: &str, generic: &str) -> AdiError {
    AdiError::new(ErrorKind::MethodCombination, template).token("GEN", generic)
}

/// Split ranked methods by form, preserving rank order
fn by_form(runtime: &Runtime, ranked: &[MethodId], form: MethodForm) -> Vec<MethodId> {
    ranked
        .iter()
        .copied()
        .filter(|&id| runtime.dispatch.method(id).is_some_and(|m| m.form == form))
        .collect()
}

pub fn standard(
    runtime: &mut Runtime,
    generic: GenericId,
    args: &mut [ObjectId],
) -> AdiResult<Option<ObjectId>> {
    let name = runtime
        .dispatch
        .generic(generic)
        .map(|g| g.name.clone())
        .unwrap_or_else(|| "?".into());

    let applicable = runtime.gather_applicable(generic, args)?;
    let ranked = runtime.rank_by_precedence(&applicable);

    let around = by_form(runtime, &ranked, MethodForm::Around);
    let before = by_form(runtime, &ranked, MethodForm::Before);
    let primary = by_form(runtime, &ranked, MethodForm::Primary);
    let mut after = by_form(runtime, &ranked, MethodForm::After);
    after.reverse();

    for method in around {
        if let Outcome::Value(result) = runtime.execute(generic, method, args)? {
            return Ok(result);
        }
    }

    for method in before {
        if runtime.execute(generic, method, args)? == Outcome::CallNext {
            return Err(combination_error(
                "Illegal call to next method from a before method of ^GEN",
                &name,
            ));
        }
    }

    let mut result = None;
    for method in primary {
        if let Outcome::Value(value) = runtime.execute(generic, method, args)? {
            result = value;
            break;
        }
    }

    for method in after {
        if runtime.execute(generic, method, args)? == Outcome::CallNext {
            return Err(combination_error(
                "Illegal call to next method from an after method of ^GEN",
                &name,
            ));
        }
    }

    Ok(result)
}
