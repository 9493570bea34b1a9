//! Meaning of recognized builtin operations and API entry points.

use shapecheck_ir::Register;

use crate::{BuiltinFunction, FrontendError, Value};

/// Result slots of one dispatch. `None` means "no information".
pub type Updates = Vec<Option<Value>>;

const INTEGRAL_BUILTINS: &[&str] = &["Int1", "Int16", "Int32", "Int64", "Word"];

/// Builtin integral kinds whose literals are tracked. Includes `Int1` (booleans).
pub fn is_builtin_integer(name: &str) -> bool {
    INTEGRAL_BUILTINS.contains(&name)
}

/// Recognize one of the API entry points by its (mangled) symbol.
pub fn entry_point(name: &str) -> Option<BuiltinFunction> {
    match name {
        "check" => Some(BuiltinFunction::Check),
        "$s10TensorFlow0A0V5shapeAA0A5ShapeVvg" => Some(BuiltinFunction::ShapeGetter),
        "$s10TensorFlow0A5ShapeVyS2icir" => Some(BuiltinFunction::ShapeSubscript),
        "$s10TensorFlow0A0V4rankSivg" => Some(BuiltinFunction::RankGetter),
        _ => None,
    }
}

/// Low-level builtin instructions. Unresolved operands or unknown names yield `None`.
pub fn interpret_instruction(name: &str, operands: &[Option<&Value>]) -> Option<Vec<Value>> {
    match name {
        "cmp_eq_Int64" => {
            let [Some(a), Some(b)] = operands else {
                return None;
            };
            Some(vec![Value::equals((*a).clone(), (*b).clone())])
        }
        _ => None,
    }
}

/// Calls of recognized entry points other than `check`.
///
/// Arities are part of the entry points' contract, so a mismatch is an error
/// rather than an unknown.
pub fn interpret_call(
    kind: BuiltinFunction,
    args: &[Register],
    values: &[Option<&Value>],
) -> Result<Option<Updates>, FrontendError> {
    let expect = |expected: usize| {
        if args.len() == expected {
            Ok(())
        } else {
            Err(FrontendError::BuiltinArity {
                kind,
                expected,
                got: args.len(),
            })
        }
    };

    match kind {
        BuiltinFunction::ShapeGetter => {
            expect(1)?;
            Ok(Some(vec![Some(Value::ShapeOf(args[0].clone()))]))
        }
        BuiltinFunction::RankGetter => {
            expect(1)?;
            Ok(Some(vec![Some(Value::RankOf(args[0].clone()))]))
        }
        BuiltinFunction::ShapeSubscript => {
            expect(2)?;
            let Some(Value::Int(offset)) = values.first().copied().flatten() else {
                return Ok(None);
            };
            let Some(Value::ShapeOf(tensor)) = values.get(1).copied().flatten() else {
                return Ok(None);
            };
            // The accessor is a coroutine; the second slot is its continuation token.
            Ok(Some(vec![Some(Value::DimOf(*offset, tensor.clone())), None]))
        }
        BuiltinFunction::Check => Err(FrontendError::CheckNotIntercepted),
    }
}
