use std::fmt;

use serde::{Deserialize, Serialize};
use shapecheck_ir::Register;

/// API entry points the interpreter gives meaning to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuiltinFunction {
    Check,
    RankGetter,
    ShapeGetter,
    ShapeSubscript,
}

/// Symbolic fact recovered from a register.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    /// Builtin integral literal. Also used for narrower widths, down to `Int1`.
    Int(i64),
    ShapeOf(Register),
    RankOf(Register),
    DimOf(i64, Register),
    BuiltinFunctionRef(BuiltinFunction),
    FunctionRef(String),
    Equals(Box<Value>, Box<Value>),
}

impl Value {
    pub fn equals(a: Value, b: Value) -> Self {
        Value::Equals(Box::new(a), Box::new(b))
    }

    /// Rebuild the value with every register renamed through `f`.
    pub fn map_registers(&self, f: &mut impl FnMut(&Register) -> Register) -> Value {
        match self {
            Value::Int(v) => Value::Int(*v),
            Value::ShapeOf(r) => Value::ShapeOf(f(r)),
            Value::RankOf(r) => Value::RankOf(f(r)),
            Value::DimOf(k, r) => Value::DimOf(*k, f(r)),
            Value::BuiltinFunctionRef(kind) => Value::BuiltinFunctionRef(*kind),
            Value::FunctionRef(name) => Value::FunctionRef(name.clone()),
            Value::Equals(a, b) => {
                let a = a.map_registers(f);
                let b = b.map_registers(f);
                Value::equals(a, b)
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::ShapeOf(r) => write!(f, "shape({r})"),
            Value::RankOf(r) => write!(f, "rank({r})"),
            Value::DimOf(k, r) => write!(f, "shape({r})[{k}]"),
            Value::BuiltinFunctionRef(kind) => write!(f, "<builtin {kind:?}>"),
            Value::FunctionRef(name) => write!(f, "@{name}"),
            Value::Equals(a, b) => write!(f, "({a} == {b})"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrontendConstraint {
    /// The boolean value must hold.
    Value(Value),
    /// `result` is bound to a call of `function` with `operands`.
    Apply {
        function: String,
        result: Register,
        operands: Vec<Register>,
    },
}

impl FrontendConstraint {
    pub fn map_registers(&self, f: &mut impl FnMut(&Register) -> Register) -> FrontendConstraint {
        match self {
            FrontendConstraint::Value(v) => FrontendConstraint::Value(v.map_registers(f)),
            FrontendConstraint::Apply {
                function,
                result,
                operands,
            } => FrontendConstraint::Apply {
                function: function.clone(),
                result: f(result),
                operands: operands.iter().map(|r| f(r)).collect(),
            },
        }
    }
}

impl fmt::Display for FrontendConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrontendConstraint::Value(v) => write!(f, "assert {v}"),
            FrontendConstraint::Apply {
                function,
                result,
                operands,
            } => write!(f, "{result} = apply @{function}({})", operands.join(", ")),
        }
    }
}
