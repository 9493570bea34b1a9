use miette::Diagnostic;
use thiserror::Error;

use crate::{BuiltinFunction, Value};

/// Contract violations between the IR producer and the interpreter.
///
/// None of these are recoverable: continuing past one would fabricate shape
/// facts. Insufficient information is never reported through this type.
#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
pub enum FrontendError {
    #[error("{opcode}: produced {produced} value(s) for {declared} declared result(s)")]
    #[diagnostic(code(shapecheck::frontend::result_arity))]
    ResultArity {
        opcode: String,
        produced: usize,
        declared: usize,
    },

    #[error("call of '{function}' must declare exactly one result, found {results}")]
    #[diagnostic(code(shapecheck::frontend::call_result_arity))]
    CallResultArity { function: String, results: usize },

    #[error("{kind:?} expects {expected} argument(s), got {got}")]
    #[diagnostic(code(shapecheck::frontend::builtin_arity))]
    BuiltinArity {
        kind: BuiltinFunction,
        expected: usize,
        got: usize,
    },

    #[error("calling non-function value {value} held in '{register}'")]
    #[diagnostic(code(shapecheck::frontend::non_function_callee))]
    NonFunctionCallee { register: String, value: Value },

    #[error("check calls must be intercepted before builtin dispatch")]
    #[diagnostic(code(shapecheck::frontend::check_not_intercepted))]
    CheckNotIntercepted,
}
