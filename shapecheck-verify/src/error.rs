use miette::Diagnostic;
use shapecheck_frontend::FrontendError;
use shapecheck_ir::IrError;
use thiserror::Error;

#[derive(Clone, Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum ComposeError {
    #[error("function '{function}' has no summary")]
    #[diagnostic(code(shapecheck::verify::unknown_function))]
    UnknownFunction { function: String },

    #[error("call of '{callee}' passes {got} operand(s) to {expected} parameter(s)")]
    #[diagnostic(code(shapecheck::verify::arity_mismatch))]
    ArityMismatch {
        callee: String,
        expected: usize,
        got: usize,
    },
}

#[derive(Clone, Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum LoweringError {
    #[error("cannot lower `{value}` as {position}")]
    #[diagnostic(
        code(shapecheck::verify::unsupported),
        help("only integer and boolean facts over ranks and dimensions reach the solver")
    )]
    Unsupported {
        value: String,
        position: &'static str,
    },
}

#[derive(Debug, Error, Diagnostic)]
pub enum VerifyError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Ir(#[from] IrError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Frontend(#[from] FrontendError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Lowering(#[from] LoweringError),

    #[error("Z3 solver is not enabled")]
    #[diagnostic(
        code(shapecheck::verify::solver_unavailable),
        help("rebuild with `--features shapecheck-verify/z3`")
    )]
    SolverUnavailable,
}
