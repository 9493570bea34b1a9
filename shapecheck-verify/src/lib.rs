#![forbid(unsafe_code)]

//! Call-graph composition of interpreter constraints and their discharge
//! against Z3.

pub mod compose;
pub mod driver;
pub mod error;
#[cfg(feature = "z3")]
pub mod lower;

pub use compose::{instantiate, Analyzer, Environment, FunctionSummary};
pub use driver::{Consistency, NoZ3Verifier, Verdict, Verifier, Witness};
#[cfg(feature = "z3")]
pub use driver::{Z3Verifier, Z3VerifierOptions};
pub use error::{ComposeError, LoweringError, VerifyError};
#[cfg(feature = "z3")]
pub use lower::Lowering;
