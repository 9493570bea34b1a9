//! Typed bindings over the Z3 C API.
//!
//! Expression nodes belong to their [`Context`]; solvers and models are
//! reference counted by hand and released on drop.

pub mod config;

#[cfg(feature = "z3")]
mod context;
#[cfg(feature = "z3")]
mod expr;
#[cfg(feature = "z3")]
mod solver;

pub use config::{ConfigError, SmtConfig, SmtProfile};

#[cfg(feature = "z3")]
pub use context::Context;
#[cfg(feature = "z3")]
pub use expr::{Bool, Int, IntSequence, Kind, Scalar, TypedExpr, Void};
#[cfg(feature = "z3")]
pub use solver::{Model, SatResult, Solver};
