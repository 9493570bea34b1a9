#![forbid(unsafe_code)]

pub mod builtins;
pub mod error;
pub mod interpret;
pub mod util;
pub mod value;

pub use error::FrontendError;
pub use interpret::{gather_constraints, Interpreter, Valuation};
pub use value::{BuiltinFunction, FrontendConstraint, Value};
