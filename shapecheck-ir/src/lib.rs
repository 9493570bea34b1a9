#![forbid(unsafe_code)]

pub mod ir;
pub mod validate;

pub use ir::*;
pub use validate::*;
