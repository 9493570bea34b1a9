use std::fmt;

use tracing::debug;
use z3_sys::*;

use crate::context::z3_string;
use crate::expr::{Bool, Int, TypedExpr, Void};
use crate::Context;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SatResult {
    Sat,
    Unsat,
    Unknown,
}

impl SatResult {
    /// Panics on anything but the three `Z3_lbool` constants.
    fn from_lbool(value: Z3_lbool) -> Self {
        match value {
            Z3_L_FALSE => SatResult::Unsat,
            Z3_L_UNDEF => SatResult::Unknown,
            Z3_L_TRUE => SatResult::Sat,
            other => panic!("Z3 solver returned an unexpected value: {other:?}"),
        }
    }
}

/// Incremental assertion stack. Holds one reference on the Z3 solver.
#[derive(Debug)]
pub struct Solver<'ctx> {
    ctx: &'ctx Context,
    raw: Z3_solver,
    last: Option<SatResult>,
}

impl<'ctx> Solver<'ctx> {
    pub fn new(ctx: &'ctx Context) -> Self {
        let raw = unsafe { Z3_mk_solver(ctx.raw()) };
        ctx.check_not_null(raw, "Z3_mk_solver");
        unsafe { Z3_solver_inc_ref(ctx.raw(), raw) };
        Self { ctx, raw, last: None }
    }

    pub fn context(&self) -> &'ctx Context {
        self.ctx
    }

    pub fn assert(&mut self, expr: TypedExpr<'ctx, Bool>) {
        self.ctx.check_same(expr.context());
        unsafe { Z3_solver_assert(self.ctx.raw(), self.raw, expr.as_raw()) };
        self.last = None;
    }

    pub fn push(&mut self) {
        unsafe { Z3_solver_push(self.ctx.raw(), self.raw) };
        self.last = None;
    }

    pub fn pop(&mut self, scopes: u32) {
        unsafe { Z3_solver_pop(self.ctx.raw(), self.raw, scopes) };
        self.last = None;
    }

    pub fn check(&mut self) -> SatResult {
        let result = SatResult::from_lbool(unsafe { Z3_solver_check(self.ctx.raw(), self.raw) });
        debug!(?result, "z3 check");
        self.last = Some(result);
        result
    }

    /// The satisfying assignment of the last check.
    ///
    /// `None` unless the last check was `Sat` and nothing was asserted since.
    pub fn get_model(&self) -> Option<Model<'_>> {
        if self.last != Some(SatResult::Sat) {
            return None;
        }
        let raw = unsafe { Z3_solver_get_model(self.ctx.raw(), self.raw) };
        if raw.is_null() {
            return None;
        }
        unsafe { Z3_model_inc_ref(self.ctx.raw(), raw) };
        Some(Model { ctx: self.ctx, raw })
    }

    /// Refutation proof of the last check, when it was `Unsat` and proofs are enabled.
    pub fn get_proof(&self) -> Option<TypedExpr<'ctx, Void>> {
        if self.last != Some(SatResult::Unsat) || !self.ctx.proofs_enabled() {
            return None;
        }
        let raw = unsafe { Z3_solver_get_proof(self.ctx.raw(), self.raw) };
        if raw.is_null() {
            return None;
        }
        Some(TypedExpr::wrap(self.ctx, raw, "Z3_solver_get_proof"))
    }

    pub fn reason_unknown(&self) -> Option<String> {
        if self.last != Some(SatResult::Unknown) {
            return None;
        }
        unsafe { z3_string(Z3_solver_get_reason_unknown(self.ctx.raw(), self.raw)) }
    }
}

impl Drop for Solver<'_> {
    fn drop(&mut self) {
        unsafe { Z3_solver_dec_ref(self.ctx.raw(), self.raw) };
    }
}

impl fmt::Display for Solver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = unsafe { z3_string(Z3_solver_to_string(self.ctx.raw(), self.raw)) };
        f.write_str(text.as_deref().unwrap_or("<NULL SOLVER?>"))
    }
}

/// Satisfying assignment. Borrows its solver, which therefore cannot change
/// while the model is alive.
#[derive(Debug)]
pub struct Model<'s> {
    ctx: &'s Context,
    raw: Z3_model,
}

impl Model<'_> {
    /// Value of `expr` under this model, completing unconstrained symbols.
    pub fn eval_int(&self, expr: TypedExpr<'_, Int>) -> Option<i64> {
        self.ctx.check_same(expr.context());
        let ctx = self.ctx.raw();
        unsafe {
            let mut out: Z3_ast = std::ptr::null_mut();
            if !Z3_model_eval(ctx, self.raw, expr.as_raw(), true, &mut out) || out.is_null() {
                return None;
            }
            let mut value: i64 = 0;
            if Z3_get_numeral_int64(ctx, out, &mut value) {
                Some(value)
            } else {
                None
            }
        }
    }
}

impl Drop for Model<'_> {
    fn drop(&mut self) {
        unsafe { Z3_model_dec_ref(self.ctx.raw(), self.raw) };
    }
}

impl fmt::Display for Model<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = unsafe { z3_string(Z3_model_to_string(self.ctx.raw(), self.raw)) };
        f.write_str(text.as_deref().unwrap_or("<NULL MODEL?>"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lbool_maps_onto_sat_results() {
        assert_eq!(SatResult::from_lbool(Z3_L_FALSE), SatResult::Unsat);
        assert_eq!(SatResult::from_lbool(Z3_L_UNDEF), SatResult::Unknown);
        assert_eq!(SatResult::from_lbool(Z3_L_TRUE), SatResult::Sat);
    }

    #[test]
    #[should_panic(expected = "unexpected value")]
    fn other_lbool_values_panic() {
        SatResult::from_lbool(2);
    }
}
