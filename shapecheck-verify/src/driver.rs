use std::collections::BTreeMap;

use shapecheck_frontend::Value;
use shapecheck_ir::Register;

use crate::compose::{instantiate, Environment};
use crate::VerifyError;

/// Values of the ranks and dimensions mentioned by a query, under one model.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Witness {
    /// Z3's rendering of the whole model.
    pub model: String,
    pub ranks: BTreeMap<Register, i64>,
    /// `(register, axis) -> extent`
    pub dims: BTreeMap<(Register, i64), i64>,
}

impl Witness {
    pub fn rank(&self, register: &str) -> Option<i64> {
        self.ranks.get(register).copied()
    }

    pub fn dim(&self, register: &str, axis: i64) -> Option<i64> {
        self.dims.get(&(register.to_string(), axis)).copied()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// The goals follow from the assumptions for every input.
    Verified,
    /// Inputs satisfying the assumptions but violating a goal.
    Counterexample(Witness),
    /// Solver gave up, or a goal is outside what can be lowered.
    Inconclusive { reason: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Consistency {
    Consistent(Witness),
    /// The facts cannot hold together: some shape assertion must fail.
    Contradictory,
    Unknown { reason: String },
}

pub trait Verifier {
    /// Do `goals` hold whenever `assumptions` do?
    fn verify(&mut self, assumptions: &[Value], goals: &[Value]) -> Result<Verdict, VerifyError>;

    /// Can all `facts` hold at once?
    fn check_consistency(&mut self, facts: &[Value]) -> Result<Consistency, VerifyError>;

    /// Instantiate `function` along the call graph and check its facts.
    fn check_function(&mut self, env: &Environment, function: &str) -> Result<Consistency, VerifyError> {
        let facts = instantiate(env, function)?;
        self.check_consistency(&facts)
    }
}

/// Fallback verifier when compiled without `--features shapecheck-verify/z3`.
///
/// This keeps the workspace buildable on machines without Z3.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoZ3Verifier;

impl Verifier for NoZ3Verifier {
    fn verify(&mut self, _assumptions: &[Value], _goals: &[Value]) -> Result<Verdict, VerifyError> {
        Err(VerifyError::SolverUnavailable)
    }

    fn check_consistency(&mut self, _facts: &[Value]) -> Result<Consistency, VerifyError> {
        Err(VerifyError::SolverUnavailable)
    }
}

#[cfg(feature = "z3")]
pub use z3_verifier::{Z3Verifier, Z3VerifierOptions};

#[cfg(feature = "z3")]
mod z3_verifier {
    use shapecheck_frontend::Value;
    use shapecheck_smt::{Bool, Context, Model, SatResult, SmtConfig, Solver, TypedExpr};
    use tracing::{debug, warn};

    use super::{Consistency, Verdict, Verifier, Witness};
    use crate::{Lowering, VerifyError};

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Z3VerifierOptions {
        /// Assert non-negative ranks and extents, and in-range axes.
        pub shape_axioms: bool,
    }

    impl Default for Z3VerifierOptions {
        fn default() -> Self {
            Self { shape_axioms: true }
        }
    }

    impl From<&SmtConfig> for Z3VerifierOptions {
        fn from(config: &SmtConfig) -> Self {
            Self {
                shape_axioms: config.shape_axioms,
            }
        }
    }

    /// Discharges queries in a fresh solver each, over a caller-owned context.
    pub struct Z3Verifier<'ctx> {
        ctx: &'ctx Context,
        options: Z3VerifierOptions,
    }

    impl<'ctx> Z3Verifier<'ctx> {
        pub fn new(ctx: &'ctx Context) -> Self {
            Self::with_options(ctx, Z3VerifierOptions::default())
        }

        pub fn with_options(ctx: &'ctx Context, options: Z3VerifierOptions) -> Self {
            Self { ctx, options }
        }

        pub fn options(&self) -> Z3VerifierOptions {
            self.options
        }

        fn lower_all(&self, lowering: &mut Lowering<'ctx>, facts: &[Value]) -> Vec<TypedExpr<'ctx, Bool>> {
            facts
                .iter()
                .filter_map(|fact| match lowering.lower_fact(fact) {
                    Ok(e) => Some(e),
                    Err(err) => {
                        warn!(fact = %fact, error = %err, "fact dropped: cannot be lowered");
                        None
                    }
                })
                .collect()
        }

        /// A solver holding `premises` and every axiom lowered so far.
        fn solver(&self, lowering: &Lowering<'ctx>, premises: &[TypedExpr<'ctx, Bool>]) -> Solver<'ctx> {
            let mut solver = self.ctx.make_solver();
            for fact in premises.iter().chain(lowering.axioms()) {
                solver.assert(*fact);
            }
            solver
        }
    }

    /// Witness of a satisfiable check. Z3 owes us a model there; without one
    /// the witness is empty.
    pub(super) fn witness_of(lowering: &Lowering<'_>, model: Option<Model<'_>>) -> Witness {
        match model {
            Some(model) => lowering.witness(&model),
            None => {
                warn!("satisfiable check produced no model; witness left empty");
                Witness::default()
            }
        }
    }

    impl Verifier for Z3Verifier<'_> {
        /// Dimensions read by the assumptions are taken to exist. Dimensions
        /// only the goals read must exist for the goals to hold.
        fn verify(&mut self, assumptions: &[Value], goals: &[Value]) -> Result<Verdict, VerifyError> {
            let mut lowering = Lowering::new(self.ctx, self.options.shape_axioms);
            let mut premises = self.lower_all(&mut lowering, assumptions);
            premises.extend(lowering.take_obligations());

            let mut lowered_goals = Vec::with_capacity(goals.len());
            for goal in goals {
                match lowering.lower_fact(goal) {
                    Ok(e) => lowered_goals.push(e),
                    Err(err) => {
                        return Ok(Verdict::Inconclusive {
                            reason: err.to_string(),
                        });
                    }
                }
            }
            lowered_goals.extend(lowering.take_obligations());
            debug!(premises = premises.len(), goals = lowered_goals.len(), "verifying");

            let mut solver = self.solver(&lowering, &premises);
            solver.assert(!self.ctx.conjunction(&lowered_goals));
            Ok(match solver.check() {
                SatResult::Unsat => Verdict::Verified,
                SatResult::Sat => Verdict::Counterexample(witness_of(&lowering, solver.get_model())),
                SatResult::Unknown => Verdict::Inconclusive {
                    reason: solver.reason_unknown().unwrap_or_else(|| "unknown".to_string()),
                },
            })
        }

        fn check_consistency(&mut self, facts: &[Value]) -> Result<Consistency, VerifyError> {
            let mut lowering = Lowering::new(self.ctx, self.options.shape_axioms);
            let mut facts = self.lower_all(&mut lowering, facts);
            facts.extend(lowering.take_obligations());
            debug!(facts = facts.len(), "checking consistency");

            let mut solver = self.solver(&lowering, &facts);
            Ok(match solver.check() {
                SatResult::Unsat => Consistency::Contradictory,
                SatResult::Sat => Consistency::Consistent(witness_of(&lowering, solver.get_model())),
                SatResult::Unknown => Consistency::Unknown {
                    reason: solver.reason_unknown().unwrap_or_else(|| "unknown".to_string()),
                },
            })
        }
    }
}
