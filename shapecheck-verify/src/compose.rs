//! Function summaries and their instantiation along the call graph.
//!
//! The interpreter sees one block at a time and leaves calls of user
//! functions as [`FrontendConstraint::Apply`] records. Instantiation replays
//! the callee's own constraints at every such call site, renamed into the
//! caller's registers.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use shapecheck_frontend::util::{compose, count};
use shapecheck_frontend::{gather_constraints, FrontendConstraint, FrontendError, Value};
use shapecheck_ir::{validate_module, Function, Module, Register};
use tracing::{debug, warn};

use crate::{ComposeError, VerifyError};

/// Everything the interpreter learned about one function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionSummary {
    pub name: String,
    pub params: Vec<Register>,
    pub returns: Vec<Register>,
    pub constraints: Vec<FrontendConstraint>,
}

impl FunctionSummary {
    /// Callees named by `Apply` constraints, without duplicates.
    pub fn callees(&self) -> BTreeSet<String> {
        self.constraints
            .iter()
            .filter_map(|c| match c {
                FrontendConstraint::Apply { function, .. } => Some(function.clone()),
                FrontendConstraint::Value(_) => None,
            })
            .collect()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Environment {
    /// Function name -> summary
    summaries: BTreeMap<String, FunctionSummary>,
    /// Caller -> callees, including callees without a summary
    dependencies: BTreeMap<String, BTreeSet<String>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a summary and record its call edges.
    pub fn add_summary(&mut self, summary: FunctionSummary) {
        for callee in summary.callees() {
            self.add_dependency(summary.name.clone(), callee);
        }
        self.summaries.insert(summary.name.clone(), summary);
    }

    /// Record that `caller` calls `callee`.
    pub fn add_dependency(&mut self, caller: String, callee: String) {
        self.dependencies.entry(caller).or_default().insert(callee);
    }

    pub fn summary(&self, function: &str) -> Option<&FunctionSummary> {
        self.summaries.get(function)
    }

    pub fn dependencies(&self, function: &str) -> impl Iterator<Item = &String> {
        self.dependencies.get(function).into_iter().flatten()
    }

    pub fn functions(&self) -> impl Iterator<Item = &String> {
        self.summaries.keys()
    }

    /// Drop the summary of `function` and, transitively, of every caller.
    ///
    /// Returns the invalidated names in removal order.
    pub fn invalidate(&mut self, function: &str) -> Vec<String> {
        let mut removed = Vec::new();
        let mut pending = vec![function.to_string()];
        while let Some(name) = pending.pop() {
            if self.summaries.remove(&name).is_none() {
                continue;
            }
            self.dependencies.remove(&name);
            pending.extend(
                self.dependencies
                    .iter()
                    .filter(|(_, callees)| callees.contains(&name))
                    .map(|(caller, _)| caller.clone()),
            );
            removed.push(name);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }
}

/// Builds an [`Environment`] by interpreting every block of every function.
#[derive(Debug, Default)]
pub struct Analyzer {
    environment: Environment,
}

impl Analyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn analyze_module(&mut self, module: &Module) -> Result<(), VerifyError> {
        validate_module(module)?;
        for function in module.functions.values() {
            self.analyze_function(function)?;
        }
        Ok(())
    }

    /// Summarize one function. Each block is interpreted from an empty
    /// valuation, and its registers are renamed through
    /// [`Function::block_scope`] so names reused by another block stay apart.
    pub fn analyze_function(&mut self, function: &Function) -> Result<(), FrontendError> {
        let mut constraints = Vec::new();
        for (i, block) in function.blocks.iter().enumerate() {
            let mut scope = function.block_scope(i);
            constraints.extend(gather_constraints(block)?.iter().map(|c| c.map_registers(&mut scope)));
        }
        debug!(function = %function.name, constraints = constraints.len(), "function summarized");
        self.environment.add_summary(FunctionSummary {
            name: function.name.clone(),
            params: function.params(),
            returns: function.returned_registers(),
            constraints,
        });
        Ok(())
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.environment
    }

    pub fn into_environment(self) -> Environment {
        self.environment
    }
}

/// Every boolean fact that holds inside `function`, with calls inlined.
///
/// Registers of the root function keep their names. Registers of an inlined
/// callee are renamed: parameters to the caller's operands, the unique return
/// register to the call's result, anything else to `callee#n::reg` with `n`
/// fresh per call site.
pub fn instantiate(env: &Environment, function: &str) -> Result<Vec<Value>, ComposeError> {
    let summary = env.summary(function).ok_or_else(|| ComposeError::UnknownFunction {
        function: function.to_string(),
    })?;

    let mut fresh = compose(count(0, 1), |n: i64| n.to_string());
    let mut stack = vec![function.to_string()];
    let mut out = Vec::new();
    expand(
        env,
        summary,
        &mut |r: &Register| r.clone(),
        &mut fresh,
        &mut stack,
        &mut out,
    )?;
    Ok(out)
}

fn expand(
    env: &Environment,
    summary: &FunctionSummary,
    mut rename: &mut dyn FnMut(&Register) -> Register,
    fresh: &mut dyn FnMut() -> String,
    stack: &mut Vec<String>,
    out: &mut Vec<Value>,
) -> Result<(), ComposeError> {
    for constraint in &summary.constraints {
        let (function, result, operands) = match constraint {
            FrontendConstraint::Value(v) => {
                out.push(v.map_registers(&mut rename));
                continue;
            }
            FrontendConstraint::Apply {
                function,
                result,
                operands,
            } => (function, result, operands),
        };

        let Some(callee) = env.summary(function) else {
            debug!(caller = %summary.name, callee = %function, "no summary for callee; call is opaque");
            continue;
        };
        if stack.contains(function) {
            warn!(caller = %summary.name, callee = %function, "recursive call skipped");
            continue;
        }
        if callee.params.len() != operands.len() {
            return Err(ComposeError::ArityMismatch {
                callee: function.clone(),
                expected: callee.params.len(),
                got: operands.len(),
            });
        }

        let mut bindings: HashMap<Register, Register> = callee
            .params
            .iter()
            .cloned()
            .zip(operands.iter().map(|r| rename(r)))
            .collect();
        match callee.returns.as_slice() {
            // A returned parameter stays bound to its operand.
            [ret] => {
                bindings.entry(ret.clone()).or_insert_with(|| rename(result));
            }
            returns => debug!(callee = %function, returns = returns.len(), "call result left unconstrained"),
        }

        let prefix = format!("{function}#{}::", fresh());
        let mut inner = |r: &Register| {
            bindings
                .get(r)
                .cloned()
                .unwrap_or_else(|| format!("{prefix}{r}"))
        };

        stack.push(function.clone());
        expand(env, callee, &mut inner, fresh, stack, out)?;
        stack.pop();
    }
    Ok(())
}
