use std::collections::BTreeMap;

use shapecheck_frontend::util::DefaultMap;
use shapecheck_frontend::Value;
use shapecheck_ir::Register;
use shapecheck_smt::{Bool, Context, Int, IntSequence, Model, TypedExpr};

use crate::{LoweringError, Witness};

enum Term<'ctx> {
    Int(TypedExpr<'ctx, Int>),
    Bool(TypedExpr<'ctx, Bool>),
}

/// Translates interpreter values into Z3 terms.
///
/// One `rank(r)` integer and one `shape(r)` sequence exist per register, no
/// matter how often they are mentioned. With shape axioms on, every rank and
/// dimension reached also yields side conditions of two sorts:
///
/// - [`Lowering::axioms`]: ranks and extents are non-negative, true of every
///   tensor.
/// - [`Lowering::take_obligations`]: `shape(r)[k]` names an existing axis,
///   i.e. `0 <= k < rank(r)`. Whoever mentions the dimension must establish
///   this; a goal that reads a missing axis does not hold.
pub struct Lowering<'ctx> {
    ctx: &'ctx Context,
    shape_axioms: bool,
    ranks: DefaultMap<'ctx, Register, TypedExpr<'ctx, Int>>,
    shapes: DefaultMap<'ctx, Register, TypedExpr<'ctx, IntSequence>>,
    dims: BTreeMap<(Register, i64), TypedExpr<'ctx, Int>>,
    axioms: Vec<TypedExpr<'ctx, Bool>>,
    obligations: Vec<TypedExpr<'ctx, Bool>>,
}

impl<'ctx> Lowering<'ctx> {
    pub fn new(ctx: &'ctx Context, shape_axioms: bool) -> Self {
        Self {
            ctx,
            shape_axioms,
            ranks: DefaultMap::with_default(move |r: &Register| ctx.make_int_variable(&format!("rank({r})"))),
            shapes: DefaultMap::with_default(move |r: &Register| {
                ctx.make_int_sequence_variable(&format!("shape({r})"))
            }),
            dims: BTreeMap::new(),
            axioms: Vec::new(),
            obligations: Vec::new(),
        }
    }

    pub fn context(&self) -> &'ctx Context {
        self.ctx
    }

    /// Lower a value that must hold.
    pub fn lower_fact(&mut self, value: &Value) -> Result<TypedExpr<'ctx, Bool>, LoweringError> {
        match value {
            Value::Equals(a, b) => match (self.lower(a)?, self.lower(b)?) {
                (Term::Int(a), Term::Int(b)) => Ok(a.equals(b)),
                (Term::Bool(a), Term::Bool(b)) => Ok(a.equals(b)),
                _ => Err(unsupported(value, "an equality of mixed kinds")),
            },
            // Builtin `Int1` truth values arrive as plain literals.
            Value::Int(k) => Ok(!self.ctx.literal(*k).equals(self.ctx.literal(0))),
            _ => Err(unsupported(value, "a boolean")),
        }
    }

    /// Lower an integer-valued term.
    pub fn lower_term(&mut self, value: &Value) -> Result<TypedExpr<'ctx, Int>, LoweringError> {
        match value {
            Value::Int(k) => Ok(self.ctx.literal(*k)),
            Value::RankOf(r) => Ok(self.rank(r)),
            Value::DimOf(k, r) => Ok(self.dim(*k, r)),
            _ => Err(unsupported(value, "an integer")),
        }
    }

    /// Non-negativity of every rank and dimension lowered so far.
    pub fn axioms(&self) -> &[TypedExpr<'ctx, Bool>] {
        &self.axioms
    }

    /// Axis-range conditions of the dimensions first lowered since the last call.
    pub fn take_obligations(&mut self) -> Vec<TypedExpr<'ctx, Bool>> {
        std::mem::take(&mut self.obligations)
    }

    /// Read every lowered rank and dimension out of `model`.
    pub fn witness(&self, model: &Model<'_>) -> Witness {
        let ranks = self
            .ranks
            .iter()
            .filter_map(|(r, rank)| Some((r.clone(), model.eval_int(*rank)?)))
            .collect();
        let dims = self
            .dims
            .iter()
            .filter_map(|(key, dim)| Some((key.clone(), model.eval_int(*dim)?)))
            .collect();
        Witness {
            model: model.to_string(),
            ranks,
            dims,
        }
    }

    fn lower(&mut self, value: &Value) -> Result<Term<'ctx>, LoweringError> {
        match value {
            Value::Equals(..) => self.lower_fact(value).map(Term::Bool),
            _ => self.lower_term(value).map(Term::Int),
        }
    }

    fn rank(&mut self, r: &Register) -> TypedExpr<'ctx, Int> {
        let first = self.ranks.lookup(r).is_none();
        let rank = *self.ranks.get(r);
        if first && self.shape_axioms {
            self.axioms.push(rank.gt(self.ctx.literal(-1)));
        }
        rank
    }

    fn dim(&mut self, k: i64, r: &Register) -> TypedExpr<'ctx, Int> {
        let key = (r.clone(), k);
        if let Some(dim) = self.dims.get(&key) {
            return *dim;
        }
        let index = self.ctx.literal(k);
        let dim = self.shapes.get(r).apply(index);
        let rank = self.rank(r);
        if self.shape_axioms {
            let minus_one = self.ctx.literal(-1);
            self.axioms.push(dim.gt(minus_one));
            self.obligations.extend([rank.gt(index), index.gt(minus_one)]);
        }
        self.dims.insert(key, dim);
        dim
    }
}

fn unsupported(value: &Value, position: &'static str) -> LoweringError {
    LoweringError::Unsupported {
        value: value.to_string(),
        position,
    }
}
