use std::fmt;
use std::marker::PhantomData;
use std::ops::{Add, BitAnd, BitOr, Div, Mul, Not, Sub};

use z3_sys::*;

use crate::context::z3_string;
use crate::Context;

mod sealed {
    pub trait Sealed {}
}

/// Logical kind of an expression, tracked only at compile time.
pub trait Kind: sealed::Sealed {
    const NAME: &'static str;
}

/// Kinds with first-order equality.
pub trait Scalar: Kind {}

/// Mathematical integers.
#[derive(Debug)]
pub enum Int {}

#[derive(Debug)]
pub enum Bool {}

/// Integer-indexed sequence of integers (an uninterpreted `Int -> Int`).
#[derive(Debug)]
pub enum IntSequence {}

/// Kind not tracked, e.g. proof terms.
#[derive(Debug)]
pub enum Void {}

macro_rules! kinds {
    ($($k:ident => $name:literal),* $(,)?) => {
        $(
            impl sealed::Sealed for $k {}
            impl Kind for $k {
                const NAME: &'static str = $name;
            }
        )*
    };
}

kinds! {
    Int => "Int",
    Bool => "Bool",
    IntSequence => "IntSequence",
    Void => "Void",
}

impl Scalar for Int {}
impl Scalar for Bool {}

/// Handle to one Z3 expression node of logical kind `K`.
///
/// Nodes are owned by the context, so handles are plain copies.
pub struct TypedExpr<'ctx, K: Kind> {
    ctx: &'ctx Context,
    ast: Z3_ast,
    _kind: PhantomData<K>,
}

impl<K: Kind> Clone for TypedExpr<'_, K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: Kind> Copy for TypedExpr<'_, K> {}

impl<'ctx, K: Kind> TypedExpr<'ctx, K> {
    pub(crate) fn wrap(ctx: &'ctx Context, ast: Z3_ast, what: &str) -> Self {
        ctx.check_not_null(ast, what);
        Self {
            ctx,
            ast,
            _kind: PhantomData,
        }
    }

    pub fn context(&self) -> &'ctx Context {
        self.ctx
    }

    pub(crate) fn as_raw(&self) -> Z3_ast {
        self.ast
    }

    fn binary<R: Kind>(
        self,
        other: TypedExpr<'ctx, impl Kind>,
        mk: unsafe extern "C" fn(Z3_context, Z3_ast, Z3_ast) -> Z3_ast,
        what: &str,
    ) -> TypedExpr<'ctx, R> {
        self.ctx.check_same(other.ctx);
        let ast = unsafe { mk(self.ctx.raw(), self.ast, other.ast) };
        TypedExpr::wrap(self.ctx, ast, what)
    }

    fn nary<R: Kind>(
        self,
        other: TypedExpr<'ctx, impl Kind>,
        mk: unsafe extern "C" fn(Z3_context, ::std::os::raw::c_uint, *const Z3_ast) -> Z3_ast,
        what: &str,
    ) -> TypedExpr<'ctx, R> {
        self.ctx.check_same(other.ctx);
        let args = [self.ast, other.ast];
        let ast = unsafe { mk(self.ctx.raw(), 2, args.as_ptr()) };
        TypedExpr::wrap(self.ctx, ast, what)
    }
}

impl<'ctx, K: Scalar> TypedExpr<'ctx, K> {
    /// `self == other`
    pub fn equals(self, other: Self) -> TypedExpr<'ctx, Bool> {
        self.binary(other, Z3_mk_eq, "Z3_mk_eq")
    }
}

impl<'ctx> TypedExpr<'ctx, Int> {
    /// `self > other`
    pub fn gt(self, other: Self) -> TypedExpr<'ctx, Bool> {
        self.binary(other, Z3_mk_gt, "Z3_mk_gt")
    }
}

impl<'ctx> TypedExpr<'ctx, Bool> {
    /// `self ⇒ other`
    pub fn implies(self, other: Self) -> TypedExpr<'ctx, Bool> {
        self.binary(other, Z3_mk_implies, "Z3_mk_implies")
    }
}

impl<'ctx> TypedExpr<'ctx, IntSequence> {
    /// Element at `index`, as an application of the underlying function.
    pub fn apply(self, index: TypedExpr<'ctx, Int>) -> TypedExpr<'ctx, Int> {
        self.ctx.check_same(index.ctx);
        let ctx = self.ctx.raw();
        let ast = unsafe {
            let decl = Z3_to_func_decl(ctx, self.ast);
            self.ctx.check_not_null(decl, "Z3_to_func_decl");
            let args = [index.ast];
            Z3_mk_app(ctx, decl, 1, args.as_ptr())
        };
        TypedExpr::wrap(self.ctx, ast, "Z3_mk_app")
    }
}

impl<'ctx> Add for TypedExpr<'ctx, Int> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.nary(rhs, Z3_mk_add, "Z3_mk_add")
    }
}

impl<'ctx> Sub for TypedExpr<'ctx, Int> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.nary(rhs, Z3_mk_sub, "Z3_mk_sub")
    }
}

impl<'ctx> Mul for TypedExpr<'ctx, Int> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.nary(rhs, Z3_mk_mul, "Z3_mk_mul")
    }
}

impl<'ctx> Div for TypedExpr<'ctx, Int> {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        self.binary(rhs, Z3_mk_div, "Z3_mk_div")
    }
}

impl<'ctx> Not for TypedExpr<'ctx, Bool> {
    type Output = Self;

    fn not(self) -> Self {
        let ast = unsafe { Z3_mk_not(self.ctx.raw(), self.ast) };
        TypedExpr::wrap(self.ctx, ast, "Z3_mk_not")
    }
}

impl<'ctx> BitAnd for TypedExpr<'ctx, Bool> {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        self.nary(rhs, Z3_mk_and, "Z3_mk_and")
    }
}

impl<'ctx> BitOr for TypedExpr<'ctx, Bool> {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.nary(rhs, Z3_mk_or, "Z3_mk_or")
    }
}

impl<K: Kind> fmt::Display for TypedExpr<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = unsafe { z3_string(Z3_ast_to_string(self.ctx.raw(), self.ast)) };
        f.write_str(text.as_deref().unwrap_or("<NULL AST?>"))
    }
}

impl<K: Kind> fmt::Debug for TypedExpr<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypedExpr<{}>({self})", K::NAME)
    }
}
