use std::ffi::{CStr, CString};

use tracing::debug;
use z3_sys::*;

use crate::expr::{Bool, Int, IntSequence, TypedExpr};
use crate::solver::Solver;
use crate::SmtConfig;

/// Z3 environment. Owns every expression built through it.
///
/// Contexts hold raw pointers and are neither `Send` nor `Sync`.
#[derive(Debug)]
pub struct Context {
    raw: Z3_context,
    int_sort: Z3_sort,
    proofs: bool,
}

thread_local! {
    static DEFAULT_CONTEXT: &'static Context = Box::leak(Box::new(Context::default()));
}

impl Context {
    pub fn new(config: &SmtConfig) -> Self {
        unsafe {
            let cfg = Z3_mk_config();
            for (key, value) in config.z3_params() {
                let key = c_string(&key);
                let value = c_string(&value);
                Z3_set_param_value(cfg, key.as_ptr(), value.as_ptr());
            }
            let raw = Z3_mk_context(cfg);
            Z3_del_config(cfg);
            assert!(!raw.is_null(), "Z3_mk_context returned null");

            // Without a handler, failing calls set an error code and return null.
            Z3_set_error_handler(raw, None);

            let int_sort = Z3_mk_int_sort(raw);
            debug!(proofs = config.proof, timeout_ms = ?config.timeout_ms, "z3 context created");
            Self {
                raw,
                int_sort,
                proofs: config.proof,
            }
        }
    }

    /// Lazily created default context of the current thread. Never dropped.
    ///
    /// This is one instance per thread, not one per process: `Context` is not
    /// `Send`, so every thread that asks gets (and leaks) its own. Prefer an
    /// explicit [`Context::new`] where isolation matters (tests).
    pub fn default_context() -> &'static Context {
        DEFAULT_CONTEXT.with(|ctx| *ctx)
    }

    pub fn proofs_enabled(&self) -> bool {
        self.proofs
    }

    pub fn make_solver(&self) -> Solver<'_> {
        Solver::new(self)
    }

    pub fn make_int_variable(&self, name: &str) -> TypedExpr<'_, Int> {
        let ast = unsafe { Z3_mk_const(self.raw, self.symbol(name), self.int_sort) };
        TypedExpr::wrap(self, ast, "Z3_mk_const")
    }

    /// An uninterpreted function `Int -> Int` standing in for an indexable shape.
    pub fn make_int_sequence_variable(&self, name: &str) -> TypedExpr<'_, IntSequence> {
        let ast = unsafe {
            let domain = [self.int_sort];
            let decl = Z3_mk_func_decl(self.raw, self.symbol(name), 1, domain.as_ptr(), self.int_sort);
            self.check_not_null(decl, "Z3_mk_func_decl");
            Z3_func_decl_to_ast(self.raw, decl)
        };
        TypedExpr::wrap(self, ast, "Z3_func_decl_to_ast")
    }

    pub fn literal(&self, value: i64) -> TypedExpr<'_, Int> {
        let ast = unsafe { Z3_mk_int64(self.raw, value, self.int_sort) };
        TypedExpr::wrap(self, ast, "Z3_mk_int64")
    }

    pub fn bool_literal(&self, value: bool) -> TypedExpr<'_, Bool> {
        let ast = unsafe {
            if value {
                Z3_mk_true(self.raw)
            } else {
                Z3_mk_false(self.raw)
            }
        };
        TypedExpr::wrap(self, ast, "Z3_mk_true/false")
    }

    /// `e1 ∧ e2 ∧ ...`, or `true` when empty.
    pub fn conjunction<'a>(&'a self, exprs: &[TypedExpr<'a, Bool>]) -> TypedExpr<'a, Bool> {
        if exprs.is_empty() {
            return self.bool_literal(true);
        }
        let args: Vec<Z3_ast> = exprs
            .iter()
            .map(|e| {
                self.check_same(e.context());
                e.as_raw()
            })
            .collect();
        let ast = unsafe { Z3_mk_and(self.raw, args.len() as u32, args.as_ptr()) };
        TypedExpr::wrap(self, ast, "Z3_mk_and")
    }

    pub(crate) fn raw(&self) -> Z3_context {
        self.raw
    }

    pub(crate) fn check_same(&self, other: &Context) {
        assert!(
            std::ptr::eq(self, other),
            "expressions from different Z3 contexts cannot be combined"
        );
    }

    /// Panics with Z3's own error message when `ptr` is null.
    pub(crate) fn check_not_null<T>(&self, ptr: *mut T, what: &str) {
        if ptr.is_null() {
            let message = unsafe {
                let code = Z3_get_error_code(self.raw);
                z3_string(Z3_get_error_msg(self.raw, code)).unwrap_or_else(|| format!("{code:?}"))
            };
            panic!("{what} returned null: {message}");
        }
    }

    fn symbol(&self, name: &str) -> Z3_symbol {
        let name = c_string(name);
        unsafe { Z3_mk_string_symbol(self.raw, name.as_ptr()) }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(&SmtConfig::default())
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        unsafe { Z3_del_context(self.raw) };
    }
}

/// Interior NUL bytes are dropped; Z3 names never need them.
pub(crate) fn c_string(s: &str) -> CString {
    CString::new(s.replace('\0', "")).unwrap_or_default()
}

/// Copy a Z3-owned string. `None` for a null pointer.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that is still alive.
pub(crate) unsafe fn z3_string(ptr: Z3_string) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}
