#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use miette::Diagnostic;
use thiserror::Error;

use crate::{Function, Module, Terminator};

#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum IrError {
    #[error("function key '{key}' mismatches Function.name='{name}'")]
    #[diagnostic(code(shapecheck::ir::name_mismatch))]
    NameMismatch { key: String, name: String },

    #[error("function '{function}' has no blocks")]
    #[diagnostic(code(shapecheck::ir::no_blocks))]
    NoBlocks { function: String },

    #[error("function '{function}' has duplicate block label '{label}'")]
    #[diagnostic(code(shapecheck::ir::duplicate_block))]
    DuplicateBlock { function: String, label: String },

    #[error("function '{function}' branches to missing block '{target}'")]
    #[diagnostic(code(shapecheck::ir::missing_block))]
    MissingBlock { function: String, target: String },

    #[error("block '{block}' of function '{function}' defines register '{register}' more than once")]
    #[diagnostic(code(shapecheck::ir::duplicate_register))]
    DuplicateRegister {
        function: String,
        block: String,
        register: String,
    },
}

/// Structural sanity check over every function of a module.
///
/// This is not a full verifier; it only rejects shapes of IR the analysis
/// relies on never seeing.
pub fn validate_module(module: &Module) -> Result<(), IrError> {
    for (key, f) in &module.functions {
        if &f.name != key {
            return Err(IrError::NameMismatch {
                key: key.clone(),
                name: f.name.clone(),
            });
        }
        validate_function(f)?;
    }
    Ok(())
}

pub fn validate_function(f: &Function) -> Result<(), IrError> {
    if f.blocks.is_empty() {
        return Err(IrError::NoBlocks {
            function: f.name.clone(),
        });
    }

    let mut labels: BTreeSet<&str> = BTreeSet::new();
    for bb in &f.blocks {
        if !labels.insert(bb.label.as_str()) {
            return Err(IrError::DuplicateBlock {
                function: f.name.clone(),
                label: bb.label.clone(),
            });
        }
    }

    let missing = |target: &str| IrError::MissingBlock {
        function: f.name.clone(),
        target: target.to_string(),
    };

    for bb in &f.blocks {
        // Register names are block-scoped: a later block may reuse one.
        let mut defined: BTreeSet<&str> = BTreeSet::new();
        let defs = bb
            .arguments
            .iter()
            .map(|a| a.value.as_str())
            .chain(bb.instructions.iter().flat_map(|i| i.results.iter().map(String::as_str)));
        for reg in defs {
            if !defined.insert(reg) {
                return Err(IrError::DuplicateRegister {
                    function: f.name.clone(),
                    block: bb.label.clone(),
                    register: reg.to_string(),
                });
            }
        }

        match &bb.terminator {
            Terminator::Return(_) | Terminator::Unreachable => {}
            Terminator::Branch { target, .. } => {
                if !labels.contains(target.as_str()) {
                    return Err(missing(target));
                }
            }
            Terminator::CondBranch {
                then_target,
                else_target,
                ..
            } => {
                for t in [then_target, else_target] {
                    if !labels.contains(t.as_str()) {
                        return Err(missing(t));
                    }
                }
            }
        }
    }

    Ok(())
}
