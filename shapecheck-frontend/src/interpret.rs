use std::collections::HashMap;

use shapecheck_ir::{Block, Instruction, InstructionDef, Register};
use tracing::{trace, warn};

use crate::builtins::{self, Updates};
use crate::{BuiltinFunction, FrontendConstraint, FrontendError, Value};

/// Symbolic values of the registers of one block. Absent means unknown.
#[derive(Clone, Debug, Default)]
pub struct Valuation {
    values: HashMap<Register, Value>,
}

impl Valuation {
    pub fn get(&self, register: &str) -> Option<&Value> {
        self.values.get(register)
    }

    /// Bind `register`, or forget it when `value` is `None`.
    pub fn set(&mut self, register: &str, value: Option<Value>) {
        match value {
            Some(v) => {
                trace!(register, value = %v, "valuation update");
                self.values.insert(register.to_string(), v);
            }
            None => {
                self.values.remove(register);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Collect the constraints implied by one basic block.
///
/// Every block starts from an empty valuation; only the constraints survive.
pub fn gather_constraints(block: &Block) -> Result<Vec<FrontendConstraint>, FrontendError> {
    let mut interp = Interpreter::default();
    for def in &block.instructions {
        interp.step(def)?;
    }
    Ok(interp.finish())
}

#[derive(Debug, Default)]
pub struct Interpreter {
    valuation: Valuation,
    constraints: Vec<FrontendConstraint>,
}

impl Interpreter {
    pub fn valuation(&self) -> &Valuation {
        &self.valuation
    }

    pub fn constraints(&self) -> &[FrontendConstraint] {
        &self.constraints
    }

    pub fn finish(self) -> Vec<FrontendConstraint> {
        self.constraints
    }

    /// Interpret one instruction, updating the valuation and emitting constraints.
    pub fn step(&mut self, def: &InstructionDef) -> Result<(), FrontendError> {
        let updates: Option<Updates> = match &def.instruction {
            Instruction::IntegerLiteral { ty, value } => match ty.builtin_member() {
                Some(kind) if builtins::is_builtin_integer(kind) => Some(vec![Some(Value::Int(*value))]),
                _ => None,
            },

            Instruction::Builtin { name, operands, .. } => {
                let values: Vec<Option<&Value>> =
                    operands.iter().map(|op| self.valuation.get(&op.value)).collect();
                builtins::interpret_instruction(name, &values)
                    .map(|vs| vs.into_iter().map(Some).collect())
            }

            Instruction::FunctionRef { name, .. } => {
                let v = match builtins::entry_point(name) {
                    Some(kind) => Value::BuiltinFunctionRef(kind),
                    None => Value::FunctionRef(name.clone()),
                };
                Some(vec![Some(v)])
            }

            // Accessors are coroutines; `begin_apply` is a call site like any other.
            // The matching `end_apply` is not checked.
            Instruction::Apply { callee, args } | Instruction::BeginApply { callee, args } => {
                self.call(def, callee, args)?
            }

            Instruction::Struct { ty, operands } => match ty.nominal_name() {
                Some("Bool" | "Int") => Some(
                    operands
                        .iter()
                        .map(|op| self.valuation.get(&op.value).cloned())
                        .collect(),
                ),
                _ => None,
            },

            Instruction::StructExtract { operand, field } if field.is(&["Int", "_value"]) => {
                Some(vec![self.valuation.get(&operand.value).cloned()])
            }

            _ => None,
        };

        let Some(results) = updates else {
            return Ok(());
        };

        if results.len() != def.results.len() {
            return Err(FrontendError::ResultArity {
                opcode: def.instruction.opcode().to_string(),
                produced: results.len(),
                declared: def.results.len(),
            });
        }

        for (register, value) in def.results.iter().zip(results) {
            self.valuation.set(register, value);
        }
        Ok(())
    }

    fn call(
        &mut self,
        def: &InstructionDef,
        callee: &Register,
        args: &[Register],
    ) -> Result<Option<Updates>, FrontendError> {
        match self.valuation.get(callee).cloned() {
            Some(Value::FunctionRef(name)) => {
                let [result] = def.results.as_slice() else {
                    return Err(FrontendError::CallResultArity {
                        function: name,
                        results: def.results.len(),
                    });
                };
                self.constraints.push(FrontendConstraint::Apply {
                    function: name,
                    result: result.clone(),
                    operands: args.to_vec(),
                });
                Ok(None)
            }

            Some(Value::BuiltinFunctionRef(BuiltinFunction::Check)) => {
                let [cond] = args else {
                    return Err(FrontendError::BuiltinArity {
                        kind: BuiltinFunction::Check,
                        expected: 1,
                        got: args.len(),
                    });
                };
                match self.valuation.get(cond) {
                    Some(v) => self.constraints.push(FrontendConstraint::Value(v.clone())),
                    None => warn!(register = %cond, "failed to recover a check"),
                }
                Ok(None)
            }

            Some(Value::BuiltinFunctionRef(kind)) => {
                let values: Vec<Option<&Value>> = args.iter().map(|a| self.valuation.get(a)).collect();
                builtins::interpret_call(kind, args, &values)
            }

            None => Ok(None),

            Some(other) => Err(FrontendError::NonFunctionCallee {
                register: callee.clone(),
                value: other,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use shapecheck_ir::{DeclRef, Operand, Terminator, Type};

    use super::*;

    const SHAPE: &str = "$s10TensorFlow0A0V5shapeAA0A5ShapeVvg";
    const SUBSCRIPT: &str = "$s10TensorFlow0A5ShapeVyS2icir";
    const RANK: &str = "$s10TensorFlow0A0V4rankSivg";

    fn int_ty() -> Type {
        Type::builtin("Int64")
    }

    fn lit(r: &str, v: i64) -> InstructionDef {
        InstructionDef::new([r], Instruction::IntegerLiteral { ty: int_ty(), value: v })
    }

    fn fref(r: &str, name: &str) -> InstructionDef {
        InstructionDef::new(
            [r],
            Instruction::FunctionRef {
                name: name.to_string(),
                ty: Type::named("fn"),
            },
        )
    }

    fn apply(results: &[&str], callee: &str, args: &[&str]) -> InstructionDef {
        InstructionDef::new(
            results.iter().copied(),
            Instruction::Apply {
                callee: callee.to_string(),
                args: args.iter().map(|a| a.to_string()).collect(),
            },
        )
    }

    fn begin_apply(results: &[&str], callee: &str, args: &[&str]) -> InstructionDef {
        InstructionDef::new(
            results.iter().copied(),
            Instruction::BeginApply {
                callee: callee.to_string(),
                args: args.iter().map(|a| a.to_string()).collect(),
            },
        )
    }

    fn cmp_eq(r: &str, a: &str, b: &str) -> InstructionDef {
        InstructionDef::new(
            [r],
            Instruction::Builtin {
                name: "cmp_eq_Int64".to_string(),
                operands: vec![Operand::new(a, int_ty()), Operand::new(b, int_ty())],
                ty: Type::builtin("Int1"),
            },
        )
    }

    fn block(instructions: Vec<InstructionDef>) -> Block {
        Block {
            label: "bb0".to_string(),
            arguments: vec![Operand::new("%x", Type::named("Tensor"))],
            instructions,
            terminator: Terminator::Unreachable,
        }
    }

    fn reg(r: &str) -> Register {
        r.to_string()
    }

    #[test]
    fn literal_compare_check_yields_one_equality() {
        let b = block(vec![
            lit("%0", 2),
            lit("%1", 3),
            cmp_eq("%2", "%0", "%1"),
            fref("%3", "check"),
            apply(&["%4"], "%3", &["%2"]),
        ]);
        let cs = gather_constraints(&b).expect("well-formed block");
        assert_eq!(
            cs,
            vec![FrontendConstraint::Value(Value::equals(Value::Int(2), Value::Int(3)))]
        );
    }

    #[test]
    fn user_call_becomes_apply_with_ordered_operands() {
        let b = block(vec![
            fref("%f", "matmul"),
            apply(&["%r"], "%f", &["%x", "%y", "%z"]),
        ]);
        let cs = gather_constraints(&b).expect("well-formed block");
        assert_eq!(
            cs,
            vec![FrontendConstraint::Apply {
                function: "matmul".to_string(),
                result: reg("%r"),
                operands: vec![reg("%x"), reg("%y"), reg("%z")],
            }]
        );
    }

    #[test]
    fn shape_subscript_pipeline_recovers_dim_fact() {
        let b = block(vec![
            fref("%sg", SHAPE),
            apply(&["%s"], "%sg", &["%x"]),
            lit("%k", 0),
            fref("%sub", SUBSCRIPT),
            begin_apply(&["%d", "%tok"], "%sub", &["%k", "%s"]),
            InstructionDef::new(Vec::<String>::new(), Instruction::EndApply { token: reg("%tok") }),
            lit("%two", 2),
            cmp_eq("%eq", "%d", "%two"),
            fref("%chk", "check"),
            apply(&["%u"], "%chk", &["%eq"]),
        ]);
        let cs = gather_constraints(&b).expect("well-formed block");
        assert_eq!(
            cs,
            vec![FrontendConstraint::Value(Value::equals(
                Value::DimOf(0, reg("%x")),
                Value::Int(2)
            ))]
        );
    }

    #[test]
    fn rank_getter_binds_rank() {
        let mut interp = Interpreter::default();
        interp.step(&fref("%rg", RANK)).expect("ok");
        interp.step(&apply(&["%r"], "%rg", &["%x"])).expect("ok");
        assert_eq!(interp.valuation().get("%r"), Some(&Value::RankOf(reg("%x"))));
    }

    #[test]
    fn non_builtin_literal_types_are_ignored() {
        let mut interp = Interpreter::default();
        interp
            .step(&InstructionDef::new(
                ["%0"],
                Instruction::IntegerLiteral {
                    ty: Type::builtin("Int8"),
                    value: 1,
                },
            ))
            .expect("ok");
        interp
            .step(&InstructionDef::new(
                ["%1"],
                Instruction::IntegerLiteral {
                    ty: Type::named("Int64"),
                    value: 1,
                },
            ))
            .expect("ok");
        assert!(interp.valuation().is_empty());
    }

    #[test]
    fn boxed_int_is_transparent() {
        let mut interp = Interpreter::default();
        interp.step(&lit("%0", 5)).expect("ok");
        interp
            .step(&InstructionDef::new(
                ["%1"],
                Instruction::Struct {
                    ty: Type::named("Int"),
                    operands: vec![Operand::new("%0", int_ty())],
                },
            ))
            .expect("ok");
        interp
            .step(&InstructionDef::new(
                ["%2"],
                Instruction::StructExtract {
                    operand: Operand::new("%1", Type::named("Int")),
                    field: DeclRef::new(["Int", "_value"]),
                },
            ))
            .expect("ok");
        assert_eq!(interp.valuation().get("%1"), Some(&Value::Int(5)));
        assert_eq!(interp.valuation().get("%2"), Some(&Value::Int(5)));
    }

    #[test]
    fn other_structs_and_fields_are_ignored() {
        let mut interp = Interpreter::default();
        interp.step(&lit("%0", 5)).expect("ok");
        interp
            .step(&InstructionDef::new(
                ["%1"],
                Instruction::Struct {
                    ty: Type::named("Float"),
                    operands: vec![Operand::new("%0", int_ty())],
                },
            ))
            .expect("ok");
        interp
            .step(&InstructionDef::new(
                ["%2"],
                Instruction::StructExtract {
                    operand: Operand::new("%0", Type::named("Bool")),
                    field: DeclRef::new(["Bool", "_value"]),
                },
            ))
            .expect("ok");
        assert_eq!(interp.valuation().get("%1"), None);
        assert_eq!(interp.valuation().get("%2"), None);
    }

    #[test]
    fn unrecovered_check_is_skipped() {
        let b = block(vec![fref("%c", "check"), apply(&["%u"], "%c", &["%missing"])]);
        assert_eq!(gather_constraints(&b), Ok(vec![]));
    }

    #[test]
    fn unknown_callee_is_opaque() {
        let b = block(vec![apply(&["%r"], "%nowhere", &["%x"])]);
        assert_eq!(gather_constraints(&b), Ok(vec![]));
    }

    #[test]
    fn result_count_mismatch_is_fatal() {
        let b = block(vec![InstructionDef::new(
            ["%0", "%1"],
            Instruction::IntegerLiteral { ty: int_ty(), value: 1 },
        )]);
        assert_eq!(
            gather_constraints(&b),
            Err(FrontendError::ResultArity {
                opcode: "integer_literal".to_string(),
                produced: 1,
                declared: 2,
            })
        );
    }

    #[test]
    fn shape_subscript_needs_token_slot() {
        let b = block(vec![
            fref("%sg", SHAPE),
            apply(&["%s"], "%sg", &["%x"]),
            lit("%k", 0),
            fref("%sub", SUBSCRIPT),
            apply(&["%d"], "%sub", &["%k", "%s"]),
        ]);
        assert!(matches!(
            gather_constraints(&b),
            Err(FrontendError::ResultArity { produced: 2, declared: 1, .. })
        ));
    }

    #[test]
    fn multi_result_user_call_is_fatal() {
        let b = block(vec![fref("%f", "g"), apply(&["%a", "%b"], "%f", &[])]);
        assert_eq!(
            gather_constraints(&b),
            Err(FrontendError::CallResultArity {
                function: "g".to_string(),
                results: 2,
            })
        );
        let b = block(vec![fref("%f", "g"), apply(&[], "%f", &[])]);
        assert!(matches!(
            gather_constraints(&b),
            Err(FrontendError::CallResultArity { results: 0, .. })
        ));
    }

    #[test]
    fn calling_a_literal_is_fatal() {
        let b = block(vec![lit("%0", 1), apply(&["%r"], "%0", &[])]);
        assert_eq!(
            gather_constraints(&b),
            Err(FrontendError::NonFunctionCallee {
                register: reg("%0"),
                value: Value::Int(1),
            })
        );
    }

    #[test]
    fn check_arity_is_fatal() {
        let b = block(vec![fref("%c", "check"), apply(&["%u"], "%c", &["%a", "%b"])]);
        assert!(matches!(
            gather_constraints(&b),
            Err(FrontendError::BuiltinArity {
                kind: BuiltinFunction::Check,
                expected: 1,
                got: 2
            })
        ));
    }

    #[test]
    fn uninformative_subscript_leaves_results_unknown() {
        let mut interp = Interpreter::default();
        interp.step(&lit("%k", 0)).expect("ok");
        interp.step(&fref("%sub", SUBSCRIPT)).expect("ok");
        // `%k` is not a shape, so the subscript yields nothing and `%k` keeps its value.
        interp
            .step(&begin_apply(&["%d", "%tok"], "%sub", &["%k", "%k"]))
            .expect("ok");
        assert_eq!(interp.valuation().get("%d"), None);
        assert_eq!(interp.valuation().get("%k"), Some(&Value::Int(0)));
    }
}
