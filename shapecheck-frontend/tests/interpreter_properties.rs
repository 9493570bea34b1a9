use proptest::prelude::*;
use shapecheck_frontend::{gather_constraints, FrontendConstraint, Value};
use shapecheck_ir::{Block, Instruction, InstructionDef, Operand, Terminator, Type};

const SHAPE: &str = "$s10TensorFlow0A0V5shapeAA0A5ShapeVvg";
const SUBSCRIPT: &str = "$s10TensorFlow0A5ShapeVyS2icir";

fn int_ty() -> Type {
    Type::builtin("Int64")
}

fn lit(r: String, v: i64) -> InstructionDef {
    InstructionDef::new([r], Instruction::IntegerLiteral { ty: int_ty(), value: v })
}

fn fref(r: String, name: &str) -> InstructionDef {
    InstructionDef::new(
        [r],
        Instruction::FunctionRef {
            name: name.to_string(),
            ty: Type::named("fn"),
        },
    )
}

fn call(results: Vec<String>, callee: String, args: Vec<String>, coroutine: bool) -> InstructionDef {
    let instruction = if coroutine {
        Instruction::BeginApply { callee, args }
    } else {
        Instruction::Apply { callee, args }
    };
    InstructionDef::new(results, instruction)
}

fn cmp_eq(r: String, a: String, b: String) -> InstructionDef {
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

/// Well-formed instruction generator over a small register pool.
fn instruction() -> impl Strategy<Value = InstructionDef> {
    let reg = || (0u8..6).prop_map(|i| format!("%{i}"));
    prop_oneof![
        (reg(), -4i64..8).prop_map(|(r, v)| lit(r, v)),
        (reg(), prop::sample::select(vec!["check", "user_fn", SHAPE, SUBSCRIPT]))
            .prop_map(|(r, n)| fref(r, n)),
        (reg(), reg(), reg()).prop_map(|(r, a, b)| cmp_eq(r, a, b)),
        (reg(), reg(), reg()).prop_map(|(r, f, a)| call(vec![r], f, vec![a], false)),
        (reg(), reg(), reg(), reg(), reg())
            .prop_map(|(d, tok, f, k, s)| call(vec![d, tok], f, vec![k, s], true)),
    ]
}

proptest! {
    #[test]
    fn interpretation_is_deterministic(insts in prop::collection::vec(instruction(), 0..24)) {
        let b = block(insts);
        let first = gather_constraints(&b);
        let second = gather_constraints(&b);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn unresolved_operands_never_emit(
        fresh_a in "[a-z]{3}",
        fresh_b in "[a-z]{3}",
        k in 0i64..4,
    ) {
        // None of these registers is ever defined, so every instruction sees unknowns.
        let a = format!("%u_{fresh_a}");
        let b = format!("%v_{fresh_b}");
        let insts = vec![
            cmp_eq("%eq".to_string(), a.clone(), b.clone()),
            fref("%chk".to_string(), "check"),
            call(vec!["%r0".to_string()], "%chk".to_string(), vec![a.clone()], false),
            lit("%k".to_string(), k),
            fref("%sub".to_string(), SUBSCRIPT),
            call(vec!["%d".to_string(), "%t".to_string()], "%sub".to_string(), vec!["%k".to_string(), b.clone()], true),
            call(vec!["%r1".to_string()], "%chk".to_string(), vec!["%d".to_string()], false),
            call(vec!["%r2".to_string()], a, vec![b], false),
        ];
        let cs = gather_constraints(&block(insts));
        prop_assert_eq!(cs, Ok(vec![]));
    }

    #[test]
    fn equality_checks_preserve_operand_order(x in -100i64..100, y in -100i64..100) {
        let insts = vec![
            lit("%a".to_string(), x),
            lit("%b".to_string(), y),
            cmp_eq("%eq".to_string(), "%a".to_string(), "%b".to_string()),
            fref("%chk".to_string(), "check"),
            call(vec!["%r".to_string()], "%chk".to_string(), vec!["%eq".to_string()], false),
        ];
        let cs = gather_constraints(&block(insts)).expect("well-formed block");
        prop_assert_eq!(cs, vec![FrontendConstraint::Value(Value::equals(Value::Int(x), Value::Int(y)))]);
    }

    #[test]
    fn user_calls_keep_argument_order(args in prop::collection::vec("%[a-z]{1,4}", 0..6)) {
        let insts = vec![
            fref("%f".to_string(), "user_fn"),
            call(vec!["%r".to_string()], "%f".to_string(), args.clone(), false),
        ];
        let cs = gather_constraints(&block(insts)).expect("well-formed block");
        prop_assert_eq!(cs, vec![FrontendConstraint::Apply {
            function: "user_fn".to_string(),
            result: "%r".to_string(),
            operands: args,
        }]);
    }
}
