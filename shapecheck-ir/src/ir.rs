#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of one IR value. Unique within a block; another block may reuse it.
pub type Register = String;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// Nominal type such as `Int`, `Bool` or `Tensor`.
    Named(String),
    /// Member selected from a namespace, e.g. `Builtin.Int64`.
    Select(Box<Type>, String),
    /// Generic application, e.g. `Tensor<Float>`.
    Generic(Box<Type>, Vec<Type>),
    Function(Vec<Type>, Box<Type>),
    Tuple(Vec<Type>),
}

impl Type {
    pub fn named(name: impl Into<String>) -> Self {
        Type::Named(name.into())
    }

    /// `Builtin.<member>`
    pub fn builtin(member: impl Into<String>) -> Self {
        Type::Select(Box::new(Type::named("Builtin")), member.into())
    }

    /// The member name when this is `Builtin.<member>`.
    pub fn builtin_member(&self) -> Option<&str> {
        match self {
            Type::Select(base, member) if matches!(base.as_ref(), Type::Named(n) if n == "Builtin") => {
                Some(member.as_str())
            }
            _ => None,
        }
    }

    pub fn nominal_name(&self) -> Option<&str> {
        match self {
            Type::Named(n) => Some(n.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Named(n) => write!(f, "{n}"),
            Type::Select(base, member) => write!(f, "{base}.{member}"),
            Type::Generic(base, args) => {
                write!(f, "{base}<")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ">")
            }
            Type::Function(params, ret) => {
                write!(f, "(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") -> {ret}")
            }
            Type::Tuple(elems) => {
                write!(f, "(")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operand {
    pub value: Register,
    pub ty: Type,
}

impl Operand {
    pub fn new(value: impl Into<Register>, ty: Type) -> Self {
        Self {
            value: value.into(),
            ty,
        }
    }
}

/// Reference to a declaration by its qualified path, e.g. `["Int", "_value"]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclRef {
    pub path: Vec<String>,
}

impl DeclRef {
    pub fn new<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is(&self, path: &[&str]) -> bool {
        self.path.len() == path.len() && self.path.iter().zip(path).all(|(a, b)| a == b)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// Integer literal of the given (usually builtin) type.
    IntegerLiteral { ty: Type, value: i64 },

    /// Low-level builtin operation, e.g. `cmp_eq_Int64`.
    Builtin {
        name: String,
        operands: Vec<Operand>,
        ty: Type,
    },

    /// Reference to a function by its (mangled) name.
    FunctionRef { name: String, ty: Type },

    /// Call of the function held in `callee`.
    Apply { callee: Register, args: Vec<Register> },

    /// Start of a coroutine call. The trailing result is the continuation token.
    BeginApply { callee: Register, args: Vec<Register> },

    /// End of the coroutine call started by `token`.
    EndApply { token: Register },

    /// Aggregate construction.
    Struct { ty: Type, operands: Vec<Operand> },

    /// Field projection out of an aggregate.
    StructExtract { operand: Operand, field: DeclRef },

    /// Any instruction the analysis does not model.
    Other { opcode: String, operands: Vec<Register> },
}

impl Instruction {
    pub fn opcode(&self) -> &str {
        match self {
            Instruction::IntegerLiteral { .. } => "integer_literal",
            Instruction::Builtin { .. } => "builtin",
            Instruction::FunctionRef { .. } => "function_ref",
            Instruction::Apply { .. } => "apply",
            Instruction::BeginApply { .. } => "begin_apply",
            Instruction::EndApply { .. } => "end_apply",
            Instruction::Struct { .. } => "struct",
            Instruction::StructExtract { .. } => "struct_extract",
            Instruction::Other { opcode, .. } => opcode,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionDef {
    #[serde(default)]
    pub results: Vec<Register>,
    pub instruction: Instruction,
}

impl InstructionDef {
    pub fn new<I, S>(results: I, instruction: Instruction) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Register>,
    {
        Self {
            results: results.into_iter().map(Into::into).collect(),
            instruction,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Terminator {
    Return(Operand),

    Branch {
        target: String,
        #[serde(default)]
        args: Vec<Register>,
    },

    CondBranch {
        condition: Register,
        then_target: String,
        else_target: String,
    },

    Unreachable,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub label: String,
    #[serde(default)]
    pub arguments: Vec<Operand>,
    pub instructions: Vec<InstructionDef>,
    pub terminator: Terminator,
}

impl Block {
    /// Block arguments, then instruction results.
    pub fn defined_registers(&self) -> impl Iterator<Item = &Register> {
        self.arguments
            .iter()
            .map(|a| &a.value)
            .chain(self.instructions.iter().flat_map(|i| i.results.iter()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub blocks: Vec<Block>,
}

impl Function {
    pub fn entry(&self) -> Option<&Block> {
        self.blocks.first()
    }

    /// Formal parameters: the arguments of the entry block.
    pub fn params(&self) -> Vec<Register> {
        self.entry()
            .map(|b| b.arguments.iter().map(|a| a.value.clone()).collect())
            .unwrap_or_default()
    }

    /// Renames the registers of block `index` to function-wide names.
    ///
    /// A name defined by several blocks stands for a different value in each.
    /// The entry block keeps bare names; a later block that redefines one
    /// refers to it as `label::register`. Names a block does not define
    /// resolve to the bare name.
    pub fn block_scope(&self, index: usize) -> impl Fn(&Register) -> Register + '_ {
        let block = self.blocks.get(index);
        let shadowed: BTreeSet<&Register> = match block {
            Some(b) if index > 0 => b
                .defined_registers()
                .filter(|r| {
                    self.blocks
                        .iter()
                        .enumerate()
                        .any(|(i, other)| i != index && other.defined_registers().any(|d| d == *r))
                })
                .collect(),
            _ => BTreeSet::new(),
        };
        move |r: &Register| match block {
            Some(b) if shadowed.contains(r) => format!("{}::{r}", b.label),
            _ => r.clone(),
        }
    }

    /// Registers returned by the function, scoped by [`Function::block_scope`],
    /// in block order, without duplicates.
    pub fn returned_registers(&self) -> Vec<Register> {
        let mut out: Vec<Register> = Vec::new();
        for (i, b) in self.blocks.iter().enumerate() {
            if let Terminator::Return(op) = &b.terminator {
                let r = self.block_scope(i)(&op.value);
                if !out.contains(&r) {
                    out.push(r);
                }
            }
        }
        out
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub functions: BTreeMap<String, Function>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, function: Function) {
        self.functions.insert(function.name.clone(), function);
    }
}
