//! IR Instructions
//!
//! Non-terminating instructions and block terminators.

use super::types::Type;
use super::value::{Label, Value, Var};
use std::fmt;

/// Integer comparison predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntPredicate {
    Eq,
    Ne,
}

impl fmt::Display for IntPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntPredicate::Eq => write!(f, "eq"),
            IntPredicate::Ne => write!(f, "ne"),
        }
    }
}

/// Value conversion operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastOp {
    Bitcast,
    Ptrtoint,
    Inttoptr,
}

impl fmt::Display for CastOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CastOp::Bitcast => write!(f, "bitcast"),
            CastOp::Ptrtoint => write!(f, "ptrtoint"),
            CastOp::Inttoptr => write!(f, "inttoptr"),
        }
    }
}

/// A non-terminating instruction
#[derive(Debug, Clone)]
pub enum Instr {
    /// Direct or indirect call; `dest` is `None` for void calls
    Call {
        dest: Option<Var>,
        callee: Value,
        args: Vec<Value>,
    },
    /// Load through a pointer
    Load { dest: Var, ptr: Value },
    /// Store through a pointer
    Store { value: Value, ptr: Value },
    /// Stack slot; `dest.ty` is the pointer type
    Alloca { dest: Var },
    /// Conversion
    Cast { dest: Var, op: CastOp, value: Value },
    /// Address of field `index` of the structure `base` points to
    FieldPtr { dest: Var, base: Value, index: u32 },
    /// Address `offset` bytes past the `i8*` base
    BytePtr { dest: Var, base: Value, offset: Value },
    /// Integer or pointer comparison
    ICmp {
        dest: Var,
        pred: IntPredicate,
        left: Value,
        right: Value,
    },
    /// SSA merge
    Phi {
        dest: Var,
        incoming: Vec<(Value, Label)>,
    },
    /// Catch-all landing pad entered on unwind
    LandingPad { dest: Var },
}

impl Instr {
    /// The variable defined by this instruction, if any
    pub fn dest(&self) -> Option<&Var> {
        match self {
            Instr::Call { dest, .. } => dest.as_ref(),
            Instr::Store { .. } => None,
            Instr::Load { dest, .. }
            | Instr::Alloca { dest }
            | Instr::Cast { dest, .. }
            | Instr::FieldPtr { dest, .. }
            | Instr::BytePtr { dest, .. }
            | Instr::ICmp { dest, .. }
            | Instr::Phi { dest, .. }
            | Instr::LandingPad { dest } => Some(dest),
        }
    }

    /// Name of the directly called function, if this is a direct call
    pub fn callee_name(&self) -> Option<&str> {
        match self {
            Instr::Call {
                callee: Value::Global { name, .. },
                ..
            } => Some(name),
            _ => None,
        }
    }

    /// Type of the landing pad result
    pub fn landing_pad_type() -> Type {
        Type::Struct(vec![Type::i8_ptr(), Type::I32])
    }
}

/// Block terminator
#[derive(Debug, Clone)]
pub enum Terminator {
    /// Return, with a value unless the function returns void
    Ret(Option<Value>),
    /// Unconditional branch
    Br(Label),
    /// Conditional branch on an `i1`
    CondBr {
        cond: Value,
        then_to: Label,
        else_to: Label,
    },
    /// Call that continues at `normal` or unwinds to `unwind`
    Invoke {
        dest: Option<Var>,
        callee: Value,
        args: Vec<Value>,
        normal: Label,
        unwind: Label,
    },
    /// Control never reaches here
    Unreachable,
}

impl Terminator {
    /// Successor labels
    pub fn successors(&self) -> Vec<&Label> {
        match self {
            Terminator::Ret(_) | Terminator::Unreachable => vec![],
            Terminator::Br(target) => vec![target],
            Terminator::CondBr {
                then_to, else_to, ..
            } => vec![then_to, else_to],
            Terminator::Invoke { normal, unwind, .. } => vec![normal, unwind],
        }
    }

    /// Name of the directly invoked function, if this is an invoke
    pub fn callee_name(&self) -> Option<&str> {
        match self {
            Terminator::Invoke {
                callee: Value::Global { name, .. },
                ..
            } => Some(name),
            _ => None,
        }
    }
}

/// Return type of a callee value (`ret` of the pointed-to function type)
pub(crate) fn callee_return_type(callee: &Value) -> Type {
    match callee.ty() {
        Type::Ptr(inner) => match *inner {
            Type::Function(fty) => fty.ret,
            _ => Type::Void,
        },
        _ => Type::Void,
    }
}
