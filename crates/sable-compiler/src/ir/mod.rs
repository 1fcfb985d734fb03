//! Low-level typed output module
//!
//! The compiler emits an [`Module`] per class: named record types, globals
//! (trampoline records, string constants, class cells), aliases, external
//! declarations of runtime services and function definitions. The module can
//! be rendered with [`PrettyPrint`] for inspection or handed to a native code
//! generator.

pub mod block;
pub mod function;
pub mod instr;
pub mod module;
pub mod pretty;
pub mod types;
pub mod value;

pub use block::BasicBlock;
pub use function::{Function, Linkage, Param, ParamAttr};
pub use instr::{CastOp, Instr, IntPredicate, Terminator};
pub use module::{Alias, Global, Module, TypeDef};
pub use pretty::PrettyPrint;
pub use types::{FunctionType, Type};
pub use value::{FunctionRef, Label, Value, Var};
