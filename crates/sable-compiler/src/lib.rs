//! Sable - ahead-of-time class compiler backend
//!
//! Turns a parsed class into a low-level typed module: lazy-linking
//! trampolines for every symbolic reference, the class-constructor routine
//! that registers the class with the runtime, thunks for native methods,
//! native-callable thunks for callback methods and synchronized wrappers.
//! Ordinary method bodies are lowered by a pluggable [`MethodTranslator`].

pub mod class;
pub mod compiler;
pub mod config;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod ir;
pub mod linkage;
pub mod mangle;
pub mod marshal;
pub mod metadata;
pub mod runtime;
pub mod scan;
pub mod strings;
pub mod sync;
pub mod target;
pub mod trampoline;
pub mod verify;

pub use class::{AccessFlags, ClassDescriptor, FieldDescriptor, MethodDescriptor};
pub use compiler::ClassCompiler;
pub use config::{CompilerConfig, VerifyMode};
pub use context::{ClassContext, ExternalBodies, MethodContext, MethodTranslator};
pub use error::{CompileError, CompileResult};
pub use ir::{Module, PrettyPrint};
pub use linkage::{LinkCell, LinkState};
pub use marshal::{Converter, MarshalerRegistry, NativeType};
pub use scan::{scan, ScanResult};
pub use target::{Arch, Os, Target};
pub use verify::{ClassVerifier, StructuralVerifier, VerifyError};
