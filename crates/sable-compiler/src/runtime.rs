//! Runtime services
//!
//! Every service the emitted code calls into. A service is declared in the
//! output module the first time an emitter asks for it, so a module only
//! declares what it uses.

use crate::ir::{FunctionRef, FunctionType, Module, Type};
use crate::trampoline::kind::{CommonFamily, RefKind};

/// Element kinds with a dedicated array allocator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveArray {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveArray {
    /// Allocator for a `newarray` element descriptor
    pub fn from_descriptor(c: char) -> Option<Self> {
        Some(match c {
            'Z' => PrimitiveArray::Boolean,
            'B' => PrimitiveArray::Byte,
            'C' => PrimitiveArray::Char,
            'S' => PrimitiveArray::Short,
            'I' => PrimitiveArray::Int,
            'J' => PrimitiveArray::Long,
            'F' => PrimitiveArray::Float,
            'D' => PrimitiveArray::Double,
            _ => return None,
        })
    }

    fn name(&self) -> &'static str {
        match self {
            PrimitiveArray::Boolean => "Boolean",
            PrimitiveArray::Byte => "Byte",
            PrimitiveArray::Char => "Char",
            PrimitiveArray::Short => "Short",
            PrimitiveArray::Int => "Int",
            PrimitiveArray::Long => "Long",
            PrimitiveArray::Float => "Float",
            PrimitiveArray::Double => "Double",
        }
    }
}

/// A runtime service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeFn {
    // Class construction
    AllocateClass,
    AddInterface,
    AddMethod,
    AddField,
    RegisterClass,
    FindClass,

    // Exceptions
    Throw,
    ThrowIfExceptionOccurred,
    ThrowVerifyError,
    ExceptionClear,
    Personality,

    // Native threads
    AttachThreadFromCallback,
    DetachThreadFromCallback,

    MemCopy,

    // Allocation
    NewArray(PrimitiveArray),
    NewObjectArray,
    NewMultiArray,
    NewString,
    Allocate,

    // Linking
    ResolveCommon(CommonFamily),
    ResolveSite(RefKind),
    ResolveNative,
    VirtualEntry,
    InterfaceEntry,
    ClassObject,
    Checkcast,
    Instanceof,

    // Monitors
    MonitorEnter,
    MonitorExit,
}

impl RuntimeFn {
    pub fn symbol(&self) -> String {
        let name = match self {
            RuntimeFn::MemCopy => return "llvm.memcpy.p0i8.p0i8.i64".to_string(),
            RuntimeFn::NewArray(elem) => return format!("_bcNew{}Array", elem.name()),
            RuntimeFn::ResolveCommon(family) => return format!("_bcResolve{}", family.type_name()),
            RuntimeFn::ResolveSite(kind) => return kind.resolver_symbol(),
            RuntimeFn::AllocateClass => "AllocateClass",
            RuntimeFn::AddInterface => "AddInterface",
            RuntimeFn::AddMethod => "AddMethod",
            RuntimeFn::AddField => "AddField",
            RuntimeFn::RegisterClass => "RegisterClass",
            RuntimeFn::FindClass => "FindClass",
            RuntimeFn::Throw => "Throw",
            RuntimeFn::ThrowIfExceptionOccurred => "ThrowIfExceptionOccurred",
            RuntimeFn::ThrowVerifyError => "ThrowVerifyError",
            RuntimeFn::ExceptionClear => "ExceptionClear",
            RuntimeFn::Personality => "Personality",
            RuntimeFn::AttachThreadFromCallback => "AttachThreadFromCallback",
            RuntimeFn::DetachThreadFromCallback => "DetachThreadFromCallback",
            RuntimeFn::NewObjectArray => "NewObjectArray",
            RuntimeFn::NewMultiArray => "NewMultiArray",
            RuntimeFn::NewString => "NewStringUtf8",
            RuntimeFn::Allocate => "Allocate",
            RuntimeFn::ResolveNative => "ResolveNativeMethod",
            RuntimeFn::VirtualEntry => "VirtualEntry",
            RuntimeFn::InterfaceEntry => "InterfaceEntry",
            RuntimeFn::ClassObject => "ClassObject",
            RuntimeFn::Checkcast => "Checkcast",
            RuntimeFn::Instanceof => "Instanceof",
            RuntimeFn::MonitorEnter => "MonitorEnter",
            RuntimeFn::MonitorExit => "MonitorExit",
        };
        format!("_bc{}", name)
    }

    pub fn signature(&self) -> FunctionType {
        let env = Type::env_ptr;
        let class = Type::class_ptr;
        let object = Type::object_ptr;
        let s = Type::i8_ptr;
        let (ret, params) = match self {
            RuntimeFn::AllocateClass => (
                class(),
                vec![env(), s(), s(), Type::I32, Type::I32, Type::I32],
            ),
            RuntimeFn::AddInterface => (Type::Void, vec![env(), class(), s()]),
            RuntimeFn::AddMethod => (
                Type::Void,
                vec![env(), class(), s(), s(), Type::I32, s()],
            ),
            RuntimeFn::AddField => (
                Type::Void,
                vec![env(), class(), s(), s(), Type::I32, Type::I32],
            ),
            RuntimeFn::RegisterClass => (Type::Void, vec![env(), class()]),
            RuntimeFn::FindClass => (class(), vec![env(), s(), class()]),
            RuntimeFn::Throw => (Type::Void, vec![env(), object()]),
            RuntimeFn::ThrowIfExceptionOccurred => (Type::Void, vec![env()]),
            RuntimeFn::ThrowVerifyError => (Type::Void, vec![env(), s()]),
            RuntimeFn::ExceptionClear => (object(), vec![env()]),
            RuntimeFn::Personality => (
                Type::I32,
                vec![Type::I32, Type::I32, Type::I64, s(), s()],
            ),
            RuntimeFn::AttachThreadFromCallback => (env(), vec![]),
            RuntimeFn::DetachThreadFromCallback => (Type::Void, vec![env()]),
            RuntimeFn::MemCopy => (
                Type::Void,
                vec![s(), s(), Type::I64, Type::I32, Type::I1],
            ),
            RuntimeFn::NewArray(_) => (object(), vec![env(), Type::I32]),
            RuntimeFn::NewObjectArray => (object(), vec![env(), Type::I32, s(), class()]),
            RuntimeFn::NewMultiArray => (
                object(),
                vec![env(), Type::I32, Type::I32.ptr(), s(), class()],
            ),
            RuntimeFn::NewString => (object(), vec![env(), s()]),
            RuntimeFn::Allocate => (object(), vec![env(), class()]),
            RuntimeFn::ResolveCommon(_) => (Type::Void, vec![]),
            RuntimeFn::ResolveSite(kind) => (kind.cache_type(), vec![env(), s()]),
            RuntimeFn::ResolveNative => (s(), vec![env(), s()]),
            RuntimeFn::VirtualEntry => (s(), vec![env(), object(), Type::I32]),
            RuntimeFn::InterfaceEntry => (s(), vec![env(), object(), s()]),
            RuntimeFn::ClassObject => (object(), vec![env(), class()]),
            RuntimeFn::Checkcast => (object(), vec![env(), object(), class()]),
            RuntimeFn::Instanceof => (Type::I32, vec![env(), object(), class()]),
            RuntimeFn::MonitorEnter | RuntimeFn::MonitorExit => {
                (Type::Void, vec![env(), object()])
            }
        };
        FunctionType::new(ret, params)
    }

    pub fn function_ref(&self) -> FunctionRef {
        FunctionRef::new(self.symbol(), self.signature())
    }

    /// Declare the service in `module` (once) and return a reference to it
    pub fn declare(&self, module: &mut Module) -> FunctionRef {
        let fref = self.function_ref();
        module.declare(&fref);
        fref
    }
}
