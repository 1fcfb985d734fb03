//! Callback signature classification
//!
//! Each parameter and the return value of a callback is classified once,
//! at compile time, into a plan that says how the thunk converts it. The
//! table is evaluated in order:
//!
//! | managed type        | annotations         | converter native | plan                |
//! |---------------------|---------------------|------------------|---------------------|
//! | `long`              | pointer             | -                | raw pointer         |
//! | primitive           | -                   | -                | pass through        |
//! | reference           | -                   | none             | error               |
//! | reference           | by_val              | struct           | struct by value     |
//! | reference           | by_val              | not a struct     | error               |
//! | reference           | -                   | struct or ptr    | object (by address) |
//! | reference           | -                   | scalar, enum     | enum                |
//! | reference           | -                   | scalar           | value               |
//!
//! A by-value struct return becomes a small integer when the target returns
//! aggregates of its size in registers and a hidden `sret` pointer
//! otherwise.

use super::{Converter, MarshalerRegistry, NativeType};
use crate::class::{ClassDescriptor, MethodDescriptor, ValueAnnotations};
use crate::descriptor::{JavaType, MethodSig};
use crate::error::{CompileError, CompileResult, MarshalPosition};
use crate::ir::{FunctionType, Type};
use crate::target::Target;

/// How a native argument becomes a managed one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgPlan<'r> {
    Pass,
    /// Native address handed to a `long` parameter
    RawPointer,
    Value(&'r Converter),
    Enum(&'r Converter),
    /// Object built from native memory. By-value structs are spilled to a
    /// stack slot so the converter gets an address.
    Object {
        converter: &'r Converter,
        by_value: bool,
    },
}

impl<'r> ArgPlan<'r> {
    /// The native parameter type
    pub fn native_type(&self, managed: &JavaType) -> Type {
        match self {
            ArgPlan::Pass => managed.ir_type(),
            ArgPlan::RawPointer => Type::i8_ptr(),
            ArgPlan::Value(c) | ArgPlan::Enum(c) => c.native.ir_type(),
            ArgPlan::Object { converter, by_value } => {
                if *by_value {
                    converter.native.ir_type()
                } else {
                    Type::i8_ptr()
                }
            }
        }
    }

    /// The converter whose `updateNative` runs after the call, if any
    pub fn update_converter(&self) -> Option<&'r Converter> {
        match self {
            ArgPlan::Object { converter, .. } if converter.update_native => Some(converter),
            _ => None,
        }
    }
}

/// How a managed result becomes a native one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnPlan<'r> {
    Void,
    Pass,
    RawPointer,
    Value(&'r Converter),
    Enum(&'r Converter),
    /// Address of native memory
    Object(&'r Converter),
    /// By-value struct returned in a register of `width`
    SmallStruct { converter: &'r Converter, width: Type },
    /// By-value struct copied into the caller's `sret` slot
    LargeStruct {
        converter: &'r Converter,
        ty: Type,
        size: u64,
    },
}

impl<'r> ReturnPlan<'r> {
    /// The native return type
    pub fn native_type(&self, managed: &JavaType) -> Type {
        match self {
            ReturnPlan::Void | ReturnPlan::LargeStruct { .. } => Type::Void,
            ReturnPlan::Pass => managed.ir_type(),
            ReturnPlan::RawPointer | ReturnPlan::Object(_) => Type::i8_ptr(),
            ReturnPlan::Value(c) | ReturnPlan::Enum(c) => c.native.ir_type(),
            ReturnPlan::SmallStruct { width, .. } => width.clone(),
        }
    }

    /// Whether converting the result calls into managed code
    pub fn converts(&self) -> bool {
        !matches!(
            self,
            ReturnPlan::Void | ReturnPlan::Pass | ReturnPlan::RawPointer
        )
    }
}

/// The classified signature of a callback thunk
#[derive(Debug, Clone)]
pub struct CallbackPlan<'r> {
    pub sig: MethodSig,
    pub args: Vec<ArgPlan<'r>>,
    pub ret: ReturnPlan<'r>,
    /// Signature the native side calls
    pub native: FunctionType,
}

impl<'r> CallbackPlan<'r> {
    /// Whether the native signature starts with a hidden result pointer
    pub fn has_sret(&self) -> bool {
        matches!(self.ret, ReturnPlan::LargeStruct { .. })
    }

    /// Native parameter index of managed parameter `i`
    pub fn native_index(&self, i: usize) -> usize {
        i + self.has_sret() as usize
    }
}

/// Human-readable method name used in errors
pub fn display_name(class: &ClassDescriptor, method: &MethodDescriptor) -> String {
    format!("{}.{}{}", class.name, method.name, method.desc)
}

/// Reject callback methods that cannot have a native entry point
pub fn validate_callback(class: &ClassDescriptor, method: &MethodDescriptor) -> CompileResult<()> {
    if !method.is_static() {
        return Err(CompileError::CallbackNotStatic {
            method: display_name(class, method),
        });
    }
    Ok(())
}

/// Classify every parameter and the return value of a callback
pub fn classify_callback<'r>(
    class: &ClassDescriptor,
    method: &MethodDescriptor,
    target: &Target,
    registry: &'r MarshalerRegistry,
) -> CompileResult<CallbackPlan<'r>> {
    validate_callback(class, method)?;
    let sig = MethodSig::parse(&method.desc)?;
    let name = || display_name(class, method);

    let mut args = Vec::with_capacity(sig.params.len());
    for (i, param) in sig.params.iter().enumerate() {
        let annotations = method.annotations.param(i);
        args.push(classify_arg(param, &annotations, registry).map_err(|e| {
            e.into_error(name(), MarshalPosition::Parameter(i))
        })?);
    }
    let ret = classify_return(&sig.ret, &method.annotations.ret, target, registry)
        .map_err(|e| e.into_error(name(), MarshalPosition::Return))?;

    let mut params = Vec::with_capacity(args.len() + 1);
    if let ReturnPlan::LargeStruct { ty, .. } = &ret {
        params.push(ty.clone().ptr());
    }
    params.extend(args.iter().zip(&sig.params).map(|(a, t)| a.native_type(t)));
    let native = FunctionType::new(ret.native_type(&sig.ret), params);

    Ok(CallbackPlan {
        sig,
        args,
        ret,
        native,
    })
}

/// Classification failure, before the method and position are known
enum Unmarshalable {
    Missing,
    NotAStruct(String),
}

impl Unmarshalable {
    fn into_error(self, method: String, position: MarshalPosition) -> CompileError {
        match self {
            Unmarshalable::Missing => CompileError::MissingMarshaler { method, position },
            Unmarshalable::NotAStruct(class) => CompileError::UnknownStruct { class },
        }
    }
}

fn converter_for<'r>(
    ty: &JavaType,
    annotations: &ValueAnnotations,
    registry: &'r MarshalerRegistry,
) -> Result<&'r Converter, Unmarshalable> {
    let converter = registry
        .lookup(&ty.to_string(), annotations)
        .ok_or(Unmarshalable::Missing)?;
    if annotations.by_val && !converter.native.is_struct() {
        return Err(Unmarshalable::NotAStruct(ty.class_name()));
    }
    Ok(converter)
}

fn classify_arg<'r>(
    ty: &JavaType,
    annotations: &ValueAnnotations,
    registry: &'r MarshalerRegistry,
) -> Result<ArgPlan<'r>, Unmarshalable> {
    if annotations.pointer && *ty == JavaType::Long {
        return Ok(ArgPlan::RawPointer);
    }
    if ty.is_primitive() {
        return Ok(ArgPlan::Pass);
    }
    let converter = converter_for(ty, annotations, registry)?;
    Ok(match &converter.native {
        NativeType::Struct(_) | NativeType::Ptr => ArgPlan::Object {
            converter,
            by_value: annotations.by_val,
        },
        _ if converter.is_enum => ArgPlan::Enum(converter),
        _ => ArgPlan::Value(converter),
    })
}

fn classify_return<'r>(
    ty: &JavaType,
    annotations: &ValueAnnotations,
    target: &Target,
    registry: &'r MarshalerRegistry,
) -> Result<ReturnPlan<'r>, Unmarshalable> {
    if *ty == JavaType::Void {
        return Ok(ReturnPlan::Void);
    }
    if annotations.pointer && *ty == JavaType::Long {
        return Ok(ReturnPlan::RawPointer);
    }
    if ty.is_primitive() {
        return Ok(ReturnPlan::Pass);
    }
    let converter = converter_for(ty, annotations, registry)?;
    Ok(match &converter.native {
        NativeType::Struct(_) if annotations.by_val => {
            let struct_ty = converter.native.ir_type();
            let size = target.data_layout().alloc_size(&struct_ty);
            if target.returns_in_registers(size) {
                ReturnPlan::SmallStruct {
                    converter,
                    width: Type::int_covering(size),
                }
            } else {
                ReturnPlan::LargeStruct {
                    converter,
                    ty: struct_ty,
                    size,
                }
            }
        }
        NativeType::Struct(_) | NativeType::Ptr => ReturnPlan::Object(converter),
        _ if converter.is_enum => ReturnPlan::Enum(converter),
        _ => ReturnPlan::Value(converter),
    })
}
