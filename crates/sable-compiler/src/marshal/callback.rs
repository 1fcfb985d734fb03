//! Callback thunks
//!
//! A static method annotated as a callback gets a function native code can
//! call directly. The thunk attaches the calling thread to the runtime,
//! converts its arguments, calls the managed method and converts the result
//! back. Converters that write back to native memory (`updateNative`) run
//! once after the call, on both the normal and the exceptional path, and the
//! thread is detached exactly once before the thunk returns or rethrows.
//!
//! A slot owing a write-back is cleared right before its `updateNative`
//! runs, so the write-back chain in the landing pads only finishes what the
//! normal path left undone. Each write-back that raises resumes the chain at
//! the next slot through its own landing pad.

use super::classify::{classify_callback, ArgPlan, ReturnPlan};
use super::{Converter, CALL_TYPE_CALLBACK};
use crate::class::MethodDescriptor;
use crate::context::ClassContext;
use crate::descriptor::JavaType;
use crate::error::CompileResult;
use crate::ir::{
    CastOp, Function, FunctionRef, IntPredicate, Label, Linkage, ParamAttr, Type, Value,
};
use crate::mangle;
use crate::runtime::RuntimeFn;
use crate::trampoline::InvokeOp;

const TO_OBJECT: &str = "toObject";
const TO_NATIVE: &str = "toNative";
const UPDATE_NATIVE: &str = "updateNative";

/// Stack slots remembering an object-converted argument for write-back
struct WriteBack<'r> {
    converter: &'r Converter,
    object: Value,
    handle: Value,
}

/// Emit the callback thunk for `method` and its `i8*` alias
pub fn compile_callback(cx: &mut ClassContext<'_>, method: &MethodDescriptor) -> CompileResult<FunctionRef> {
    let marshalers = cx.marshalers;
    let class = cx.class;
    let plan = classify_callback(class, method, &cx.target, marshalers)?;

    let target_symbol = if method.is_synchronized() {
        mangle::synchronized_symbol(&class.name, &method.name, &method.desc)
    } else {
        mangle::method_symbol(&class.name, &method.name, &method.desc)
    };
    let target = FunctionRef::new(target_symbol, plan.sig.function_type(true));
    cx.module.declare(&target);

    let name = mangle::callback_symbol(&class.name, &method.name, &method.desc);
    let names: &[&str] = if plan.has_sret() { &["sret"] } else { &[] };
    let mut func = Function::new(name, plan.native.clone(), names);
    if plan.has_sret() {
        func.set_param_attr(0, ParamAttr::StructRet);
    }
    func.personality = Some(cx.personality());

    let attach = cx.runtime(RuntimeFn::AttachThreadFromCallback);
    let detach = cx.runtime(RuntimeFn::DetachThreadFromCallback);
    let env = returned(func.call(&attach, vec![]), Type::env_ptr());

    // Write-back slots and the pending exception live in the entry block so
    // every landing pad sees them
    let mut write_backs = Vec::new();
    for arg in &plan.args {
        if let Some(converter) = arg.update_converter() {
            let object = func.alloca(Type::object_ptr());
            func.store(Value::null(Type::object_ptr()), object.clone());
            let handle = func.alloca(Type::I64);
            func.store(Value::i64(0), handle.clone());
            write_backs.push(WriteBack {
                converter,
                object,
                handle,
            });
        }
    }
    let pending = (!write_backs.is_empty()).then(|| {
        let cell = func.alloca(Type::object_ptr());
        func.store(Value::null(Type::object_ptr()), cell.clone());
        cell
    });

    let failure = func.new_block("failure");
    let failure_updated = plan.ret.converts().then(|| func.new_block("failure_updated"));
    let mut write_back_failed = Vec::with_capacity(write_backs.len());
    let mut steps = Vec::with_capacity(write_backs.len() + 1);
    if pending.is_some() {
        for _ in &write_backs {
            write_back_failed.push(func.new_block("write_back_failed"));
            steps.push(func.new_block("write_back"));
        }
        steps.push(func.new_block("rethrow"));
    }

    let mut args = vec![env.clone()];
    let mut slots = write_backs.iter();
    for (i, (arg, managed)) in plan.args.iter().zip(&plan.sig.params).enumerate() {
        let native = func.param(plan.native_index(i));
        let value = match *arg {
            ArgPlan::Pass => native,
            ArgPlan::RawPointer => func.cast(CastOp::Ptrtoint, native, Type::I64),
            ArgPlan::Value(converter) => {
                let class_object = cx.ldc_class(&mut func, &env, &managed.class_name(), Some(&failure))?;
                let desc = format!(
                    "(Ljava/lang/Class;{}J)Ljava/lang/Object;",
                    primitive_descriptor(converter)
                );
                let to_object = cx.invoke(InvokeOp::Static, &converter.marshaler, TO_OBJECT, &desc)?;
                invoke(&mut func, &to_object, vec![env.clone(), class_object, native, flags()], &failure)
            }
            ArgPlan::Enum(converter) => {
                let values = enum_values(cx, managed)?;
                let constants = invoke(&mut func, &values, vec![env.clone()], &failure);
                let desc = format!(
                    "([Ljava/lang/Enum;{}J)Ljava/lang/Enum;",
                    primitive_descriptor(converter)
                );
                let to_object = cx.invoke(InvokeOp::Static, &converter.marshaler, TO_OBJECT, &desc)?;
                invoke(&mut func, &to_object, vec![env.clone(), constants, native, flags()], &failure)
            }
            ArgPlan::Object { converter, by_value } => {
                let address = if by_value {
                    let copy = func.alloca(native.ty());
                    func.store(native, copy.clone());
                    func.bitcast(copy, Type::i8_ptr())
                } else {
                    native
                };
                let handle = func.cast(CastOp::Ptrtoint, address, Type::I64);
                let class_object = cx.ldc_class(&mut func, &env, &managed.class_name(), Some(&failure))?;
                let to_object = cx.invoke(
                    InvokeOp::Static,
                    &converter.marshaler,
                    TO_OBJECT,
                    "(Ljava/lang/Class;JJ)Ljava/lang/Object;",
                )?;
                let object = invoke(
                    &mut func,
                    &to_object,
                    vec![env.clone(), class_object, handle.clone(), flags()],
                    &failure,
                );
                if converter.update_native {
                    if let Some(slot) = slots.next() {
                        func.store(object.clone(), slot.object.clone());
                        func.store(handle, slot.handle.clone());
                    }
                }
                object
            }
        };
        args.push(value);
    }

    let result = func.invoke(&target, args, &failure);

    for (slot, unwind) in write_backs.iter().zip(&write_back_failed) {
        let update = update_native(cx, slot.converter)?;
        let object = func.load(slot.object.clone());
        func.store(Value::null(Type::object_ptr()), slot.object.clone());
        let handle = func.load(slot.handle.clone());
        func.invoke(&update, vec![env.clone(), object, handle, flags()], unwind);
    }
    let late = failure_updated.as_ref().unwrap_or(&failure);

    let managed_result = result
        .clone()
        .unwrap_or_else(|| Value::null(Type::object_ptr()));
    let native_result = match &plan.ret {
        ReturnPlan::Void => None,
        ReturnPlan::Pass => result,
        ReturnPlan::RawPointer => Some(func.cast(CastOp::Inttoptr, managed_result, Type::i8_ptr())),
        ReturnPlan::Value(converter) => {
            let desc = format!("(Ljava/lang/Object;J){}", primitive_descriptor(converter));
            let to_native = cx.invoke(InvokeOp::Static, &converter.marshaler, TO_NATIVE, &desc)?;
            Some(invoke(&mut func, &to_native, vec![env.clone(), managed_result, flags()], late))
        }
        ReturnPlan::Enum(converter) => {
            let desc = format!("(Ljava/lang/Enum;J){}", primitive_descriptor(converter));
            let to_native = cx.invoke(InvokeOp::Static, &converter.marshaler, TO_NATIVE, &desc)?;
            Some(invoke(&mut func, &to_native, vec![env.clone(), managed_result, flags()], late))
        }
        ReturnPlan::Object(converter) => {
            let handle = object_to_handle(cx, &mut func, converter, &env, managed_result, late)?;
            Some(func.cast(CastOp::Inttoptr, handle, Type::i8_ptr()))
        }
        ReturnPlan::SmallStruct { converter, width } => {
            let handle = object_to_handle(cx, &mut func, converter, &env, managed_result, late)?;
            let ptr = func.cast(CastOp::Inttoptr, handle, width.clone().ptr());
            Some(func.load(ptr))
        }
        ReturnPlan::LargeStruct { converter, size, .. } => {
            let handle = object_to_handle(cx, &mut func, converter, &env, managed_result, late)?;
            let src = func.cast(CastOp::Inttoptr, handle, Type::i8_ptr());
            let dest = func.bitcast(func.param(0), Type::i8_ptr());
            let memcpy = cx.runtime(RuntimeFn::MemCopy);
            func.call(
                &memcpy,
                vec![
                    dest,
                    src,
                    Value::i64(*size as i64),
                    Value::i32(0),
                    Value::bool(false),
                ],
            );
            None
        }
    };
    func.call(&detach, vec![env.clone()]);
    func.ret(native_result);

    let clear = cx.runtime(RuntimeFn::ExceptionClear);
    let throw = cx.runtime(RuntimeFn::Throw);

    func.switch_to(&failure);
    func.landing_pad();
    let exception = returned(func.call(&clear, vec![env.clone()]), Type::object_ptr());
    match &pending {
        Some(pending) => {
            func.store(exception, pending.clone());
            func.br(&steps[0]);
        }
        None => rethrow(&mut func, &detach, &throw, &env, exception),
    }

    if let Some(pending) = &pending {
        for (k, slot) in write_backs.iter().enumerate() {
            // A raising write-back replaces the pending exception
            func.switch_to(&write_back_failed[k]);
            func.landing_pad();
            let exception = returned(func.call(&clear, vec![env.clone()]), Type::object_ptr());
            func.store(exception, pending.clone());
            func.br(&steps[k + 1]);

            func.switch_to(&steps[k]);
            let update = update_native(cx, slot.converter)?;
            let object = func.load(slot.object.clone());
            let owed = func.icmp(IntPredicate::Ne, object.clone(), Value::null(Type::object_ptr()));
            let write_back = func.new_block("write_back_owed");
            func.cond_br(owed, &write_back, &steps[k + 1]);
            func.switch_to(&write_back);
            func.store(Value::null(Type::object_ptr()), slot.object.clone());
            let handle = func.load(slot.handle.clone());
            func.invoke(&update, vec![env.clone(), object, handle, flags()], &write_back_failed[k]);
            func.br(&steps[k + 1]);
        }
        func.switch_to(&steps[write_backs.len()]);
        let exception = func.load(pending.clone());
        rethrow(&mut func, &detach, &throw, &env, exception);
    }

    if let Some(failure_updated) = &failure_updated {
        func.switch_to(failure_updated);
        func.landing_pad();
        let exception = returned(func.call(&clear, vec![env.clone()]), Type::object_ptr());
        rethrow(&mut func, &detach, &throw, &env, exception);
    }

    let fref = cx.module.add_function(func);
    cx.module.add_alias(
        format!("{}_i8p", fref.name),
        Linkage::Private,
        fref.as_i8_ptr(),
    );
    tracing::debug!(
        method = %method.name,
        thunk = %fref.name,
        sret = plan.has_sret(),
        write_backs = write_backs.len(),
        "generated callback thunk"
    );
    Ok(fref)
}

fn flags() -> Value {
    Value::i64(CALL_TYPE_CALLBACK)
}

/// Managed descriptor of a scalar converter's native value
fn primitive_descriptor(converter: &Converter) -> char {
    // Value and enum plans are only built for scalar converters
    converter.native.descriptor_char().unwrap_or('J')
}

fn returned(value: Option<Value>, ty: Type) -> Value {
    value.unwrap_or(Value::Null(ty))
}

fn invoke(func: &mut Function, callee: &FunctionRef, args: Vec<Value>, unwind: &Label) -> Value {
    let ty = callee.ty.ret.clone();
    func.invoke(callee, args, unwind)
        .unwrap_or(Value::Zero(ty))
}

/// The enum's `values()` accessor
fn enum_values(cx: &mut ClassContext<'_>, managed: &JavaType) -> CompileResult<FunctionRef> {
    let name = managed.class_name();
    let desc = format!("()[L{};", name);
    cx.invoke(InvokeOp::Static, &name, "values", &desc)
}

fn update_native(cx: &mut ClassContext<'_>, converter: &Converter) -> CompileResult<FunctionRef> {
    cx.invoke(
        InvokeOp::Static,
        &converter.marshaler,
        UPDATE_NATIVE,
        "(Ljava/lang/Object;JJ)V",
    )
}

/// Convert a managed object to the address of its native form
fn object_to_handle(
    cx: &mut ClassContext<'_>,
    func: &mut Function,
    converter: &Converter,
    env: &Value,
    object: Value,
    unwind: &Label,
) -> CompileResult<Value> {
    let to_native = cx.invoke(
        InvokeOp::Static,
        &converter.marshaler,
        TO_NATIVE,
        "(Ljava/lang/Object;J)J",
    )?;
    Ok(invoke(func, &to_native, vec![env.clone(), object, flags()], unwind))
}

fn rethrow(func: &mut Function, detach: &FunctionRef, throw: &FunctionRef, env: &Value, exception: Value) {
    func.call(detach, vec![env.clone()]);
    func.call(throw, vec![env.clone(), exception]);
    func.unreachable();
}
