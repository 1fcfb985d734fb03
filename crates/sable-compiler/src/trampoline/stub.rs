//! Site call-stubs
//!
//! Every Site gets a private function with the signature of the operation it
//! stands for. The stub reads the Site's cache cell and only calls into the
//! kind's resolver while the cell still holds its sentinel; afterwards the
//! cached pointer, offset or index is used directly.

use crate::descriptor::{JavaType, MethodSig};
use crate::error::CompileResult;
use crate::ir::{
    Function, FunctionRef, FunctionType, IntPredicate, Linkage, Module, Type, Value,
};
use crate::runtime::RuntimeFn;

use super::kind::{ClassOp, InvokeOp, RefKind, Reference};

/// Read a resolve-once cell, calling `resolver(env, record)` while it holds
/// `sentinel`. A resolver that still answers with the sentinel has raised
/// an exception; that path ends in the runtime's throw primitive.
pub(crate) fn resolve_once(
    func: &mut Function,
    module: &mut Module,
    env: &Value,
    cell: Value,
    sentinel: Value,
    resolver: &FunctionRef,
    record: Value,
) -> Value {
    let throw = RuntimeFn::ThrowIfExceptionOccurred.declare(module);

    let entry = func.current_label();
    let cached = func.load(cell);
    let unresolved = func.icmp(IntPredicate::Eq, cached.clone(), sentinel.clone());
    let resolve = func.new_block("resolve");
    let fail = func.new_block("link_failed");
    let resolved = func.new_block("resolved");
    func.cond_br(unresolved, &resolve, &resolved);

    func.switch_to(&resolve);
    let fresh = match func.call(resolver, vec![env.clone(), record]) {
        Some(v) => v,
        None => sentinel.clone(),
    };
    let failed = func.icmp(IntPredicate::Eq, fresh.clone(), sentinel);
    func.cond_br(failed, &fail, &resolved);

    func.switch_to(&fail);
    func.call(&throw, vec![env.clone()]);
    func.unreachable();

    func.switch_to(&resolved);
    let ty = cached.ty();
    func.phi(ty, vec![(cached, entry), (fresh, resolve)])
}

/// Signature of the stub for a reference
pub fn stub_type(reference: &Reference) -> CompileResult<FunctionType> {
    let env = Type::env_ptr();
    let object = Type::object_ptr();
    Ok(match reference.kind {
        RefKind::Invoke(op) => {
            MethodSig::parse(&reference.desc)?.function_type(op == InvokeOp::Static)
        }
        RefKind::Field(op) => {
            let ty = JavaType::parse(&reference.desc)?.ir_type();
            let mut params = vec![env];
            if !op.is_static() {
                params.push(object);
            }
            if op.is_put() {
                params.push(ty);
                FunctionType::new(Type::Void, params)
            } else {
                FunctionType::new(ty, params)
            }
        }
        RefKind::Class(ClassOp::New) | RefKind::Class(ClassOp::LoadConstantClass) => {
            FunctionType::new(object, vec![env])
        }
        RefKind::Class(ClassOp::Checkcast) => FunctionType::new(object.clone(), vec![env, object]),
        RefKind::Class(ClassOp::Instanceof) => FunctionType::new(Type::I32, vec![env, object]),
    })
}

/// Define the stub `name` for `reference` whose Site record lives at `site`
pub fn emit_stub(
    module: &mut Module,
    name: String,
    reference: &Reference,
    site: &Value,
) -> CompileResult<FunctionRef> {
    let ty = stub_type(reference)?;
    let kind = reference.kind;
    let mut func = Function::new(name, ty.clone(), &["env"]);
    func.linkage = Linkage::Private;
    let env = func.param(0);

    let resolver = RuntimeFn::ResolveSite(kind).declare(module);
    let cell = func.field_ptr(site.clone(), 3, kind.cache_type());
    let record = Value::Bitcast(Box::new(site.clone()), Type::i8_ptr());
    let resolved = resolve_once(&mut func, module, &env, cell, kind.sentinel(), &resolver, record);

    match kind {
        RefKind::Invoke(op) => {
            let entry = match op {
                InvokeOp::Static | InvokeOp::Special => resolved,
                InvokeOp::Virtual => {
                    let lookup = RuntimeFn::VirtualEntry.declare(module);
                    dispatch(&mut func, &lookup, &env, resolved)
                }
                InvokeOp::Interface => {
                    let lookup = RuntimeFn::InterfaceEntry.declare(module);
                    dispatch(&mut func, &lookup, &env, resolved)
                }
            };
            let target = func.bitcast(entry, ty.ptr());
            let args = func.param_values();
            let result = func.call_value(target, args);
            func.ret(result);
        }
        RefKind::Field(op) => {
            let field_ty = JavaType::parse(&reference.desc)?.ir_type();
            let address = if op.is_static() {
                resolved
            } else {
                let base = func.bitcast(func.param(1), Type::i8_ptr());
                func.byte_ptr(base, resolved)
            };
            let ptr = func.bitcast(address, field_ty.ptr());
            if op.is_put() {
                let value = func.param(func.params.len() - 1);
                func.store(value, ptr);
                func.ret(None);
            } else {
                let value = func.load(ptr);
                func.ret(Some(value));
            }
        }
        RefKind::Class(op) => {
            let (service, args) = match op {
                ClassOp::New => (RuntimeFn::Allocate, vec![env, resolved]),
                ClassOp::LoadConstantClass => (RuntimeFn::ClassObject, vec![env, resolved]),
                ClassOp::Checkcast => (RuntimeFn::Checkcast, vec![env, func.param(1), resolved]),
                ClassOp::Instanceof => (RuntimeFn::Instanceof, vec![env, func.param(1), resolved]),
            };
            let service = service.declare(module);
            let result = func.call(&service, args);
            func.ret(result);
        }
    }

    Ok(module.add_function(func))
}

/// Look up the receiver's implementation through a vtable index or an
/// interface method handle
fn dispatch(func: &mut Function, lookup: &FunctionRef, env: &Value, key: Value) -> Value {
    let receiver = func.param(1);
    func.call(lookup, vec![env.clone(), receiver, key])
        .unwrap_or_else(|| Value::null(Type::i8_ptr()))
}
