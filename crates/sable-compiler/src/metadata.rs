//! Class metadata
//!
//! Field layouts, the class-constructor routine that builds and registers
//! the runtime class, and the thunks standing in for native methods.

use crate::class::{FieldDescriptor, MethodDescriptor};
use crate::context::ClassContext;
use crate::descriptor::{JavaType, MethodSig};
use crate::error::CompileResult;
use crate::ir::{Function, FunctionRef, FunctionType, Global, IntPredicate, Type, Value};
use crate::mangle;
use crate::runtime::RuntimeFn;
use crate::target::DataLayout;
use crate::trampoline::stub::resolve_once;

/// Record type of a native method's resolution cell
pub const NATIVE_RECORD: &str = "InvokeNative";

/// One slot per field, in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    pub ty: Type,
    pub offsets: Vec<u64>,
    pub size: u64,
}

impl FieldLayout {
    pub fn new<'f>(
        fields: impl IntoIterator<Item = &'f FieldDescriptor>,
        layout: &DataLayout,
    ) -> CompileResult<Self> {
        let types = fields
            .into_iter()
            .map(|f| JavaType::parse(&f.desc).map(|t| t.ir_type()))
            .collect::<CompileResult<Vec<_>>>()?;
        let offsets = layout.field_offsets(&types);
        let ty = Type::Struct(types);
        let size = layout.alloc_size(&ty);
        Ok(Self { ty, offsets, size })
    }
}

fn constructor_type() -> FunctionType {
    FunctionType::new(Type::class_ptr(), vec![Type::env_ptr()])
}

/// Target of a method's `AddMethod` entry: nothing for abstract methods,
/// the wrapper for synchronized ones, the body (or native thunk) otherwise
fn method_entry(cx: &mut ClassContext<'_>, method: &MethodDescriptor) -> CompileResult<Value> {
    if method.is_abstract() {
        return Ok(Value::null(Type::i8_ptr()));
    }
    let body = cx.method_ref(method)?;
    let entry = if method.is_synchronized() {
        FunctionRef::new(
            mangle::synchronized_symbol(&cx.class.name, &method.name, &method.desc),
            body.ty,
        )
    } else {
        body
    };
    cx.module.declare(&entry);
    Ok(entry.as_i8_ptr())
}

/// Emit the class-constructor routine `ClassInit_<class>`.
///
/// Allocates the class, adds interfaces, methods and fields, caches every
/// caught throwable type and registers the class. Every step that can raise
/// unwinds to one landing pad; the routine then returns null and the class
/// is never registered.
pub fn emit_class_constructor(cx: &mut ClassContext<'_>, throwables: &[String]) -> CompileResult<FunctionRef> {
    let class = cx.class;
    let layout = cx.target.data_layout();
    let statics = FieldLayout::new(class.class_fields(), &layout)?;
    let instance = FieldLayout::new(class.instance_fields(), &layout)?;
    cx.module.add_type("ClassFields", Some(statics.ty.clone()));
    cx.module.add_type("InstanceFields", Some(instance.ty.clone()));

    let mut func = Function::new(mangle::class_init_symbol(&class.name), constructor_type(), &["env"]);
    func.personality = Some(cx.personality());
    let env = func.param(0);
    let null_class = Value::null(Type::class_ptr());

    let catch_all = func.new_block("catch_all");
    let failed = func.new_block("failed");
    let populate = func.new_block("populate");

    let name = cx.string(&class.name);
    let super_name = match class.runtime_super_name() {
        Some(s) => cx.string(s),
        None => Value::null(Type::i8_ptr()),
    };
    let allocate = cx.runtime(RuntimeFn::AllocateClass);
    let clazz = func
        .invoke(
            &allocate,
            vec![
                env.clone(),
                name,
                super_name,
                Value::i32(class.access.0 as i64),
                Value::i32(statics.size as i64),
                Value::i32(instance.size as i64),
            ],
            &catch_all,
        )
        .unwrap_or_else(|| null_class.clone());
    let allocation_failed = func.icmp(IntPredicate::Eq, clazz.clone(), null_class.clone());
    func.cond_br(allocation_failed, &failed, &populate);

    func.switch_to(&populate);
    let add_interface = cx.runtime(RuntimeFn::AddInterface);
    for interface in &class.interfaces {
        let name = cx.string(interface);
        func.invoke(&add_interface, vec![env.clone(), clazz.clone(), name], &catch_all);
    }

    let add_method = cx.runtime(RuntimeFn::AddMethod);
    for method in &class.methods {
        let name = cx.string(&method.name);
        let desc = cx.string(&method.desc);
        let entry = method_entry(cx, method)?;
        func.invoke(
            &add_method,
            vec![
                env.clone(),
                clazz.clone(),
                name,
                desc,
                Value::i32(method.access.0 as i64),
                entry,
            ],
            &catch_all,
        );
    }

    let add_field = cx.runtime(RuntimeFn::AddField);
    let (mut next_static, mut next_instance) = (statics.offsets.iter(), instance.offsets.iter());
    for field in &class.fields {
        let offset = if field.access.is_static() {
            next_static.next()
        } else {
            next_instance.next()
        };
        let name = cx.string(&field.name);
        let desc = cx.string(&field.desc);
        func.invoke(
            &add_field,
            vec![
                env.clone(),
                clazz.clone(),
                name,
                desc,
                Value::i32(field.access.0 as i64),
                Value::i32(offset.copied().unwrap_or(0) as i64),
            ],
            &catch_all,
        );
    }

    let find_class = cx.runtime(RuntimeFn::FindClass);
    for throwable in throwables {
        let name = cx.string(throwable);
        let cell = cx.catch_class(throwable);
        let found = func
            .invoke(&find_class, vec![env.clone(), name, clazz.clone()], &catch_all)
            .unwrap_or_else(|| null_class.clone());
        func.store(found, cell);
    }

    let register = cx.runtime(RuntimeFn::RegisterClass);
    func.invoke(&register, vec![env.clone(), clazz.clone()], &catch_all);
    let cell = cx.class_cell();
    func.store(clazz.clone(), cell);
    func.ret(Some(clazz));

    func.switch_to(&failed);
    func.ret(Some(null_class.clone()));

    func.switch_to(&catch_all);
    func.landing_pad();
    func.ret(Some(null_class));

    tracing::debug!(
        class = %class.name,
        static_size = statics.size,
        instance_size = instance.size,
        methods = class.methods.len(),
        fields = class.fields.len(),
        "emitted class constructor"
    );
    Ok(cx.module.add_function(func))
}

/// Emit a class constructor that raises `VerifyError(message)` instead of
/// building the class
pub fn emit_verify_error_constructor(cx: &mut ClassContext<'_>, message: &str) -> FunctionRef {
    let mut func = Function::new(mangle::class_init_symbol(&cx.class.name), constructor_type(), &["env"]);
    func.personality = Some(cx.personality());
    let env = func.param(0);
    let failed = func.new_block("failed");

    let message = cx.string(message);
    let throw = cx.runtime(RuntimeFn::ThrowVerifyError);
    func.invoke(&throw, vec![env, message], &failed);
    func.ret(Some(Value::null(Type::class_ptr())));

    func.switch_to(&failed);
    func.landing_pad();
    func.ret(Some(Value::null(Type::class_ptr())));

    cx.module.add_function(func)
}

/// Emit the body of a native method: resolve the native symbol once, then
/// forward the environment, the receiver (or class object) and all
/// arguments, and rethrow anything the native code left pending
pub fn compile_native_thunk(cx: &mut ClassContext<'_>, method: &MethodDescriptor) -> CompileResult<FunctionRef> {
    let owner = cx.class.name.clone();
    let sig = MethodSig::parse(&method.desc)?;
    let fref = cx.method_ref(method)?;

    let record_ty = cx.module.add_type(
        NATIVE_RECORD,
        Some(Type::Struct(vec![Type::i8_ptr(); 4])),
    );
    let resolver = cx.runtime(RuntimeFn::ResolveNative);
    let short_name = cx.string(&mangle::native_short_name(&owner, &method.name));
    let long_name = cx.string(&mangle::native_long_name(&owner, &method.name, &method.desc)?);
    let init = Value::Struct {
        ty: record_ty.clone(),
        fields: vec![
            resolver.as_i8_ptr(),
            Value::null(Type::i8_ptr()),
            short_name,
            long_name,
        ],
    };
    let record = cx.module.add_global(Global::private(
        format!("{}_{}", NATIVE_RECORD, fref.name),
        record_ty,
        init,
    ));

    let mut func = Function::new(fref.name.clone(), fref.ty.clone(), &["env"]);
    let env = func.param(0);
    let cell = func.field_ptr(record.clone(), 1, Type::i8_ptr());
    let key = Value::Bitcast(Box::new(record), Type::i8_ptr());
    let resolved = resolve_once(
        &mut func,
        &mut cx.module,
        &env,
        cell,
        Value::null(Type::i8_ptr()),
        &resolver,
        key,
    );
    let native = func.bitcast(resolved, sig.native_function_type().ptr());

    let receiver = if method.is_static() {
        let class_cell = cx.class_cell();
        let class = func.load(class_cell);
        let class_object = cx.runtime(RuntimeFn::ClassObject);
        func.call(&class_object, vec![env.clone(), class])
            .unwrap_or_else(|| Value::null(Type::object_ptr()))
    } else {
        func.param(1)
    };
    let first_arg = if method.is_static() { 1 } else { 2 };
    let mut args = vec![env.clone(), receiver];
    args.extend((first_arg..func.params.len()).map(|i| func.param(i)));
    let result = func.call_value(native, args);

    let rethrow = cx.runtime(RuntimeFn::ThrowIfExceptionOccurred);
    func.call(&rethrow, vec![env]);
    func.ret(result);

    Ok(cx.module.add_function(func))
}
