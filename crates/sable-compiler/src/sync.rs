//! Synchronized wrappers
//!
//! A synchronized method compiles to its plain body plus a wrapper that
//! holds the method's monitor around the call. The monitor is released on
//! the normal path and in the landing pad, so it is released once however
//! the body exits.

use crate::class::MethodDescriptor;
use crate::context::ClassContext;
use crate::error::CompileResult;
use crate::ir::{Function, FunctionRef, Type, Value};
use crate::mangle;
use crate::runtime::RuntimeFn;

/// Emit `<method>_synchronized` around the body of `method`
pub fn compile_synchronized(cx: &mut ClassContext<'_>, method: &MethodDescriptor) -> CompileResult<FunctionRef> {
    let body = cx.method_ref(method)?;
    cx.module.declare(&body);

    let name = mangle::synchronized_symbol(&cx.class.name, &method.name, &method.desc);
    let mut func = Function::new(name, body.ty.clone(), &["env"]);
    func.personality = Some(cx.personality());
    let env = func.param(0);

    let monitor = if method.is_static() {
        let cell = cx.class_cell();
        let class = func.load(cell);
        let class_object = cx.runtime(RuntimeFn::ClassObject);
        func.call(&class_object, vec![env.clone(), class])
            .unwrap_or_else(|| Value::null(Type::object_ptr()))
    } else {
        func.param(1)
    };

    let enter = cx.runtime(RuntimeFn::MonitorEnter);
    let exit = cx.runtime(RuntimeFn::MonitorExit);
    let rethrow = cx.runtime(RuntimeFn::ThrowIfExceptionOccurred);

    func.call(&enter, vec![env.clone(), monitor.clone()]);
    let failure = func.new_block("failure");
    let args = func.param_values();
    let result = func.invoke(&body, args, &failure);
    func.call(&exit, vec![env.clone(), monitor.clone()]);
    func.ret(result);

    func.switch_to(&failure);
    func.landing_pad();
    func.call(&exit, vec![env.clone(), monitor]);
    func.call(&rethrow, vec![env]);
    func.unreachable();

    Ok(cx.module.add_function(func))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{AccessFlags, ClassDescriptor};
    use crate::ir::PrettyPrint;
    use crate::marshal::MarshalerRegistry;
    use crate::target::Target;

    fn class(access: u16) -> ClassDescriptor {
        ClassDescriptor {
            name: "a/A".to_string(),
            super_name: Some("java/lang/Object".to_string()),
            interfaces: vec![],
            access: AccessFlags(AccessFlags::PUBLIC),
            fields: vec![],
            methods: vec![MethodDescriptor {
                name: "m".to_string(),
                desc: "(J)I".to_string(),
                access: AccessFlags(AccessFlags::SYNCHRONIZED | access),
                body: None,
                annotations: Default::default(),
            }],
        }
    }

    #[test]
    fn test_instance_wrapper_locks_receiver() {
        let class = class(AccessFlags::PUBLIC);
        let marshalers = MarshalerRegistry::default();
        let mut cx = ClassContext::new(&class, Target::default(), &marshalers);
        let fref = compile_synchronized(&mut cx, &class.methods[0]).unwrap();
        let func = cx.module.get_function(&fref.name).unwrap();

        assert!(func.validate().is_ok(), "{:?}", func.validate());
        assert_eq!(fref.ty.to_string(), "i32 (%Env*, %Object*, i64)");
        assert_eq!(func.call_count("_bcMonitorEnter"), 1);
        // normal exit and landing pad
        assert_eq!(func.call_count("_bcMonitorExit"), 2);
        assert_eq!(func.call_count("_bcClassObject"), 0);
        let text = func.pretty_print();
        assert!(text.contains("call void @_bcMonitorEnter(%Env* %env, %Object* %p1)"));
        assert!(text.contains("unwind label %failure"));
    }

    #[test]
    fn test_static_wrapper_locks_class_object() {
        let class = class(AccessFlags::STATIC);
        let marshalers = MarshalerRegistry::default();
        let mut cx = ClassContext::new(&class, Target::default(), &marshalers);
        let fref = compile_synchronized(&mut cx, &class.methods[0]).unwrap();
        let func = cx.module.get_function(&fref.name).unwrap();

        assert_eq!(func.call_count("_bcClassObject"), 1);
        assert_eq!(func.call_count("_bcThrowIfExceptionOccurred"), 1);
        assert!(cx.module.has_global("clazz"));
        assert!(cx
            .module
            .get_function(&mangle::method_symbol("a/A", "m", "(J)I"))
            .unwrap()
            .is_declaration());
    }
}
