//! Emission context
//!
//! [`ClassContext`] owns everything scoped to the compilation of one class:
//! the output module, the string pool and the trampoline registry.
//! [`MethodContext`] is what a [`MethodTranslator`] sees while it lowers one
//! method body; it hands out call targets for symbolic references so that
//! ordinary bodies share the same records as the generated thunks.

use crate::class::{ClassDescriptor, MethodDescriptor};
use crate::descriptor::{self, MethodSig};
use crate::error::CompileResult;
use crate::ir::{Function, FunctionRef, Global, Label, Module, Type, Value};
use crate::mangle;
use crate::marshal::MarshalerRegistry;
use crate::runtime::RuntimeFn;
use crate::strings::StringPool;
use crate::target::Target;
use crate::trampoline::kind::{ClassOp, FieldOp, InvokeOp, RefKind, Reference};
use crate::trampoline::{self, TrampolineRegistry};
use std::ops::{Deref, DerefMut};

/// Per-class emission state
pub struct ClassContext<'a> {
    pub class: &'a ClassDescriptor,
    pub target: Target,
    pub marshalers: &'a MarshalerRegistry,
    pub module: Module,
    pub strings: StringPool,
    pub trampolines: TrampolineRegistry,
}

impl<'a> ClassContext<'a> {
    pub fn new(class: &'a ClassDescriptor, target: Target, marshalers: &'a MarshalerRegistry) -> Self {
        let mut module = Module::new(class.name.clone());
        trampoline::define_handle_types(&mut module);
        Self {
            class,
            target,
            marshalers,
            module,
            strings: StringPool::new(),
            trampolines: TrampolineRegistry::new(),
        }
    }

    /// Pooled `i8*` constant for `s`
    pub fn string(&mut self, s: &str) -> Value {
        self.strings.intern(&mut self.module, s)
    }

    /// Declare a runtime service
    pub fn runtime(&mut self, f: RuntimeFn) -> FunctionRef {
        f.declare(&mut self.module)
    }

    /// The `%Class**` cell the class constructor fills in
    pub fn class_cell(&mut self) -> Value {
        trampoline::class_cell(&mut self.module)
    }

    /// The `%Class**` cell caching a caught throwable type
    pub fn catch_class(&mut self, name: &str) -> Value {
        self.module.add_global(Global::private(
            throwable_cell_name(name),
            Type::class_ptr(),
            Value::null(Type::class_ptr()),
        ))
    }

    /// Personality routine operand for functions with landing pads
    pub fn personality(&mut self) -> Value {
        self.runtime(RuntimeFn::Personality).as_i8_ptr()
    }

    /// Call target for a reference: a direct symbol where the target is
    /// statically bound, otherwise the Site stub
    pub fn reference(&mut self, reference: &Reference) -> CompileResult<FunctionRef> {
        if let RefKind::Invoke(op) = reference.kind {
            if let Some(direct) = self.direct_target(op, &reference.owner, &reference.name, &reference.desc)? {
                self.module.declare(&direct);
                return Ok(direct);
            }
        }
        self.trampolines
            .site(&mut self.module, &mut self.strings, reference)
    }

    pub fn invoke(&mut self, op: InvokeOp, owner: &str, name: &str, desc: &str) -> CompileResult<FunctionRef> {
        self.reference(&Reference::member(RefKind::Invoke(op), owner, name, desc))
    }

    pub fn field(&mut self, op: FieldOp, owner: &str, name: &str, desc: &str) -> CompileResult<FunctionRef> {
        self.reference(&Reference::member(RefKind::Field(op), owner, name, desc))
    }

    pub fn class_op(&mut self, op: ClassOp, class: &str) -> CompileResult<FunctionRef> {
        self.reference(&Reference::class(op, class))
    }

    /// Direct call target for an invocation, if it needs no lazy linking:
    /// constructors, and private, final or static methods of this class
    pub fn direct_target(
        &self,
        op: InvokeOp,
        owner: &str,
        name: &str,
        desc: &str,
    ) -> CompileResult<Option<FunctionRef>> {
        let sig = MethodSig::parse(desc)?;
        let is_static = op == InvokeOp::Static;
        let fn_type = sig.function_type(is_static);

        if owner != self.class.name {
            if name == "<init>" {
                return Ok(Some(FunctionRef::new(
                    mangle::method_symbol(owner, name, desc),
                    fn_type,
                )));
            }
            return Ok(None);
        }

        let Some(target) = self.class.find_method(name, desc) else {
            return Ok(None);
        };
        let statically_bound = target.is_constructor()
            || target.access.is_private()
            || target.access.is_final()
            || target.is_static();
        if !statically_bound {
            return Ok(None);
        }
        let symbol = if target.is_synchronized() {
            mangle::synchronized_symbol(owner, name, desc)
        } else {
            mangle::method_symbol(owner, name, desc)
        };
        Ok(Some(FunctionRef::new(symbol, fn_type)))
    }

    /// The class object (`%Object*`) for a class literal. Calls that may
    /// raise unwind to `unwind` when one is given.
    pub fn ldc_class(
        &mut self,
        func: &mut Function,
        env: &Value,
        name: &str,
        unwind: Option<&Label>,
    ) -> CompileResult<Value> {
        if let Some(elem) = descriptor::primitive_array_element(name) {
            let cell = self
                .module
                .add_global(Global::external(format!("array_{}", elem), Type::object_ptr()));
            return Ok(func.load(cell));
        }
        let (callee, args) = if name == self.class.name {
            let cell = self.class_cell();
            let class = func.load(cell);
            (self.runtime(RuntimeFn::ClassObject), vec![env.clone(), class])
        } else {
            (self.class_op(ClassOp::LoadConstantClass, name)?, vec![env.clone()])
        };
        Ok(func
            .call_or_invoke(&callee, args, unwind)
            .unwrap_or_else(|| Value::null(Type::object_ptr())))
    }

    /// Symbol and signature of the function a method of this class compiles to
    pub fn method_ref(&self, method: &MethodDescriptor) -> CompileResult<FunctionRef> {
        let sig = MethodSig::parse(&method.desc)?;
        Ok(FunctionRef::new(
            mangle::method_symbol(&self.class.name, &method.name, &method.desc),
            sig.function_type(method.is_static()),
        ))
    }

    /// Finish and hand out the module
    pub fn into_module(self) -> Module {
        self.module
    }
}

/// Name of the cell caching a throwable's class pointer
pub fn throwable_cell_name(name: &str) -> String {
    format!("{}_Class", mangle::mangle(name))
}

/// Context for lowering one method
pub struct MethodContext<'c, 'a> {
    cx: &'c mut ClassContext<'a>,
    pub method: &'a MethodDescriptor,
}

impl<'c, 'a> MethodContext<'c, 'a> {
    pub fn new(cx: &'c mut ClassContext<'a>, method: &'a MethodDescriptor) -> Self {
        Self { cx, method }
    }

    /// Symbol and signature of the function the method compiles to
    pub fn fn_ref(&self) -> CompileResult<FunctionRef> {
        self.cx.method_ref(self.method)
    }

    /// A fresh definition of this method's function, ready to be filled in
    pub fn new_function(&self) -> CompileResult<Function> {
        let fref = self.fn_ref()?;
        Ok(Function::new(fref.name, fref.ty, &["env"]))
    }
}

impl<'c, 'a> Deref for MethodContext<'c, 'a> {
    type Target = ClassContext<'a>;

    fn deref(&self) -> &Self::Target {
        &*self.cx
    }
}

impl<'c, 'a> DerefMut for MethodContext<'c, 'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.cx
    }
}

/// Lowers ordinary method bodies
pub trait MethodTranslator {
    fn translate(&mut self, cx: &mut MethodContext<'_, '_>) -> CompileResult<Function>;
}

/// Leaves ordinary bodies to a separate lowering step: every method with a
/// body becomes an external declaration that the class constructor and the
/// generated thunks link against
#[derive(Debug, Default, Clone, Copy)]
pub struct ExternalBodies;

impl MethodTranslator for ExternalBodies {
    fn translate(&mut self, cx: &mut MethodContext<'_, '_>) -> CompileResult<Function> {
        Ok(Function::declaration(&cx.fn_ref()?))
    }
}
