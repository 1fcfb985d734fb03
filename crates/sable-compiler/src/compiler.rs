//! Class compiler
//!
//! Drives the compilation of one class into one module:
//!
//! 1. optional verification;
//! 2. scan the class for references, strings and caught types;
//! 3. emit string constants, trampoline records and throwable cells;
//! 4. per method: the translated body or native thunk, the synchronized
//!    wrapper and the callback thunk where they apply;
//! 5. the class-constructor routine.

use crate::class::{ClassDescriptor, MethodDescriptor};
use crate::config::{CompilerConfig, VerifyMode};
use crate::context::{ClassContext, ExternalBodies, MethodContext, MethodTranslator};
use crate::error::{CompileError, CompileResult};
use crate::ir::{Function, Module};
use crate::marshal::{self, MarshalerRegistry};
use crate::metadata;
use crate::scan;
use crate::sync;
use crate::target::Target;
use crate::verify::{ClassVerifier, StructuralVerifier};

/// Compiles classes one at a time. Nothing emitted for one class is shared
/// with the next.
pub struct ClassCompiler {
    target: Target,
    verify: VerifyMode,
    marshalers: MarshalerRegistry,
    translator: Box<dyn MethodTranslator>,
    verifier: Box<dyn ClassVerifier>,
}

impl ClassCompiler {
    pub fn new(config: &CompilerConfig) -> Self {
        Self {
            target: config.target,
            verify: config.verify,
            marshalers: config.marshaler_registry(),
            translator: Box::new(ExternalBodies),
            verifier: Box::new(StructuralVerifier),
        }
    }

    /// Lower ordinary method bodies with `translator`
    pub fn with_translator(mut self, translator: impl MethodTranslator + 'static) -> Self {
        self.translator = Box::new(translator);
        self
    }

    pub fn with_verifier(mut self, verifier: impl ClassVerifier + 'static) -> Self {
        self.verifier = Box::new(verifier);
        self
    }

    pub fn target(&self) -> Target {
        self.target
    }

    /// Compile `class` into a fresh module
    pub fn compile(&mut self, class: &ClassDescriptor) -> CompileResult<Module> {
        let span = tracing::debug_span!("compile_class", class = %class.name);
        let _enter = span.enter();

        if self.verify != VerifyMode::Skip {
            if let Err(err) = self.verifier.verify(class) {
                if self.verify == VerifyMode::Now {
                    return Err(CompileError::Verify {
                        class: class.name.clone(),
                        message: err.to_string(),
                    });
                }
                tracing::debug!(error = %err, "deferring verify error to class load");
                let mut cx = ClassContext::new(class, self.target, &self.marshalers);
                metadata::emit_verify_error_constructor(&mut cx, &err.to_string());
                return Ok(cx.into_module());
            }
        }

        let scanned = scan::scan(class)?;
        let mut cx = ClassContext::new(class, self.target, &self.marshalers);

        for s in &scanned.strings {
            cx.string(s);
        }
        cx.class_cell();
        for reference in &scanned.references {
            cx.reference(reference)?;
        }
        for throwable in &scanned.throwables {
            cx.catch_class(throwable);
        }
        tracing::debug!(
            strings = cx.strings.len(),
            commons = cx.trampolines.common_count(),
            sites = cx.trampolines.site_count(),
            "emitted records"
        );

        for method in &class.methods {
            compile_method(self.translator.as_mut(), &mut cx, method)?;
        }

        metadata::emit_class_constructor(&mut cx, &scanned.throwables)?;
        let module = cx.into_module();
        tracing::debug!(
            functions = module.definitions().count(),
            globals = module.globals.len(),
            "compiled class"
        );
        Ok(module)
    }
}

fn compile_method<'a>(
    translator: &mut dyn MethodTranslator,
    cx: &mut ClassContext<'a>,
    method: &'a MethodDescriptor,
) -> CompileResult<()> {
    if method.is_abstract() {
        return Ok(());
    }

    if method.is_native() {
        metadata::compile_native_thunk(cx, method)?;
    } else {
        let body = {
            let mut mcx = MethodContext::new(cx, method);
            translator.translate(&mut mcx)?
        };
        check_translated(cx, method, &body)?;
        cx.module.add_function(body);
    }

    if method.is_synchronized() {
        sync::compile_synchronized(cx, method)?;
    }
    if method.is_callback() {
        marshal::compile_callback(cx, method)?;
    }
    tracing::trace!(method = %method.name, desc = %method.desc, "compiled method");
    Ok(())
}

/// A translated body must define the method's own symbol with its signature
fn check_translated(cx: &ClassContext<'_>, method: &MethodDescriptor, body: &Function) -> CompileResult<()> {
    let expected = cx.method_ref(method)?;
    let message = if body.name != expected.name {
        format!("produced @{} instead of @{}", body.name, expected.name)
    } else if body.ty != expected.ty {
        format!("produced type {} instead of {}", body.ty, expected.ty)
    } else if let Err(e) = body.validate() {
        e
    } else {
        return Ok(());
    };
    Err(CompileError::Translator {
        method: format!("{}.{}{}", cx.class.name, method.name, method.desc),
        message,
    })
}

impl Default for ClassCompiler {
    fn default() -> Self {
        Self::new(&CompilerConfig::default())
    }
}
