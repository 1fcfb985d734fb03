//! Symbol reference scanning
//!
//! Walks every method body and exception table of a class and collects the
//! distinct symbolic references, string constants and caught throwable types
//! the emitted module needs. Results keep first-seen order so output is
//! deterministic.

use crate::class::{ClassDescriptor, Constant, Insn};
use crate::descriptor;
use crate::error::CompileResult;
use crate::mangle;
use crate::trampoline::kind::{ClassOp, FieldOp, InvokeOp, RefKind, Reference};
use rustc_hash::FxHashSet;

/// Everything a class body refers to
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanResult {
    /// Distinct references by kind and key
    pub references: Vec<Reference>,
    /// Distinct strings
    pub strings: Vec<String>,
    /// Distinct caught class names
    pub throwables: Vec<String>,
}

#[derive(Default)]
struct Collector {
    result: ScanResult,
    seen_refs: FxHashSet<Reference>,
    seen_strings: FxHashSet<String>,
    seen_throwables: FxHashSet<String>,
}

impl Collector {
    fn string(&mut self, s: &str) {
        if self.seen_strings.insert(s.to_string()) {
            self.result.strings.push(s.to_string());
        }
    }

    fn reference(&mut self, r: Reference) {
        if self.seen_refs.insert(r.clone()) {
            self.result.references.push(r);
        }
    }

    fn member(&mut self, kind: RefKind, m: &crate::class::MemberRef) {
        self.string(&m.owner);
        self.string(&m.name);
        self.string(&m.desc);
        self.reference(Reference::member(kind, &m.owner, &m.name, &m.desc));
    }

    fn throwable(&mut self, name: &str) {
        self.string(name);
        if self.seen_throwables.insert(name.to_string()) {
            self.result.throwables.push(name.to_string());
        }
    }
}

/// Collect references, strings and throwables of `class`
pub fn scan(class: &ClassDescriptor) -> CompileResult<ScanResult> {
    let mut c = Collector::default();

    c.string(&class.name);
    if let Some(super_name) = &class.super_name {
        c.string(super_name);
    }
    for interface in &class.interfaces {
        c.string(interface);
    }
    for field in class.class_fields().chain(class.instance_fields()) {
        c.string(&field.name);
        c.string(&field.desc);
    }

    for method in &class.methods {
        c.string(&method.name);
        c.string(&method.desc);

        if method.is_native() {
            c.string(&mangle::native_short_name(&class.name, &method.name));
            c.string(&mangle::native_long_name(
                &class.name,
                &method.name,
                &method.desc,
            )?);
            continue;
        }

        for insn in method.instructions() {
            match insn {
                Insn::New { class: name } => {
                    c.string(name);
                    c.reference(Reference::class(ClassOp::New, name));
                }
                Insn::Checkcast { class: name } => {
                    c.string(name);
                    c.reference(Reference::class(ClassOp::Checkcast, name));
                }
                Insn::Instanceof { class: name } => {
                    c.string(name);
                    c.reference(Reference::class(ClassOp::Instanceof, name));
                }
                Insn::ANewArray { class: name } => {
                    c.string(name);
                    c.string(&descriptor::array_of(name));
                }
                Insn::MultiANewArray { desc, .. } => c.string(desc),
                Insn::GetStatic(m) => c.member(RefKind::Field(FieldOp::GetStatic), m),
                Insn::PutStatic(m) => c.member(RefKind::Field(FieldOp::PutStatic), m),
                Insn::GetField(m) => c.member(RefKind::Field(FieldOp::GetField), m),
                Insn::PutField(m) => c.member(RefKind::Field(FieldOp::PutField), m),
                Insn::InvokeStatic(m) => c.member(RefKind::Invoke(InvokeOp::Static), m),
                Insn::InvokeVirtual(m) => c.member(RefKind::Invoke(InvokeOp::Virtual), m),
                Insn::InvokeSpecial(m) => c.member(RefKind::Invoke(InvokeOp::Special), m),
                Insn::InvokeInterface(m) => c.member(RefKind::Invoke(InvokeOp::Interface), m),
                Insn::Ldc {
                    value: Constant::String(s),
                } => c.string(s),
                Insn::Ldc {
                    value: Constant::Class(name),
                } => {
                    c.string(name);
                    if name != &class.name && descriptor::primitive_array_element(name).is_none() {
                        c.reference(Reference::class(ClassOp::LoadConstantClass, name));
                    }
                }
                Insn::NewArray { .. } | Insn::Ldc { .. } | Insn::Other => {}
            }
        }

        for handler in method.handlers() {
            if let Some(catch_type) = &handler.catch_type {
                c.throwable(catch_type);
            }
        }
    }

    tracing::trace!(
        class = %class.name,
        references = c.result.references.len(),
        strings = c.result.strings.len(),
        throwables = c.result.throwables.len(),
        "scanned class"
    );
    Ok(c.result)
}
