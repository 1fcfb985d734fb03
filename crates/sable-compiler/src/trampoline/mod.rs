//! Lazy-linking trampolines
//!
//! Every symbolic reference a class makes is compiled to a pair of records
//! instead of a direct symbol:
//!
//! - one *Common* record per distinct `(family, owner, name, descriptor)` key,
//!   holding the lookup key and a slot the runtime fills in once;
//! - one *Site* record per exact reference kind, holding a pointer to its
//!   Common record, the calling class cell and a cache cell.
//!
//! Emitted code calls a per-Site stub that resolves through the runtime on
//! first use and uses the cached value afterwards.

pub mod kind;
pub mod stub;

use crate::error::CompileResult;
use crate::ir::{FunctionRef, Global, Module, Type, Value};
use crate::mangle::mangle;
use crate::runtime::RuntimeFn;
use crate::strings::StringPool;
use kind::{CommonFamily, RefKind, Reference};
use rustc_hash::FxHashMap;

pub use kind::{ClassOp, FieldOp, InvokeOp};

/// Name of the per-class singleton cell holding the registered class
pub const CLASS_CELL: &str = "clazz";

/// The per-class singleton cell (`%Class**`), defined on first use
pub fn class_cell(module: &mut Module) -> Value {
    module.add_global(Global::private(
        CLASS_CELL,
        Type::class_ptr(),
        Value::null(Type::class_ptr()),
    ))
}

/// Define the opaque runtime handle types
pub fn define_handle_types(module: &mut Module) {
    module.add_type("Env", None);
    module.add_type("Class", None);
    module.add_type("Object", None);
}

type CommonKey = (CommonFamily, String, String, String);

/// Deduplicating map from reference key to Common record, and from exact
/// reference to Site stub. Scoped to one compiled class.
#[derive(Debug, Default)]
pub struct TrampolineRegistry {
    commons: FxHashMap<CommonKey, Value>,
    sites: FxHashMap<Reference, FunctionRef>,
    order: Vec<Reference>,
}

impl TrampolineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stub for `reference`, emitting its Site (and, for a new key, its
    /// Common) record on first request
    pub fn site(
        &mut self,
        module: &mut Module,
        strings: &mut StringPool,
        reference: &Reference,
    ) -> CompileResult<FunctionRef> {
        if let Some(stub) = self.sites.get(reference) {
            return Ok(stub.clone());
        }

        let kind = reference.kind;
        let common = self.common(module, strings, reference);

        let symbol = format!("{}_{}", kind.name(), key_symbol(reference));
        let site_ty = module.add_type(&kind.site_type_name(), Some(kind.site_type()));
        let resolver = RuntimeFn::ResolveSite(kind).declare(module);
        let caller = class_cell(module);
        let init = Value::Struct {
            ty: site_ty.clone(),
            fields: vec![resolver.as_i8_ptr(), common, caller, kind.sentinel()],
        };
        let site = module.add_global(Global::private(format!("{}_Site", symbol), site_ty, init));

        let stub = stub::emit_stub(module, symbol, reference, &site)?;
        tracing::trace!(reference = %reference, stub = %stub.name, "emitted trampoline");

        self.sites.insert(reference.clone(), stub.clone());
        self.order.push(reference.clone());
        Ok(stub)
    }

    /// The Common record for the key of `reference`
    fn common(&mut self, module: &mut Module, strings: &mut StringPool, reference: &Reference) -> Value {
        let family = reference.kind.family();
        let key: CommonKey = (
            family,
            reference.owner.clone(),
            reference.name.clone(),
            reference.desc.clone(),
        );
        if let Some(address) = self.commons.get(&key) {
            return address.clone();
        }

        let ty = module.add_type(family.type_name(), Some(family.record_type()));
        let resolver = RuntimeFn::ResolveCommon(family).declare(module);
        let parts: Vec<&str> = match reference.kind {
            RefKind::Class(_) => vec![reference.owner.as_str()],
            _ => vec![
                reference.owner.as_str(),
                reference.name.as_str(),
                reference.desc.as_str(),
            ],
        };
        let key_strings = parts.iter().map(|s| strings.intern(module, s)).collect();
        let init = family.record_init(ty.clone(), resolver.as_i8_ptr(), key_strings);
        let name = format!("{}_{}", family.type_name(), key_symbol(reference));
        let address = module.add_global(Global::private(name, ty, init));

        self.commons.insert(key, address.clone());
        address
    }

    /// Number of Common records emitted
    pub fn common_count(&self) -> usize {
        self.commons.len()
    }

    /// Number of Site records emitted
    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    /// References with a Site, in emission order
    pub fn references(&self) -> &[Reference] {
        &self.order
    }

    /// Whether a Site exists for `reference`
    pub fn contains(&self, reference: &Reference) -> bool {
        self.sites.contains_key(reference)
    }
}

/// Symbol fragment for a reference key
fn key_symbol(reference: &Reference) -> String {
    match reference.kind {
        RefKind::Class(_) => mangle(&reference.owner),
        _ => format!(
            "{}_{}__{}",
            mangle(&reference.owner),
            mangle(&reference.name),
            mangle(&reference.desc)
        ),
    }
}
