//! Reference kinds
//!
//! The closed set of symbolic references a method body can make, and the
//! record layout each kind uses.

use crate::ir::{Type, Value};
use std::fmt;

/// Class references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassOp {
    New,
    Checkcast,
    Instanceof,
    LoadConstantClass,
}

/// Field accesses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldOp {
    GetStatic,
    PutStatic,
    GetField,
    PutField,
}

impl FieldOp {
    pub fn is_static(&self) -> bool {
        matches!(self, FieldOp::GetStatic | FieldOp::PutStatic)
    }

    pub fn is_put(&self) -> bool {
        matches!(self, FieldOp::PutStatic | FieldOp::PutField)
    }
}

/// Method invocations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvokeOp {
    Static,
    Virtual,
    Special,
    Interface,
}

/// Exact kind of a reference; sites are deduplicated per kind and key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    Class(ClassOp),
    Field(FieldOp),
    Invoke(InvokeOp),
}

/// Kinds sharing one Common record layout (and one Common per key)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommonFamily {
    ClassRes,
    StaticField,
    InstanceField,
    InvokeStatic,
    InvokeVirtual,
    InvokeSpecial,
    InvokeInterface,
}

impl CommonFamily {
    /// Name of the record type
    pub fn type_name(&self) -> &'static str {
        match self {
            CommonFamily::ClassRes => "ClassResCommon",
            CommonFamily::StaticField => "GetPutStaticCommon",
            CommonFamily::InstanceField => "GetPutFieldCommon",
            CommonFamily::InvokeStatic => "InvokeStaticCommon",
            CommonFamily::InvokeVirtual => "InvokeVirtualCommon",
            CommonFamily::InvokeSpecial => "InvokeSpecialCommon",
            CommonFamily::InvokeInterface => "InvokeInterfaceCommon",
        }
    }

    /// Record body. Field 0 is always the resolver identity; the rest is the
    /// lookup key plus the slot the resolver fills in.
    pub fn record_type(&self) -> Type {
        let s = Type::i8_ptr;
        match self {
            // {resolver, name, resolved class}
            CommonFamily::ClassRes => Type::Struct(vec![s(), s(), Type::class_ptr()]),
            // {resolver, address, owner, name, desc}
            CommonFamily::StaticField => Type::Struct(vec![s(), s(), s(), s(), s()]),
            // {resolver, offset, owner, name, desc}
            CommonFamily::InstanceField => Type::Struct(vec![s(), Type::I32, s(), s(), s()]),
            // {resolver, owner, name, desc, method, vtable index}
            CommonFamily::InvokeVirtual => {
                Type::Struct(vec![s(), s(), s(), s(), s(), Type::I32])
            }
            // {resolver, owner, name, desc, method}
            CommonFamily::InvokeStatic
            | CommonFamily::InvokeSpecial
            | CommonFamily::InvokeInterface => Type::Struct(vec![s(), s(), s(), s(), s()]),
        }
    }

    /// Initializer of the record for a key; `strings` are the pooled
    /// `i8*` constants of the key parts (one for classes, three otherwise)
    pub fn record_init(&self, ty: Type, resolver: Value, strings: Vec<Value>) -> Value {
        let null = || Value::null(Type::i8_ptr());
        let mut fields = vec![resolver];
        match self {
            CommonFamily::ClassRes => {
                fields.extend(strings);
                fields.push(Value::null(Type::class_ptr()));
            }
            CommonFamily::StaticField => {
                fields.push(null());
                fields.extend(strings);
            }
            CommonFamily::InstanceField => {
                fields.push(Value::i32(0));
                fields.extend(strings);
            }
            CommonFamily::InvokeVirtual => {
                fields.extend(strings);
                fields.push(null());
                fields.push(Value::i32(-1));
            }
            CommonFamily::InvokeStatic
            | CommonFamily::InvokeSpecial
            | CommonFamily::InvokeInterface => {
                fields.extend(strings);
                fields.push(null());
            }
        }
        Value::Struct { ty, fields }
    }
}

impl RefKind {
    pub fn family(&self) -> CommonFamily {
        match self {
            RefKind::Class(_) => CommonFamily::ClassRes,
            RefKind::Field(op) if op.is_static() => CommonFamily::StaticField,
            RefKind::Field(_) => CommonFamily::InstanceField,
            RefKind::Invoke(InvokeOp::Static) => CommonFamily::InvokeStatic,
            RefKind::Invoke(InvokeOp::Virtual) => CommonFamily::InvokeVirtual,
            RefKind::Invoke(InvokeOp::Special) => CommonFamily::InvokeSpecial,
            RefKind::Invoke(InvokeOp::Interface) => CommonFamily::InvokeInterface,
        }
    }

    /// Short name used in symbols
    pub fn name(&self) -> &'static str {
        match self {
            RefKind::Class(ClassOp::New) => "New",
            RefKind::Class(ClassOp::Checkcast) => "Checkcast",
            RefKind::Class(ClassOp::Instanceof) => "Instanceof",
            RefKind::Class(ClassOp::LoadConstantClass) => "LdcClass",
            RefKind::Field(FieldOp::GetStatic) => "GetStatic",
            RefKind::Field(FieldOp::PutStatic) => "PutStatic",
            RefKind::Field(FieldOp::GetField) => "GetField",
            RefKind::Field(FieldOp::PutField) => "PutField",
            RefKind::Invoke(InvokeOp::Static) => "InvokeStatic",
            RefKind::Invoke(InvokeOp::Virtual) => "InvokeVirtual",
            RefKind::Invoke(InvokeOp::Special) => "InvokeSpecial",
            RefKind::Invoke(InvokeOp::Interface) => "InvokeInterface",
        }
    }

    /// Name of the Site record type
    pub fn site_type_name(&self) -> String {
        match self {
            RefKind::Class(_) => format!("{}Res", self.name()),
            _ => self.name().to_string(),
        }
    }

    /// Type of the Site's cache cell
    pub fn cache_type(&self) -> Type {
        match self {
            RefKind::Class(_) => Type::class_ptr(),
            RefKind::Field(op) if op.is_static() => Type::i8_ptr(),
            RefKind::Field(_) => Type::I32,
            RefKind::Invoke(InvokeOp::Virtual) => Type::I32,
            RefKind::Invoke(_) => Type::i8_ptr(),
        }
    }

    /// Value of the cache cell while unresolved
    pub fn sentinel(&self) -> Value {
        match self.cache_type() {
            Type::I32 if *self == RefKind::Invoke(InvokeOp::Virtual) => Value::i32(-1),
            Type::I32 => Value::i32(0),
            ty => Value::null(ty),
        }
    }

    /// Site record body: {resolver, common, caller class cell, cache}
    pub fn site_type(&self) -> Type {
        Type::Struct(vec![
            Type::i8_ptr(),
            Type::named(self.family().type_name()).ptr(),
            Type::class_ptr().ptr(),
            self.cache_type(),
        ])
    }

    /// Runtime entry point that resolves a Site of this kind
    pub fn resolver_symbol(&self) -> String {
        let group = match self {
            RefKind::Class(_) => "Class",
            RefKind::Field(_) => "Field",
            RefKind::Invoke(_) => "Method",
        };
        format!("_bcResolve{}For{}", group, self.name())
    }

    /// Number of pooled strings forming the key (owner only for classes)
    pub fn key_arity(&self) -> usize {
        match self {
            RefKind::Class(_) => 1,
            _ => 3,
        }
    }
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One symbolic reference: kind plus `(owner, name, descriptor)` key.
/// Class references use the class name as owner and leave the rest empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    pub kind: RefKind,
    pub owner: String,
    pub name: String,
    pub desc: String,
}

impl Reference {
    pub fn class(op: ClassOp, class: impl Into<String>) -> Self {
        Self {
            kind: RefKind::Class(op),
            owner: class.into(),
            name: String::new(),
            desc: String::new(),
        }
    }

    pub fn member(
        kind: RefKind,
        owner: impl Into<String>,
        name: impl Into<String>,
        desc: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            owner: owner.into(),
            name: name.into(),
            desc: desc.into(),
        }
    }

    /// The lookup key shared by every kind of the same family
    pub fn key(&self) -> (CommonFamily, &str, &str, &str) {
        (self.kind.family(), &self.owner, &self.name, &self.desc)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            RefKind::Class(_) => write!(f, "{} {}", self.kind, self.owner),
            _ => write!(f, "{} {}.{}{}", self.kind, self.owner, self.name, self.desc),
        }
    }
}
