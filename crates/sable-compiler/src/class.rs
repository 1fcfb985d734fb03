//! Class descriptions
//!
//! The compiler consumes a class that an external loader has already parsed
//! (and, unless verification is skipped, can hand to a verifier). The model is
//! deserializable so the CLI and the tests can build classes from JSON.

use crate::error::CompileResult;
use serde::{Deserialize, Serialize};

/// Access and property flags of classes, fields and methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessFlags(pub u16);

impl AccessFlags {
    pub const PUBLIC: u16 = 0x0001;
    pub const PRIVATE: u16 = 0x0002;
    pub const PROTECTED: u16 = 0x0004;
    pub const STATIC: u16 = 0x0008;
    pub const FINAL: u16 = 0x0010;
    pub const SYNCHRONIZED: u16 = 0x0020;
    pub const NATIVE: u16 = 0x0100;
    pub const INTERFACE: u16 = 0x0200;
    pub const ABSTRACT: u16 = 0x0400;

    pub fn contains(&self, flag: u16) -> bool {
        self.0 & flag != 0
    }

    pub fn is_static(&self) -> bool {
        self.contains(Self::STATIC)
    }

    pub fn is_private(&self) -> bool {
        self.contains(Self::PRIVATE)
    }

    pub fn is_final(&self) -> bool {
        self.contains(Self::FINAL)
    }

    pub fn is_synchronized(&self) -> bool {
        self.contains(Self::SYNCHRONIZED)
    }

    pub fn is_native(&self) -> bool {
        self.contains(Self::NATIVE)
    }

    pub fn is_interface(&self) -> bool {
        self.contains(Self::INTERFACE)
    }

    pub fn is_abstract(&self) -> bool {
        self.contains(Self::ABSTRACT)
    }
}

/// A parsed class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDescriptor {
    /// Internal name, e.g. `com/example/Point`
    pub name: String,
    /// Internal name of the superclass; `None` for the root class
    #[serde(default, rename = "super")]
    pub super_name: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub access: AccessFlags,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    #[serde(default)]
    pub methods: Vec<MethodDescriptor>,
}

impl ClassDescriptor {
    /// Parse a class description from JSON
    pub fn from_json(json: &str) -> CompileResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Find a declared method by name and descriptor
    pub fn find_method(&self, name: &str, desc: &str) -> Option<&MethodDescriptor> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.desc == desc)
    }

    /// Static fields in declaration order
    pub fn class_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.access.is_static())
    }

    /// Instance fields in declaration order
    pub fn instance_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| !f.access.is_static())
    }

    /// Superclass name passed to the runtime (interfaces have none)
    pub fn runtime_super_name(&self) -> Option<&str> {
        if self.access.is_interface() {
            None
        } else {
            self.super_name.as_deref()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub desc: String,
    #[serde(default)]
    pub access: AccessFlags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub name: String,
    pub desc: String,
    #[serde(default)]
    pub access: AccessFlags,
    /// Instructions and exception table; absent for native and abstract methods
    #[serde(default)]
    pub body: Option<MethodBody>,
    #[serde(default)]
    pub annotations: MethodAnnotations,
}

impl MethodDescriptor {
    pub fn is_static(&self) -> bool {
        self.access.is_static()
    }

    pub fn is_native(&self) -> bool {
        self.access.is_native()
    }

    pub fn is_abstract(&self) -> bool {
        self.access.is_abstract()
    }

    pub fn is_synchronized(&self) -> bool {
        self.access.is_synchronized()
    }

    pub fn is_constructor(&self) -> bool {
        self.name == "<init>"
    }

    /// Marked as an entry point callable from native code
    pub fn is_callback(&self) -> bool {
        self.annotations.callback
    }

    /// Instructions, empty for bodiless methods
    pub fn instructions(&self) -> &[Insn] {
        self.body
            .as_ref()
            .map(|b| b.instructions.as_slice())
            .unwrap_or(&[])
    }

    /// Exception handlers, empty for bodiless methods
    pub fn handlers(&self) -> &[ExceptionHandler] {
        self.body
            .as_ref()
            .map(|b| b.handlers.as_slice())
            .unwrap_or(&[])
    }
}

/// Interop annotations of a method
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodAnnotations {
    #[serde(default)]
    pub callback: bool,
    #[serde(default, rename = "return")]
    pub ret: ValueAnnotations,
    /// Per-parameter annotations; missing trailing entries mean "none"
    #[serde(default)]
    pub params: Vec<ValueAnnotations>,
}

impl MethodAnnotations {
    pub fn param(&self, index: usize) -> ValueAnnotations {
        self.params.get(index).cloned().unwrap_or_default()
    }
}

/// Interop annotations of a parameter or return value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueAnnotations {
    /// Explicit converter class
    #[serde(default)]
    pub marshaler: Option<String>,
    /// A `long` carrying a raw native address
    #[serde(default)]
    pub pointer: bool,
    /// Struct passed or returned by value
    #[serde(default)]
    pub by_val: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodBody {
    #[serde(default)]
    pub instructions: Vec<Insn>,
    #[serde(default)]
    pub handlers: Vec<ExceptionHandler>,
}

/// One exception table entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionHandler {
    /// Caught class; `None` for catch-all (`finally`) handlers
    #[serde(default)]
    pub catch_type: Option<String>,
}

/// Owner, name and descriptor of a field or method operand
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberRef {
    pub owner: String,
    pub name: String,
    pub desc: String,
}

/// The instructions the compiler looks at; everything else is opaque
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Insn {
    New { class: String },
    /// Primitive array; `elem` is the element's descriptor character
    NewArray { elem: char },
    Checkcast { class: String },
    Instanceof { class: String },
    ANewArray { class: String },
    MultiANewArray { desc: String, dims: u8 },
    GetStatic(MemberRef),
    PutStatic(MemberRef),
    GetField(MemberRef),
    PutField(MemberRef),
    InvokeVirtual(MemberRef),
    InvokeSpecial(MemberRef),
    InvokeStatic(MemberRef),
    InvokeInterface(MemberRef),
    Ldc { value: Constant },
    #[serde(other)]
    Other,
}

/// Constant pool value loaded by `ldc`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Constant {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    /// Internal name or array descriptor
    Class(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_class_json() {
        let class = ClassDescriptor::from_json(
            r#"{
                "name": "a/B",
                "super": "java/lang/Object",
                "access": 33,
                "fields": [{"name": "x", "desc": "I", "access": 8}],
                "methods": [{
                    "name": "m",
                    "desc": "()V",
                    "body": {
                        "instructions": [
                            {"op": "getstatic", "owner": "a/C", "name": "y", "desc": "J"},
                            {"op": "ldc", "value": {"type": "string", "value": "hi"}},
                            {"op": "iadd"},
                            {"op": "newarray", "elem": "J"}
                        ],
                        "handlers": [{"catch_type": "java/io/IOException"}]
                    }
                }]
            }"#,
        )
        .unwrap();
        assert_eq!(class.super_name.as_deref(), Some("java/lang/Object"));
        assert_eq!(class.class_fields().count(), 1);
        let m = class.find_method("m", "()V").unwrap();
        assert_eq!(m.instructions().len(), 4);
        assert_eq!(m.instructions()[2], Insn::Other);
        assert_eq!(m.instructions()[3], Insn::NewArray { elem: 'J' });
        assert_eq!(
            m.instructions()[1],
            Insn::Ldc {
                value: Constant::String("hi".to_string())
            }
        );
        assert_eq!(m.handlers()[0].catch_type.as_deref(), Some("java/io/IOException"));
    }

    #[test]
    fn test_interface_has_no_runtime_super() {
        let class = ClassDescriptor {
            name: "a/I".to_string(),
            super_name: Some("java/lang/Object".to_string()),
            interfaces: vec![],
            access: AccessFlags(AccessFlags::INTERFACE | AccessFlags::ABSTRACT),
            fields: vec![],
            methods: vec![],
        };
        assert_eq!(class.runtime_super_name(), None);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(ClassDescriptor::from_json("{").is_err());
    }
}
