//! IR Values
//!
//! Operands of instructions and initializers of globals.

use super::types::{FunctionType, Type};
use std::fmt;

/// A function-local SSA variable
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Var {
    pub name: String,
    pub ty: Type,
}

impl Var {
    /// Create a new variable
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    /// Use this variable as an operand
    pub fn value(&self) -> Value {
        Value::Local(self.clone())
    }
}

/// A basic block label
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label(pub String);

impl Label {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// A reference to a function symbol together with its signature
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionRef {
    pub name: String,
    pub ty: FunctionType,
}

impl FunctionRef {
    pub fn new(name: impl Into<String>, ty: FunctionType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    /// The function's address as a value
    pub fn value(&self) -> Value {
        Value::Global {
            name: self.name.clone(),
            ty: self.ty.ptr(),
        }
    }

    /// The function's address reinterpreted as `i8*`
    pub fn as_i8_ptr(&self) -> Value {
        Value::Bitcast(Box::new(self.value()), Type::i8_ptr())
    }
}

/// An instruction operand or global initializer
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Local variable (`%name`)
    Local(Var),
    /// Address of a global or function (`@name`); `ty` is the pointer type
    Global { name: String, ty: Type },
    /// Integer constant
    Int { ty: Type, value: i64 },
    /// Floating-point constant
    Float { ty: Type, value: f64 },
    /// Null pointer of the given pointer type
    Null(Type),
    /// Zero-initialized aggregate
    Zero(Type),
    /// Byte string including the trailing NUL (`c"..\00"`)
    Bytes(Vec<u8>),
    /// Literal structure constant
    Struct { ty: Type, fields: Vec<Value> },
    /// Constant pointer cast
    Bitcast(Box<Value>, Type),
}

impl Value {
    pub fn i8(value: i64) -> Value {
        Value::Int { ty: Type::I8, value }
    }

    pub fn i32(value: i64) -> Value {
        Value::Int { ty: Type::I32, value }
    }

    pub fn i64(value: i64) -> Value {
        Value::Int { ty: Type::I64, value }
    }

    pub fn bool(value: bool) -> Value {
        Value::Int {
            ty: Type::I1,
            value: value as i64,
        }
    }

    pub fn null(ty: Type) -> Value {
        Value::Null(ty)
    }

    /// Address of a global of type `value_ty`
    pub fn global(name: impl Into<String>, value_ty: Type) -> Value {
        Value::Global {
            name: name.into(),
            ty: value_ty.ptr(),
        }
    }

    /// The type of this value
    pub fn ty(&self) -> Type {
        match self {
            Value::Local(var) => var.ty.clone(),
            Value::Global { ty, .. } => ty.clone(),
            Value::Int { ty, .. } => ty.clone(),
            Value::Float { ty, .. } => ty.clone(),
            Value::Null(ty) => ty.clone(),
            Value::Zero(ty) => ty.clone(),
            Value::Bytes(bytes) => Type::Array(bytes.len() as u64, Box::new(Type::I8)),
            Value::Struct { ty, .. } => ty.clone(),
            Value::Bitcast(_, ty) => ty.clone(),
        }
    }

    /// Check if this value is a compile-time constant
    pub fn is_constant(&self) -> bool {
        !matches!(self, Value::Local(_))
    }

    /// Zero value of a scalar type, used for placeholder returns
    pub fn zero_of(ty: &Type) -> Option<Value> {
        match ty {
            Type::Void => None,
            Type::Float | Type::Double => Some(Value::Float {
                ty: ty.clone(),
                value: 0.0,
            }),
            Type::Ptr(_) => Some(Value::Null(ty.clone())),
            t if t.is_integer() => Some(Value::Int {
                ty: ty.clone(),
                value: 0,
            }),
            _ => Some(Value::Zero(ty.clone())),
        }
    }

    /// Render as `<type> <value>`
    pub fn typed(&self) -> String {
        format!("{} {}", self.ty(), self)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Local(var) => write!(f, "%{}", var.name),
            Value::Global { name, .. } => write!(f, "@{}", name),
            Value::Int { ty: Type::I1, value } => {
                write!(f, "{}", if *value != 0 { "true" } else { "false" })
            }
            Value::Int { value, .. } => write!(f, "{}", value),
            Value::Float { value, .. } => write!(f, "{:e}", value),
            Value::Null(_) => write!(f, "null"),
            Value::Zero(_) => write!(f, "zeroinitializer"),
            Value::Bytes(bytes) => {
                write!(f, "c\"")?;
                for &b in bytes {
                    if b.is_ascii_graphic() && b != b'"' && b != b'\\' || b == b' ' {
                        write!(f, "{}", b as char)?;
                    } else {
                        write!(f, "\\{:02X}", b)?;
                    }
                }
                write!(f, "\"")
            }
            Value::Struct { fields, .. } => {
                write!(f, "{{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", field.typed())?;
                }
                write!(f, "}}")
            }
            Value::Bitcast(inner, ty) => write!(f, "bitcast ({} to {})", inner.typed(), ty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_display_escapes() {
        let v = Value::Bytes(b"a\"b\0".to_vec());
        assert_eq!(v.to_string(), "c\"a\\22b\\00\"");
        assert_eq!(v.ty(), Type::Array(4, Box::new(Type::I8)));
    }

    #[test]
    fn test_struct_constant_display() {
        let v = Value::Struct {
            ty: Type::named("Rec"),
            fields: vec![Value::null(Type::i8_ptr()), Value::i32(0)],
        };
        assert_eq!(v.to_string(), "{i8* null, i32 0}");
    }

    #[test]
    fn test_function_ref_as_i8_ptr() {
        let f = FunctionRef::new("f", FunctionType::new(Type::Void, vec![Type::env_ptr()]));
        assert_eq!(f.as_i8_ptr().to_string(), "bitcast (void (%Env*)* @f to i8*)");
    }

    #[test]
    fn test_zero_of() {
        assert_eq!(Value::zero_of(&Type::Void), None);
        assert_eq!(Value::zero_of(&Type::I32), Some(Value::i32(0)));
        assert_eq!(
            Value::zero_of(&Type::object_ptr()),
            Some(Value::Null(Type::object_ptr()))
        );
    }
}
