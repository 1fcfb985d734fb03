//! IR Types
//!
//! Types of the low-level output module. Pointers are typed so that record
//! layouts and call signatures stay checkable before code generation.

use std::fmt;

/// A type in the output module
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// No value (function returns only)
    Void,
    /// 1-bit integer (comparison results)
    I1,
    /// 8-bit integer
    I8,
    /// 16-bit integer
    I16,
    /// 32-bit integer
    I32,
    /// 64-bit integer
    I64,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// Typed pointer
    Ptr(Box<Type>),
    /// Literal (anonymous) structure
    Struct(Vec<Type>),
    /// Reference to a named type definition (`%Name`)
    Named(String),
    /// Fixed-length array
    Array(u64, Box<Type>),
    /// Function type (only meaningful behind a pointer)
    Function(Box<FunctionType>),
}

impl Type {
    /// Pointer to this type
    pub fn ptr(self) -> Type {
        Type::Ptr(Box::new(self))
    }

    /// Reference to a named type
    pub fn named(name: impl Into<String>) -> Type {
        Type::Named(name.into())
    }

    /// `i8*`, the untyped address
    pub fn i8_ptr() -> Type {
        Type::I8.ptr()
    }

    /// `%Env*`, the per-thread runtime context handle
    pub fn env_ptr() -> Type {
        Type::named("Env").ptr()
    }

    /// `%Class*`, a runtime class handle
    pub fn class_ptr() -> Type {
        Type::named("Class").ptr()
    }

    /// `%Object*`, a managed object reference
    pub fn object_ptr() -> Type {
        Type::named("Object").ptr()
    }

    /// Pointee of a pointer type
    pub fn pointee(&self) -> Option<&Type> {
        match self {
            Type::Ptr(inner) => Some(inner),
            _ => None,
        }
    }

    /// Check if this is a pointer type
    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Ptr(_))
    }

    /// Check if this is an integer type
    pub fn is_integer(&self) -> bool {
        matches!(self, Type::I1 | Type::I8 | Type::I16 | Type::I32 | Type::I64)
    }

    /// Check if this is a scalar (integer, float or pointer)
    pub fn is_primitive(&self) -> bool {
        self.is_integer() || matches!(self, Type::Float | Type::Double | Type::Ptr(_))
    }

    /// Check if this is an aggregate (structure or array)
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Type::Struct(_) | Type::Array(..))
    }

    /// Smallest integer type covering `size` bytes (at most 8)
    pub fn int_covering(size: u64) -> Type {
        match size {
            0..=1 => Type::I8,
            2 => Type::I16,
            3..=4 => Type::I32,
            _ => Type::I64,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::I1 => write!(f, "i1"),
            Type::I8 => write!(f, "i8"),
            Type::I16 => write!(f, "i16"),
            Type::I32 => write!(f, "i32"),
            Type::I64 => write!(f, "i64"),
            Type::Float => write!(f, "float"),
            Type::Double => write!(f, "double"),
            Type::Ptr(inner) => write!(f, "{}*", inner),
            Type::Struct(fields) => {
                write!(f, "{{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", field)?;
                }
                write!(f, "}}")
            }
            Type::Named(name) => write!(f, "%{}", name),
            Type::Array(len, elem) => write!(f, "[{} x {}]", len, elem),
            Type::Function(ty) => write!(f, "{}", ty),
        }
    }
}

/// A function signature
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionType {
    /// Return type
    pub ret: Type,
    /// Parameter types
    pub params: Vec<Type>,
}

impl FunctionType {
    /// Create a new function type
    pub fn new(ret: Type, params: Vec<Type>) -> Self {
        Self { ret, params }
    }

    /// Pointer-to-function type
    pub fn ptr(&self) -> Type {
        Type::Function(Box::new(self.clone())).ptr()
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (", self.ret)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_display() {
        assert_eq!(Type::I32.to_string(), "i32");
        assert_eq!(Type::class_ptr().ptr().to_string(), "%Class**");
        assert_eq!(
            Type::Struct(vec![Type::i8_ptr(), Type::I32]).to_string(),
            "{i8*, i32}"
        );
        assert_eq!(Type::Array(4, Box::new(Type::I8)).to_string(), "[4 x i8]");
    }

    #[test]
    fn test_function_pointer_display() {
        let ty = FunctionType::new(Type::I32, vec![Type::env_ptr(), Type::I64]);
        assert_eq!(ty.ptr().to_string(), "i32 (%Env*, i64)*");
    }

    #[test]
    fn test_int_covering() {
        assert_eq!(Type::int_covering(1), Type::I8);
        assert_eq!(Type::int_covering(2), Type::I16);
        assert_eq!(Type::int_covering(3), Type::I32);
        assert_eq!(Type::int_covering(4), Type::I32);
        assert_eq!(Type::int_covering(6), Type::I64);
        assert_eq!(Type::int_covering(8), Type::I64);
    }
}
