//! Type descriptors
//!
//! Parsing of field (`I`, `[J`, `Ljava/lang/String;`) and method
//! (`(IJ)V`) descriptors and their mapping onto IR types.

use crate::error::{CompileError, CompileResult};
use crate::ir::{FunctionType, Type};
use std::fmt;

/// Most array dimensions a descriptor may have
pub const MAX_ARRAY_DIMENSIONS: usize = 255;

/// A managed type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JavaType {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Void,
    /// Class type by internal name
    Object(String),
    /// Array of the element type
    Array(Box<JavaType>),
}

impl JavaType {
    /// Parse a complete field descriptor (or `V`)
    pub fn parse(desc: &str) -> CompileResult<JavaType> {
        match Self::parse_prefix(desc) {
            Some((ty, "")) => Ok(ty),
            _ => Err(invalid(desc)),
        }
    }

    /// Parse one type at the start of `s`, returning it and the rest
    fn parse_prefix(s: &str) -> Option<(JavaType, &str)> {
        let elem = s.trim_start_matches('[');
        let dims = s.len() - elem.len();
        if dims > MAX_ARRAY_DIMENSIONS {
            return None;
        }

        let mut chars = elem.chars();
        let (mut ty, rest) = match chars.next()? {
            'Z' => (JavaType::Boolean, chars.as_str()),
            'B' => (JavaType::Byte, chars.as_str()),
            'C' => (JavaType::Char, chars.as_str()),
            'S' => (JavaType::Short, chars.as_str()),
            'I' => (JavaType::Int, chars.as_str()),
            'J' => (JavaType::Long, chars.as_str()),
            'F' => (JavaType::Float, chars.as_str()),
            'D' => (JavaType::Double, chars.as_str()),
            'V' if dims == 0 => (JavaType::Void, chars.as_str()),
            'L' => {
                let end = elem.find(';')?;
                let name = &elem[1..end];
                if name.is_empty() {
                    return None;
                }
                (JavaType::Object(name.to_string()), &elem[end + 1..])
            }
            _ => return None,
        };
        for _ in 0..dims {
            ty = JavaType::Array(Box::new(ty));
        }
        Some((ty, rest))
    }

    /// Check for the eight primitive value types
    pub fn is_primitive(&self) -> bool {
        !matches!(
            self,
            JavaType::Void | JavaType::Object(_) | JavaType::Array(_)
        )
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, JavaType::Object(_) | JavaType::Array(_))
    }

    /// The IR type values of this type are carried in
    pub fn ir_type(&self) -> Type {
        match self {
            JavaType::Boolean | JavaType::Byte => Type::I8,
            JavaType::Char | JavaType::Short => Type::I16,
            JavaType::Int => Type::I32,
            JavaType::Long => Type::I64,
            JavaType::Float => Type::Float,
            JavaType::Double => Type::Double,
            JavaType::Void => Type::Void,
            JavaType::Object(_) | JavaType::Array(_) => Type::object_ptr(),
        }
    }

    /// Name the runtime uses to look the class up: the internal name for
    /// class types, the descriptor for arrays and primitives
    pub fn class_name(&self) -> String {
        match self {
            JavaType::Object(name) => name.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for JavaType {
    /// Renders the descriptor
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JavaType::Boolean => write!(f, "Z"),
            JavaType::Byte => write!(f, "B"),
            JavaType::Char => write!(f, "C"),
            JavaType::Short => write!(f, "S"),
            JavaType::Int => write!(f, "I"),
            JavaType::Long => write!(f, "J"),
            JavaType::Float => write!(f, "F"),
            JavaType::Double => write!(f, "D"),
            JavaType::Void => write!(f, "V"),
            JavaType::Object(name) => write!(f, "L{};", name),
            JavaType::Array(elem) => write!(f, "[{}", elem),
        }
    }
}

/// A parsed method descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSig {
    pub params: Vec<JavaType>,
    pub ret: JavaType,
}

impl MethodSig {
    pub fn parse(desc: &str) -> CompileResult<MethodSig> {
        let mut rest = desc.strip_prefix('(').ok_or_else(|| invalid(desc))?;
        let mut params = Vec::new();
        loop {
            if let Some(after) = rest.strip_prefix(')') {
                rest = after;
                break;
            }
            let (ty, after) = JavaType::parse_prefix(rest).ok_or_else(|| invalid(desc))?;
            if ty == JavaType::Void {
                return Err(invalid(desc));
            }
            params.push(ty);
            rest = after;
        }
        let ret = JavaType::parse(rest).map_err(|_| invalid(desc))?;
        Ok(MethodSig { params, ret })
    }

    /// The compiled function's signature: environment handle, receiver for
    /// instance methods, then the declared parameters
    pub fn function_type(&self, is_static: bool) -> FunctionType {
        let mut params = vec![Type::env_ptr()];
        if !is_static {
            params.push(Type::object_ptr());
        }
        params.extend(self.params.iter().map(JavaType::ir_type));
        FunctionType::new(self.ret.ir_type(), params)
    }

    /// Signature of a JNI-style native implementation: the receiver slot
    /// carries the class object for static methods
    pub fn native_function_type(&self) -> FunctionType {
        self.function_type(false)
    }

    /// The parameter part of the descriptor, without parentheses
    pub fn params_descriptor(&self) -> String {
        self.params.iter().map(|p| p.to_string()).collect()
    }
}

/// Element descriptor of a one-dimensional primitive array class name
/// (`[I` yields `I`)
pub fn primitive_array_element(name: &str) -> Option<char> {
    let mut chars = name.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some('['), Some(c), None) if "ZBCSIJFD".contains(c) => Some(c),
        _ => None,
    }
}

/// Array descriptor for an array whose element class is `class`
/// (`a/B` yields `[La/B;`, `[I` yields `[[I`)
pub fn array_of(class: &str) -> String {
    if class.starts_with('[') {
        format!("[{}", class)
    } else {
        format!("[L{};", class)
    }
}

fn invalid(desc: &str) -> CompileError {
    CompileError::InvalidDescriptor {
        descriptor: desc.to_string(),
    }
}
