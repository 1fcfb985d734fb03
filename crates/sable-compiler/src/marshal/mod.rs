//! Native interop bridge
//!
//! Converters (marshalers) translate between native values and managed
//! objects. A callback-annotated method gets a native-callable thunk that
//! converts its native arguments, calls the managed method and converts the
//! result back; see [`callback`].

pub mod callback;
pub mod classify;

use crate::class::ValueAnnotations;
use crate::ir::Type;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

pub use callback::compile_callback;
pub use classify::{classify_callback, ArgPlan, CallbackPlan, ReturnPlan};

/// Trailing flags argument of every converter call made from a callback
pub const CALL_TYPE_CALLBACK: i64 = 2;

/// Native shape of a converted value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NativeType {
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Ptr,
    /// Aggregate with the given member types
    Struct(Vec<NativeType>),
}

impl NativeType {
    pub fn ir_type(&self) -> Type {
        match self {
            NativeType::I8 => Type::I8,
            NativeType::I16 => Type::I16,
            NativeType::I32 => Type::I32,
            NativeType::I64 => Type::I64,
            NativeType::F32 => Type::Float,
            NativeType::F64 => Type::Double,
            NativeType::Ptr => Type::i8_ptr(),
            NativeType::Struct(fields) => Type::Struct(fields.iter().map(NativeType::ir_type).collect()),
        }
    }

    /// Descriptor of the managed primitive carrying this value, for
    /// primitive-shaped types
    pub fn descriptor_char(&self) -> Option<char> {
        Some(match self {
            NativeType::I8 => 'B',
            NativeType::I16 => 'S',
            NativeType::I32 => 'I',
            NativeType::I64 => 'J',
            NativeType::F32 => 'F',
            NativeType::F64 => 'D',
            NativeType::Ptr | NativeType::Struct(_) => return None,
        })
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, NativeType::Struct(_))
    }
}

/// A registered conversion between a managed type and a native value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Converter {
    /// Managed type descriptor, e.g. `Lcom/example/Point;`
    #[serde(rename = "type")]
    pub managed: String,
    /// Internal name of the class implementing the conversion
    pub marshaler: String,
    pub native: NativeType,
    #[serde(default, rename = "enum")]
    pub is_enum: bool,
    /// The marshaler writes managed-side changes back to native memory
    #[serde(default)]
    pub update_native: bool,
}

/// Converters by managed type
#[derive(Debug, Clone, Default)]
pub struct MarshalerRegistry {
    converters: Vec<Converter>,
    by_type: FxHashMap<String, Vec<usize>>,
}

impl MarshalerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, converter: Converter) {
        let index = self.converters.len();
        self.by_type
            .entry(converter.managed.clone())
            .or_default()
            .push(index);
        self.converters.push(converter);
    }

    /// Converter for a value of managed type `desc`. An explicit marshaler
    /// annotation selects among the candidates for the type; without one
    /// the first registered converter wins.
    pub fn lookup(&self, desc: &str, annotations: &ValueAnnotations) -> Option<&Converter> {
        let candidates = self.by_type.get(desc)?;
        let mut found = candidates.iter().map(|&i| &self.converters[i]);
        match &annotations.marshaler {
            Some(name) => found.find(|c| &c.marshaler == name),
            None => found.next(),
        }
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Converter> {
        self.converters.iter()
    }
}

impl FromIterator<Converter> for MarshalerRegistry {
    fn from_iter<I: IntoIterator<Item = Converter>>(iter: I) -> Self {
        let mut registry = Self::new();
        for converter in iter {
            registry.register(converter);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn converter(managed: &str, marshaler: &str) -> Converter {
        Converter {
            managed: managed.to_string(),
            marshaler: marshaler.to_string(),
            native: NativeType::Ptr,
            is_enum: false,
            update_native: false,
        }
    }

    #[test]
    fn test_lookup_prefers_annotated_marshaler() {
        let registry: MarshalerRegistry = vec![
            converter("La/P;", "a/PtrMarshaler"),
            converter("La/P;", "a/ValueMarshaler"),
        ]
        .into_iter()
        .collect();

        let plain = ValueAnnotations::default();
        assert_eq!(registry.lookup("La/P;", &plain).unwrap().marshaler, "a/PtrMarshaler");

        let explicit = ValueAnnotations {
            marshaler: Some("a/ValueMarshaler".to_string()),
            ..Default::default()
        };
        assert_eq!(registry.lookup("La/P;", &explicit).unwrap().marshaler, "a/ValueMarshaler");

        let unknown = ValueAnnotations {
            marshaler: Some("a/Other".to_string()),
            ..Default::default()
        };
        assert!(registry.lookup("La/P;", &unknown).is_none());
        assert!(registry.lookup("La/Q;", &plain).is_none());
    }

    #[test]
    fn test_native_type_from_json() {
        let t: NativeType = serde_json::from_str(r#"{"struct": ["i32", "f64"]}"#).unwrap();
        assert_eq!(t, NativeType::Struct(vec![NativeType::I32, NativeType::F64]));
        assert_eq!(t.ir_type().to_string(), "{i32, double}");
        assert_eq!(NativeType::F32.descriptor_char(), Some('F'));
        assert_eq!(NativeType::Ptr.descriptor_char(), None);
    }
}
