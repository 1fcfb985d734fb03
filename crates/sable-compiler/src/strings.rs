//! String constants
//!
//! Interned per compiled class by exact byte content. Each distinct value is
//! one private constant global; every consumer references that global.

use crate::ir::{Global, Module, Type, Value};
use rustc_hash::FxHashMap;

/// Interned string constants of one class
#[derive(Debug, Default)]
pub struct StringPool {
    /// Global name by content
    globals: FxHashMap<Vec<u8>, String>,
}

impl StringPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// `i8*` to the NUL-terminated constant holding `s`, defining it on first use
    pub fn intern(&mut self, module: &mut Module, s: &str) -> Value {
        let bytes = s.as_bytes();
        let next = self.globals.len();
        let name = self
            .globals
            .entry(bytes.to_vec())
            .or_insert_with(|| format!("str.{}", next))
            .clone();

        let mut data = bytes.to_vec();
        data.push(0);
        let ty = Type::Array(data.len() as u64, Box::new(Type::I8));
        let address = module.add_global(Global::private(name, ty, Value::Bytes(data)).constant());
        Value::Bitcast(Box::new(address), Type::i8_ptr())
    }

    /// Global name of an interned value
    pub fn global_name(&self, s: &str) -> Option<&str> {
        self.globals.get(s.as_bytes()).map(|n| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.globals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.globals.is_empty()
    }
}
