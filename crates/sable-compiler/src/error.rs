//! Compilation errors

use std::fmt;
use thiserror::Error;

pub type CompileResult<T> = Result<T, CompileError>;

/// Which part of a callback signature lacks a converter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarshalPosition {
    Return,
    /// Zero-based parameter index
    Parameter(usize),
}

impl fmt::Display for MarshalPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarshalPosition::Return => write!(f, "return type"),
            MarshalPosition::Parameter(i) => write!(f, "parameter {}", i + 1),
        }
    }
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("@Callback method {method} is not static")]
    CallbackNotStatic { method: String },

    #[error("No @Marshaler found for {position} of @Callback method {method}")]
    MissingMarshaler {
        method: String,
        position: MarshalPosition,
    },

    #[error("Invalid type descriptor: {descriptor}")]
    InvalidDescriptor { descriptor: String },

    #[error("No native layout registered for struct type {class}")]
    UnknownStruct { class: String },

    #[error("Failed to translate method {method}: {message}")]
    Translator { method: String, message: String },

    #[error("Verification of class {class} failed: {message}")]
    Verify { class: String, message: String },

    #[error("Invalid class description: {0}")]
    Input(#[from] serde_json::Error),

    #[error("Invalid compiler configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for CompileError {
    fn from(err: toml::de::Error) -> Self {
        CompileError::Config(err.to_string())
    }
}
