//! Compiler configuration
//!
//! Loaded from TOML:
//!
//! ```toml
//! verify = "defer"
//!
//! [target]
//! arch = "arm64"
//! os = "ios"
//!
//! [[marshalers]]
//! type = "Lcom/example/Point;"
//! marshaler = "com/example/PointMarshaler"
//! native = { struct = ["i32", "i32"] }
//! update_native = true
//! ```

use crate::descriptor::JavaType;
use crate::error::{CompileError, CompileResult};
use crate::marshal::{Converter, MarshalerRegistry};
use crate::target::Target;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What to do with the class verifier's verdict
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyMode {
    /// Do not verify
    #[default]
    Skip,
    /// Fail compilation on a verify error
    Now,
    /// Compile a class constructor that raises the verify error at load time
    Defer,
}

impl std::str::FromStr for VerifyMode {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skip" => Ok(VerifyMode::Skip),
            "now" => Ok(VerifyMode::Now),
            "defer" => Ok(VerifyMode::Defer),
            _ => Err(CompileError::Config(format!("unknown verify mode '{}'", s))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub target: Target,
    pub verify: VerifyMode,
    pub marshalers: Vec<Converter>,
}

impl CompilerConfig {
    /// Parse a configuration from a file
    pub fn from_file(path: &Path) -> CompileResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> CompileResult<Self> {
        let config: CompilerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every marshaler entry names a managed type and a converter class
    pub fn validate(&self) -> CompileResult<()> {
        for entry in &self.marshalers {
            let ty = JavaType::parse(&entry.managed)
                .map_err(|_| CompileError::Config(format!("invalid marshaled type '{}'", entry.managed)))?;
            if entry.marshaler.is_empty() {
                return Err(CompileError::Config(format!(
                    "marshaler for '{}' has no class name",
                    entry.managed
                )));
            }
            if ty == JavaType::Void {
                return Err(CompileError::Config("'V' cannot be marshaled".to_string()));
            }
        }
        Ok(())
    }

    /// The converter registry. Entries for primitive types are kept but
    /// never consulted, since primitives pass through unconverted.
    pub fn marshaler_registry(&self) -> MarshalerRegistry {
        for entry in &self.marshalers {
            if JavaType::parse(&entry.managed).is_ok_and(|t| t.is_primitive()) {
                tracing::warn!(
                    ty = %entry.managed,
                    marshaler = %entry.marshaler,
                    "marshaler declared for a primitive type is ignored"
                );
            }
        }
        self.marshalers.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ValueAnnotations;
    use crate::marshal::NativeType;
    use crate::target::{Arch, Os};
    use std::io::Write;

    const CONFIG: &str = r#"
verify = "defer"

[target]
arch = "thumbv7"
os = "ios"

[[marshalers]]
type = "La/Point;"
marshaler = "a/PointMarshaler"
native = { struct = ["i32", "i32"] }
update_native = true

[[marshalers]]
type = "La/Mode;"
marshaler = "a/ModeMarshaler"
native = "i32"
enum = true
"#;

    #[test]
    fn test_parse_config() {
        let config = CompilerConfig::from_toml_str(CONFIG).unwrap();
        assert_eq!(config.target, Target::new(Arch::Thumbv7, Os::Ios));
        assert_eq!(config.verify, VerifyMode::Defer);
        assert_eq!(config.marshalers.len(), 2);
        assert_eq!(
            config.marshalers[0].native,
            NativeType::Struct(vec![NativeType::I32, NativeType::I32])
        );
        assert!(config.marshalers[0].update_native);
        assert!(config.marshalers[1].is_enum);
        assert!(!config.marshalers[1].update_native);

        let registry = config.marshaler_registry();
        assert!(registry.lookup("La/Mode;", &ValueAnnotations::default()).is_some());
    }

    #[test]
    fn test_defaults() {
        let config = CompilerConfig::from_toml_str("").unwrap();
        assert_eq!(config.target, Target::default());
        assert_eq!(config.verify, VerifyMode::Skip);
        assert!(config.marshalers.is_empty());
    }

    #[test]
    fn test_rejects_bad_entries() {
        let bad_type = r#"
[[marshalers]]
type = "Lnope"
marshaler = "a/M"
native = "ptr"
"#;
        assert!(matches!(
            CompilerConfig::from_toml_str(bad_type),
            Err(CompileError::Config(_))
        ));
        assert!(matches!(
            CompilerConfig::from_toml_str("verify = \"sometimes\""),
            Err(CompileError::Config(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();
        let config = CompilerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.verify, VerifyMode::Defer);

        let missing = CompilerConfig::from_file(Path::new("/nonexistent/sable.toml"));
        assert!(matches!(missing, Err(CompileError::Io(_))));
    }
}
