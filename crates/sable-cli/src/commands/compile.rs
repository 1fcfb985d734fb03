//! `sable compile` - compile a class description to an IR module

use anyhow::Context;
use sable_compiler::{ClassCompiler, CompilerConfig, PrettyPrint, Target, VerifyMode};
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct CompileOptions {
    /// TOML configuration file
    pub config: Option<PathBuf>,
    /// `<arch>-<os>`, overrides the configuration
    pub target: Option<String>,
    /// Verify mode, overrides the configuration
    pub verify: Option<String>,
}

impl CompileOptions {
    fn load_config(&self) -> anyhow::Result<CompilerConfig> {
        let mut config = match &self.config {
            Some(path) => CompilerConfig::from_file(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => CompilerConfig::default(),
        };
        if let Some(target) = &self.target {
            config.target = target.parse::<Target>()?;
        }
        if let Some(verify) = &self.verify {
            config.verify = verify.parse::<VerifyMode>()?;
        }
        Ok(config)
    }
}

/// Compile `file` and render the module as text
pub fn run(file: &Path, options: &CompileOptions) -> anyhow::Result<String> {
    let config = options.load_config()?;
    let class = super::read_class(file)?;
    tracing::info!(class = %class.name, target = %config.target, "compiling");

    let mut compiler = ClassCompiler::new(&config);
    let module = compiler
        .compile(&class)
        .with_context(|| format!("failed to compile {}", class.name))?;
    Ok(module.pretty_print())
}

pub fn execute(file: PathBuf, options: CompileOptions, output: Option<PathBuf>) -> anyhow::Result<()> {
    let text = run(&file, &options)?;
    super::emit(&text, output.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CLASS: &str = r#"{
        "name": "a/A",
        "super": "java/lang/Object",
        "access": 1,
        "fields": [{"name": "x", "desc": "I"}, {"name": "x", "desc": "I"}],
        "methods": [{"name": "m", "desc": "()V", "access": 9}]
    }"#;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_compile_prints_module() {
        let dir = TempDir::new().unwrap();
        let class = write(&dir, "A.json", CLASS);

        let text = run(&class, &CompileOptions::default()).unwrap();
        assert!(text.contains("@ClassInit_a_A"));
        assert!(text.contains("@clazz"));
    }

    #[test]
    fn test_output_file() {
        let dir = TempDir::new().unwrap();
        let class = write(&dir, "A.json", CLASS);
        let out = dir.path().join("A.ll");

        execute(class, CompileOptions::default(), Some(out.clone())).unwrap();
        let text = std::fs::read_to_string(out).unwrap();
        assert!(text.contains("@ClassInit_a_A"));
    }

    #[test]
    fn test_flags_override_config() {
        let dir = TempDir::new().unwrap();
        let class = write(&dir, "A.json", CLASS);
        let config = write(&dir, "sable.toml", "verify = \"skip\"\n");

        let options = CompileOptions {
            config: Some(config),
            verify: Some("now".to_string()),
            ..Default::default()
        };
        let err = run(&class, &options).unwrap_err();
        assert!(format!("{:#}", err).contains("Verification of class a/A failed"));
    }

    #[test]
    fn test_rejects_unknown_target() {
        let dir = TempDir::new().unwrap();
        let class = write(&dir, "A.json", CLASS);
        let options = CompileOptions {
            target: Some("sparc-solaris".to_string()),
            ..Default::default()
        };
        assert!(run(&class, &options).is_err());
    }

    #[test]
    fn test_missing_input() {
        let options = CompileOptions::default();
        let err = run(Path::new("/nonexistent/A.json"), &options).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
