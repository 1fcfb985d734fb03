pub mod compile;
pub mod scan;

use anyhow::Context;
use sable_compiler::ClassDescriptor;
use std::path::Path;

/// Read and parse a class description
pub fn read_class(path: &Path) -> anyhow::Result<ClassDescriptor> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    ClassDescriptor::from_json(&json).with_context(|| format!("failed to parse {}", path.display()))
}

/// Write `text` to `output`, or stdout when there is none
pub fn emit(text: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            print!("{}", text);
            Ok(())
        }
    }
}
