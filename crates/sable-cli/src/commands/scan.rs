//! `sable scan` - list what a class refers to

use sable_compiler::scan;
use serde_json::json;
use std::path::{Path, PathBuf};

/// Scan `file` and render the result as JSON
pub fn run(file: &Path) -> anyhow::Result<String> {
    let class = super::read_class(file)?;
    let result = scan(&class)?;
    let references: Vec<String> = result.references.iter().map(|r| r.to_string()).collect();
    let report = json!({
        "class": class.name,
        "references": references,
        "strings": result.strings,
        "throwables": result.throwables,
    });
    Ok(format!("{}\n", serde_json::to_string_pretty(&report)?))
}

pub fn execute(file: PathBuf, output: Option<PathBuf>) -> anyhow::Result<()> {
    let text = run(&file)?;
    super::emit(&text, output.as_deref())
}
