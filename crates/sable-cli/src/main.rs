//! Sable command-line driver
//!
//! Compiles JSON class descriptions to textual IR modules.

mod commands;
mod logging;

use clap::{Parser, Subcommand};
use commands::compile::CompileOptions;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sable")]
#[command(about = "Ahead-of-time class compiler", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level or filter directive (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a class description to an IR module
    Compile {
        /// Class description (JSON)
        file: PathBuf,
        /// Compiler configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Target as <arch>-<os>, e.g. arm64-ios
        #[arg(long)]
        target: Option<String>,
        /// Verification: skip, now or defer
        #[arg(long)]
        verify: Option<String>,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the references, strings and caught types of a class
    Scan {
        /// Class description (JSON)
        file: PathBuf,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    match cli.command {
        Commands::Compile {
            file,
            config,
            target,
            verify,
            output,
        } => {
            let options = CompileOptions {
                config,
                target,
                verify,
            };
            commands::compile::execute(file, options, output)
        }

        Commands::Scan { file, output } => commands::scan::execute(file, output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_compile() {
        let cli = Cli::try_parse_from([
            "sable", "compile", "A.json", "--target", "arm64-ios", "-o", "A.ll",
        ])
        .unwrap();
        match cli.command {
            Commands::Compile { target, output, .. } => {
                assert_eq!(target.as_deref(), Some("arm64-ios"));
                assert_eq!(output, Some(PathBuf::from("A.ll")));
            }
            _ => panic!("expected compile"),
        }
        assert_eq!(cli.log_level, "warn");
    }
}
