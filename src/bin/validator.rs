//! Schema Validator CLI
//!
//! Checks configuration documents against the registered schema versions and
//! migrates them to the current version.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use similar::TextDiff;
use subsystem_schemas::{Checksum, ParsingContext, SchemaConfig};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "schema-validator")]
#[command(about = "Validate and migrate versioned configuration documents")]
struct Cli {
    /// Configuration file (defaults to schemas.toml lookup)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every document kind and its schema versions
    Versions,

    /// Decode a document, or every document under a directory
    Check {
        /// File or directory to check
        path: PathBuf,
    },

    /// Rewrite a document in the current schema version
    Migrate {
        /// Document to migrate
        file: PathBuf,
        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print a unified diff between the input and the result
        #[arg(long)]
        diff: bool,
    },

    /// Print the decoded model as JSON
    Dump {
        /// Document to decode
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match SchemaConfig::load_from(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli, &config) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli, config: &SchemaConfig) -> anyhow::Result<()> {
    let context = ParsingContext::standard(config.write_options())
        .context("failed to build the parsing context")?;

    match cli.command {
        Commands::Versions => {
            for dispatcher in context.dispatchers() {
                println!("📦 {}", dispatcher.local_name());
                for version in dispatcher.registry().versions() {
                    let marker = if version == dispatcher.current() { " (current)" } else { "" };
                    println!("   {}{}", version.namespace_uri(), marker);
                }
            }
            Ok(())
        }

        Commands::Check { path } => {
            let files = collect_files(&path, config)?;
            if files.is_empty() {
                bail!("no matching files under {}", path.display());
            }

            let mut failures = 0usize;
            for file in &files {
                match context.read_path(file) {
                    Ok(decoded) => println!("✅ {} - {}", file.display(), decoded.version),
                    Err(e) => {
                        failures += 1;
                        println!("❌ {} - {}", file.display(), e);
                    }
                }
            }

            println!();
            if failures > 0 {
                println!("❌ {} of {} documents rejected", failures, files.len());
                std::process::exit(1);
            }
            println!("✅ {} documents accepted", files.len());
            Ok(())
        }

        Commands::Migrate { file, output, diff } => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let before = context
                .read(&raw)
                .with_context(|| format!("failed to decode {}", file.display()))?;
            let migrated = context.write(&before.version.local_name, &before.model)?;

            let after = context.read(&migrated).context("migrated document does not decode")?;
            let old_sum = Checksum::of_model(&before.model)?;
            let new_sum = Checksum::of_model(&after.model)?;
            debug!(from = %before.version, to = %after.version, "migrated document");

            if diff {
                let old_label = file.display().to_string();
                let new_label = format!("{} ({})", old_label, after.version);
                let text_diff = TextDiff::from_lines(raw.as_str(), migrated.as_str());
                print!(
                    "{}",
                    text_diff.unified_diff().context_radius(3).header(&old_label, &new_label)
                );
            }

            match output {
                Some(out) => {
                    fs::write(&out, &migrated)
                        .with_context(|| format!("failed to write {}", out.display()))?;
                    println!("✅ {} -> {} written to {}", before.version, after.version, out.display());
                }
                None if !diff => print!("{}", migrated),
                None => {}
            }

            if old_sum != new_sum {
                bail!("model changed during migration ({} != {})", old_sum.short(), new_sum.short());
            }
            Ok(())
        }

        Commands::Dump { file } => {
            let decoded = context
                .read_path(&file)
                .with_context(|| format!("failed to decode {}", file.display()))?;
            let json = if config.output.pretty {
                serde_json::to_string_pretty(&decoded.model)?
            } else {
                serde_json::to_string(&decoded.model)?
            };
            println!("{}", json);
            eprintln!("{} sha256:{}", decoded.version, Checksum::of_model(&decoded.model)?);
            Ok(())
        }
    }
}

/// A single file is always checked; directories are filtered by extension
fn collect_files(path: &Path, config: &SchemaConfig) -> anyhow::Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        bail!("{} does not exist", path.display());
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .follow_links(config.input.follow_links)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && config.accepts(e.path()))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    Ok(files)
}
