//! Schema Config CLI
//!
//! Shows, creates and checks the configuration used by `schema-validator`.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use subsystem_schemas::SchemaConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-config")]
#[command(about = "Inspect and create schema tool configuration")]
struct Cli {
    /// Configuration file (defaults to schemas.toml lookup)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective configuration
    Show {
        /// Print as TOML (default)
        #[arg(long, conflicts_with = "json")]
        toml: bool,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a configuration file with default values
    Init {
        /// Where to write it
        #[arg(short, long, default_value = "schemas.toml")]
        output: PathBuf,
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },

    /// Load the configuration and report unusable settings
    Validate,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Show { toml: _, json } => {
            let config = load(cli.config.as_deref())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                print!("{}", toml::to_string_pretty(&config)?);
            }
            Ok(())
        }

        Commands::Init { output, force } => {
            if output.exists() && !force {
                bail!("{} already exists (use --force to replace it)", output.display());
            }
            let path = output
                .to_str()
                .with_context(|| format!("{} is not valid UTF-8", output.display()))?;
            SchemaConfig::default()
                .save(path)
                .with_context(|| format!("failed to write {}", output.display()))?;
            info!(path = %output.display(), "wrote default configuration");
            println!("✅ Created {}", output.display());
            Ok(())
        }

        Commands::Validate => {
            let config = load(cli.config.as_deref())?;
            let problems = config.problems();
            if problems.is_empty() {
                println!("✅ Configuration is valid");
                return Ok(());
            }
            for problem in &problems {
                println!("❌ {}", problem);
            }
            bail!("{} configuration problem(s)", problems.len())
        }
    }
}

fn load(path: Option<&str>) -> anyhow::Result<SchemaConfig> {
    SchemaConfig::load_from(path).context("failed to load configuration")
}
