//! Configuration for the command-line tools
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (schemas.toml)
//! - Environment variables (SCHEMAS__*)
//!
//! ## Example config file (schemas.toml):
//! ```toml
//! [output]
//! indent = 4
//! declaration = true
//! pretty = true
//!
//! [input]
//! extensions = ["xml"]
//! follow_links = false
//!
//! [logging]
//! level = "info"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::xml::WriteOptions;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// How encoded documents and JSON dumps are formatted
    #[serde(default)]
    pub output: OutputConfig,

    /// Which files are picked up when checking a directory
    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Spaces per nesting level in written XML, 0 for a single line
    #[serde(default = "default_indent")]
    pub indent: usize,

    /// Write an XML declaration before the root element
    #[serde(default)]
    pub declaration: bool,

    /// Pretty-print JSON model dumps
    #[serde(default = "default_true")]
    pub pretty: bool,
}

/// Input configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// File extensions scanned inside directories
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Follow symbolic links while walking directories
    #[serde(default)]
    pub follow_links: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when RUST_LOG is unset
    #[serde(default = "default_level")]
    pub level: String,
}

// Default value functions
fn default_indent() -> usize {
    4
}

fn default_true() -> bool {
    true
}

fn default_extensions() -> Vec<String> {
    vec!["xml".to_string()]
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            indent: default_indent(),
            declaration: false,
            pretty: true,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            follow_links: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl SchemaConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = ["schemas.toml", ".schemas.toml", "config/schemas.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("org", "jboss", "subsystem-schemas") {
            let xdg_config = config_dir.config_dir().join("schemas.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (SCHEMAS__OUTPUT__INDENT=2)
        builder = builder.add_source(
            Environment::with_prefix("SCHEMAS")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Writer settings for encoded documents
    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            indent: self.output.indent,
            declaration: self.output.declaration,
        }
    }

    /// Whether a file should be checked when found inside a directory
    pub fn accepts(&self, path: &std::path::Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map_or(false, |ext| {
                self.input.extensions.iter().any(|wanted| wanted.eq_ignore_ascii_case(ext))
            })
    }

    /// Settings that load but cannot be used
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.output.indent > 16 {
            problems.push(format!("output.indent {} is larger than 16", self.output.indent));
        }
        if self.input.extensions.is_empty() {
            problems.push("input.extensions is empty; directories would yield no files".to_string());
        }
        if let Some(bad) = self.input.extensions.iter().find(|e| e.is_empty() || e.starts_with('.')) {
            problems.push(format!("input.extensions entry '{}' must be a bare extension", bad));
        }
        if let Err(e) = EnvFilter::try_new(&self.logging.level) {
            problems.push(format!("logging.level '{}': {}", self.logging.level, e));
        }
        problems
    }
}
