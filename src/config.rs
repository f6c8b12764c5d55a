//! Configuration for the versioning engine
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (versioning.toml)
//! - Environment variables (VERSIONING__*)
//!
//! ## Example config file (versioning.toml):
//! ```toml
//! [lifecycle]
//! duplicate_marks = "keep-first"
//!
//! [dependencies]
//! check_shapes_on_declare = true
//!
//! [projection]
//! name = "v"
//!
//! [diagnostics]
//! suggestions = true
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// Main configuration for a versioning context
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersioningConfig {
    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    #[serde(default)]
    pub dependencies: DependencyConfig,

    #[serde(default)]
    pub projection: ProjectionConfig,

    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

/// What to do when an element receives a second added/removed/madeOptional mark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicateMarkPolicy {
    #[default]
    KeepFirst,
    Replace,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LifecycleConfig {
    #[serde(default)]
    pub duplicate_marks: DuplicateMarkPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyConfig {
    /// Reject a dependency whose shape disagrees with an already declared axis
    #[serde(default = "default_true")]
    pub check_shapes_on_declare: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionConfig {
    /// Projection name carried by every emitted instruction
    #[serde(default = "default_projection_name")]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Attach "did you mean" hints to version-not-found diagnostics
    #[serde(default = "default_true")]
    pub suggestions: bool,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_projection_name() -> String {
    "v".to_string()
}

impl Default for DependencyConfig {
    fn default() -> Self {
        Self {
            check_shapes_on_declare: true,
        }
    }
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            name: default_projection_name(),
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self { suggestions: true }
    }
}

impl VersioningConfig {
    /// Load configuration from default locations
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, adding a required file on top of the defaults
    pub fn load_from(config_path: Option<&str>) -> std::result::Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = [
            "versioning.toml",
            ".versioning.toml",
            "config/versioning.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "versioning") {
            let xdg_config = config_dir.config_dir().join("versioning.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("VERSIONING")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
