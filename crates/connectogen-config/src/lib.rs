// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Connectogen Blueprint System
//!
//! Type-safe loader for connectome blueprints with support for:
//! - TOML file parsing
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! A blueprint declares the simulation settings (seed, volume), a table of
//! shared scalar values, and the ordered list of connection sections the
//! engine will run. Strategy parameters are kept as raw TOML tables here;
//! each strategy kind deserializes its own parameter struct at build time.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use connectogen_config::load_blueprint;
//!
//! let blueprint = load_blueprint(None, None).expect("Failed to load blueprint");
//! println!("Connections declared: {}", blueprint.connections.len());
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod loader;
pub mod types;
pub mod validation;

pub use loader::{
    apply_cli_overrides, apply_environment_overrides, find_blueprint_file, load_blueprint,
};
pub use types::*;
pub use validation::{validate_blueprint, BlueprintValidationError};

/// Re-export for convenience
pub use serde;

/// Blueprint error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Blueprint file not found. Searched: {0}")]
    FileNotFound(String),

    #[error("Failed to read blueprint file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax: {0}")]
    ParseError(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Result type for blueprint operations
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blueprint_types_compile() {
        // Smoke test to ensure types are properly defined
        let blueprint = Blueprint::default();
        assert!(blueprint.connections.is_empty());
    }
}
