// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Blueprint file loading with override support
//!
//! This module implements the 3-tier loading system:
//! 1. TOML file (base declarations)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{validate_blueprint, Blueprint, ConfigError, ConfigResult};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default blueprint file name searched for when no path is given.
pub const BLUEPRINT_FILE: &str = "connectogen_blueprint.toml";

/// Find the blueprint file
///
/// Search order:
/// 1. `CONNECTOGEN_BLUEPRINT_PATH` environment variable
/// 2. Current working directory: `./connectogen_blueprint.toml`
/// 3. Parent directories (searches up to 5 levels)
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no blueprint is found in any location
pub fn find_blueprint_file() -> ConfigResult<PathBuf> {
    // 1. Check environment variable first
    if let Ok(env_path) = env::var("CONNECTOGEN_BLUEPRINT_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        } else {
            return Err(ConfigError::FileNotFound(format!(
                "Blueprint specified by CONNECTOGEN_BLUEPRINT_PATH not found: {}",
                path.display()
            )));
        }
    }

    // 2. Search in common locations
    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(BLUEPRINT_FILE));

        let mut current = cwd.clone();
        for _ in 0..5 {
            if let Some(parent) = current.parent() {
                search_paths.push(parent.join(BLUEPRINT_FILE));
                current = parent.to_path_buf();
            }
        }
    }

    for path in &search_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "Blueprint file '{}' not found in any of these locations:\n{}\n\nSet CONNECTOGEN_BLUEPRINT_PATH environment variable to specify custom location.",
        BLUEPRINT_FILE, search_list
    )))
}

/// Load a blueprint from a TOML file
///
/// # Arguments
///
/// * `blueprint_path` - Optional path. If `None`, searches for the file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Returns
///
/// Complete, validated `Blueprint` with all overrides applied
///
/// # Errors
///
/// Returns an error if the file is not found, contains invalid TOML, or
/// fails validation
pub fn load_blueprint(
    blueprint_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<Blueprint> {
    let blueprint_file = if let Some(path) = blueprint_path {
        path.to_path_buf()
    } else {
        find_blueprint_file()?
    };

    let content = fs::read_to_string(&blueprint_file)?;
    let mut blueprint: Blueprint = toml::from_str(&content)?;

    // Apply overrides in order
    apply_environment_overrides(&mut blueprint);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut blueprint, cli);
    }

    validate_blueprint(&blueprint)?;
    Ok(blueprint)
}

/// Apply environment variable overrides
///
/// Supported environment variables:
/// - `CONNECTOGEN_SEED` -> `simulation.seed`
pub fn apply_environment_overrides(blueprint: &mut Blueprint) {
    if let Ok(value) = env::var("CONNECTOGEN_SEED") {
        if let Ok(seed) = value.parse::<u64>() {
            blueprint.simulation.seed = Some(seed);
        }
    }
}

/// Apply CLI argument overrides
///
/// # Arguments
///
/// * `blueprint` - Blueprint to modify
/// * `cli_args` - HashMap of CLI arguments (e.g., `{"seed": "42"}`)
pub fn apply_cli_overrides(blueprint: &mut Blueprint, cli_args: &HashMap<String, String>) {
    if let Some(value) = cli_args.get("seed") {
        if let Ok(seed) = value.parse::<u64>() {
            blueprint.simulation.seed = Some(seed);
        }
    }
}
