// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Blueprint validation
//!
//! Structural checks that do not need the engine: name uniqueness, scalar
//! sanity, volume extents. Strategy parameter validation happens later, when
//! the engine builds each strategy against the populations it will run on.

use crate::{Blueprint, ConfigError, ConfigResult};
use std::collections::HashSet;

/// Validation errors that can occur during blueprint validation
#[derive(Debug, Clone)]
pub enum BlueprintValidationError {
    EmptyConnectionName { index: usize },
    DuplicateConnectionName { name: String },
    EmptyStrategyKind { connection: String },
    NonFiniteScalar { name: String, value: f64 },
    InvalidVolume { axis: &'static str, value: f64 },
}

impl std::fmt::Display for BlueprintValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyConnectionName { index } => {
                write!(f, "Connection #{} has an empty name", index)
            }
            Self::DuplicateConnectionName { name } => {
                write!(f, "Connection name '{}' is declared more than once", name)
            }
            Self::EmptyStrategyKind { connection } => {
                write!(f, "Connection '{}' does not name a strategy", connection)
            }
            Self::NonFiniteScalar { name, value } => {
                write!(f, "Scalar '{}' = {} is not finite", name, value)
            }
            Self::InvalidVolume { axis, value } => {
                write!(f, "Volume extent {} = {} must be positive", axis, value)
            }
        }
    }
}

/// Validate the complete blueprint
///
/// Checks for:
/// - Non-empty, unique connection names
/// - Non-empty strategy kinds
/// - Finite scalar values
/// - Positive volume extents
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` with details if validation fails
pub fn validate_blueprint(blueprint: &Blueprint) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_connections(blueprint, &mut errors);
    validate_scalars(blueprint, &mut errors);
    validate_volume(blueprint, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Blueprint validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn validate_connections(blueprint: &Blueprint, errors: &mut Vec<BlueprintValidationError>) {
    let mut seen = HashSet::new();
    for (index, conn) in blueprint.connections.iter().enumerate() {
        if conn.name.is_empty() {
            errors.push(BlueprintValidationError::EmptyConnectionName { index });
            continue;
        }
        if !seen.insert(conn.name.as_str()) {
            errors.push(BlueprintValidationError::DuplicateConnectionName {
                name: conn.name.clone(),
            });
        }
        if conn.strategy.is_empty() {
            errors.push(BlueprintValidationError::EmptyStrategyKind {
                connection: conn.name.clone(),
            });
        }
    }
}

fn validate_scalars(blueprint: &Blueprint, errors: &mut Vec<BlueprintValidationError>) {
    for (name, &value) in &blueprint.scalars {
        if !value.is_finite() {
            errors.push(BlueprintValidationError::NonFiniteScalar {
                name: name.clone(),
                value,
            });
        }
    }
}

fn validate_volume(blueprint: &Blueprint, errors: &mut Vec<BlueprintValidationError>) {
    let volume = blueprint.simulation.volume;
    if !(volume.x > 0.0) {
        errors.push(BlueprintValidationError::InvalidVolume { axis: "x", value: volume.x });
    }
    if !(volume.z > 0.0) {
        errors.push(BlueprintValidationError::InvalidVolume { axis: "z", value: volume.z });
    }
}
