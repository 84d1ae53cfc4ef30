// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Error taxonomy for connectome construction.

Two classes matter to callers: configuration errors (a strategy section is
wrong; found at build or validate time) and supply errors (the populations,
tags, or datasets a strategy needs cannot satisfy it; found at the start of
connect, before anything is recorded). Under-connection is deliberately not
an error; it is reported as notices on the run outcome.
*/

use connectogen_structures::StructureError;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// A strategy section that cannot be built or validated.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Strategy '{strategy}': missing required parameter '{parameter}'")]
    MissingParameter { strategy: String, parameter: &'static str },

    #[error("Strategy '{strategy}': invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        strategy: String,
        parameter: &'static str,
        reason: String,
    },

    #[error("Strategy '{strategy}': bad parameters: {message}")]
    BadParameters { strategy: String, message: String },

    #[error("Unknown projection plane '{0}' (expected one of: xyz, xy, xz, yz, x, y, z)")]
    UnknownPlane(String),

    #[error("Unknown strategy kind '{kind}'. Known kinds: {known}")]
    UnknownStrategy { kind: String, known: String },

    #[error("Strategy '{strategy}': unknown population '{population}'")]
    UnknownPopulation { strategy: String, population: String },

    #[error("Strategy '{strategy}': unknown scalar '{scalar}'")]
    UnknownScalar { strategy: String, scalar: String },

    #[error("Strategy '{strategy}' has already connected; re-running is not allowed")]
    AlreadyConnected { strategy: String },

    #[error("Strategy '{strategy}' must validate before connecting")]
    NotValidated { strategy: String },

    #[error("Population '{0}' is already registered")]
    DuplicatePopulation(String),
}

/// Inputs that cannot satisfy a strategy's demands. Raised before any edge
/// of the failing strategy is recorded.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SupplyError {
    #[error(
        "Exclusive matching needs at least as many '{from}' cells ({from_count}) as '{to}' cells ({to_count})"
    )]
    ExclusiveUnderSupply {
        from: String,
        from_count: usize,
        to: String,
        to_count: usize,
    },

    #[error("Edge tag '{0}' has not been recorded yet")]
    MissingTag(String),

    #[error("Derived dataset '{0}' has not been recorded yet")]
    MissingDataset(String),

    #[error("Dataset '{name}' covers {got} cells, population needs {expected}")]
    DatasetMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("Tag '{tag}': cell {cell} does not belong to population '{population}'")]
    ForeignCell {
        tag: String,
        cell: u64,
        population: String,
    },

    #[error(
        "Population '{satellite}' has {satellite_count} cells, cannot mirror row {row} of planet '{planet}'"
    )]
    SatelliteUnderSupply {
        satellite: String,
        satellite_count: usize,
        planet: String,
        row: usize,
    },
}

/// Umbrella error for a construction run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Supply(#[from] SupplyError),

    #[error(transparent)]
    Structure(#[from] StructureError),
}
