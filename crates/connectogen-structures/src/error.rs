// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Error types for structure construction and storage.
*/

/// Result type for structure operations
pub type StructureResult<T> = Result<T, StructureError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StructureError {
    #[error("Population '{population}': cell ids must be strictly increasing (row {row})")]
    NonMonotonicIds { population: String, row: usize },

    #[error("Population '{population}': {what} has {got} entries for {expected} cells")]
    LengthMismatch {
        population: String,
        what: &'static str,
        got: usize,
        expected: usize,
    },

    #[error("Edge list carries {edges} edges but {refs} compartment pairs")]
    CompartmentMismatch { edges: usize, refs: usize },

    #[error("Edge tag '{0}' already recorded")]
    DuplicateTag(String),

    #[error("Dataset '{0}' already recorded")]
    DuplicateDataset(String),
}
