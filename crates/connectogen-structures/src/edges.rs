// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Directed edges between cells.

An `EdgeList` is one strategy's complete output for one tag. Touch-based
strategies additionally carry one compartment pair per edge, aligned by
index with the edge vector.
*/

use serde::{Deserialize, Serialize};

use crate::error::{StructureError, StructureResult};
use crate::population::CellId;

/// One directed connection between two cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: CellId,
    pub target: CellId,
}

impl Edge {
    pub fn new(source: CellId, target: CellId) -> Self {
        Self { source, target }
    }
}

/// Compartment indices resolving an edge below soma level. Indices refer to
/// the morphology of the source and target cell respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompartmentRef {
    pub source: u32,
    pub target: u32,
}

/// A complete, immutable edge list recorded under one tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeList {
    edges: Vec<Edge>,
    compartments: Option<Vec<CompartmentRef>>,
}

impl EdgeList {
    pub fn new(edges: Vec<Edge>) -> Self {
        Self { edges, compartments: None }
    }

    /// Edge list with per-edge compartment resolution. Lengths must match.
    pub fn with_compartments(
        edges: Vec<Edge>,
        compartments: Vec<CompartmentRef>,
    ) -> StructureResult<Self> {
        if edges.len() != compartments.len() {
            return Err(StructureError::CompartmentMismatch {
                edges: edges.len(),
                refs: compartments.len(),
            });
        }
        Ok(Self { edges, compartments: Some(compartments) })
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn compartments(&self) -> Option<&[CompartmentRef]> {
        self.compartments.as_deref()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn sources(&self) -> impl Iterator<Item = CellId> + '_ {
        self.edges.iter().map(|e| e.source)
    }

    pub fn targets(&self) -> impl Iterator<Item = CellId> + '_ {
        self.edges.iter().map(|e| e.target)
    }
}

// ============================================================================
// Tests
// ============================================================================
