// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Per-cell morphology descriptions.

A morphology is a set of spherical compartments positioned relative to the
cell's soma. Touch detection tests compartment pairs across two cells for
overlap; everything else in the engine works at soma level and ignores
morphologies entirely.
*/

use serde::{Deserialize, Serialize};

use crate::population::Point;

/// One spherical compartment, offset from the owning cell's soma.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Compartment {
    /// Offset from the soma position, in the same units as cell positions.
    pub offset: Point,
    /// Compartment radius.
    pub radius: f64,
}

impl Compartment {
    pub fn new(offset: Point, radius: f64) -> Self {
        Self { offset, radius }
    }

    /// Absolute center of this compartment for a cell at `soma`.
    pub fn center_at(&self, soma: Point) -> Point {
        [
            soma[0] + self.offset[0],
            soma[1] + self.offset[1],
            soma[2] + self.offset[2],
        ]
    }
}

/// The compartment set of a single cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Morphology {
    compartments: Vec<Compartment>,
}

impl Morphology {
    pub fn new(compartments: Vec<Compartment>) -> Self {
        Self { compartments }
    }

    pub fn compartments(&self) -> &[Compartment] {
        &self.compartments
    }

    pub fn len(&self) -> usize {
        self.compartments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compartments.is_empty()
    }

    /// Farthest extent of any compartment from the soma. Used as the default
    /// search radius when touch detection has no explicit override.
    pub fn reach(&self) -> f64 {
        self.compartments
            .iter()
            .map(|c| {
                let d = (c.offset[0] * c.offset[0]
                    + c.offset[1] * c.offset[1]
                    + c.offset[2] * c.offset[2])
                    .sqrt();
                d + c.radius
            })
            .fold(0.0, f64::max)
    }
}

// ============================================================================
// Tests
// ============================================================================
