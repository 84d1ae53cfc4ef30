// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Morphology touch detection.

Two-stage refinement from cell-level proximity down to compartment pairs.
Stage one shortlists cell pairs whose search spheres overlap on the cell
intersection plane, using the spatial index of the larger population so the
smaller one issues the queries. Stage two tests every compartment pair of
each candidate cell pair for overlap on the compartment intersection plane;
one intersecting pair is chosen uniformly at random and becomes the edge's
compartment reference. Cell pairs without any intersecting compartments
produce no edge.

The cell-level prefilter exists because compartment testing is quadratic per
cell pair; it must only ever run on pairs that can plausibly touch.
*/

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::debug;

use connectogen_structures::{CompartmentRef, Edge, Morphology, Population};

use crate::spatial::{KdTree, Plane};

/// Search radius of a population: explicit override first, then morphology
/// reach, then the soma radius from placement.
pub fn search_radius(population: &Population) -> f64 {
    if let Some(radius) = population.search_radius() {
        return radius;
    }
    let reach = (0..population.len())
        .filter_map(|row| population.morphology(row))
        .map(Morphology::reach)
        .fold(0.0, f64::max);
    if reach > 0.0 {
        reach
    } else {
        population.radius()
    }
}

/// One touch-detection run between two populations with morphologies.
pub struct TouchDetector<'a> {
    from: &'a Population,
    to: &'a Population,
    cell_plane: Plane,
    compartment_plane: Plane,
    radius: f64,
}

impl<'a> TouchDetector<'a> {
    pub fn new(
        from: &'a Population,
        to: &'a Population,
        cell_plane: Plane,
        compartment_plane: Plane,
    ) -> Self {
        let radius = search_radius(from) + search_radius(to);
        Self { from, to, cell_plane, compartment_plane, radius }
    }

    /// Override the cell-level query radius (normally the sum of the two
    /// populations' search radii).
    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    pub fn cell_plane(&self) -> Plane {
        self.cell_plane
    }

    /// Cell-level query radius in effect for stage one.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Run both stages. `from_index` and `to_index` are the two populations'
    /// indexes on the cell intersection plane; only the one belonging to the
    /// larger population is queried.
    pub fn detect(
        &self,
        from_index: &Arc<KdTree>,
        to_index: &Arc<KdTree>,
        rng: &mut StdRng,
    ) -> (Vec<Edge>, Vec<CompartmentRef>) {
        let pairs = self.intersect_cells(from_index, to_index);
        debug!(
            target: "connectogen",
            "Touch stage 1: {} candidate cell pairs ({} x {}, radius {})",
            pairs.len(),
            self.from.len(),
            self.to.len(),
            self.radius
        );
        self.intersect_compartments(&pairs, rng)
    }

    /// Stage one: `(from_row, to_row)` pairs within the search radius on the
    /// cell plane. Queries run from the smaller population against the
    /// larger one's index; radius queries are symmetric, so mirroring the
    /// reversed matches gives the same pair set.
    fn intersect_cells(&self, from_index: &Arc<KdTree>, to_index: &Arc<KdTree>) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        let mut hits = Vec::new();
        if self.from.len() <= self.to.len() {
            for from_row in 0..self.from.len() {
                to_index.query_radius_into(self.from.position(from_row), self.radius, &mut hits);
                pairs.extend(hits.iter().map(|&to_row| (from_row, to_row)));
            }
        } else {
            for to_row in 0..self.to.len() {
                from_index.query_radius_into(self.to.position(to_row), self.radius, &mut hits);
                pairs.extend(hits.iter().map(|&from_row| (from_row, to_row)));
            }
        }
        pairs
    }

    /// Stage two: keep the cell pairs with at least one compartment overlap
    /// and resolve each to one uniformly chosen compartment pair.
    fn intersect_compartments(
        &self,
        pairs: &[(usize, usize)],
        rng: &mut StdRng,
    ) -> (Vec<Edge>, Vec<CompartmentRef>) {
        let mut edges = Vec::new();
        let mut refs = Vec::new();
        let mut overlapping: Vec<CompartmentRef> = Vec::new();

        for &(from_row, to_row) in pairs {
            let (Some(from_morph), Some(to_morph)) =
                (self.from.morphology(from_row), self.to.morphology(to_row))
            else {
                continue;
            };
            let from_soma = self.from.position(from_row);
            let to_soma = self.to.position(to_row);

            overlapping.clear();
            for (i, a) in from_morph.compartments().iter().enumerate() {
                for (j, b) in to_morph.compartments().iter().enumerate() {
                    let gap = a.radius + b.radius;
                    let dist_sq = self
                        .compartment_plane
                        .distance_sq(a.center_at(from_soma), b.center_at(to_soma));
                    if dist_sq <= gap * gap {
                        overlapping.push(CompartmentRef { source: i as u32, target: j as u32 });
                    }
                }
            }
            if let Some(&chosen) = overlapping.choose(rng) {
                edges.push(Edge::new(self.from.id_at(from_row), self.to.id_at(to_row)));
                refs.push(chosen);
            }
        }
        (edges, refs)
    }
}

// ============================================================================
// Tests
// ============================================================================
