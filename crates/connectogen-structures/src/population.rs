// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Cell populations.

A population is an immutable table of cells of one type: globally unique ids,
3D positions, and optional per-cell morphologies. Ids are strictly increasing
within a population. When they are also contiguous the id-to-row translation
is plain offset arithmetic; otherwise an explicit lookup map is kept, so
sparse id ranges (deleted or merged populations upstream) work the same way.
*/

use ahash::AHashMap;

use crate::error::{StructureError, StructureResult};
use crate::morphology::Morphology;

/// Globally unique cell identifier.
pub type CellId = u64;

/// Position in simulation space.
pub type Point = [f64; 3];

/// A named table of placed cells of a single type.
#[derive(Debug, Clone)]
pub struct Population {
    name: String,
    first_id: CellId,
    ids: Vec<CellId>,
    positions: Vec<Point>,
    radius: f64,
    search_radius: Option<f64>,
    morphologies: Vec<Morphology>,
    // None when ids are contiguous and offset addressing applies.
    row_lookup: Option<AHashMap<CellId, usize>>,
}

impl Population {
    /// Build a population with contiguous ids starting at `first_id`.
    pub fn new(name: impl Into<String>, first_id: CellId, positions: Vec<Point>) -> Self {
        let ids = (0..positions.len() as CellId).map(|i| first_id + i).collect();
        Self {
            name: name.into(),
            first_id,
            ids,
            positions,
            radius: 0.0,
            search_radius: None,
            morphologies: Vec::new(),
            row_lookup: None,
        }
    }

    /// Build a population with explicit (possibly non-contiguous) ids.
    ///
    /// Ids must be strictly increasing. Contiguous ids fall back to offset
    /// addressing; gaps get an explicit id-to-row map.
    pub fn with_ids(
        name: impl Into<String>,
        ids: Vec<CellId>,
        positions: Vec<Point>,
    ) -> StructureResult<Self> {
        let name = name.into();
        if ids.len() != positions.len() {
            return Err(StructureError::LengthMismatch {
                population: name,
                what: "id list",
                got: ids.len(),
                expected: positions.len(),
            });
        }
        for row in 1..ids.len() {
            if ids[row] <= ids[row - 1] {
                return Err(StructureError::NonMonotonicIds { population: name, row });
            }
        }
        let first_id = ids.first().copied().unwrap_or(0);
        let dense = ids
            .iter()
            .enumerate()
            .all(|(row, &id)| id == first_id + row as CellId);
        let row_lookup = if dense {
            None
        } else {
            Some(ids.iter().enumerate().map(|(row, &id)| (id, row)).collect())
        };
        Ok(Self {
            name,
            first_id,
            ids,
            positions,
            radius: 0.0,
            search_radius: None,
            morphologies: Vec::new(),
            row_lookup,
        })
    }

    /// Soma radius from placement, consumed by geometry inflation and as the
    /// last-resort touch search radius.
    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    /// Explicit touch-detection search radius override.
    pub fn with_search_radius(mut self, search_radius: f64) -> Self {
        self.search_radius = Some(search_radius);
        self
    }

    /// Attach one morphology per cell.
    pub fn with_morphologies(mut self, morphologies: Vec<Morphology>) -> StructureResult<Self> {
        if morphologies.len() != self.positions.len() {
            return Err(StructureError::LengthMismatch {
                population: self.name,
                what: "morphology list",
                got: morphologies.len(),
                expected: self.positions.len(),
            });
        }
        self.morphologies = morphologies;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn first_id(&self) -> CellId {
        self.first_id
    }

    /// Id of the cell in the given row.
    ///
    /// # Panics
    /// Panics if `row` is out of bounds.
    pub fn id_at(&self, row: usize) -> CellId {
        self.ids[row]
    }

    /// Row of the cell with the given id, if it belongs to this population.
    pub fn row_of(&self, id: CellId) -> Option<usize> {
        match &self.row_lookup {
            Some(map) => map.get(&id).copied(),
            None => {
                let row = id.checked_sub(self.first_id)? as usize;
                (row < self.ids.len()).then_some(row)
            }
        }
    }

    pub fn position(&self, row: usize) -> Point {
        self.positions[row]
    }

    pub fn positions(&self) -> &[Point] {
        &self.positions
    }

    pub fn ids(&self) -> &[CellId] {
        &self.ids
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn search_radius(&self) -> Option<f64> {
        self.search_radius
    }

    pub fn morphology(&self, row: usize) -> Option<&Morphology> {
        self.morphologies.get(row)
    }

    pub fn has_morphologies(&self) -> bool {
        !self.morphologies.is_empty()
    }

    /// True when ids are contiguous and addressing is pure offset arithmetic.
    pub fn is_dense(&self) -> bool {
        self.row_lookup.is_none()
    }

    /// Iterate `(id, position)` pairs in row order.
    pub fn iter(&self) -> impl Iterator<Item = (CellId, Point)> + '_ {
        self.ids.iter().copied().zip(self.positions.iter().copied())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn points(n: usize) -> Vec<Point> {
        (0..n).map(|i| [i as f64, 0.0, 0.0]).collect()
    }

    #[test]
    fn dense_population_uses_offset_addressing() {
        let pop = Population::new("granule", 100, points(5));
        assert!(pop.is_dense());
        assert_eq!(pop.id_at(3), 103);
        assert_eq!(pop.row_of(104), Some(4));
        assert_eq!(pop.row_of(105), None);
        assert_eq!(pop.row_of(99), None);
    }

    #[test]
    fn sparse_ids_get_an_explicit_map() {
        let pop = Population::with_ids("dcn", vec![7, 9, 20], points(3)).unwrap();
        assert!(!pop.is_dense());
        assert_eq!(pop.row_of(9), Some(1));
        assert_eq!(pop.row_of(8), None);
        assert_eq!(pop.id_at(2), 20);
    }

    #[test]
    fn contiguous_explicit_ids_stay_dense() {
        let pop = Population::with_ids("golgi", vec![5, 6, 7], points(3)).unwrap();
        assert!(pop.is_dense());
        assert_eq!(pop.row_of(6), Some(1));
    }

    #[test]
    fn non_monotone_ids_are_rejected() {
        let err = Population::with_ids("bad", vec![3, 3, 4], points(3)).unwrap_err();
        assert!(matches!(err, StructureError::NonMonotonicIds { row: 1, .. }));
    }

    #[test]
    fn id_position_length_mismatch_is_rejected() {
        let err = Population::with_ids("bad", vec![1, 2], points(3)).unwrap_err();
        assert!(matches!(err, StructureError::LengthMismatch { .. }));
    }

    #[test]
    fn empty_population_is_usable() {
        let pop = Population::new("empty", 0, Vec::new());
        assert!(pop.is_empty());
        assert_eq!(pop.row_of(0), None);
        assert_eq!(pop.iter().count(), 0);
    }

    #[test]
    fn morphology_length_is_validated() {
        let err = Population::new("pc", 0, points(2))
            .with_morphologies(vec![Morphology::default()])
            .unwrap_err();
        assert!(matches!(err, StructureError::LengthMismatch { .. }));
    }
}
