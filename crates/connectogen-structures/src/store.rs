// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
The connectome store.

Collects every strategy output under a string tag, plus named derived
datasets (per-cell arrays a strategy computes for later strategies, such as
fiber heights). Both stores are append-once: a tag or dataset name can be
recorded exactly once and never mutated afterwards, so downstream readers
always see complete lists. Insertion order is preserved for deterministic
iteration and reporting.

The RNG seed of the construction run is recorded here so any output can be
reproduced.
*/

use ahash::AHashMap;
use ndarray::{Array1, Array2};

use crate::edges::EdgeList;
use crate::error::{StructureError, StructureResult};

/// A named per-cell array recorded by one strategy and read by later ones.
#[derive(Debug, Clone, PartialEq)]
pub enum Dataset {
    /// One value per cell (e.g. fiber heights).
    PerCell(Array1<f64>),
    /// One row per cell (e.g. orientation coefficients).
    Table(Array2<f64>),
}

impl Dataset {
    /// Number of cells covered by the dataset.
    pub fn rows(&self) -> usize {
        match self {
            Dataset::PerCell(a) => a.len(),
            Dataset::Table(a) => a.nrows(),
        }
    }

    pub fn as_per_cell(&self) -> Option<&Array1<f64>> {
        match self {
            Dataset::PerCell(a) => Some(a),
            Dataset::Table(_) => None,
        }
    }

    pub fn as_table(&self) -> Option<&Array2<f64>> {
        match self {
            Dataset::PerCell(_) => None,
            Dataset::Table(a) => Some(a),
        }
    }
}

/// Append-once storage for tagged edge lists and derived datasets.
#[derive(Debug, Clone)]
pub struct ConnectomeStore {
    seed: u64,
    tags: Vec<(String, EdgeList)>,
    tag_index: AHashMap<String, usize>,
    datasets: Vec<(String, Dataset)>,
    dataset_index: AHashMap<String, usize>,
}

impl ConnectomeStore {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            tags: Vec::new(),
            tag_index: AHashMap::new(),
            datasets: Vec::new(),
            dataset_index: AHashMap::new(),
        }
    }

    /// Seed the construction run was started with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Record a complete edge list under `tag`. Each tag can be recorded
    /// exactly once.
    pub fn record_edges(&mut self, tag: impl Into<String>, list: EdgeList) -> StructureResult<()> {
        let tag = tag.into();
        if self.tag_index.contains_key(&tag) {
            return Err(StructureError::DuplicateTag(tag));
        }
        self.tag_index.insert(tag.clone(), self.tags.len());
        self.tags.push((tag, list));
        Ok(())
    }

    pub fn edges(&self, tag: &str) -> Option<&EdgeList> {
        self.tag_index.get(tag).map(|&i| &self.tags[i].1)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag_index.contains_key(tag)
    }

    /// Tags with their edge lists, in recording order.
    pub fn tags(&self) -> impl Iterator<Item = (&str, &EdgeList)> {
        self.tags.iter().map(|(t, l)| (t.as_str(), l))
    }

    pub fn record_dataset(
        &mut self,
        name: impl Into<String>,
        dataset: Dataset,
    ) -> StructureResult<()> {
        let name = name.into();
        if self.dataset_index.contains_key(&name) {
            return Err(StructureError::DuplicateDataset(name));
        }
        self.dataset_index.insert(name.clone(), self.datasets.len());
        self.datasets.push((name, dataset));
        Ok(())
    }

    pub fn dataset(&self, name: &str) -> Option<&Dataset> {
        self.dataset_index.get(name).map(|&i| &self.datasets[i].1)
    }

    /// Dataset names in recording order.
    pub fn dataset_names(&self) -> impl Iterator<Item = &str> {
        self.datasets.iter().map(|(n, _)| n.as_str())
    }

    /// Total edge count across all tags.
    pub fn total_edges(&self) -> usize {
        self.tags.iter().map(|(_, l)| l.len()).sum()
    }
}

// ============================================================================
// Tests
// ============================================================================
