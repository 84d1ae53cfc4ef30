// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Per-run cache of spatial indexes.

Strategies request an index by (population, plane); the first request builds
it, later requests share it via `Arc`. Populations are immutable once handed
to the scaffold, so a cached tree never goes stale within a run.
*/

use std::sync::Arc;

use ahash::AHashMap;
use tracing::debug;

use connectogen_structures::Population;

use crate::spatial::kdtree::KdTree;
use crate::spatial::plane::Plane;

#[derive(Debug, Default)]
pub struct IndexCache {
    trees: AHashMap<(String, Plane), Arc<KdTree>>,
}

impl IndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared index for `population` on `plane`, building it on first use.
    pub fn index_for(&mut self, population: &Population, plane: Plane) -> Arc<KdTree> {
        let key = (population.name().to_string(), plane);
        if let Some(tree) = self.trees.get(&key) {
            return Arc::clone(tree);
        }
        let tree = Arc::new(KdTree::build(population.positions(), plane));
        debug!(
            target: "connectogen",
            "Built spatial index for '{}' on plane {} ({} cells)",
            population.name(),
            plane,
            tree.len()
        );
        self.trees.insert(key, Arc::clone(&tree));
        tree
    }

    /// Number of distinct (population, plane) indexes built so far.
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
