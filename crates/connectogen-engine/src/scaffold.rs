// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
The construction orchestrator.

A `Scaffold` owns everything the connection strategies share: the placed
populations (read-only once registered), the scalar table from the
blueprint, the spatial-index cache, the single seeded RNG, and the
`ConnectomeStore` outputs are recorded into.

`run` drives the declared connections sequentially in blueprint order.
Each declaration is built from the registry, validated, and connected; a
configuration or supply error aborts that declaration only and the run
continues with the next one. Later strategies can read the tags and
datasets earlier ones recorded.
*/

use std::sync::Arc;

use ahash::AHashMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{error, info};

use connectogen_config::{Blueprint, ConnectionConfig};
use connectogen_structures::{ConnectomeStore, Dataset, EdgeList, Population};

use crate::error::{ConfigurationError, EngineError, EngineResult};
use crate::spatial::{IndexCache, KdTree, Plane};
use crate::strategies::{build_strategy, StrategyReport};

/// Result of one connection declaration within a run.
#[derive(Debug)]
pub struct StrategyOutcome {
    pub name: String,
    pub kind: String,
    pub result: Result<StrategyReport, EngineError>,
}

/// Summary of a whole construction run.
#[derive(Debug)]
pub struct ConnectomeReport {
    pub seed: u64,
    pub outcomes: Vec<StrategyOutcome>,
}

impl ConnectomeReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Total edges recorded by the successful strategies.
    pub fn total_edges(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(StrategyReport::total_edges)
            .sum()
    }
}

/// Shared environment of one construction run.
pub struct Scaffold {
    populations: Vec<Arc<Population>>,
    by_name: AHashMap<String, usize>,
    scalars: AHashMap<String, f64>,
    cache: IndexCache,
    rng: StdRng,
    store: ConnectomeStore,
}

impl Scaffold {
    pub fn new(seed: u64) -> Self {
        Self {
            populations: Vec::new(),
            by_name: AHashMap::new(),
            scalars: AHashMap::new(),
            cache: IndexCache::new(),
            rng: StdRng::seed_from_u64(seed),
            store: ConnectomeStore::new(seed),
        }
    }

    /// Scaffold seeded and configured from a blueprint. A missing seed is
    /// drawn from entropy; either way it ends up recorded in the store. The
    /// volume extents are exposed as the scalars `volume_x` and `volume_z`.
    pub fn from_blueprint(blueprint: &Blueprint) -> Self {
        let seed = blueprint
            .simulation
            .seed
            .unwrap_or_else(|| rand::thread_rng().gen());
        let mut scaffold = Self::new(seed);
        for (name, &value) in &blueprint.scalars {
            scaffold.scalars.insert(name.clone(), value);
        }
        scaffold
            .scalars
            .insert("volume_x".to_string(), blueprint.simulation.volume.x);
        scaffold
            .scalars
            .insert("volume_z".to_string(), blueprint.simulation.volume.z);
        scaffold
    }

    pub fn seed(&self) -> u64 {
        self.store.seed()
    }

    /// Register a placed population. Names must be unique.
    pub fn add_population(&mut self, population: Population) -> EngineResult<()> {
        let name = population.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(ConfigurationError::DuplicatePopulation(name).into());
        }
        self.by_name.insert(name, self.populations.len());
        self.populations.push(Arc::new(population));
        Ok(())
    }

    pub fn population(&self, name: &str) -> Option<Arc<Population>> {
        self.by_name
            .get(name)
            .map(|&i| Arc::clone(&self.populations[i]))
    }

    pub fn population_names(&self) -> impl Iterator<Item = &str> {
        self.populations.iter().map(|p| p.name())
    }

    pub fn set_scalar(&mut self, name: impl Into<String>, value: f64) {
        self.scalars.insert(name.into(), value);
    }

    pub fn scalar(&self, key: &str) -> Option<f64> {
        self.scalars.get(key).copied()
    }

    pub fn edges(&self, tag: &str) -> Option<&EdgeList> {
        self.store.edges(tag)
    }

    pub fn dataset(&self, name: &str) -> Option<&Dataset> {
        self.store.dataset(name)
    }

    /// Shared spatial index for a registered population on a plane.
    pub fn index_for(&mut self, population: &Population, plane: Plane) -> Arc<KdTree> {
        self.cache.index_for(population, plane)
    }

    /// The single RNG of the run. Every random draw of every strategy goes
    /// through here, so the recorded seed reproduces the full output.
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn record_edges(&mut self, tag: impl Into<String>, list: EdgeList) -> EngineResult<()> {
        self.store.record_edges(tag, list)?;
        Ok(())
    }

    pub fn record_dataset(
        &mut self,
        name: impl Into<String>,
        dataset: Dataset,
    ) -> EngineResult<()> {
        self.store.record_dataset(name, dataset)?;
        Ok(())
    }

    pub fn store(&self) -> &ConnectomeStore {
        &self.store
    }

    pub fn into_store(self) -> ConnectomeStore {
        self.store
    }

    /// Run the declared connections in order. Build, validate and connect
    /// each; a failing declaration is reported and skipped, the rest of the
    /// run continues.
    pub fn run(&mut self, connections: &[ConnectionConfig]) -> ConnectomeReport {
        let mut outcomes = Vec::with_capacity(connections.len());
        info!(
            target: "connectogen",
            "Starting construction: {} connection declarations, seed {}",
            connections.len(),
            self.seed()
        );
        for conn in connections {
            let result = self.run_connection(conn);
            match &result {
                Ok(report) => {
                    info!(
                        target: "connectogen",
                        "Connected '{}' ({}): {} edges across {} tag(s)",
                        conn.name,
                        conn.strategy,
                        report.total_edges(),
                        report.tags.len()
                    );
                }
                Err(err) => {
                    error!(
                        target: "connectogen",
                        "Strategy '{}' ({}) failed: {}",
                        conn.name, conn.strategy, err
                    );
                }
            }
            outcomes.push(StrategyOutcome {
                name: conn.name.clone(),
                kind: conn.strategy.clone(),
                result,
            });
        }
        ConnectomeReport { seed: self.seed(), outcomes }
    }

    fn run_connection(&mut self, conn: &ConnectionConfig) -> EngineResult<StrategyReport> {
        let mut instance = build_strategy(&conn.strategy, &conn.name, &conn.params)?;
        instance.validate(self)?;
        instance.connect(self)
    }
}

// ============================================================================
// Tests
// ============================================================================
