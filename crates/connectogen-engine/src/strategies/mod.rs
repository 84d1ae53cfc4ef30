// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Connection strategies.

A strategy is a validated configuration bundle built from one blueprint
`[[connection]]` section: which populations connect, under which geometry and
degree caps, and under which output tag(s). Every kind funnels into the
generic matcher or the touch detector; the kinds differ only in what they
feed them.

Kinds are registered in a static map from kind name to constructor, looked
up when a blueprint section is built. Unknown kinds report the full list of
known ones. Each built instance walks `Built -> Validated -> Connected`
exactly once; re-running a connected instance is rejected, matching the
append-once tag store.
*/

use std::collections::BTreeMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use connectogen_structures::{EdgeList, Population};

use crate::error::{ConfigurationError, EngineResult, SupplyError};
use crate::matcher::MatchOutcome;
use crate::scaffold::Scaffold;

mod box_span;
mod proximity;
mod random_subset;
mod satellite;
mod shared_intermediate;
mod staged;
mod touch;

/// What one strategy recorded: `(tag, edge count)` pairs, dataset names,
/// and how many anchor cells fell short of their degree budget.
#[derive(Debug, Clone, Default)]
pub struct StrategyReport {
    pub tags: Vec<(String, usize)>,
    pub datasets: Vec<String>,
    pub under_connected: usize,
}

impl StrategyReport {
    pub fn total_edges(&self) -> usize {
        self.tags.iter().map(|(_, n)| n).sum()
    }
}

/// One configured connection kind.
pub trait ConnectionStrategy {
    fn name(&self) -> &str;

    fn kind(&self) -> &'static str;

    /// Check the section against the scaffold: populations exist, named
    /// scalars resolve, parameter combinations make sense. Must pass before
    /// `connect` may run.
    fn validate(&self, scaffold: &Scaffold) -> Result<(), ConfigurationError>;

    /// Produce and record this strategy's complete output. Supply problems
    /// surface before anything is recorded.
    fn connect(&mut self, scaffold: &mut Scaffold) -> EngineResult<StrategyReport>;
}

impl std::fmt::Debug for dyn ConnectionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionStrategy")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .finish()
    }
}

/// Lifecycle of a strategy instance. No transition ever goes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyState {
    Built,
    Validated,
    Connected,
}

/// A strategy plus its lifecycle state. The scaffold driver only talks to
/// instances, so the state machine cannot be bypassed.
pub struct StrategyInstance {
    strategy: Box<dyn ConnectionStrategy>,
    state: StrategyState,
}

impl std::fmt::Debug for StrategyInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyInstance")
            .field("strategy", &self.strategy)
            .field("state", &self.state)
            .finish()
    }
}

impl StrategyInstance {
    pub fn new(strategy: Box<dyn ConnectionStrategy>) -> Self {
        Self { strategy, state: StrategyState::Built }
    }

    pub fn name(&self) -> &str {
        self.strategy.name()
    }

    pub fn kind(&self) -> &'static str {
        self.strategy.kind()
    }

    pub fn state(&self) -> StrategyState {
        self.state
    }

    pub fn validate(&mut self, scaffold: &Scaffold) -> Result<(), ConfigurationError> {
        if self.state == StrategyState::Connected {
            return Err(ConfigurationError::AlreadyConnected {
                strategy: self.name().to_string(),
            });
        }
        self.strategy.validate(scaffold)?;
        self.state = StrategyState::Validated;
        Ok(())
    }

    /// Run the strategy once. A connected instance stays connected; a failed
    /// connect leaves the instance validated (nothing was recorded).
    pub fn connect(&mut self, scaffold: &mut Scaffold) -> EngineResult<StrategyReport> {
        match self.state {
            StrategyState::Built => Err(ConfigurationError::NotValidated {
                strategy: self.name().to_string(),
            }
            .into()),
            StrategyState::Connected => Err(ConfigurationError::AlreadyConnected {
                strategy: self.name().to_string(),
            }
            .into()),
            StrategyState::Validated => {
                let report = self.strategy.connect(scaffold)?;
                self.state = StrategyState::Connected;
                Ok(report)
            }
        }
    }
}

type Constructor =
    fn(&str, &toml::Table) -> Result<Box<dyn ConnectionStrategy>, ConfigurationError>;

static REGISTRY: Lazy<BTreeMap<&'static str, Constructor>> = Lazy::new(|| {
    let mut map: BTreeMap<&'static str, Constructor> = BTreeMap::new();
    map.insert("proximity", proximity::build);
    map.insert("box", box_span::build);
    map.insert("staged_proximity", staged::build);
    map.insert("random_subset", random_subset::build);
    map.insert("shared_intermediate", shared_intermediate::build);
    map.insert("satellite", satellite::build);
    map.insert("touch", touch::build);
    map
});

/// The registered strategy kind names, sorted.
pub fn strategy_kinds() -> Vec<&'static str> {
    REGISTRY.keys().copied().collect()
}

/// Build a named strategy instance of the given kind from its raw blueprint
/// parameter table.
pub fn build_strategy(
    kind: &str,
    name: &str,
    params: &toml::Table,
) -> Result<StrategyInstance, ConfigurationError> {
    let constructor = REGISTRY
        .get(kind)
        .ok_or_else(|| ConfigurationError::UnknownStrategy {
            kind: kind.to_string(),
            known: strategy_kinds().join(", "),
        })?;
    Ok(StrategyInstance::new(constructor(name, params)?))
}

// ----------------------------------------------------------------------------
// Shared parameter pieces
// ----------------------------------------------------------------------------

/// A numeric parameter given either inline or as the name of a blueprint
/// scalar, resolved against the scaffold's scalar table.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScalarRef {
    Value(f64),
    Named(String),
}

impl ScalarRef {
    pub fn resolve(&self, strategy: &str, scaffold: &Scaffold) -> Result<f64, ConfigurationError> {
        match self {
            ScalarRef::Value(v) => Ok(*v),
            ScalarRef::Named(name) => {
                scaffold
                    .scalar(name)
                    .ok_or_else(|| ConfigurationError::UnknownScalar {
                        strategy: strategy.to_string(),
                        scalar: name.clone(),
                    })
            }
        }
    }
}

/// Which side of the declared edge direction the matcher iterates. The
/// matcher always anchors its `to` role; a `from`-anchored strategy swaps
/// the roles and flips the outcome so recorded edges keep their declared
/// direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorSide {
    #[default]
    To,
    From,
}

pub(crate) fn parse_params<P: DeserializeOwned>(
    strategy: &str,
    params: &toml::Table,
) -> Result<P, ConfigurationError> {
    params
        .clone()
        .try_into()
        .map_err(|err| ConfigurationError::BadParameters {
            strategy: strategy.to_string(),
            message: err.to_string(),
        })
}

pub(crate) fn required_population(
    strategy: &str,
    scaffold: &Scaffold,
    name: &str,
) -> Result<Arc<Population>, ConfigurationError> {
    scaffold
        .population(name)
        .ok_or_else(|| ConfigurationError::UnknownPopulation {
            strategy: strategy.to_string(),
            population: name.to_string(),
        })
}

pub(crate) fn required_edges<'a>(
    scaffold: &'a Scaffold,
    tag: &str,
) -> Result<&'a EdgeList, SupplyError> {
    scaffold
        .edges(tag)
        .ok_or_else(|| SupplyError::MissingTag(tag.to_string()))
}

/// Record one matcher outcome under `tag`, surfacing under-connection once
/// per run at warn level with per-cell detail at debug.
pub(crate) fn record_matched(
    scaffold: &mut Scaffold,
    strategy: &str,
    tag: &str,
    outcome: MatchOutcome,
    report: &mut StrategyReport,
) -> EngineResult<()> {
    if !outcome.under.is_empty() {
        warn!(
            target: "connectogen",
            "Strategy '{}': {} cell(s) under-connected for tag '{}'",
            strategy,
            outcome.under.len(),
            tag
        );
        for notice in &outcome.under {
            debug!(
                target: "connectogen",
                "  cell {} got {} of {} wanted edges",
                notice.cell, notice.got, notice.wanted
            );
        }
    }
    report.under_connected += outcome.under.len();
    report.tags.push((tag.to_string(), outcome.edges.len()));
    scaffold.record_edges(tag, EdgeList::new(outcome.edges))
}

// ============================================================================
// Tests
// ============================================================================
