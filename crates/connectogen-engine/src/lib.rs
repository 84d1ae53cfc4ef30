// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# Connectogen Engine

This crate implements connectome construction between spatially embedded cell
populations:
- Spatial indexing (balanced k-d trees over configurable projection planes)
- Degree-constrained stochastic matching (one algorithm behind every strategy)
- Morphology touch detection (compartment-level intersection)
- A static registry of connection strategy kinds driven by blueprint sections

## Architecture

A `Scaffold` owns the placed populations, the shared scalar table, the
spatial-index cache, the seeded RNG, and the `ConnectomeStore` the strategies
write into. Strategies run sequentially in blueprint order; later strategies
may read the tags and datasets earlier ones recorded.

Copyright 2025 Neuraville Inc.
Licensed under the Apache License, Version 2.0
*/

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod error;
pub mod geometry;
pub mod matcher;
pub mod scaffold;
pub mod spatial;
pub mod strategies;
pub mod touch;

pub use error::{ConfigurationError, EngineError, EngineResult, SupplyError};

pub use spatial::{IndexCache, KdTree, Plane};

pub use geometry::{
    Always, Axis, AxisSpan, Composite, Geometry, HalfSpace, PlanarGauge, Relation, WithinRadius,
};

pub use matcher::{
    Acceptance, Cap, CandidateOrder, MatchOutcome, MatchSettings, ProximityMatcher,
    UnderConnection,
};

pub use touch::{search_radius, TouchDetector};

pub use strategies::{
    build_strategy, strategy_kinds, AnchorSide, ConnectionStrategy, ScalarRef, StrategyInstance,
    StrategyReport, StrategyState,
};

pub use scaffold::{ConnectomeReport, Scaffold, StrategyOutcome};

// Re-export core data structures (single source of truth)
pub use connectogen_structures::{
    CellId, Compartment, CompartmentRef, ConnectomeStore, Dataset, Edge, EdgeList, Morphology,
    Point, Population,
};

// Re-export the blueprint types strategies are configured from
pub use connectogen_config::{Blueprint, ConnectionConfig};
