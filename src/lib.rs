// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# Connectogen

Connectome construction for spatially embedded cell populations: load a
blueprint, register placed populations, and let the declared connection
strategies wire them up through one seeded, reproducible engine.

This umbrella crate re-exports the workspace members:

- [`structures`] - populations, edge lists, morphologies, the output store
- [`config`] - the TOML blueprint with environment and CLI overrides
- [`engine`] - spatial index, geometric predicates, the degree-constrained
  matcher, touch detection, and the strategy registry

## Quick start

```no_run
use connectogen::prelude::*;

let blueprint = connectogen::config::load_blueprint(None, None)?;
let mut scaffold = Scaffold::from_blueprint(&blueprint);
scaffold.add_population(Population::new("granule", 0, vec![[0.0, 0.0, 0.0]]))?;
let report = scaffold.run(&blueprint.connections);
println!("{} edges, seed {}", report.total_edges(), report.seed);
# Ok::<(), Box<dyn std::error::Error>>(())
```

Copyright 2025 Neuraville Inc.
Licensed under the Apache License, Version 2.0
*/

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use connectogen_config as config;
pub use connectogen_engine as engine;
pub use connectogen_structures as structures;

pub use connectogen_config::{Blueprint, ConfigError, ConnectionConfig};
pub use connectogen_engine::{
    build_strategy, strategy_kinds, ConfigurationError, ConnectionStrategy, ConnectomeReport,
    EngineError, EngineResult, Scaffold, StrategyReport, SupplyError,
};
pub use connectogen_structures::{
    CellId, Compartment, ConnectomeStore, Edge, EdgeList, Morphology, Point, Population,
};

/// The types most programs touch, importable in one line.
pub mod prelude {
    pub use crate::config::{load_blueprint, Blueprint, ConnectionConfig};
    pub use crate::engine::{
        ConnectomeReport, EngineError, EngineResult, Plane, Scaffold, StrategyOutcome,
    };
    pub use crate::structures::{
        CellId, Compartment, ConnectomeStore, Edge, EdgeList, Morphology, Point, Population,
    };
}
