// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Blueprint type definitions
//!
//! This module defines the structs that map to sections in a connectome
//! blueprint file (`connectogen_blueprint.toml`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root blueprint structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Blueprint {
    pub simulation: SimulationConfig,
    /// Shared scalar values (layer thicknesses, placement radii, volume
    /// extents) referenced by name from strategy parameters.
    pub scalars: BTreeMap<String, f64>,
    /// Ordered connection declarations; the engine runs them in file order
    /// so later strategies can read earlier outputs.
    #[serde(rename = "connection")]
    pub connections: Vec<ConnectionConfig>,
}

/// Simulation-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// RNG seed for the whole construction run. Drawn from entropy when
    /// absent; the effective seed is always recorded with the output.
    pub seed: Option<u64>,
    pub volume: VolumeConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            volume: VolumeConfig::default(),
        }
    }
}

/// Horizontal extent of the simulated tissue volume
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct VolumeConfig {
    pub x: f64,
    pub z: f64,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self { x: 400.0, z: 400.0 }
    }
}

/// One `[[connection]]` section: a named strategy invocation.
///
/// Strategy-specific parameters stay as a raw TOML table; each strategy kind
/// deserializes its own typed parameter struct when it is built.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionConfig {
    pub name: String,
    pub strategy: String,
    #[serde(flatten)]
    pub params: toml::Table,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_blueprint() {
        let blueprint: Blueprint = toml::from_str(
            r#"
            [simulation]
            seed = 7

            [scalars]
            granular_thickness = 150.0

            [[connection]]
            name = "glom_to_granule"
            strategy = "proximity"
            from = "glomerulus"
            to = "granule"
            radius = 40.0
            "#,
        )
        .unwrap();

        assert_eq!(blueprint.simulation.seed, Some(7));
        assert_eq!(blueprint.scalars["granular_thickness"], 150.0);
        assert_eq!(blueprint.connections.len(), 1);
        let conn = &blueprint.connections[0];
        assert_eq!(conn.name, "glom_to_granule");
        assert_eq!(conn.strategy, "proximity");
        assert_eq!(conn.params["radius"].as_float(), Some(40.0));
    }

    #[test]
    fn test_connection_order_is_file_order() {
        let blueprint: Blueprint = toml::from_str(
            r#"
            [[connection]]
            name = "second_reads_first"
            strategy = "proximity"

            [[connection]]
            name = "first"
            strategy = "box"
            "#,
        )
        .unwrap();
        let names: Vec<_> = blueprint.connections.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["second_reads_first", "first"]);
    }

    #[test]
    fn test_defaults_apply_without_sections() {
        let blueprint: Blueprint = toml::from_str("").unwrap();
        assert_eq!(blueprint.simulation.seed, None);
        assert_eq!(blueprint.simulation.volume.x, 400.0);
        assert!(blueprint.scalars.is_empty());
    }
}
