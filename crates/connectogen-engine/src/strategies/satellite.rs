// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Satellite mirroring.

A satellite population shadows a planet population cell for cell: whatever
connected onto planet cell `k` in an earlier tag also connects onto
satellite cell `k`. Rows are translated through the populations' explicit
id maps rather than raw id offset arithmetic, so sparse id ranges cannot
silently mispair cells.
*/

use serde::Deserialize;

use connectogen_structures::{Edge, EdgeList};

use crate::error::{ConfigurationError, EngineResult, SupplyError};
use crate::scaffold::Scaffold;
use crate::strategies::{
    parse_params, required_edges, required_population, ConnectionStrategy, StrategyReport,
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SatelliteParams {
    /// The satellite population receiving the mirrored edges.
    to: String,
    /// The population the satellites shadow.
    planet: String,
    /// Earlier tag whose edges target the planet population.
    follow_tag: String,
    tag: String,
}

pub(super) struct SatelliteStrategy {
    name: String,
    params: SatelliteParams,
}

pub(super) fn build(
    name: &str,
    params: &toml::Table,
) -> Result<Box<dyn ConnectionStrategy>, ConfigurationError> {
    let params: SatelliteParams = parse_params(name, params)?;
    Ok(Box::new(SatelliteStrategy { name: name.to_string(), params }))
}

impl ConnectionStrategy for SatelliteStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "satellite"
    }

    fn validate(&self, scaffold: &Scaffold) -> Result<(), ConfigurationError> {
        required_population(&self.name, scaffold, &self.params.to)?;
        required_population(&self.name, scaffold, &self.params.planet)?;
        Ok(())
    }

    fn connect(&mut self, scaffold: &mut Scaffold) -> EngineResult<StrategyReport> {
        let satellites = required_population(&self.name, scaffold, &self.params.to)?;
        let planets = required_population(&self.name, scaffold, &self.params.planet)?;
        let followed = required_edges(scaffold, &self.params.follow_tag)?;

        let mut edges = Vec::with_capacity(followed.len());
        for edge in followed.edges() {
            let row = planets
                .row_of(edge.target)
                .ok_or_else(|| SupplyError::ForeignCell {
                    tag: self.params.follow_tag.clone(),
                    cell: edge.target,
                    population: planets.name().to_string(),
                })?;
            if row >= satellites.len() {
                return Err(SupplyError::SatelliteUnderSupply {
                    satellite: satellites.name().to_string(),
                    satellite_count: satellites.len(),
                    planet: planets.name().to_string(),
                    row,
                }
                .into());
            }
            edges.push(Edge::new(edge.source, satellites.id_at(row)));
        }

        let mut report = StrategyReport::default();
        report.tags.push((self.params.tag.clone(), edges.len()));
        scaffold.record_edges(&self.params.tag, EdgeList::new(edges))?;
        Ok(report)
    }
}

// ============================================================================
// Tests
// ============================================================================
