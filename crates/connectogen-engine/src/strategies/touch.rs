// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Morphology touch detection as a connection strategy. Thin wrapper that
//! pulls the two populations and their cell-plane indexes out of the
//! scaffold and hands them to [`TouchDetector`].

use serde::Deserialize;

use connectogen_structures::EdgeList;

use crate::error::{ConfigurationError, EngineResult};
use crate::scaffold::Scaffold;
use crate::spatial::Plane;
use crate::strategies::{
    parse_params, required_population, ConnectionStrategy, ScalarRef, StrategyReport,
};
use crate::touch::TouchDetector;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TouchParams {
    from: String,
    to: String,
    tag: String,
    /// Plane the cell-level candidate query runs on.
    #[serde(default)]
    cell_intersection_plane: Plane,
    /// Plane compartment overlap is measured on.
    #[serde(default)]
    compartment_intersection_plane: Plane,
    /// Override for the cell-level query radius. Defaults to the sum of the
    /// two populations' search radii.
    radius: Option<ScalarRef>,
}

pub(super) struct TouchStrategy {
    name: String,
    params: TouchParams,
}

pub(super) fn build(
    name: &str,
    params: &toml::Table,
) -> Result<Box<dyn ConnectionStrategy>, ConfigurationError> {
    let params: TouchParams = parse_params(name, params)?;
    Ok(Box::new(TouchStrategy { name: name.to_string(), params }))
}

impl ConnectionStrategy for TouchStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "touch"
    }

    fn validate(&self, scaffold: &Scaffold) -> Result<(), ConfigurationError> {
        for name in [&self.params.from, &self.params.to] {
            let population = required_population(&self.name, scaffold, name)?;
            if !population.has_morphologies() {
                return Err(ConfigurationError::InvalidParameter {
                    strategy: self.name.clone(),
                    parameter: "from/to",
                    reason: format!("population '{}' has no morphologies", name),
                });
            }
        }
        if let Some(radius) = &self.params.radius {
            radius.resolve(&self.name, scaffold)?;
        }
        Ok(())
    }

    fn connect(&mut self, scaffold: &mut Scaffold) -> EngineResult<StrategyReport> {
        let from = required_population(&self.name, scaffold, &self.params.from)?;
        let to = required_population(&self.name, scaffold, &self.params.to)?;
        let radius = self
            .params
            .radius
            .as_ref()
            .map(|r| r.resolve(&self.name, scaffold))
            .transpose()?;

        let mut detector = TouchDetector::new(
            &from,
            &to,
            self.params.cell_intersection_plane,
            self.params.compartment_intersection_plane,
        );
        if let Some(radius) = radius {
            detector = detector.with_radius(radius);
        }

        let from_index = scaffold.index_for(&from, self.params.cell_intersection_plane);
        let to_index = scaffold.index_for(&to, self.params.cell_intersection_plane);
        let (edges, compartments) = detector.detect(&from_index, &to_index, scaffold.rng());

        let mut report = StrategyReport::default();
        report.tags.push((self.params.tag.clone(), edges.len()));
        scaffold.record_edges(
            &self.params.tag,
            EdgeList::with_compartments(edges, compartments)?,
        )?;
        Ok(report)
    }
}

// ============================================================================
// Tests
// ============================================================================
