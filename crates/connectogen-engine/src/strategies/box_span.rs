// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Axis-aligned box matching.

Candidates whose soma (optionally inflated by a placement radius) falls
inside a per-axis interval around the anchor. Covers axonal field rules
(axon box around the source soma, `anchor = "from"`), dendritic tree plates
(x/z extent around the anchor), and box-shaped gap junction fields.

An optional planar gauge replaces the box's own closeness for distance
rejection, normalizing by an external scale such as a layer thickness.
*/

use serde::Deserialize;

use crate::error::{ConfigurationError, EngineResult};
use crate::geometry::{AxisSpan, Composite, Geometry, PlanarGauge};
use crate::matcher::{Acceptance, Cap, CandidateOrder, MatchSettings, ProximityMatcher};
use crate::scaffold::Scaffold;
use crate::spatial::Plane;
use crate::strategies::{
    parse_params, record_matched, required_population, AnchorSide, ConnectionStrategy, ScalarRef,
    StrategyReport,
};

#[derive(Debug, Clone, Deserialize)]
struct GaugeParams {
    plane: Plane,
    norm: ScalarRef,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BoxParams {
    from: String,
    to: String,
    tag: String,
    /// Half-widths per axis; an absent axis is unconstrained.
    limit_x: Option<ScalarRef>,
    limit_y: Option<ScalarRef>,
    limit_z: Option<ScalarRef>,
    /// Widens every constrained axis, e.g. by the candidate placement radius.
    inflate: Option<ScalarRef>,
    #[serde(default)]
    convergence: Cap,
    #[serde(default)]
    divergence: Cap,
    #[serde(default)]
    exclusive: bool,
    #[serde(default)]
    selection: CandidateOrder,
    #[serde(default)]
    acceptance: Acceptance,
    #[serde(default)]
    anchor: AnchorSide,
    gauge: Option<GaugeParams>,
}

pub(super) struct BoxStrategy {
    name: String,
    params: BoxParams,
}

pub(super) fn build(
    name: &str,
    params: &toml::Table,
) -> Result<Box<dyn ConnectionStrategy>, ConfigurationError> {
    let params: BoxParams = parse_params(name, params)?;
    Ok(Box::new(BoxStrategy { name: name.to_string(), params }))
}

impl BoxStrategy {
    fn geometry(&self, scaffold: &Scaffold) -> Result<Composite, ConfigurationError> {
        let mut half = [None; 3];
        for (slot, limit) in half.iter_mut().zip([
            &self.params.limit_x,
            &self.params.limit_y,
            &self.params.limit_z,
        ]) {
            if let Some(limit) = limit {
                *slot = Some(limit.resolve(&self.name, scaffold)?);
            }
        }
        if half.iter().all(Option::is_none) {
            return Err(ConfigurationError::MissingParameter {
                strategy: self.name.clone(),
                parameter: "limit_x/limit_y/limit_z",
            });
        }
        let mut span = AxisSpan::new(half);
        if let Some(inflate) = &self.params.inflate {
            span = span.with_inflation(inflate.resolve(&self.name, scaffold)?);
        }
        let mut composite = Composite::new(vec![Box::new(span) as Box<dyn Geometry>]);
        if let Some(gauge) = &self.params.gauge {
            let norm = gauge.norm.resolve(&self.name, scaffold)?;
            composite = composite.with_gauge(Box::new(PlanarGauge::new(gauge.plane, norm)));
        }
        Ok(composite)
    }
}

impl ConnectionStrategy for BoxStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "box"
    }

    fn validate(&self, scaffold: &Scaffold) -> Result<(), ConfigurationError> {
        required_population(&self.name, scaffold, &self.params.from)?;
        required_population(&self.name, scaffold, &self.params.to)?;
        self.geometry(scaffold)?;
        Ok(())
    }

    fn connect(&mut self, scaffold: &mut Scaffold) -> EngineResult<StrategyReport> {
        let from = required_population(&self.name, scaffold, &self.params.from)?;
        let to = required_population(&self.name, scaffold, &self.params.to)?;
        let geometry = self.geometry(scaffold)?;

        let (candidates, anchors) = match self.params.anchor {
            AnchorSide::To => (&from, &to),
            AnchorSide::From => (&to, &from),
        };
        let settings = MatchSettings {
            convergence: self.params.convergence,
            divergence: self.params.divergence,
            exclusive: self.params.exclusive,
            order: self.params.selection,
            acceptance: self.params.acceptance,
        };
        let mut matcher = ProximityMatcher::new(candidates, anchors, &geometry, settings);
        if let Some((plane, _)) = geometry.shortlist() {
            matcher = matcher.with_index(scaffold.index_for(candidates, plane));
        }

        let mut outcome = matcher.run(scaffold.rng())?;
        if self.params.anchor == AnchorSide::From {
            outcome = outcome.flipped();
        }

        let mut report = StrategyReport::default();
        record_matched(scaffold, &self.name, &self.params.tag, outcome, &mut report)?;
        Ok(report)
    }
}

// ============================================================================
// Tests
// ============================================================================
