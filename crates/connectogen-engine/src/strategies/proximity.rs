// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Radius-based matching.

The workhorse kind: candidates within a projected Euclidean ball of the
anchor, optionally further gated by an axis interval or a half-space on the
soma ordering, matched under the usual caps. Covers afferent capture rules
(closest-N within dendrite reach), soma-above dendrite rules, and planar
gap junctions within the same population (`anchor = "from"`).

With `from_y_dataset` the candidates' y coordinates are replaced by a
recorded per-cell dataset before matching, so fiber endpoints rather than
somata enter the distance test.
*/

use serde::Deserialize;

use connectogen_structures::Point;

use crate::error::{ConfigurationError, EngineResult, SupplyError};
use crate::geometry::{Axis, AxisSpan, Composite, Geometry, HalfSpace, Relation, WithinRadius};
use crate::matcher::{Acceptance, Cap, CandidateOrder, MatchSettings, ProximityMatcher};
use crate::scaffold::Scaffold;
use crate::spatial::Plane;
use crate::strategies::{
    parse_params, record_matched, required_population, AnchorSide, ConnectionStrategy, ScalarRef,
    StrategyReport,
};

#[derive(Debug, Clone, Deserialize)]
struct AxisLimit {
    axis: Axis,
    within: ScalarRef,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct HalfSpaceParams {
    axis: Axis,
    relation: Relation,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProximityParams {
    from: String,
    to: String,
    tag: String,
    radius: ScalarRef,
    #[serde(default)]
    plane: Plane,
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
    axis_limit: Option<AxisLimit>,
    half_space: Option<HalfSpaceParams>,
    from_y_dataset: Option<String>,
}

pub(super) struct ProximityStrategy {
    name: String,
    params: ProximityParams,
}

pub(super) fn build(
    name: &str,
    params: &toml::Table,
) -> Result<Box<dyn ConnectionStrategy>, ConfigurationError> {
    let params: ProximityParams = parse_params(name, params)?;
    Ok(Box::new(ProximityStrategy { name: name.to_string(), params }))
}

impl ProximityStrategy {
    fn geometry(&self, scaffold: &Scaffold) -> Result<Composite, ConfigurationError> {
        let radius = self.params.radius.resolve(&self.name, scaffold)?;
        let mut gates: Vec<Box<dyn Geometry>> =
            vec![Box::new(WithinRadius::new(radius, self.params.plane))];
        if let Some(limit) = &self.params.axis_limit {
            let within = limit.within.resolve(&self.name, scaffold)?;
            let mut half = [None; 3];
            half[limit.axis.index()] = Some(within);
            gates.push(Box::new(AxisSpan::new(half)));
        }
        if let Some(hs) = self.params.half_space {
            gates.push(Box::new(HalfSpace::new(hs.axis, hs.relation)));
        }
        Ok(Composite::new(gates))
    }

    /// Candidate positions with y replaced by the named dataset, which must
    /// cover the whole candidate population.
    fn substituted_positions(
        &self,
        scaffold: &Scaffold,
        name: &str,
        candidates: &connectogen_structures::Population,
    ) -> Result<Vec<Point>, SupplyError> {
        let dataset = scaffold
            .dataset(name)
            .ok_or_else(|| SupplyError::MissingDataset(name.to_string()))?;
        let heights = dataset
            .as_per_cell()
            .ok_or_else(|| SupplyError::DatasetMismatch {
                name: name.to_string(),
                expected: candidates.len(),
                got: dataset.rows(),
            })?;
        if heights.len() != candidates.len() {
            return Err(SupplyError::DatasetMismatch {
                name: name.to_string(),
                expected: candidates.len(),
                got: heights.len(),
            });
        }
        Ok(candidates
            .positions()
            .iter()
            .zip(heights.iter())
            .map(|(&[x, _, z], &y)| [x, y, z])
            .collect())
    }
}

impl ConnectionStrategy for ProximityStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "proximity"
    }

    fn validate(&self, scaffold: &Scaffold) -> Result<(), ConfigurationError> {
        required_population(&self.name, scaffold, &self.params.from)?;
        required_population(&self.name, scaffold, &self.params.to)?;
        self.geometry(scaffold)?;
        if self.params.anchor == AnchorSide::From {
            // From-anchored runs feed the geometry with swapped arguments;
            // only symmetric gates survive that, and the dataset substitute
            // applies to the candidate side which would no longer be `from`.
            if self.params.half_space.is_some() {
                return Err(ConfigurationError::InvalidParameter {
                    strategy: self.name.clone(),
                    parameter: "half_space",
                    reason: "cannot combine with anchor = \"from\"".to_string(),
                });
            }
            if self.params.from_y_dataset.is_some() {
                return Err(ConfigurationError::InvalidParameter {
                    strategy: self.name.clone(),
                    parameter: "from_y_dataset",
                    reason: "cannot combine with anchor = \"from\"".to_string(),
                });
            }
        }
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

        if let Some(dataset) = &self.params.from_y_dataset {
            // Substituted coordinates invalidate the cached index; fall back
            // to a full predicate scan like the source rule did.
            let positions = self.substituted_positions(scaffold, dataset, candidates)?;
            matcher = matcher.with_from_positions(positions);
        } else if let Some((plane, _)) = geometry.shortlist() {
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
