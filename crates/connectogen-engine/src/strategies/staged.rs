// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Two-phase matching with a shared per-anchor total.

Phase one claims candidates inside a planar radius of each anchor, closest
first with distance rejection, consuming each claimed candidate for good
(ascending-segment style contacts). Phase two tops every anchor up to
`stage1_convergence + stage2_convergence` total edges with a uniform pick
from an axis interval, never re-pairing a candidate its anchor already
claimed in phase one (fiber-passage style contacts).

Optionally records a per-candidate fiber height dataset, drawn uniformly
from a configured interval above each candidate's soma, for later strategies
that match against fiber endpoints instead of somata.
*/

use ahash::AHashSet;
use ndarray::Array1;
use rand::Rng;
use serde::Deserialize;

use connectogen_structures::Dataset;

use crate::error::{ConfigurationError, EngineResult, SupplyError};
use crate::geometry::{AxisSpan, WithinRadius};
use crate::matcher::{Acceptance, Cap, CandidateOrder, MatchSettings, ProximityMatcher};
use crate::scaffold::Scaffold;
use crate::spatial::Plane;
use crate::strategies::{
    parse_params, record_matched, required_population, ConnectionStrategy, ScalarRef,
    StrategyReport,
};

#[derive(Debug, Clone, Deserialize)]
struct HeightParams {
    dataset: String,
    min: ScalarRef,
    max: ScalarRef,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StagedParams {
    from: String,
    to: String,
    stage1_tag: String,
    stage2_tag: String,
    radius: ScalarRef,
    stage1_convergence: u32,
    stage2_convergence: u32,
    /// Plane of the phase-one radius test; the vertical axis is normally
    /// projected out because the rising segment spans it anyway.
    #[serde(default = "default_stage1_plane")]
    stage1_plane: Plane,
    heights: Option<HeightParams>,
}

fn default_stage1_plane() -> Plane {
    Plane::Xz
}

pub(super) struct StagedStrategy {
    name: String,
    params: StagedParams,
}

pub(super) fn build(
    name: &str,
    params: &toml::Table,
) -> Result<Box<dyn ConnectionStrategy>, ConfigurationError> {
    let params: StagedParams = parse_params(name, params)?;
    Ok(Box::new(StagedStrategy { name: name.to_string(), params }))
}

impl ConnectionStrategy for StagedStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "staged_proximity"
    }

    fn validate(&self, scaffold: &Scaffold) -> Result<(), ConfigurationError> {
        required_population(&self.name, scaffold, &self.params.from)?;
        required_population(&self.name, scaffold, &self.params.to)?;
        self.params.radius.resolve(&self.name, scaffold)?;
        if let Some(heights) = &self.params.heights {
            let min = heights.min.resolve(&self.name, scaffold)?;
            let max = heights.max.resolve(&self.name, scaffold)?;
            if !(max >= min) {
                return Err(ConfigurationError::InvalidParameter {
                    strategy: self.name.clone(),
                    parameter: "heights",
                    reason: format!("max ({}) must be at least min ({})", max, min),
                });
            }
        }
        Ok(())
    }

    fn connect(&mut self, scaffold: &mut Scaffold) -> EngineResult<StrategyReport> {
        let from = required_population(&self.name, scaffold, &self.params.from)?;
        let to = required_population(&self.name, scaffold, &self.params.to)?;
        let radius = self.params.radius.resolve(&self.name, scaffold)?;
        let mut report = StrategyReport::default();

        // Phase one is exclusive; its supply precondition is checked up
        // front so a failed run leaves the store untouched.
        if from.len() < to.len() {
            return Err(SupplyError::ExclusiveUnderSupply {
                from: from.name().to_string(),
                from_count: from.len(),
                to: to.name().to_string(),
                to_count: to.len(),
            }
            .into());
        }

        if let Some(heights) = &self.params.heights {
            let min = heights.min.resolve(&self.name, scaffold)?;
            let max = heights.max.resolve(&self.name, scaffold)?;
            let values: Vec<f64> = from
                .positions()
                .iter()
                .map(|p| p[1] + scaffold.rng().gen_range(min..=max))
                .collect();
            scaffold.record_dataset(&heights.dataset, Dataset::PerCell(Array1::from(values)))?;
            report.datasets.push(heights.dataset.clone());
        }

        // Phase one: planar radius, closest first, distance rejection,
        // single-use candidates. Exclusivity demands supply up front.
        let stage1_geometry = WithinRadius::new(radius, self.params.stage1_plane);
        let mut stage1 = ProximityMatcher::new(
            &from,
            &to,
            &stage1_geometry,
            MatchSettings {
                convergence: Cap::Limit(self.params.stage1_convergence),
                divergence: Cap::Limit(1),
                exclusive: true,
                order: CandidateOrder::ClosestFirst,
                acceptance: Acceptance::Distance,
            },
        )
        .with_index(scaffold.index_for(&from, self.params.stage1_plane))
        .run(scaffold.rng())?;

        // Each anchor's phase-two budget tops it up to the shared total, and
        // its own phase-one picks are off limits.
        let total = self.params.stage1_convergence + self.params.stage2_convergence;
        let budgets: Vec<u32> = stage1
            .accepted_per_anchor
            .iter()
            .map(|&got| total - got)
            .collect();
        let mut forbidden: AHashSet<(u32, u32)> = AHashSet::new();
        for edge in &stage1.edges {
            // Rows exist by construction; the matcher emitted these ids.
            if let (Some(f), Some(t)) = (from.row_of(edge.source), to.row_of(edge.target)) {
                forbidden.insert((f as u32, t as u32));
            }
        }

        let stage2_geometry = AxisSpan::new([Some(radius), None, None]);
        let mut stage2 = ProximityMatcher::new(
            &from,
            &to,
            &stage2_geometry,
            MatchSettings {
                convergence: Cap::Unlimited, // overridden per anchor
                divergence: Cap::Unlimited,
                exclusive: false,
                order: CandidateOrder::Random,
                acceptance: Acceptance::Always,
            },
        )
        .with_index(scaffold.index_for(&from, Plane::X))
        .with_budgets(&budgets)
        .with_forbidden(&forbidden)
        .run(scaffold.rng())?;

        // Each phase's tag comes out grouped by target cell.
        stage1.edges.sort_unstable_by_key(|e| (e.target, e.source));
        stage2.edges.sort_unstable_by_key(|e| (e.target, e.source));

        record_matched(scaffold, &self.name, &self.params.stage1_tag, stage1, &mut report)?;
        record_matched(scaffold, &self.name, &self.params.stage2_tag, stage2, &mut report)?;
        Ok(report)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::build_strategy;
    use crate::SupplyError;
    use connectogen_structures::{CellId, Population};

    fn table(toml: &str) -> toml::Table {
        toml::from_str(toml).unwrap()
    }

    fn run(scaffold: &mut Scaffold, params: &str) -> EngineResult<StrategyReport> {
        let mut instance = build_strategy("staged_proximity", "granule_to_golgi", &table(params)).unwrap();
        instance.validate(scaffold)?;
        instance.connect(scaffold)
    }

    fn grid_population(name: &str, first_id: CellId, n: usize, y: f64) -> Population {
        Population::new(
            name,
            first_id,
            (0..n).map(|i| [(i % 10) as f64, y, (i / 10) as f64]).collect(),
        )
    }

    const PARAMS: &str = r#"
        from = "granule"
        to = "golgi"
        stage1_tag = "ascending_to_golgi"
        stage2_tag = "fiber_to_golgi"
        radius = 6.0
        stage1_convergence = 2
        stage2_convergence = 3
        heights = { dataset = "fiber_heights", min = 10.0, max = 20.0 }
    "#;

    #[test]
    fn anchors_reach_the_shared_total_when_supply_allows() {
        let mut scaffold = Scaffold::new(77);
        scaffold
            .add_population(grid_population("granule", 0, 200, 0.0))
            .unwrap();
        scaffold
            .add_population(Population::new(
                "golgi",
                1000,
                vec![[4.0, 1.0, 4.0], [6.0, 1.0, 6.0]],
            ))
            .unwrap();

        let report = run(&mut scaffold, PARAMS).unwrap();

        let stage1 = scaffold.edges("ascending_to_golgi").unwrap();
        let stage2 = scaffold.edges("fiber_to_golgi").unwrap();
        for golgi in [1000u64, 1001] {
            let got1 = stage1.targets().filter(|&t| t == golgi).count();
            let got2 = stage2.targets().filter(|&t| t == golgi).count();
            assert!(got1 <= 2);
            assert_eq!(got1 + got2, 5, "anchor {} should reach the total", golgi);
        }
        assert_eq!(report.tags.len(), 2);
        assert_eq!(report.datasets, vec!["fiber_heights".to_string()]);
    }

    #[test]
    fn stage_one_candidates_are_single_use() {
        let mut scaffold = Scaffold::new(78);
        scaffold
            .add_population(grid_population("granule", 0, 100, 0.0))
            .unwrap();
        scaffold
            .add_population(Population::new(
                "golgi",
                1000,
                vec![[4.0, 1.0, 4.0], [4.5, 1.0, 4.5], [5.0, 1.0, 5.0]],
            ))
            .unwrap();

        run(&mut scaffold, PARAMS).unwrap();

        let mut sources: Vec<_> = scaffold
            .edges("ascending_to_golgi")
            .unwrap()
            .sources()
            .collect();
        let before = sources.len();
        sources.sort_unstable();
        sources.dedup();
        assert_eq!(sources.len(), before);
    }

    #[test]
    fn no_anchor_repairs_its_own_stage_one_pick() {
        let mut scaffold = Scaffold::new(79);
        scaffold
            .add_population(grid_population("granule", 0, 60, 0.0))
            .unwrap();
        scaffold
            .add_population(Population::new("golgi", 1000, vec![[4.0, 1.0, 4.0]]))
            .unwrap();

        run(&mut scaffold, PARAMS).unwrap();

        let stage1: Vec<(u64, u64)> = scaffold
            .edges("ascending_to_golgi")
            .unwrap()
            .edges()
            .iter()
            .map(|e| (e.source, e.target))
            .collect();
        let stage2 = scaffold.edges("fiber_to_golgi").unwrap();
        for edge in stage2.edges() {
            assert!(
                !stage1.contains(&(edge.source, edge.target)),
                "pair ({}, {}) appears in both stages",
                edge.source,
                edge.target
            );
        }
    }

    #[test]
    fn heights_sit_in_the_configured_interval_above_each_soma() {
        let mut scaffold = Scaffold::new(80);
        scaffold
            .add_population(grid_population("granule", 0, 50, 3.0))
            .unwrap();
        scaffold
            .add_population(Population::new("golgi", 1000, vec![[4.0, 1.0, 4.0]]))
            .unwrap();

        run(&mut scaffold, PARAMS).unwrap();

        let dataset = scaffold.dataset("fiber_heights").unwrap();
        let heights = dataset.as_per_cell().unwrap();
        assert_eq!(heights.len(), 50);
        // Soma y is 3.0, interval [10, 20] above it.
        assert!(heights.iter().all(|&h| (13.0..=23.0).contains(&h)));
    }

    #[test]
    fn under_supply_fails_before_anything_is_recorded() {
        let mut scaffold = Scaffold::new(81);
        scaffold
            .add_population(Population::new("granule", 0, vec![[0.0; 3]]))
            .unwrap();
        scaffold
            .add_population(Population::new(
                "golgi",
                1000,
                vec![[0.0; 3], [1.0, 0.0, 0.0]],
            ))
            .unwrap();

        let err = run(&mut scaffold, PARAMS).unwrap_err();
        assert!(matches!(
            err,
            crate::EngineError::Supply(SupplyError::ExclusiveUnderSupply { .. })
        ));
        assert!(scaffold.edges("ascending_to_golgi").is_none());
        assert!(scaffold.edges("fiber_to_golgi").is_none());
        assert!(scaffold.dataset("fiber_heights").is_none());
    }

    #[test]
    fn inverted_height_interval_fails_validation() {
        let mut scaffold = Scaffold::new(0);
        scaffold
            .add_population(Population::new("granule", 0, vec![[0.0; 3]]))
            .unwrap();
        scaffold
            .add_population(Population::new("golgi", 10, vec![[0.0; 3]]))
            .unwrap();
        let mut instance = build_strategy(
            "staged_proximity",
            "bad",
            &table(
                r#"
                from = "granule"
                to = "golgi"
                stage1_tag = "a"
                stage2_tag = "b"
                radius = 5.0
                stage1_convergence = 1
                stage2_convergence = 1
                heights = { dataset = "h", min = 20.0, max = 10.0 }
                "#,
            ),
        )
        .unwrap();
        let err = instance.validate(&scaffold).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidParameter { .. }));
    }
}
