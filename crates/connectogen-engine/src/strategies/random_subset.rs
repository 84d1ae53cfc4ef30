// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Geometry-free uniform sampling.

Each anchor draws `count` partners uniformly without replacement from the
whole opposite population. Covers long-range afferent collaterals where
position does not gate eligibility, anchored on either side of the edge:
convergent fills (`anchor = "to"`, the default) pick sources per target,
divergent fans (`anchor = "from"`) pick targets per source. A coin-flip
count (`count = { coin_flip = [a, b] }`) preserves rules that split a
population between two fan-out degrees.

Optionally records a per-cell orientation dataset for the `to` population:
one unit plane normal plus offset per cell, drawn from the run RNG, for
later strategies that measure distance to an oriented dendritic plane.
*/

use ndarray::Array2;
use rand::Rng;
use serde::Deserialize;

use connectogen_structures::Dataset;

use crate::error::{ConfigurationError, EngineResult};
use crate::geometry::Always;
use crate::matcher::{Acceptance, Cap, CandidateOrder, MatchSettings, ProximityMatcher};
use crate::scaffold::Scaffold;
use crate::strategies::{
    parse_params, record_matched, required_population, AnchorSide, ConnectionStrategy,
    StrategyReport,
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RandomSubsetParams {
    from: String,
    to: String,
    tag: String,
    count: Cap,
    #[serde(default)]
    anchor: AnchorSide,
    orientation_dataset: Option<String>,
}

pub(super) struct RandomSubsetStrategy {
    name: String,
    params: RandomSubsetParams,
}

pub(super) fn build(
    name: &str,
    params: &toml::Table,
) -> Result<Box<dyn ConnectionStrategy>, ConfigurationError> {
    let params: RandomSubsetParams = parse_params(name, params)?;
    Ok(Box::new(RandomSubsetStrategy { name: name.to_string(), params }))
}

impl ConnectionStrategy for RandomSubsetStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "random_subset"
    }

    fn validate(&self, scaffold: &Scaffold) -> Result<(), ConfigurationError> {
        required_population(&self.name, scaffold, &self.params.from)?;
        required_population(&self.name, scaffold, &self.params.to)?;
        Ok(())
    }

    fn connect(&mut self, scaffold: &mut Scaffold) -> EngineResult<StrategyReport> {
        let from = required_population(&self.name, scaffold, &self.params.from)?;
        let to = required_population(&self.name, scaffold, &self.params.to)?;
        let mut report = StrategyReport::default();

        // Orientations describe the `to` cells and are recorded up front,
        // even when that population is too small to take any edges.
        if let Some(name) = &self.params.orientation_dataset {
            let mut planes = Array2::zeros((to.len(), 4));
            for (row, position) in to.positions().iter().enumerate() {
                let normal = random_unit_vector(scaffold.rng());
                let offset = -(normal[0] * position[0]
                    + normal[1] * position[1]
                    + normal[2] * position[2]);
                planes[[row, 0]] = normal[0];
                planes[[row, 1]] = normal[1];
                planes[[row, 2]] = normal[2];
                planes[[row, 3]] = offset;
            }
            scaffold.record_dataset(name, Dataset::Table(planes))?;
            report.datasets.push(name.clone());
        }

        let (candidates, anchors) = match self.params.anchor {
            AnchorSide::To => (&from, &to),
            AnchorSide::From => (&to, &from),
        };
        let settings = MatchSettings {
            convergence: self.params.count,
            divergence: Cap::Unlimited,
            exclusive: false,
            order: CandidateOrder::Random,
            acceptance: Acceptance::Always,
        };
        let mut outcome = ProximityMatcher::new(candidates, anchors, &Always, settings)
            .run(scaffold.rng())?;
        if self.params.anchor == AnchorSide::From {
            outcome = outcome.flipped();
        }

        record_matched(scaffold, &self.name, &self.params.tag, outcome, &mut report)?;
        Ok(report)
    }
}

/// Uniformly distributed unit vector, by rejection from the unit cube.
fn random_unit_vector(rng: &mut rand::rngs::StdRng) -> [f64; 3] {
    loop {
        let v = [
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
        ];
        let norm_sq: f64 = v.iter().map(|c| c * c).sum();
        if norm_sq > 1e-6 && norm_sq <= 1.0 {
            let norm = norm_sq.sqrt();
            return [v[0] / norm, v[1] / norm, v[2] / norm];
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::build_strategy;
    use connectogen_structures::Population;
    use rand::SeedableRng;

    fn table(toml: &str) -> toml::Table {
        toml::from_str(toml).unwrap()
    }

    fn run(scaffold: &mut Scaffold, params: &str) -> EngineResult<StrategyReport> {
        let mut instance = build_strategy("random_subset", "subset", &table(params)).unwrap();
        instance.validate(scaffold)?;
        instance.connect(scaffold)
    }

    fn line(name: &str, first_id: u64, n: usize) -> Population {
        Population::new(name, first_id, (0..n).map(|i| [i as f64, 0.0, 0.0]).collect())
    }

    #[test]
    fn each_anchor_draws_exactly_count_distinct_sources() {
        let mut scaffold = Scaffold::new(55);
        scaffold.add_population(line("glom", 0, 40)).unwrap();
        scaffold.add_population(line("dcn", 100, 5)).unwrap();

        run(
            &mut scaffold,
            r#"
            from = "glom"
            to = "dcn"
            tag = "glom_to_dcn"
            count = 6
            "#,
        )
        .unwrap();

        let edges = scaffold.edges("glom_to_dcn").unwrap();
        assert_eq!(edges.len(), 30);
        for dcn in 100..105u64 {
            let mut sources: Vec<_> = edges
                .edges()
                .iter()
                .filter(|e| e.target == dcn)
                .map(|e| e.source)
                .collect();
            assert_eq!(sources.len(), 6);
            sources.sort_unstable();
            sources.dedup();
            assert_eq!(sources.len(), 6, "replacement draw for anchor {}", dcn);
        }
    }

    #[test]
    fn small_partner_population_connects_fully_per_anchor() {
        // Fewer partners than the requested fan: every partner connects.
        let mut scaffold = Scaffold::new(56);
        scaffold.add_population(line("purkinje", 0, 4)).unwrap();
        scaffold.add_population(line("dcn", 100, 3)).unwrap();

        let report = run(
            &mut scaffold,
            r#"
            from = "purkinje"
            to = "dcn"
            tag = "pc_to_dcn"
            count = 5
            anchor = "from"
            "#,
        )
        .unwrap();

        let edges = scaffold.edges("pc_to_dcn").unwrap();
        assert_eq!(edges.len(), 12);
        for pc in 0..4u64 {
            assert_eq!(edges.sources().filter(|&s| s == pc).count(), 3);
        }
        assert_eq!(report.under_connected, 4);
    }

    #[test]
    fn coin_flip_count_splits_the_anchors_between_two_degrees() {
        let mut scaffold = Scaffold::new(57);
        scaffold.add_population(line("purkinje", 0, 64)).unwrap();
        scaffold.add_population(line("dcn", 1000, 30)).unwrap();

        run(
            &mut scaffold,
            r#"
            from = "purkinje"
            to = "dcn"
            tag = "pc_to_dcn"
            count = { coin_flip = [5, 4] }
            anchor = "from"
            "#,
        )
        .unwrap();

        let edges = scaffold.edges("pc_to_dcn").unwrap();
        let mut fives = 0;
        let mut fours = 0;
        for pc in 0..64u64 {
            match edges.sources().filter(|&s| s == pc).count() {
                5 => fives += 1,
                4 => fours += 1,
                other => panic!("purkinje {} has fan {}", pc, other),
            }
        }
        assert!(fives > 0 && fours > 0);
        assert_eq!(fives + fours, 64);
    }

    #[test]
    fn orientation_dataset_carries_unit_plane_normals() {
        let mut scaffold = Scaffold::new(58);
        scaffold.add_population(line("purkinje", 0, 3)).unwrap();
        scaffold.add_population(line("dcn", 100, 7)).unwrap();

        run(
            &mut scaffold,
            r#"
            from = "purkinje"
            to = "dcn"
            tag = "pc_to_dcn"
            count = 2
            anchor = "from"
            orientation_dataset = "dcn_orientations"
            "#,
        )
        .unwrap();

        let table = scaffold
            .dataset("dcn_orientations")
            .unwrap()
            .as_table()
            .unwrap()
            .clone();
        assert_eq!(table.nrows(), 7);
        assert_eq!(table.ncols(), 4);
        for row in table.rows() {
            let norm = (row[0] * row[0] + row[1] * row[1] + row[2] * row[2]).sqrt();
            assert!((norm - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn unit_vectors_are_unit_length() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let v = random_unit_vector(&mut rng);
            let norm: f64 = v.iter().map(|c| c * c).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn missing_count_is_rejected_at_build() {
        let err = build("bad", &table("from = \"a\"\nto = \"b\"\ntag = \"t\""))
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::BadParameters { .. }));
    }
}
