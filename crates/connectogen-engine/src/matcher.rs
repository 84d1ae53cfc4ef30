// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Degree-constrained stochastic matching.

One algorithm sits behind every matcher-based connection strategy. For each
cell of the `to` population, visited in seeded random order, it shortlists
geometrically eligible `from` candidates, randomizes them, walks them
closest first with per-pair distance rejection (both overridable), and
accepts until the anchor's convergence budget is met.
Divergence budgets cap how often each candidate can be given out; exclusive
runs additionally demand enough candidates to cover every anchor up front.

Candidates that run out produce under-connection notices on the outcome,
never errors. All randomness comes from the single RNG passed to `run`, so a
seed fully determines the output.
*/

use std::borrow::Cow;
use std::cmp::Ordering;
use std::sync::Arc;

use ahash::AHashSet;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;

use connectogen_structures::{CellId, Edge, Point, Population};

use crate::error::SupplyError;
use crate::geometry::Geometry;
use crate::spatial::KdTree;

/// Degree budget for one side of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cap {
    #[default]
    Unlimited,
    Limit(u32),
    /// Fair coin between two limits, drawn per cell. Kept for rules that
    /// split a population between two degrees (e.g. Purkinje fan-out of
    /// `div` or `div - 1`).
    CoinFlip(u32, u32),
}

impl Cap {
    /// Concrete budget for one cell; `None` means unlimited.
    pub fn resolve(&self, rng: &mut StdRng) -> Option<u32> {
        match *self {
            Cap::Unlimited => None,
            Cap::Limit(n) => Some(n),
            Cap::CoinFlip(a, b) => Some(if rng.gen::<bool>() { a } else { b }),
        }
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, Cap::Unlimited)
    }
}

impl<'de> Deserialize<'de> for Cap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Limit(u32),
            CoinFlip { coin_flip: [u32; 2] },
        }
        Ok(match Repr::deserialize(deserializer)? {
            Repr::Limit(n) => Cap::Limit(n),
            Repr::CoinFlip { coin_flip: [a, b] } => Cap::CoinFlip(a, b),
        })
    }
}

/// How the shortlist is walked once randomized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateOrder {
    /// Stable sort by closeness after the shuffle; ties stay in random
    /// order, so equally close candidates are picked uniformly.
    #[default]
    ClosestFirst,
    /// Pure shuffle. With accept-all this selects a uniform subset.
    Random,
}

/// Per-candidate accept rule applied while walking the shortlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Acceptance {
    Always,
    /// Accept iff a fresh uniform draw exceeds the pair's closeness, so
    /// near pairs connect with high probability and far ones rarely.
    #[default]
    Distance,
}

/// Knobs of one matcher run.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchSettings {
    /// Max accepted edges per `to` cell.
    pub convergence: Cap,
    /// Max times each `from` cell may be given out.
    pub divergence: Cap,
    /// Consume candidates at their divergence cap; requires at least as many
    /// `from` cells as `to` cells before anything runs.
    pub exclusive: bool,
    pub order: CandidateOrder,
    pub acceptance: Acceptance,
}

/// A `to` cell that wanted more edges than the candidates could supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnderConnection {
    pub cell: CellId,
    pub wanted: u32,
    pub got: u32,
}

/// Complete result of one matcher run.
#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    pub edges: Vec<Edge>,
    /// Sorted by cell id for stable reporting.
    pub under: Vec<UnderConnection>,
    /// Accepted count per `to` row, regardless of any later flip.
    pub accepted_per_anchor: Vec<u32>,
}

impl MatchOutcome {
    /// Swap edge endpoints. Used by strategies whose recorded direction is
    /// the opposite of the matcher's from→to orientation.
    pub fn flipped(mut self) -> Self {
        for edge in &mut self.edges {
            std::mem::swap(&mut edge.source, &mut edge.target);
        }
        self
    }
}

/// One degree-constrained stochastic matching run between two populations.
pub struct ProximityMatcher<'a> {
    from: &'a Population,
    to: &'a Population,
    geometry: &'a dyn Geometry,
    settings: MatchSettings,
    index: Option<Arc<KdTree>>,
    from_positions: Cow<'a, [Point]>,
    budgets: Option<&'a [u32]>,
    forbidden: Option<&'a AHashSet<(u32, u32)>>,
}

impl<'a> ProximityMatcher<'a> {
    pub fn new(
        from: &'a Population,
        to: &'a Population,
        geometry: &'a dyn Geometry,
        settings: MatchSettings,
    ) -> Self {
        Self {
            from,
            to,
            geometry,
            settings,
            index: None,
            from_positions: Cow::Borrowed(from.positions()),
            budgets: None,
            forbidden: None,
        }
    }

    /// Spatial index over the effective `from` positions, on the plane the
    /// geometry's shortlist bound names. Without one, candidates are found
    /// by full scan.
    pub fn with_index(mut self, index: Arc<KdTree>) -> Self {
        self.index = Some(index);
        self
    }

    /// Replace the candidate coordinates, e.g. with fiber endpoints derived
    /// from a recorded dataset. Length must match the `from` population.
    pub fn with_from_positions(mut self, positions: Vec<Point>) -> Self {
        debug_assert_eq!(positions.len(), self.from.len());
        self.from_positions = Cow::Owned(positions);
        self
    }

    /// Per-anchor convergence budgets (`to`-row indexed), overriding the
    /// convergence cap. Lets a second phase top anchors up to a total.
    /// Length must match the `to` population.
    pub fn with_budgets(mut self, budgets: &'a [u32]) -> Self {
        debug_assert_eq!(budgets.len(), self.to.len());
        self.budgets = Some(budgets);
        self
    }

    /// `(from_row, to_row)` pairs that must never connect in this run.
    pub fn with_forbidden(mut self, forbidden: &'a AHashSet<(u32, u32)>) -> Self {
        self.forbidden = Some(forbidden);
        self
    }

    pub fn run(self, rng: &mut StdRng) -> Result<MatchOutcome, SupplyError> {
        let n_from = self.from.len();
        let n_to = self.to.len();

        if self.settings.exclusive && n_from < n_to {
            return Err(SupplyError::ExclusiveUnderSupply {
                from: self.from.name().to_string(),
                from_count: n_from,
                to: self.to.name().to_string(),
                to_count: n_to,
            });
        }

        // Divergence budgets are fixed per candidate before any matching, so
        // coin-flip caps resolve deterministically in row order.
        let give_budget: Vec<Option<u32>> = if self.settings.divergence.is_unlimited() {
            vec![None; n_from]
        } else {
            (0..n_from)
                .map(|_| self.settings.divergence.resolve(rng))
                .collect()
        };
        let mut given = vec![0u32; n_from];

        let mut anchors: Vec<usize> = (0..n_to).collect();
        anchors.shuffle(rng);

        let bound = self.geometry.shortlist();
        let mut edges = Vec::new();
        let mut under = Vec::new();
        let mut accepted_per_anchor = vec![0u32; n_to];
        let mut rows: Vec<usize> = Vec::new();
        let mut scored: Vec<(usize, f64)> = Vec::new();

        for &t in &anchors {
            let wanted = match self.budgets {
                Some(budgets) => Some(budgets[t]),
                None => self.settings.convergence.resolve(rng),
            };
            if wanted == Some(0) {
                continue;
            }
            let anchor_id = self.to.id_at(t);
            let anchor_point = self.to.position(t);

            match (&self.index, bound) {
                (Some(tree), Some((_, radius))) => {
                    tree.query_radius_into(anchor_point, radius, &mut rows);
                }
                _ => {
                    rows.clear();
                    rows.extend(0..n_from);
                }
            }

            scored.clear();
            for &row in &rows {
                if let Some(limit) = give_budget[row] {
                    if given[row] >= limit {
                        continue;
                    }
                }
                // Ids are globally unique, so equality means the same cell.
                if self.from.id_at(row) == anchor_id {
                    continue;
                }
                if let Some(forbidden) = self.forbidden {
                    if forbidden.contains(&(row as u32, t as u32)) {
                        continue;
                    }
                }
                let from_point = self.from_positions[row];
                if !self.geometry.accepts(from_point, anchor_point) {
                    continue;
                }
                scored.push((row, self.geometry.closeness(from_point, anchor_point)));
            }

            scored.shuffle(rng);
            if self.settings.order == CandidateOrder::ClosestFirst {
                // Stable sort keeps the shuffled order among ties.
                scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
            }

            let mut got = 0u32;
            for &(row, closeness) in &scored {
                if let Some(w) = wanted {
                    if got >= w {
                        break;
                    }
                }
                if self.settings.acceptance == Acceptance::Distance
                    && rng.gen::<f64>() <= closeness
                {
                    continue;
                }
                edges.push(Edge::new(self.from.id_at(row), anchor_id));
                got += 1;
                given[row] += 1;
            }

            accepted_per_anchor[t] = got;
            if let Some(w) = wanted {
                if got < w {
                    under.push(UnderConnection { cell: anchor_id, wanted: w, got });
                }
            }
        }

        under.sort_by_key(|u| u.cell);
        Ok(MatchOutcome { edges, under, accepted_per_anchor })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Always, WithinRadius};
    use crate::spatial::Plane;
    use rand::SeedableRng;

    fn rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    /// `n` cells on the x axis at unit spacing, starting at `first_id`.
    fn line(name: &str, first_id: CellId, n: usize) -> Population {
        Population::new(
            name,
            first_id,
            (0..n).map(|i| [i as f64, 0.0, 0.0]).collect(),
        )
    }

    /// Accept-all over a pure shuffle, so counts are exact and the cap and
    /// supply arithmetic under test is isolated from the rejection draw.
    fn settings(convergence: Cap) -> MatchSettings {
        MatchSettings {
            convergence,
            order: CandidateOrder::Random,
            acceptance: Acceptance::Always,
            ..MatchSettings::default()
        }
    }

    #[test]
    fn default_settings_walk_closest_first_with_distance_rejection() {
        let defaults = MatchSettings::default();
        assert_eq!(defaults.order, CandidateOrder::ClosestFirst);
        assert_eq!(defaults.acceptance, Acceptance::Distance);

        // A candidate at exactly the radius has closeness 1.0, so the
        // rejection draw can never pass it; the coincident one always does.
        let from = Population::new("glom", 0, vec![[0.0, 0.0, 0.0], [10.0, 0.0, 0.0]]);
        let to = Population::new("granule", 100, vec![[0.0, 0.0, 0.0]]);
        let geometry = WithinRadius::new(10.0, Plane::Xyz);
        for seed in 0..10 {
            let outcome = ProximityMatcher::new(&from, &to, &geometry, defaults)
                .run(&mut rng(seed))
                .unwrap();
            assert_eq!(outcome.edges, vec![Edge::new(0, 100)], "seed {}", seed);
        }
    }

    #[test]
    fn convergence_is_exact_with_ample_supply() {
        let from = line("granule", 0, 50);
        let to = Population::new("golgi", 1000, vec![[10.0, 0.0, 0.0], [40.0, 0.0, 0.0]]);
        let geometry = WithinRadius::new(8.0, Plane::Xyz);

        let outcome = ProximityMatcher::new(&from, &to, &geometry, settings(Cap::Limit(3)))
            .run(&mut rng(7))
            .unwrap();

        assert_eq!(outcome.edges.len(), 6);
        assert!(outcome.under.is_empty());
        for t in 0..to.len() {
            assert_eq!(outcome.accepted_per_anchor[t], 3);
        }
        // Every accepted candidate really is inside the ball.
        for edge in &outcome.edges {
            let f = from.position(from.row_of(edge.source).unwrap());
            let t = to.position(to.row_of(edge.target).unwrap());
            assert!(Plane::Xyz.distance(f, t) <= 8.0);
        }
    }

    #[test]
    fn scarce_candidates_give_min_and_a_notice() {
        let from = line("granule", 0, 2);
        let to = Population::new("golgi", 100, vec![[0.0, 0.0, 0.0]]);
        let geometry = WithinRadius::new(5.0, Plane::Xyz);

        let outcome = ProximityMatcher::new(&from, &to, &geometry, settings(Cap::Limit(5)))
            .run(&mut rng(3))
            .unwrap();

        assert_eq!(outcome.edges.len(), 2);
        assert_eq!(
            outcome.under,
            vec![UnderConnection { cell: 100, wanted: 5, got: 2 }]
        );
    }

    #[test]
    fn empty_from_population_yields_notices_not_panics() {
        let from = Population::new("granule", 0, Vec::new());
        let to = line("golgi", 10, 3);
        let geometry = WithinRadius::new(5.0, Plane::Xyz);

        let outcome = ProximityMatcher::new(&from, &to, &geometry, settings(Cap::Limit(2)))
            .run(&mut rng(1))
            .unwrap();

        assert!(outcome.edges.is_empty());
        assert_eq!(outcome.under.len(), 3);
        assert!(outcome.under.iter().all(|u| u.got == 0 && u.wanted == 2));
    }

    #[test]
    fn exclusive_under_supply_fails_before_any_edges() {
        let from = line("mossy", 0, 2);
        let to = line("target", 100, 5);
        let geometry = Always;
        let s = MatchSettings {
            divergence: Cap::Limit(1),
            exclusive: true,
            ..settings(Cap::Limit(1))
        };

        let err = ProximityMatcher::new(&from, &to, &geometry, s)
            .run(&mut rng(9))
            .unwrap_err();
        assert!(matches!(err, SupplyError::ExclusiveUnderSupply { from_count: 2, to_count: 5, .. }));
    }

    #[test]
    fn exclusive_one_to_one_uses_every_candidate_once() {
        let from = line("ascending", 0, 8);
        let to = line("purkinje", 100, 8);
        let s = MatchSettings {
            divergence: Cap::Limit(1),
            exclusive: true,
            ..settings(Cap::Limit(1))
        };

        let outcome = ProximityMatcher::new(&from, &to, &Always, s)
            .run(&mut rng(21))
            .unwrap();

        assert_eq!(outcome.edges.len(), 8);
        let mut sources: Vec<_> = outcome.edges.iter().map(|e| e.source).collect();
        sources.sort_unstable();
        sources.dedup();
        assert_eq!(sources.len(), 8, "no candidate may be reused");
    }

    #[test]
    fn divergence_cap_holds_without_exclusivity() {
        let from = line("source", 0, 3);
        let to = line("sink", 100, 30);
        let s = MatchSettings {
            divergence: Cap::Limit(4),
            ..settings(Cap::Limit(1))
        };

        let outcome = ProximityMatcher::new(&from, &to, &Always, s)
            .run(&mut rng(5))
            .unwrap();

        let mut counts = [0u32; 3];
        for edge in &outcome.edges {
            counts[edge.source as usize] += 1;
        }
        assert!(counts.iter().all(|&c| c <= 4));
        // 3 sources * 4 slots = 12 edges for 30 anchors wanting 1 each.
        assert_eq!(outcome.edges.len(), 12);
        assert_eq!(outcome.under.len(), 18);
    }

    #[test]
    fn closest_first_picks_the_nearest_candidate() {
        let from = Population::new(
            "glom",
            0,
            vec![[9.0, 0.0, 0.0], [2.0, 0.0, 0.0], [5.0, 0.0, 0.0]],
        );
        let to = Population::new("granule", 100, vec![[0.0, 0.0, 0.0]]);
        let geometry = WithinRadius::new(20.0, Plane::Xyz);
        let s = MatchSettings {
            order: CandidateOrder::ClosestFirst,
            ..settings(Cap::Limit(2))
        };

        for seed in 0..20 {
            let outcome = ProximityMatcher::new(&from, &to, &geometry, s)
                .run(&mut rng(seed))
                .unwrap();
            let sources: Vec<_> = outcome.edges.iter().map(|e| e.source).collect();
            assert_eq!(sources, vec![1, 2], "seed {}", seed);
        }
    }

    #[test]
    fn forbidden_pairs_are_never_emitted() {
        let from = line("granule", 0, 5);
        let to = Population::new("golgi", 100, vec![[2.0, 0.0, 0.0]]);
        let mut forbidden = AHashSet::new();
        forbidden.insert((2u32, 0u32));

        for seed in 0..10 {
            let outcome = ProximityMatcher::new(&from, &to, &Always, settings(Cap::Unlimited))
                .with_forbidden(&forbidden)
                .run(&mut rng(seed))
                .unwrap();
            assert_eq!(outcome.edges.len(), 4);
            assert!(outcome.edges.iter().all(|e| e.source != 2));
        }
    }

    #[test]
    fn same_population_never_pairs_a_cell_with_itself() {
        let pop = line("golgi", 0, 6);
        let geometry = WithinRadius::new(100.0, Plane::Xyz);

        let outcome = ProximityMatcher::new(&pop, &pop, &geometry, settings(Cap::Unlimited))
            .run(&mut rng(13))
            .unwrap();

        assert_eq!(outcome.edges.len(), 6 * 5);
        assert!(outcome.edges.iter().all(|e| e.source != e.target));
    }

    #[test]
    fn per_anchor_budgets_override_convergence() {
        let from = line("granule", 0, 10);
        let to = line("golgi", 100, 3);
        let budgets = [4u32, 0, 2];

        let outcome = ProximityMatcher::new(&from, &to, &Always, settings(Cap::Limit(999)))
            .with_budgets(&budgets)
            .run(&mut rng(2))
            .unwrap();

        assert_eq!(outcome.accepted_per_anchor, vec![4, 0, 2]);
        assert_eq!(outcome.edges.len(), 6);
        // A zero budget is satisfied, not under-connected.
        assert!(outcome.under.is_empty());
    }

    #[test]
    #[should_panic]
    fn budget_slice_shorter_than_the_anchors_is_rejected() {
        let from = line("granule", 0, 4);
        let to = line("golgi", 100, 3);
        let budgets = [1u32, 1];

        let _ = ProximityMatcher::new(&from, &to, &Always, settings(Cap::Unlimited))
            .with_budgets(&budgets);
    }

    #[test]
    fn saturated_closeness_rejects_everything() {
        // Gauge norm so small every pair sits at closeness 1.0.
        let from = line("a", 0, 10);
        let to = Population::new("b", 100, vec![[50.0, 0.0, 0.0]]);
        let geometry = WithinRadius::new(1e-9, Plane::Xyz);
        let s = MatchSettings {
            acceptance: Acceptance::Distance,
            ..settings(Cap::Unlimited)
        };

        let outcome = ProximityMatcher::new(&from, &to, &geometry, s)
            .run(&mut rng(4))
            .unwrap();
        assert!(outcome.edges.is_empty());
    }

    #[test]
    fn same_seed_reproduces_the_same_outcome() {
        let from = line("granule", 0, 40);
        let to = line("golgi", 1000, 15);
        let geometry = WithinRadius::new(12.0, Plane::Xyz);
        let s = MatchSettings {
            acceptance: Acceptance::Distance,
            order: CandidateOrder::ClosestFirst,
            divergence: Cap::Limit(3),
            ..settings(Cap::Limit(4))
        };

        let a = ProximityMatcher::new(&from, &to, &geometry, s).run(&mut rng(99)).unwrap();
        let b = ProximityMatcher::new(&from, &to, &geometry, s).run(&mut rng(99)).unwrap();
        assert_eq!(a.edges, b.edges);
        assert_eq!(a.under, b.under);

        let c = ProximityMatcher::new(&from, &to, &geometry, s).run(&mut rng(100)).unwrap();
        assert_ne!(a.edges, c.edges, "different seeds should diverge");
    }

    #[test]
    fn coin_flip_cap_uses_both_values() {
        let mut r = rng(11);
        let cap = Cap::CoinFlip(5, 4);
        let mut seen = AHashSet::new();
        for _ in 0..64 {
            seen.insert(cap.resolve(&mut r).unwrap());
        }
        assert_eq!(seen.len(), 2);
        assert!(seen.contains(&5) && seen.contains(&4));
    }

    #[test]
    fn flipped_outcome_swaps_endpoints() {
        let outcome = MatchOutcome {
            edges: vec![Edge::new(1, 9)],
            under: Vec::new(),
            accepted_per_anchor: vec![1],
        };
        assert_eq!(outcome.flipped().edges, vec![Edge::new(9, 1)]);
    }

    #[test]
    fn cap_deserializes_from_int_and_coin_flip_table() {
        #[derive(Deserialize)]
        struct P {
            convergence: Cap,
            divergence: Cap,
        }
        let p: P = toml::from_str("convergence = 7\ndivergence = { coin_flip = [5, 4] }").unwrap();
        assert_eq!(p.convergence, Cap::Limit(7));
        assert_eq!(p.divergence, Cap::CoinFlip(5, 4));
    }
}
