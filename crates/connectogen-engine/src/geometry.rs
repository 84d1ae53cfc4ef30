// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Geometric pair predicates.

A `Geometry` decides whether a (from, to) cell pair is geometrically
eligible and how close the pair is on a normalized [0, 1] scale. The matcher
rejection-samples against closeness, so 0 means certain acceptance and 1
means (almost) certain rejection. Predicates are stateless; the matcher owns
all randomness and bookkeeping.

Concrete shapes cover the pair tests used by the connection strategies:
projected balls, axis-aligned spans with candidate inflation, half-space
soma ordering, and externally normalized distance gauges. `Composite` ands
gates together when a rule needs more than one shape.
*/

use serde::Deserialize;

use connectogen_structures::Point;

use crate::spatial::Plane;

/// One coordinate axis, as named in strategy parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Vertical ordering between the two somata of a pair, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// `from[axis] <= to[axis]`
    FromBelowTo,
    /// `from[axis] >= to[axis]`
    FromAboveTo,
}

/// Pair eligibility and normalized closeness.
pub trait Geometry {
    fn accepts(&self, from: Point, to: Point) -> bool;

    /// Normalized distance in [0, 1]; only meaningful for accepted pairs.
    fn closeness(&self, from: Point, to: Point) -> f64;

    /// Conservative shortlist bound: every accepted candidate lies within
    /// this radius of the anchor on this plane. `None` means no useful
    /// bound exists and the matcher must scan the whole population.
    fn shortlist(&self) -> Option<(Plane, f64)> {
        None
    }
}

/// Projected Euclidean ball.
#[derive(Debug, Clone, Copy)]
pub struct WithinRadius {
    pub radius: f64,
    pub plane: Plane,
}

impl WithinRadius {
    pub fn new(radius: f64, plane: Plane) -> Self {
        Self { radius, plane }
    }
}

impl Geometry for WithinRadius {
    fn accepts(&self, from: Point, to: Point) -> bool {
        self.plane.distance_sq(from, to) <= self.radius * self.radius
    }

    fn closeness(&self, from: Point, to: Point) -> f64 {
        if self.radius > 0.0 {
            (self.plane.distance(from, to) / self.radius).min(1.0)
        } else {
            0.0
        }
    }

    fn shortlist(&self) -> Option<(Plane, f64)> {
        Some((self.plane, self.radius))
    }
}

/// Axis-aligned span: per-axis half-widths, unconstrained axes ignored.
///
/// `inflate` widens every constrained axis by the candidate's placement
/// radius, so a cell counts as inside the span as soon as its soma sphere
/// touches it. Closeness is the worst per-axis ratio, which reproduces
/// per-axis rejection against a single draw.
#[derive(Debug, Clone, Copy)]
pub struct AxisSpan {
    half: [Option<f64>; 3],
    inflate: f64,
}

impl AxisSpan {
    pub fn new(half: [Option<f64>; 3]) -> Self {
        Self { half, inflate: 0.0 }
    }

    pub fn with_inflation(mut self, inflate: f64) -> Self {
        self.inflate = inflate;
        self
    }

    fn constrained(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.half
            .iter()
            .enumerate()
            .filter_map(move |(i, h)| h.map(|w| (i, w + self.inflate)))
    }
}

impl Geometry for AxisSpan {
    fn accepts(&self, from: Point, to: Point) -> bool {
        self.constrained()
            .all(|(i, w)| (from[i] - to[i]).abs() <= w)
    }

    fn closeness(&self, from: Point, to: Point) -> f64 {
        self.constrained()
            .map(|(i, w)| {
                if w > 0.0 {
                    ((from[i] - to[i]).abs() / w).min(1.0)
                } else {
                    0.0
                }
            })
            .fold(0.0, f64::max)
    }

    fn shortlist(&self) -> Option<(Plane, f64)> {
        let mut present = [false; 3];
        let mut radius_sq = 0.0;
        for (i, w) in self.constrained() {
            present[i] = true;
            radius_sq += w * w;
        }
        let plane = match present {
            [true, true, true] => Plane::Xyz,
            [true, true, false] => Plane::Xy,
            [true, false, true] => Plane::Xz,
            [false, true, true] => Plane::Yz,
            [true, false, false] => Plane::X,
            [false, true, false] => Plane::Y,
            [false, false, true] => Plane::Z,
            [false, false, false] => return None,
        };
        Some((plane, radius_sq.sqrt()))
    }
}

/// Inclusive soma ordering along one axis.
#[derive(Debug, Clone, Copy)]
pub struct HalfSpace {
    pub axis: Axis,
    pub relation: Relation,
}

impl HalfSpace {
    pub fn new(axis: Axis, relation: Relation) -> Self {
        Self { axis, relation }
    }
}

impl Geometry for HalfSpace {
    fn accepts(&self, from: Point, to: Point) -> bool {
        let i = self.axis.index();
        match self.relation {
            Relation::FromBelowTo => from[i] <= to[i],
            Relation::FromAboveTo => from[i] >= to[i],
        }
    }

    fn closeness(&self, _from: Point, _to: Point) -> f64 {
        0.0
    }
}

/// Always-accepting gauge normalizing planar distance by an external scale,
/// typically a layer thickness. Distances beyond the scale saturate at 1.
#[derive(Debug, Clone, Copy)]
pub struct PlanarGauge {
    pub plane: Plane,
    pub norm: f64,
}

impl PlanarGauge {
    pub fn new(plane: Plane, norm: f64) -> Self {
        Self { plane, norm }
    }
}

impl Geometry for PlanarGauge {
    fn accepts(&self, _from: Point, _to: Point) -> bool {
        true
    }

    fn closeness(&self, from: Point, to: Point) -> f64 {
        if self.norm > 0.0 {
            (self.plane.distance(from, to) / self.norm).min(1.0)
        } else {
            0.0
        }
    }
}

/// No geometric constraint; every pair is eligible at closeness 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct Always;

impl Geometry for Always {
    fn accepts(&self, _from: Point, _to: Point) -> bool {
        true
    }

    fn closeness(&self, _from: Point, _to: Point) -> f64 {
        0.0
    }
}

/// Conjunction of gates with an optional dedicated scoring gauge.
///
/// Acceptance requires every gate. Closeness comes from the gauge when one
/// is set, otherwise it is the worst closeness over all gates.
pub struct Composite {
    gates: Vec<Box<dyn Geometry>>,
    gauge: Option<Box<dyn Geometry>>,
}

impl Composite {
    pub fn new(gates: Vec<Box<dyn Geometry>>) -> Self {
        Self { gates, gauge: None }
    }

    pub fn with_gauge(mut self, gauge: Box<dyn Geometry>) -> Self {
        self.gauge = Some(gauge);
        self
    }
}

impl Geometry for Composite {
    fn accepts(&self, from: Point, to: Point) -> bool {
        self.gates.iter().all(|g| g.accepts(from, to))
    }

    fn closeness(&self, from: Point, to: Point) -> f64 {
        match &self.gauge {
            Some(gauge) => gauge.closeness(from, to),
            None => self
                .gates
                .iter()
                .map(|g| g.closeness(from, to))
                .fold(0.0, f64::max),
        }
    }

    fn shortlist(&self) -> Option<(Plane, f64)> {
        // Any gate bound is a valid superset; take the tightest radius.
        self.gates
            .iter()
            .filter_map(|g| g.shortlist())
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const O: Point = [0.0, 0.0, 0.0];

    #[test]
    fn within_radius_scores_linear_distance() {
        let g = WithinRadius::new(10.0, Plane::Xyz);
        assert!(g.accepts(O, [6.0, 8.0, 0.0]));
        assert!((g.closeness(O, [6.0, 8.0, 0.0]) - 1.0).abs() < 1e-12);
        assert!((g.closeness(O, [3.0, 4.0, 0.0]) - 0.5).abs() < 1e-12);
        assert!(!g.accepts(O, [11.0, 0.0, 0.0]));
    }

    #[test]
    fn axis_span_ignores_unconstrained_axes() {
        let g = AxisSpan::new([Some(5.0), None, Some(2.0)]);
        assert!(g.accepts(O, [5.0, 9000.0, -2.0]));
        assert!(!g.accepts(O, [5.0, 0.0, 2.1]));
    }

    #[test]
    fn axis_span_inflation_widens_every_constrained_axis() {
        let g = AxisSpan::new([Some(1.0), None, None]).with_inflation(0.5);
        assert!(g.accepts(O, [1.5, 0.0, 0.0]));
        assert!(!g.accepts(O, [1.6, 0.0, 0.0]));
    }

    #[test]
    fn axis_span_closeness_is_the_worst_axis() {
        let g = AxisSpan::new([Some(10.0), None, Some(10.0)]);
        let c = g.closeness(O, [2.0, 0.0, 8.0]);
        assert!((c - 0.8).abs() < 1e-12);
    }

    #[test]
    fn axis_span_shortlist_spans_the_constrained_plane() {
        let g = AxisSpan::new([Some(3.0), None, Some(4.0)]);
        let (plane, radius) = g.shortlist().unwrap();
        assert_eq!(plane, Plane::Xz);
        assert!((radius - 5.0).abs() < 1e-12);

        assert!(AxisSpan::new([None, None, None]).shortlist().is_none());
    }

    #[test]
    fn half_space_boundary_is_inclusive() {
        let g = HalfSpace::new(Axis::Y, Relation::FromBelowTo);
        assert!(g.accepts([0.0, 5.0, 0.0], [0.0, 5.0, 0.0]));
        assert!(g.accepts([0.0, 4.9, 0.0], [0.0, 5.0, 0.0]));
        assert!(!g.accepts([0.0, 5.1, 0.0], [0.0, 5.0, 0.0]));
    }

    #[test]
    fn planar_gauge_saturates_at_one() {
        let g = PlanarGauge::new(Plane::Xy, 100.0);
        assert!(g.accepts(O, [900.0, 0.0, 0.0]));
        assert_eq!(g.closeness(O, [900.0, 0.0, 0.0]), 1.0);
        assert!((g.closeness(O, [30.0, 40.0, 0.0]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn composite_needs_every_gate_and_prefers_the_gauge() {
        let composite = Composite::new(vec![
            Box::new(WithinRadius::new(10.0, Plane::Xy)),
            Box::new(HalfSpace::new(Axis::Y, Relation::FromBelowTo)),
        ])
        .with_gauge(Box::new(PlanarGauge::new(Plane::Xy, 20.0)));

        // Inside the ball but above the target: rejected.
        assert!(!composite.accepts([0.0, 1.0, 0.0], [1.0, 0.0, 0.0]));
        // Inside both gates: accepted, scored by the gauge, not the ball.
        let from = [6.0, -1.0, 0.0];
        assert!(composite.accepts(from, O));
        assert!((composite.closeness(from, O) - 6.083 / 20.0).abs() < 1e-3);
    }

    #[test]
    fn composite_without_gauge_takes_worst_gate() {
        let composite = Composite::new(vec![
            Box::new(WithinRadius::new(10.0, Plane::X)),
            Box::new(WithinRadius::new(100.0, Plane::Z)),
        ]);
        let c = composite.closeness(O, [5.0, 0.0, 90.0]);
        assert!((c - 0.9).abs() < 1e-12);
    }

    #[test]
    fn composite_shortlist_takes_the_tightest_gate() {
        let composite = Composite::new(vec![
            Box::new(WithinRadius::new(50.0, Plane::Xyz)),
            Box::new(WithinRadius::new(10.0, Plane::Xy)),
        ]);
        let (plane, radius) = composite.shortlist().unwrap();
        assert_eq!(plane, Plane::Xy);
        assert_eq!(radius, 10.0);
    }
}
