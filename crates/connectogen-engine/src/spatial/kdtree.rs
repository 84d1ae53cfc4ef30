// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Balanced k-d tree over plane-projected positions.

Built once per (population, plane) pair by median splitting, O(N log N).
Queries prune subtrees by the splitting coordinate, so radius queries touch
O(log N + K) nodes for K matches. Points are never mutated after build;
consumed-candidate bookkeeping lives in the matcher, not here.

A tree built over zero points is valid and answers every query with an empty
result.
*/

use std::cmp::Ordering;

use connectogen_structures::Point;

use crate::spatial::plane::Plane;

/// Spatial index over one population's positions, projected onto one plane.
///
/// Query results are row indices into the position slice the tree was built
/// from, in unspecified order.
#[derive(Debug, Clone)]
pub struct KdTree {
    plane: Plane,
    points: Vec<Point>,
    order: Vec<u32>,
}

impl KdTree {
    /// Build a balanced tree by recursive median split.
    pub fn build(points: &[Point], plane: Plane) -> Self {
        let mut order: Vec<u32> = (0..points.len() as u32).collect();
        build_recursive(points, &mut order, plane.axes(), 0);
        Self {
            plane,
            points: points.to_vec(),
            order,
        }
    }

    pub fn plane(&self) -> Plane {
        self.plane
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// All rows whose projected distance to `center` is at most `radius`.
    pub fn query_radius(&self, center: Point, radius: f64) -> Vec<usize> {
        let mut out = Vec::new();
        self.query_radius_into(center, radius, &mut out);
        out
    }

    /// `query_radius` into a caller-owned buffer, cleared first. Lets the
    /// matcher reuse one allocation across thousands of anchor cells.
    pub fn query_radius_into(&self, center: Point, radius: f64, out: &mut Vec<usize>) {
        out.clear();
        if self.points.is_empty() || radius < 0.0 {
            return;
        }
        self.collect_in_radius(0, self.order.len(), 0, center, radius, radius * radius, out);
    }

    /// Row and projected distance of the cell closest to `center`. Ties
    /// resolve to an arbitrary one of the tied cells.
    pub fn nearest(&self, center: Point) -> Option<(usize, f64)> {
        if self.points.is_empty() {
            return None;
        }
        let mut best = (usize::MAX, f64::INFINITY);
        self.find_nearest(0, self.order.len(), 0, center, &mut best);
        Some((best.0, best.1.sqrt()))
    }

    fn collect_in_radius(
        &self,
        lo: usize,
        hi: usize,
        depth: usize,
        center: Point,
        radius: f64,
        radius_sq: f64,
        out: &mut Vec<usize>,
    ) {
        if lo >= hi {
            return;
        }
        let axes = self.plane.axes();
        let axis = axes[depth % axes.len()];
        let mid = lo + (hi - lo) / 2;
        let row = self.order[mid] as usize;
        let point = self.points[row];

        if self.plane.distance_sq(point, center) <= radius_sq {
            out.push(row);
        }

        let delta = center[axis] - point[axis];
        if delta <= radius {
            self.collect_in_radius(lo, mid, depth + 1, center, radius, radius_sq, out);
        }
        if delta >= -radius {
            self.collect_in_radius(mid + 1, hi, depth + 1, center, radius, radius_sq, out);
        }
    }

    fn find_nearest(
        &self,
        lo: usize,
        hi: usize,
        depth: usize,
        center: Point,
        best: &mut (usize, f64),
    ) {
        if lo >= hi {
            return;
        }
        let axes = self.plane.axes();
        let axis = axes[depth % axes.len()];
        let mid = lo + (hi - lo) / 2;
        let row = self.order[mid] as usize;
        let point = self.points[row];

        let dist_sq = self.plane.distance_sq(point, center);
        if dist_sq < best.1 {
            *best = (row, dist_sq);
        }

        let delta = center[axis] - point[axis];
        let (near_lo, near_hi, far_lo, far_hi) = if delta <= 0.0 {
            (lo, mid, mid + 1, hi)
        } else {
            (mid + 1, hi, lo, mid)
        };
        self.find_nearest(near_lo, near_hi, depth + 1, center, best);
        if delta * delta <= best.1 {
            self.find_nearest(far_lo, far_hi, depth + 1, center, best);
        }
    }
}

fn build_recursive(points: &[Point], order: &mut [u32], axes: &'static [usize], depth: usize) {
    if order.len() <= 1 {
        return;
    }
    let axis = axes[depth % axes.len()];
    let mid = order.len() / 2;
    order.select_nth_unstable_by(mid, |&a, &b| {
        points[a as usize][axis]
            .partial_cmp(&points[b as usize][axis])
            .unwrap_or(Ordering::Equal)
    });
    let (left, rest) = order.split_at_mut(mid);
    let right = &mut rest[1..];
    build_recursive(points, left, axes, depth + 1);
    build_recursive(points, right, axes, depth + 1);
}

// ============================================================================
// Tests
// ============================================================================
