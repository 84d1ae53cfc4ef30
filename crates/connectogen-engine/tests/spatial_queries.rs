// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Property tests pitting the k-d tree against a brute-force scan. The two
//! must agree exactly on every plane and radius, including degenerate clouds
//! where many points share a projected coordinate.

use proptest::prelude::*;

use connectogen_engine::{KdTree, Plane, Point};

fn brute_force(points: &[Point], plane: Plane, center: Point, radius: f64) -> Vec<usize> {
    let r2 = radius * radius;
    let mut rows: Vec<usize> = points
        .iter()
        .enumerate()
        .filter(|(_, &p)| plane.distance_sq(center, p) <= r2)
        .map(|(row, _)| row)
        .collect();
    rows.sort_unstable();
    rows
}

fn point_strategy() -> impl Strategy<Value = Point> {
    // Small coordinate range on purpose, so radius queries regularly hit
    // boundary and duplicate cases.
    prop::array::uniform3(-50.0f64..50.0)
}

fn cloud_strategy() -> impl Strategy<Value = Vec<Point>> {
    prop::collection::vec(point_strategy(), 0..200)
}

proptest! {
    #[test]
    fn tree_matches_brute_force_in_full_space(
        points in cloud_strategy(),
        center in point_strategy(),
        radius in 0.0f64..80.0,
    ) {
        let tree = KdTree::build(&points, Plane::Xyz);
        let mut got = tree.query_radius(center, radius);
        got.sort_unstable();
        prop_assert_eq!(got, brute_force(&points, Plane::Xyz, center, radius));
    }

    #[test]
    fn tree_matches_brute_force_on_a_plane(
        points in cloud_strategy(),
        center in point_strategy(),
        radius in 0.0f64..80.0,
    ) {
        let tree = KdTree::build(&points, Plane::Xz);
        let mut got = tree.query_radius(center, radius);
        got.sort_unstable();
        prop_assert_eq!(got, brute_force(&points, Plane::Xz, center, radius));
    }

    #[test]
    fn tree_matches_brute_force_on_a_single_axis(
        points in cloud_strategy(),
        center in point_strategy(),
        radius in 0.0f64..80.0,
    ) {
        let tree = KdTree::build(&points, Plane::X);
        let mut got = tree.query_radius(center, radius);
        got.sort_unstable();
        prop_assert_eq!(got, brute_force(&points, Plane::X, center, radius));
    }

    #[test]
    fn buffer_reuse_leaves_no_stale_rows(
        points in cloud_strategy(),
        a in point_strategy(),
        b in point_strategy(),
        radius in 0.0f64..80.0,
    ) {
        let tree = KdTree::build(&points, Plane::Xyz);
        let mut out = Vec::new();
        tree.query_radius_into(a, radius, &mut out);
        tree.query_radius_into(b, radius, &mut out);
        out.sort_unstable();
        prop_assert_eq!(out, brute_force(&points, Plane::Xyz, b, radius));
    }
}

#[test]
fn nearest_agrees_with_exhaustive_scan() {
    let points: Vec<Point> = (0..40)
        .map(|i| {
            let f = i as f64;
            [f * 1.7 % 13.0, f * 3.1 % 7.0, f * 0.9 % 11.0]
        })
        .collect();
    let tree = KdTree::build(&points, Plane::Xyz);

    let center = [5.0, 2.0, 4.0];
    let (row, dist) = tree.nearest(center).unwrap();
    let best = points
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            Plane::Xyz
                .distance_sq(center, **a)
                .partial_cmp(&Plane::Xyz.distance_sq(center, **b))
                .unwrap()
        })
        .map(|(i, _)| i)
        .unwrap();
    assert_eq!(row, best);
    assert!((dist - Plane::Xyz.distance(center, points[best])).abs() < 1e-12);
}

#[test]
fn empty_cloud_yields_no_results() {
    let tree = KdTree::build(&[], Plane::Xy);
    assert!(tree.is_empty());
    assert!(tree.query_radius([0.0; 3], 10.0).is_empty());
    assert!(tree.nearest([0.0; 3]).is_none());
}
