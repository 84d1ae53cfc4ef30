// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Projection planes.

Every distance in the engine is measured after projecting both points onto a
plane: the full space (`xyz`), one of the axis-aligned planes (`xy`, `xz`,
`yz`), or a single axis (`x`, `y`, `z`). Anisotropic tissue rules come down
to choosing the right plane; parallel-fiber reach, for example, is a pure
`x` interval while glomerular capture is a full `xyz` ball.
*/

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use connectogen_structures::Point;

use crate::error::ConfigurationError;

/// Axis subset distances are measured in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plane {
    #[default]
    Xyz,
    Xy,
    Xz,
    Yz,
    X,
    Y,
    Z,
}

impl Plane {
    /// Axis indices contributing to this plane, in x/y/z order.
    pub fn axes(self) -> &'static [usize] {
        match self {
            Plane::Xyz => &[0, 1, 2],
            Plane::Xy => &[0, 1],
            Plane::Xz => &[0, 2],
            Plane::Yz => &[1, 2],
            Plane::X => &[0],
            Plane::Y => &[1],
            Plane::Z => &[2],
        }
    }

    pub fn dimensions(self) -> usize {
        self.axes().len()
    }

    /// Squared distance between the projections of `a` and `b`.
    pub fn distance_sq(self, a: Point, b: Point) -> f64 {
        self.axes()
            .iter()
            .map(|&i| {
                let d = a[i] - b[i];
                d * d
            })
            .sum()
    }

    pub fn distance(self, a: Point, b: Point) -> f64 {
        self.distance_sq(a, b).sqrt()
    }
}

impl FromStr for Plane {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "xyz" => Ok(Plane::Xyz),
            "xy" => Ok(Plane::Xy),
            "xz" => Ok(Plane::Xz),
            "yz" => Ok(Plane::Yz),
            "x" => Ok(Plane::X),
            "y" => Ok(Plane::Y),
            "z" => Ok(Plane::Z),
            other => Err(ConfigurationError::UnknownPlane(other.to_string())),
        }
    }
}

impl fmt::Display for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Plane::Xyz => "xyz",
            Plane::Xy => "xy",
            Plane::Xz => "xz",
            Plane::Yz => "yz",
            Plane::X => "x",
            Plane::Y => "y",
            Plane::Z => "z",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_ignores_projected_out_axes() {
        let a = [0.0, 100.0, 0.0];
        let b = [3.0, -50.0, 4.0];
        assert!((Plane::Xz.distance(a, b) - 5.0).abs() < 1e-12);
        assert!((Plane::X.distance(a, b) - 3.0).abs() < 1e-12);
        assert!((Plane::Y.distance(a, b) - 150.0).abs() < 1e-12);
    }

    #[test]
    fn full_space_distance_is_euclidean() {
        let d = Plane::Xyz.distance([1.0, 2.0, 3.0], [1.0, 2.0, 3.0]);
        assert_eq!(d, 0.0);
        let d = Plane::Xyz.distance([0.0, 0.0, 0.0], [2.0, 3.0, 6.0]);
        assert!((d - 7.0).abs() < 1e-12);
    }

    #[test]
    fn parses_every_known_name() {
        for name in ["xyz", "xy", "xz", "yz", "x", "y", "z"] {
            let plane: Plane = name.parse().unwrap();
            assert_eq!(plane.to_string(), name);
        }
    }

    #[test]
    fn unknown_name_is_a_configuration_error() {
        let err = "diag".parse::<Plane>().unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownPlane(_)));
    }
}
