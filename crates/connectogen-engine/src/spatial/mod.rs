// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Spatial indexing utilities for efficient position-based queries.

Implements balanced k-d trees over configurable projection planes for:
- Radius queries during candidate shortlisting
- Nearest-neighbor lookups
- One shared read-only index per (population, plane) pair
*/

pub mod cache;
pub mod kdtree;
pub mod plane;

pub use cache::IndexCache;
pub use kdtree::KdTree;
pub use plane::Plane;
