// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Core data structures for connectome construction. Defines cell populations,
//! edges, morphologies, and the append-once connectome store shared by every
//! connection strategy.

mod edges;
mod error;
mod morphology;
mod population;
mod store;

pub use edges::{CompartmentRef, Edge, EdgeList};
pub use error::{StructureError, StructureResult};
pub use morphology::{Compartment, Morphology};
pub use population::{CellId, Point, Population};
pub use store::{ConnectomeStore, Dataset};
