// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Joining two earlier edge sets over a shared intermediate.

Connects `from` to `to` wherever both touch the same intermediate cell in
two previously recorded tags: `from_tag` holds `from -> intermediate` edges,
`to_tag` holds `intermediate -> to` edges. The classic case is inhibition
delivered onto every cell that shares an afferent terminal with the
inhibiting cell.

Purely a deterministic join; no geometry, no randomness. Edges come out
grouped by the `from` population's row order, then by `from_tag` edge order
within a cell.
*/

use ahash::AHashMap;
use serde::Deserialize;

use connectogen_structures::{CellId, Edge, EdgeList};

use crate::error::{ConfigurationError, EngineResult};
use crate::scaffold::Scaffold;
use crate::strategies::{
    parse_params, required_edges, required_population, ConnectionStrategy, StrategyReport,
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SharedIntermediateParams {
    from: String,
    to: String,
    tag: String,
    /// Earlier tag with `from -> intermediate` edges.
    from_tag: String,
    /// Earlier tag with `intermediate -> to` edges.
    to_tag: String,
}

pub(super) struct SharedIntermediateStrategy {
    name: String,
    params: SharedIntermediateParams,
}

pub(super) fn build(
    name: &str,
    params: &toml::Table,
) -> Result<Box<dyn ConnectionStrategy>, ConfigurationError> {
    let params: SharedIntermediateParams = parse_params(name, params)?;
    Ok(Box::new(SharedIntermediateStrategy { name: name.to_string(), params }))
}

impl ConnectionStrategy for SharedIntermediateStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "shared_intermediate"
    }

    fn validate(&self, scaffold: &Scaffold) -> Result<(), ConfigurationError> {
        required_population(&self.name, scaffold, &self.params.from)?;
        required_population(&self.name, scaffold, &self.params.to)?;
        Ok(())
    }

    fn connect(&mut self, scaffold: &mut Scaffold) -> EngineResult<StrategyReport> {
        let from = required_population(&self.name, scaffold, &self.params.from)?;
        let first = required_edges(scaffold, &self.params.from_tag)?;
        let second = required_edges(scaffold, &self.params.to_tag)?;

        // Group both earlier tags, preserving their edge order.
        let mut via_by_from: AHashMap<CellId, Vec<CellId>> = AHashMap::new();
        for edge in first.edges() {
            via_by_from.entry(edge.source).or_default().push(edge.target);
        }
        let mut targets_by_via: AHashMap<CellId, Vec<CellId>> = AHashMap::new();
        for edge in second.edges() {
            targets_by_via.entry(edge.source).or_default().push(edge.target);
        }

        let mut edges = Vec::new();
        for (from_id, _) in from.iter() {
            let Some(vias) = via_by_from.get(&from_id) else {
                continue;
            };
            for via in vias {
                if let Some(targets) = targets_by_via.get(via) {
                    edges.extend(targets.iter().map(|&t| Edge::new(from_id, t)));
                }
            }
        }

        let mut report = StrategyReport::default();
        report.tags.push((self.params.tag.clone(), edges.len()));
        scaffold.record_edges(&self.params.tag, EdgeList::new(edges))?;
        Ok(report)
    }
}

// ============================================================================
// Tests
// ============================================================================
