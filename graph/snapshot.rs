/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Serializable snapshot of a sketch graph, the shape exchanged with the
//! sketch backend.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::{Edge, EdgeId, EdgeSpec, GraphModel, Node, NodeId};
use crate::error::CanvasResult;
use crate::registries::type_catalog::TypeCatalog;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SketchSnapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl SketchSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

impl GraphModel {
    pub fn to_snapshot(&self) -> SketchSnapshot {
        SketchSnapshot {
            nodes: self.nodes().cloned().collect(),
            edges: self.edges().cloned().collect(),
        }
    }

    /// Rebuild a model from backend data.
    ///
    /// Backend nodes are trusted even when their type is missing from
    /// `catalog`. Duplicate ids and edges whose endpoints are absent are
    /// skipped with a warning so one bad record does not block loading.
    pub fn from_snapshot(snapshot: SketchSnapshot, catalog: TypeCatalog) -> Self {
        let mut model = GraphModel::new(catalog);
        for node in snapshot.nodes {
            let id = node.id().clone();
            if let Err(err) = model.insert_node(node) {
                warn!("skipping node `{id}` from snapshot: {err}");
            }
        }
        for edge in snapshot.edges {
            let id = edge.id().clone();
            if let Err(err) = model.insert_edge(edge) {
                warn!("skipping edge `{id}` from snapshot: {err}");
            }
        }
        model
    }

    /// Fold a partial snapshot (e.g. a neighborhood fetched from the
    /// backend) into the model. Nodes and edges already present keep their
    /// local state; edges whose endpoints are still unknown are skipped.
    /// Returns the ids of the nodes that were added.
    pub fn merge_snapshot(&mut self, snapshot: SketchSnapshot) -> Vec<NodeId> {
        let mut added = Vec::new();
        for node in snapshot.nodes {
            if self.contains_node(node.id()) {
                continue;
            }
            let id = node.id().clone();
            match self.insert_node(node) {
                Ok(id) => added.push(id),
                Err(err) => warn!("skipping node `{id}` from partial snapshot: {err}"),
            }
        }
        for edge in snapshot.edges {
            if self.contains_edge(edge.id()) {
                continue;
            }
            let id = edge.id().clone();
            if let Err(err) = self.insert_edge(edge) {
                debug!("skipping edge `{id}` from partial snapshot: {err}");
            }
        }
        added
    }

    fn insert_edge(&mut self, edge: Edge) -> CanvasResult<EdgeId> {
        let id = edge.id().clone();
        let source = edge.source().clone();
        let target = edge.target().clone();
        let spec = EdgeSpec {
            edge_type: edge.edge_type,
            label: edge.label,
            confidence: edge.confidence,
            date: edge.date,
            source_handle: edge.source_handle,
            target_handle: edge.target_handle,
        };
        self.add_edge_with_id(id, &source, &target, spec)
    }
}
