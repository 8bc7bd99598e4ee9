/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Sketch graph model.
//!
//! Core structures:
//! - `GraphModel`: owns nodes, edges and the selection for one open sketch,
//!   backed by a petgraph `StableGraph` (index-based adjacency, no owned
//!   back-references between nodes).
//! - `Node`: typed core fields plus a free-form extension map.
//! - `Edge`: directed relation between two existing nodes.
//!
//! Node and edge ids are additionally kept in insertion-ordered indexes
//! because `StableGraph` reuses vacated slots.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use euclid::default::Point2D;
use indexmap::IndexMap;
use log::debug;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::EdgeRef;
use petgraph::{Directed, Direction};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{CanvasError, CanvasResult};
use crate::registries::type_catalog::TypeCatalog;

pub mod filter;
pub mod handles;
pub mod selection;
pub mod snapshot;

use handles::HandleSide;
pub use selection::{SelectionState, SelectionUpdateMode};

/// Slot handle into the backing petgraph graph. Not stable across removals
/// of the same node; use [`NodeId`] for identity.
pub type NodeKey = NodeIndex;

pub type EdgeKey = EdgeIndex;

/// Open-ended per-node attributes owned by the domain (e.g. `email`,
/// `registrar`).
pub type Extensions = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for NodeId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(String);

impl EdgeId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EdgeId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for EdgeId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Optional visual hints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f32>,
}

/// A sketch entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    id: NodeId,

    #[serde(rename = "type")]
    pub node_type: String,

    pub label: String,

    /// Position in graph space; `None` until placed by a drag or a layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Point2D<f32>>,

    #[serde(default)]
    pub style: NodeStyle,

    #[serde(default)]
    pub collapsed: bool,

    #[serde(default)]
    pub hidden: bool,

    /// Pinned nodes are never moved by the force simulation.
    #[serde(default)]
    pub pinned: bool,

    #[serde(default)]
    pub extensions: Extensions,
}

impl Node {
    fn from_spec(id: NodeId, spec: NodeSpec) -> Self {
        Self {
            id,
            node_type: spec.node_type,
            label: spec.label,
            position: spec.position,
            style: spec.style,
            collapsed: false,
            hidden: false,
            pinned: false,
            extensions: spec.extensions,
        }
    }

    /// Immutable identity.
    pub fn id(&self) -> &NodeId {
        &self.id
    }
}

/// A directed relation between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    id: EdgeId,
    source: NodeId,
    target: NodeId,

    #[serde(rename = "type")]
    pub edge_type: String,

    #[serde(default)]
    pub label: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,

    /// ISO-8601 date string as provided by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<HandleSide>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<HandleSide>,
}

impl Edge {
    fn from_spec(id: EdgeId, source: NodeId, target: NodeId, spec: EdgeSpec) -> Self {
        Self {
            id,
            source,
            target,
            edge_type: spec.edge_type,
            label: spec.label,
            confidence: spec.confidence,
            date: spec.date,
            source_handle: spec.source_handle,
            target_handle: spec.target_handle,
        }
    }

    pub fn id(&self) -> &EdgeId {
        &self.id
    }

    pub fn source(&self) -> &NodeId {
        &self.source
    }

    pub fn target(&self) -> &NodeId {
        &self.target
    }

    pub fn is_incident(&self, node: &NodeId) -> bool {
        &self.source == node || &self.target == node
    }

    /// The endpoint opposite `node`; for self-loops, `node` itself.
    pub fn other_end(&self, node: &NodeId) -> &NodeId {
        if &self.source == node {
            &self.target
        } else {
            &self.source
        }
    }
}

/// Creation request for a node; the model assigns the id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeSpec {
    pub node_type: String,
    pub label: String,
    pub position: Option<Point2D<f32>>,
    pub style: NodeStyle,
    pub extensions: Extensions,
}

impl NodeSpec {
    pub fn new(node_type: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn at(mut self, position: Point2D<f32>) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_style(mut self, style: NodeStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extensions.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeSpec {
    pub edge_type: String,
    pub label: String,
    pub confidence: Option<f32>,
    pub date: Option<String>,
    pub source_handle: Option<HandleSide>,
    pub target_handle: Option<HandleSide>,
}

impl EdgeSpec {
    pub fn new(edge_type: impl Into<String>) -> Self {
        Self {
            edge_type: edge_type.into(),
            ..Self::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_handles(mut self, source: HandleSide, target: HandleSide) -> Self {
        self.source_handle = Some(source);
        self.target_handle = Some(target);
        self
    }
}

/// Partial update applied by [`GraphModel::update_node`]. Extension keys in
/// the patch overwrite existing keys; other keys are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<NodeStyle>,
    #[serde(default)]
    pub extensions: Extensions,
}

impl NodePatch {
    pub fn extension(key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut patch = Self::default();
        patch.extensions.insert(key.into(), value.into());
        patch
    }
}

/// Node/edge store for one open sketch.
#[derive(Debug, Clone)]
pub struct GraphModel {
    inner: StableGraph<Node, Edge, Directed>,

    /// Node id to slot, in insertion order.
    nodes_by_id: IndexMap<NodeId, NodeKey>,

    /// Edge id to slot, in insertion order.
    edges_by_id: IndexMap<EdgeId, EdgeKey>,

    catalog: TypeCatalog,

    selection: SelectionState,

    /// Bumped on every mutation of nodes or edges.
    version: u64,
}

impl GraphModel {
    pub fn new(catalog: TypeCatalog) -> Self {
        Self {
            inner: StableGraph::new(),
            nodes_by_id: IndexMap::new(),
            edges_by_id: IndexMap::new(),
            catalog,
            selection: SelectionState::new(),
            version: 0,
        }
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    /// Replace the type catalog. Existing nodes are kept even if their type
    /// is no longer listed; only new nodes are validated.
    pub fn set_catalog(&mut self, catalog: TypeCatalog) {
        self.catalog = catalog;
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn node_count(&self) -> usize {
        self.nodes_by_id.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges_by_id.len()
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes_by_id.contains_key(id)
    }

    pub fn contains_edge(&self, id: &EdgeId) -> bool {
        self.edges_by_id.contains_key(id)
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        let key = self.nodes_by_id.get(id)?;
        self.inner.node_weight(*key)
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        let key = self.edges_by_id.get(id)?;
        self.inner.edge_weight(*key)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes_by_id
            .values()
            .filter_map(|key| self.inner.node_weight(*key))
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges_by_id
            .values()
            .filter_map(|key| self.inner.edge_weight(*key))
    }

    /// Insertion rank of a node, used as a deterministic tie-break by the
    /// layout strategies.
    pub fn node_order(&self, id: &NodeId) -> Option<usize> {
        self.nodes_by_id.get_index_of(id)
    }

    /// Edges touching `id`, in no particular order.
    pub fn incident_edges(&self, id: &NodeId) -> impl Iterator<Item = &Edge> {
        let key = self.nodes_by_id.get(id).copied();
        key.into_iter().flat_map(move |key| {
            self.inner
                .edges_directed(key, Direction::Outgoing)
                .chain(
                    self.inner
                        .edges_directed(key, Direction::Incoming)
                        .filter(|edge| edge.source() != edge.target()),
                )
                .map(|edge| edge.weight())
        })
    }

    /// `(neighbor, edge)` pairs for `id`, in edge insertion order.
    ///
    /// The iterator is finite and can be requested again at any time; an
    /// unknown id yields nothing.
    pub fn neighbors(&self, id: &NodeId) -> impl Iterator<Item = (&Node, &Edge)> {
        let mut incident: Vec<(usize, EdgeKey)> = match self.nodes_by_id.get(id) {
            Some(key) => self
                .inner
                .edges_directed(*key, Direction::Outgoing)
                .chain(self.inner.edges_directed(*key, Direction::Incoming))
                .filter_map(|edge| {
                    let order = self.edges_by_id.get_index_of(edge.weight().id())?;
                    Some((order, edge.id()))
                })
                .collect(),
            None => Vec::new(),
        };
        incident.sort_unstable_by_key(|(order, _)| *order);
        incident.dedup_by_key(|(order, _)| *order);

        let id = id.clone();
        incident.into_iter().filter_map(move |(_, key)| {
            let edge = self.inner.edge_weight(key)?;
            let neighbor = self.node(edge.other_end(&id))?;
            Some((neighbor, edge))
        })
    }

    /// Nodes satisfying `predicate`, in insertion order. Recomputed on every
    /// call; see [`filter::NodeFilter`] for the memoized form.
    pub fn filtered_nodes<'a, P>(&'a self, predicate: P) -> impl Iterator<Item = &'a Node> + 'a
    where
        P: Fn(&Node) -> bool + 'a,
    {
        self.nodes().filter(move |node| predicate(node))
    }

    pub fn validate_node_spec(&self, spec: &NodeSpec) -> CanvasResult<()> {
        if !self.catalog.is_known_node_type(&spec.node_type) {
            return Err(CanvasError::Validation(format!(
                "unrecognized node type `{}`",
                spec.node_type
            )));
        }
        Ok(())
    }

    /// Create a node with a fresh unique id.
    pub fn add_node(&mut self, spec: NodeSpec) -> CanvasResult<NodeId> {
        self.add_node_with_id(NodeId::generate(), spec)
    }

    /// Create a node under an id chosen by the caller (e.g. one the backend
    /// already acknowledged).
    pub fn add_node_with_id(&mut self, id: NodeId, spec: NodeSpec) -> CanvasResult<NodeId> {
        self.validate_node_spec(&spec)?;
        self.insert_node(Node::from_spec(id, spec))
    }

    /// Insert a fully-formed node without type validation.
    pub(crate) fn insert_node(&mut self, node: Node) -> CanvasResult<NodeId> {
        if self.nodes_by_id.contains_key(node.id()) {
            return Err(CanvasError::Validation(format!(
                "node id `{}` already exists",
                node.id()
            )));
        }
        let id = node.id().clone();
        let key = self.inner.add_node(node);
        self.nodes_by_id.insert(id.clone(), key);
        self.bump();
        Ok(id)
    }

    /// Check that an edge between `source` and `target` could be added.
    pub fn validate_edge(
        &self,
        source: &NodeId,
        target: &NodeId,
        edge_type: &str,
    ) -> CanvasResult<(NodeKey, NodeKey)> {
        let from = *self
            .nodes_by_id
            .get(source)
            .ok_or_else(|| CanvasError::missing_node(source))?;
        let to = *self
            .nodes_by_id
            .get(target)
            .ok_or_else(|| CanvasError::missing_node(target))?;
        if from == to && !self.catalog.edge_policy(edge_type).allow_self_loops {
            return Err(CanvasError::Validation(format!(
                "self-loop on `{source}` is not allowed for edge type `{edge_type}`"
            )));
        }
        Ok((from, to))
    }

    pub fn add_edge(
        &mut self,
        source: &NodeId,
        target: &NodeId,
        spec: EdgeSpec,
    ) -> CanvasResult<EdgeId> {
        self.add_edge_with_id(EdgeId::generate(), source, target, spec)
    }

    pub fn add_edge_with_id(
        &mut self,
        id: EdgeId,
        source: &NodeId,
        target: &NodeId,
        spec: EdgeSpec,
    ) -> CanvasResult<EdgeId> {
        if self.edges_by_id.contains_key(&id) {
            return Err(CanvasError::Validation(format!(
                "edge id `{id}` already exists"
            )));
        }
        let (from, to) = self.validate_edge(source, target, &spec.edge_type)?;
        let edge = Edge::from_spec(id.clone(), source.clone(), target.clone(), spec);
        let key = self.inner.add_edge(from, to, edge);
        self.edges_by_id.insert(id.clone(), key);
        self.bump();
        Ok(id)
    }

    /// Remove nodes together with every incident edge. Absent ids are
    /// skipped. Returns how many nodes were removed.
    pub fn remove_nodes<'a>(&mut self, ids: impl IntoIterator<Item = &'a NodeId>) -> usize {
        let mut removed = 0;
        for id in ids {
            let Some(key) = self.nodes_by_id.shift_remove(id) else {
                continue;
            };
            let incident: Vec<EdgeKey> = self
                .inner
                .edges_directed(key, Direction::Outgoing)
                .chain(self.inner.edges_directed(key, Direction::Incoming))
                .map(|edge| edge.id())
                .collect();
            for edge_key in incident {
                if let Some(edge) = self.inner.edge_weight(edge_key) {
                    self.edges_by_id.shift_remove(edge.id());
                }
            }
            self.inner.remove_node(key);
            removed += 1;
        }
        if removed > 0 {
            self.prune_selection();
            self.bump();
        }
        removed
    }

    /// Remove edges by id. Absent ids are skipped.
    pub fn remove_edges<'a>(&mut self, ids: impl IntoIterator<Item = &'a EdgeId>) -> usize {
        let mut removed = 0;
        for id in ids {
            if let Some(key) = self.edges_by_id.shift_remove(id) {
                self.inner.remove_edge(key);
                removed += 1;
            }
        }
        if removed > 0 {
            self.prune_selection();
            self.bump();
        }
        removed
    }

    pub fn update_node(&mut self, id: &NodeId, patch: NodePatch) -> CanvasResult<()> {
        let node = self
            .node_mut(id)
            .ok_or_else(|| CanvasError::missing_node(id))?;
        if let Some(label) = patch.label {
            node.label = label;
        }
        if let Some(style) = patch.style {
            node.style = style;
        }
        node.extensions.extend(patch.extensions);
        self.bump();
        Ok(())
    }

    pub fn set_node_position(&mut self, id: &NodeId, position: Point2D<f32>) -> CanvasResult<()> {
        let node = self
            .node_mut(id)
            .ok_or_else(|| CanvasError::missing_node(id))?;
        node.position = Some(position);
        self.bump();
        Ok(())
    }

    pub fn set_node_pinned(&mut self, id: &NodeId, pinned: bool) -> CanvasResult<()> {
        let node = self
            .node_mut(id)
            .ok_or_else(|| CanvasError::missing_node(id))?;
        node.pinned = pinned;
        self.bump();
        Ok(())
    }

    pub fn set_node_hidden(&mut self, id: &NodeId, hidden: bool) -> CanvasResult<()> {
        let node = self
            .node_mut(id)
            .ok_or_else(|| CanvasError::missing_node(id))?;
        node.hidden = hidden;
        self.bump();
        Ok(())
    }

    pub fn set_node_collapsed(&mut self, id: &NodeId, collapsed: bool) -> CanvasResult<()> {
        let node = self
            .node_mut(id)
            .ok_or_else(|| CanvasError::missing_node(id))?;
        node.collapsed = collapsed;
        self.bump();
        Ok(())
    }

    /// Write layout output. Unknown ids are skipped; only position fields
    /// change. Returns the ids that were updated.
    pub fn apply_positions<I>(&mut self, positions: I) -> Vec<NodeId>
    where
        I: IntoIterator<Item = (NodeId, Point2D<f32>)>,
    {
        let mut updated = Vec::new();
        for (id, position) in positions {
            if let Some(node) = self.node_mut(&id) {
                node.position = Some(position);
                updated.push(id);
            }
        }
        if !updated.is_empty() {
            self.bump();
        }
        updated
    }

    /// Fold `secondaries` into `primary`.
    ///
    /// The primary keeps its identity and core fields; extension maps are
    /// unioned with the primary winning conflicts; every edge touching a
    /// secondary is re-pointed at the primary and the result is
    /// deduplicated by `(source, target, type)`, first occurrence wins.
    /// Edges that only linked merged nodes to each other are dropped.
    /// Validation happens before any mutation, so the merge is all or
    /// nothing.
    pub fn merge_nodes(&mut self, primary: &NodeId, secondaries: &[NodeId]) -> CanvasResult<()> {
        if secondaries.contains(primary) {
            return Err(CanvasError::Validation(format!(
                "cannot merge node `{primary}` into itself"
            )));
        }
        let primary_key = *self
            .nodes_by_id
            .get(primary)
            .ok_or_else(|| CanvasError::missing_node(primary))?;
        let mut secondary_keys = Vec::with_capacity(secondaries.len());
        for id in secondaries {
            let key = *self
                .nodes_by_id
                .get(id)
                .ok_or_else(|| CanvasError::missing_node(id))?;
            if !secondary_keys.contains(&key) {
                secondary_keys.push(key);
            }
        }
        if secondary_keys.is_empty() {
            return Ok(());
        }

        let absorbed: HashSet<&NodeId> = secondaries.iter().collect();
        let repoint = |id: &NodeId| {
            if absorbed.contains(id) {
                primary.clone()
            } else {
                id.clone()
            }
        };

        let mut extensions = self.inner[primary_key].extensions.clone();
        for key in &secondary_keys {
            for (name, value) in &self.inner[*key].extensions {
                extensions
                    .entry(name.clone())
                    .or_insert_with(|| value.clone());
            }
        }

        let mut seen: HashSet<(NodeId, NodeId, String)> = HashSet::new();
        let mut moved: Vec<Edge> = Vec::new();
        let mut dropped: Vec<EdgeId> = Vec::new();
        for edge_key in self.edges_by_id.values() {
            let edge = &self.inner[*edge_key];
            let touches_absorbed =
                absorbed.contains(edge.source()) || absorbed.contains(edge.target());
            if !touches_absorbed && !edge.is_incident(primary) {
                continue;
            }
            let source = repoint(edge.source());
            let target = repoint(edge.target());
            if source == target && edge.source() != edge.target() {
                dropped.push(edge.id().clone());
                continue;
            }
            if !seen.insert((source.clone(), target.clone(), edge.edge_type.clone())) {
                dropped.push(edge.id().clone());
                continue;
            }
            if touches_absorbed {
                let mut edge = edge.clone();
                // Anchors do not carry over to another node's handles.
                if absorbed.contains(edge.source()) {
                    edge.source_handle = None;
                }
                if absorbed.contains(edge.target()) {
                    edge.target_handle = None;
                }
                edge.source = source;
                edge.target = target;
                moved.push(edge);
            }
        }

        for id in &dropped {
            if let Some(key) = self.edges_by_id.shift_remove(id) {
                self.inner.remove_edge(key);
            }
        }
        for key in &secondary_keys {
            if let Some(node) = self.inner.remove_node(*key) {
                self.nodes_by_id.shift_remove(node.id());
            }
        }
        for edge in moved {
            let (Some(from), Some(to)) = (
                self.nodes_by_id.get(edge.source()).copied(),
                self.nodes_by_id.get(edge.target()).copied(),
            ) else {
                self.edges_by_id.shift_remove(edge.id());
                continue;
            };
            let id = edge.id().clone();
            let key = self.inner.add_edge(from, to, edge);
            // Existing key: IndexMap keeps the original insertion slot.
            self.edges_by_id.insert(id, key);
        }
        self.inner[primary_key].extensions = extensions;

        debug!(
            "merged {} node(s) into `{primary}`, dropped {} edge(s)",
            secondary_keys.len(),
            dropped.len()
        );
        self.prune_selection();
        self.bump();
        Ok(())
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// Click-select a node. Returns false if the node does not exist.
    pub fn select_node(&mut self, id: &NodeId, multi_select: bool) -> bool {
        if !self.contains_node(id) {
            return false;
        }
        self.selection.select(id.clone(), multi_select);
        true
    }

    /// Update the node selection; ids that do not exist are ignored.
    pub fn update_selection(&mut self, ids: Vec<NodeId>, mode: SelectionUpdateMode) {
        let ids: Vec<NodeId> = ids
            .into_iter()
            .filter(|id| self.nodes_by_id.contains_key(id))
            .collect();
        self.selection.update_many(ids, mode);
    }

    pub fn update_edge_selection(&mut self, ids: Vec<EdgeId>, mode: SelectionUpdateMode) {
        let ids: Vec<EdgeId> = ids
            .into_iter()
            .filter(|id| self.edges_by_id.contains_key(id))
            .collect();
        self.selection.update_edges(ids, mode);
    }

    pub fn select_all(&mut self) {
        let ids: Vec<NodeId> = self.nodes_by_id.keys().cloned().collect();
        self.selection.update_many(ids, SelectionUpdateMode::Replace);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Selected node ids, in selection order.
    pub fn selected_node_ids(&self) -> Vec<NodeId> {
        self.selection.nodes().cloned().collect()
    }

    fn prune_selection(&mut self) {
        let nodes = &self.nodes_by_id;
        let edges = &self.edges_by_id;
        self.selection
            .retain(|id| nodes.contains_key(id), |id| edges.contains_key(id));
    }

    fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        let key = *self.nodes_by_id.get(id)?;
        self.inner.node_weight_mut(key)
    }

    fn bump(&mut self) {
        self.version = self.version.wrapping_add(1);
    }
}

impl Default for GraphModel {
    fn default() -> Self {
        Self::new(TypeCatalog::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn person(label: &str) -> NodeSpec {
        NodeSpec::new("person", label)
    }

    fn related() -> EdgeSpec {
        EdgeSpec::new("related_to")
    }

    fn assert_no_dangling_edges(model: &GraphModel) {
        for edge in model.edges() {
            assert!(model.contains_node(edge.source()), "dangling source");
            assert!(model.contains_node(edge.target()), "dangling target");
        }
        assert_eq!(model.edges().count(), model.edge_count());
        assert_eq!(model.inner.edge_count(), model.edge_count());
        assert_eq!(model.inner.node_count(), model.node_count());
    }

    #[test]
    fn test_graph_new() {
        let model = GraphModel::default();
        assert_eq!(model.node_count(), 0);
        assert_eq!(model.edge_count(), 0);
        assert_eq!(model.version(), 0);
    }

    #[test]
    fn test_add_node_assigns_unique_ids() {
        let mut model = GraphModel::default();
        let a = model.add_node(person("Ada")).unwrap();
        let b = model.add_node(person("Ada")).unwrap();

        assert_ne!(a, b);
        assert_eq!(model.node(&a).unwrap().label, "Ada");
        assert_eq!(model.node(&a).unwrap().id(), &a);
        assert!(model.node(&a).unwrap().position.is_none());
    }

    #[test]
    fn test_add_node_rejects_unknown_type() {
        let mut model = GraphModel::default();
        let err = model.add_node(NodeSpec::new("spaceship", "x")).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(model.node_count(), 0);
    }

    #[test]
    fn test_add_node_with_duplicate_id_fails() {
        let mut model = GraphModel::default();
        model
            .add_node_with_id(NodeId::from("n"), person("a"))
            .unwrap();
        let err = model
            .add_node_with_id(NodeId::from("n"), person("b"))
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(model.node(&NodeId::from("n")).unwrap().label, "a");
    }

    #[test]
    fn test_add_edge_missing_endpoint_is_reference_error() {
        let mut model = GraphModel::default();
        let a = model.add_node(person("a")).unwrap();
        let ghost = NodeId::from("ghost");

        assert!(model.add_edge(&a, &ghost, related()).unwrap_err().is_reference());
        assert!(model.add_edge(&ghost, &a, related()).unwrap_err().is_reference());
        assert_eq!(model.edge_count(), 0);
    }

    #[test]
    fn test_self_loop_follows_type_policy() {
        let mut model = GraphModel::default();
        let a = model.add_node(NodeSpec::new("website", "a")).unwrap();

        assert!(model.add_edge(&a, &a, related()).unwrap_err().is_validation());
        model.add_edge(&a, &a, EdgeSpec::new("links_to")).unwrap();
        assert_eq!(model.edge_count(), 1);
        assert_eq!(model.neighbors(&a).count(), 1);
    }

    #[test]
    fn test_remove_nodes_removes_incident_edges_and_is_idempotent() {
        let mut model = GraphModel::default();
        let a = model.add_node(person("a")).unwrap();
        let b = model.add_node(person("b")).unwrap();
        let c = model.add_node(person("c")).unwrap();
        model.add_edge(&a, &b, related()).unwrap();
        model.add_edge(&c, &a, related()).unwrap();
        let bc = model.add_edge(&b, &c, related()).unwrap();

        assert_eq!(model.remove_nodes([&a]), 1);
        assert_eq!(model.node_count(), 2);
        assert_eq!(model.edge_count(), 1);
        assert!(model.contains_edge(&bc));
        assert_no_dangling_edges(&model);

        let version = model.version();
        assert_eq!(model.remove_nodes([&a]), 0);
        assert_eq!(model.version(), version);
    }

    #[test]
    fn test_removal_prunes_selection() {
        let mut model = GraphModel::default();
        let a = model.add_node(person("a")).unwrap();
        let b = model.add_node(person("b")).unwrap();
        let ab = model.add_edge(&a, &b, related()).unwrap();
        model.update_selection(vec![a.clone(), b.clone()], SelectionUpdateMode::Replace);
        model.update_edge_selection(vec![ab], SelectionUpdateMode::Add);

        model.remove_nodes([&b]);
        assert_eq!(model.selected_node_ids(), vec![a]);
        assert_eq!(model.selection().edge_count(), 0);
    }

    #[test]
    fn test_update_selection_ignores_unknown_ids() {
        let mut model = GraphModel::default();
        let a = model.add_node(person("a")).unwrap();
        model.update_selection(
            vec![a.clone(), NodeId::from("ghost")],
            SelectionUpdateMode::Replace,
        );
        assert_eq!(model.selected_node_ids(), vec![a]);
    }

    #[test]
    fn test_update_node_merges_extensions() {
        let mut model = GraphModel::default();
        let a = model
            .add_node(person("a").with_extension("email", "a@example.com"))
            .unwrap();
        model
            .update_node(&a, NodePatch::extension("phone", "+100"))
            .unwrap();

        let node = model.node(&a).unwrap();
        assert_eq!(node.extensions["email"], json!("a@example.com"));
        assert_eq!(node.extensions["phone"], json!("+100"));
        assert!(
            model
                .update_node(&NodeId::from("ghost"), NodePatch::default())
                .unwrap_err()
                .is_reference()
        );
    }

    #[test]
    fn test_neighbors_follow_edge_insertion_order() {
        let mut model = GraphModel::default();
        let hub = model.add_node(person("hub")).unwrap();
        let x = model.add_node(person("x")).unwrap();
        let y = model.add_node(person("y")).unwrap();
        let z = model.add_node(person("z")).unwrap();
        model.add_edge(&hub, &y, related()).unwrap();
        model.add_edge(&x, &hub, related()).unwrap();
        model.add_edge(&hub, &z, related()).unwrap();

        let labels: Vec<&str> = model
            .neighbors(&hub)
            .map(|(node, _)| node.label.as_str())
            .collect();
        assert_eq!(labels, vec!["y", "x", "z"]);

        // Restartable.
        assert_eq!(model.neighbors(&hub).count(), 3);
        assert_eq!(model.neighbors(&NodeId::from("ghost")).count(), 0);
    }

    #[test]
    fn test_neighbors_order_survives_slot_reuse() {
        let mut model = GraphModel::default();
        let hub = model.add_node(person("hub")).unwrap();
        let a = model.add_node(person("a")).unwrap();
        let b = model.add_node(person("b")).unwrap();
        let c = model.add_node(person("c")).unwrap();
        let first = model.add_edge(&hub, &a, related()).unwrap();
        model.add_edge(&hub, &b, related()).unwrap();
        model.remove_edges([&first]);
        model.add_edge(&hub, &c, related()).unwrap();

        let labels: Vec<&str> = model
            .neighbors(&hub)
            .map(|(node, _)| node.label.as_str())
            .collect();
        assert_eq!(labels, vec!["b", "c"]);
    }

    #[test]
    fn test_merge_unions_extensions_primary_wins() {
        let mut model = GraphModel::default();
        let a = model
            .add_node(
                person("a")
                    .with_extension("email", "a@example.com")
                    .with_extension("city", "Paris"),
            )
            .unwrap();
        let b = model
            .add_node(
                person("b")
                    .with_extension("email", "b@example.com")
                    .with_extension("phone", "+33"),
            )
            .unwrap();

        model.merge_nodes(&a, std::slice::from_ref(&b)).unwrap();

        let merged = model.node(&a).unwrap();
        assert_eq!(merged.label, "a");
        assert_eq!(merged.extensions["email"], json!("a@example.com"));
        assert_eq!(merged.extensions["city"], json!("Paris"));
        assert_eq!(merged.extensions["phone"], json!("+33"));
        assert!(!model.contains_node(&b));
    }

    #[test]
    fn test_merge_repoints_and_deduplicates_edges() {
        let mut model = GraphModel::default();
        let a = model.add_node(person("a")).unwrap();
        let b = model.add_node(person("b")).unwrap();
        let c = model.add_node(person("c")).unwrap();
        let d = model.add_node(person("d")).unwrap();
        let ac = model.add_edge(&a, &c, related()).unwrap();
        let bc = model.add_edge(&b, &c, related()).unwrap();
        let db = model.add_edge(&d, &b, EdgeSpec::new("owns")).unwrap();
        let ab = model.add_edge(&a, &b, related()).unwrap();

        model.merge_nodes(&a, std::slice::from_ref(&b)).unwrap();

        assert!(model.contains_edge(&ac));
        assert!(!model.contains_edge(&bc), "duplicate of a->c");
        assert!(!model.contains_edge(&ab), "collapsed into a self-loop");
        let moved = model.edge(&db).unwrap();
        assert_eq!(moved.source(), &d);
        assert_eq!(moved.target(), &a);

        let mut triples = HashSet::new();
        for edge in model.edges() {
            assert!(triples.insert((
                edge.source().clone(),
                edge.target().clone(),
                edge.edge_type.clone()
            )));
        }
        assert_no_dangling_edges(&model);

        let order: Vec<&EdgeId> = model.edges().map(|edge| edge.id()).collect();
        assert_eq!(order, vec![&ac, &db]);
    }

    #[test]
    fn test_merge_into_itself_is_validation_error_and_leaves_model_untouched() {
        let mut model = GraphModel::default();
        let a = model.add_node(person("a")).unwrap();
        let b = model.add_node(person("b")).unwrap();
        let version = model.version();

        let err = model.merge_nodes(&a, &[b.clone(), a.clone()]).unwrap_err();
        assert!(err.is_validation());
        assert!(model.contains_node(&b));
        assert_eq!(model.version(), version);
    }

    #[test]
    fn test_merge_with_missing_secondary_is_atomic() {
        let mut model = GraphModel::default();
        let a = model.add_node(person("a")).unwrap();
        let b = model.add_node(person("b")).unwrap();

        let err = model
            .merge_nodes(&a, &[b.clone(), NodeId::from("ghost")])
            .unwrap_err();
        assert!(err.is_reference());
        assert!(model.contains_node(&b));
    }

    #[test]
    fn test_merge_clears_anchors_on_repointed_side() {
        let mut model = GraphModel::default();
        let a = model.add_node(person("a")).unwrap();
        let b = model.add_node(person("b")).unwrap();
        let c = model.add_node(person("c")).unwrap();
        let bc = model
            .add_edge(
                &b,
                &c,
                related().with_handles(HandleSide::Right, HandleSide::Left),
            )
            .unwrap();

        model.merge_nodes(&a, std::slice::from_ref(&b)).unwrap();
        let edge = model.edge(&bc).unwrap();
        assert_eq!(edge.source_handle, None);
        assert_eq!(edge.target_handle, Some(HandleSide::Left));
    }

    #[test]
    fn test_apply_positions_skips_unknown_ids() {
        let mut model = GraphModel::default();
        let a = model.add_node(person("a")).unwrap();
        let updated = model.apply_positions(vec![
            (a.clone(), Point2D::new(3.0, 4.0)),
            (NodeId::from("ghost"), Point2D::new(0.0, 0.0)),
        ]);
        assert_eq!(updated, vec![a.clone()]);
        assert_eq!(model.node(&a).unwrap().position, Some(Point2D::new(3.0, 4.0)));
    }

    #[test]
    fn test_filtered_nodes_keeps_insertion_order() {
        let mut model = GraphModel::default();
        for label in ["d", "a", "c", "b"] {
            model.add_node(person(label)).unwrap();
        }
        let labels: Vec<&str> = model
            .filtered_nodes(|node| node.label != "c")
            .map(|node| node.label.as_str())
            .collect();
        assert_eq!(labels, vec!["d", "a", "b"]);
    }

    #[derive(Debug, Clone)]
    enum Op {
        AddNode,
        AddEdge(usize, usize),
        RemoveNode(usize),
        RemoveEdge(usize),
        Merge(usize, usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => Just(Op::AddNode),
            4 => (0usize..16, 0usize..16).prop_map(|(a, b)| Op::AddEdge(a, b)),
            1 => (0usize..16).prop_map(Op::RemoveNode),
            1 => (0usize..16).prop_map(Op::RemoveEdge),
            1 => (0usize..16, 0usize..16).prop_map(|(a, b)| Op::Merge(a, b)),
        ]
    }

    proptest! {
        #[test]
        fn prop_no_dangling_edges_after_any_operation_sequence(
            ops in proptest::collection::vec(op_strategy(), 1..60)
        ) {
            let mut model = GraphModel::default();
            for op in ops {
                let nodes: Vec<NodeId> = model.nodes().map(|n| n.id().clone()).collect();
                let edges: Vec<EdgeId> = model.edges().map(|e| e.id().clone()).collect();
                let pick = |ids: &[NodeId], i: usize| ids.get(i % ids.len().max(1)).cloned();
                match op {
                    Op::AddNode => {
                        model.add_node(NodeSpec::new("person", "p")).unwrap();
                    },
                    Op::AddEdge(a, b) => {
                        if let (Some(a), Some(b)) = (pick(&nodes, a), pick(&nodes, b)) {
                            let _ = model.add_edge(&a, &b, EdgeSpec::new("related_to"));
                        }
                    },
                    Op::RemoveNode(a) => {
                        if let Some(a) = pick(&nodes, a) {
                            model.remove_nodes([&a]);
                        }
                    },
                    Op::RemoveEdge(e) => {
                        if let Some(e) = edges.get(e % edges.len().max(1)) {
                            model.remove_edges([e]);
                        }
                    },
                    Op::Merge(a, b) => {
                        if let (Some(a), Some(b)) = (pick(&nodes, a), pick(&nodes, b)) {
                            let _ = model.merge_nodes(&a, &[b]);
                        }
                    },
                }
                for edge in model.edges() {
                    prop_assert!(model.contains_node(edge.source()));
                    prop_assert!(model.contains_node(edge.target()));
                }
                prop_assert_eq!(model.inner.edge_count(), model.edge_count());
                prop_assert_eq!(model.inner.node_count(), model.node_count());
                for id in model.selection().nodes() {
                    prop_assert!(model.contains_node(id));
                }
            }
        }

        #[test]
        fn prop_filtered_nodes_is_ordered_subset(
            labels in proptest::collection::vec("[a-z]{1,3}", 0..30),
            needle in "[a-z]",
        ) {
            let mut model = GraphModel::default();
            for label in &labels {
                model.add_node(NodeSpec::new("person", label.clone())).unwrap();
            }
            let predicate = |node: &Node| node.label.contains(needle.as_str());
            let filtered: Vec<&NodeId> = model.filtered_nodes(predicate).map(|n| n.id()).collect();
            let all: Vec<&NodeId> = model.nodes().map(|n| n.id()).collect();

            let mut cursor = 0;
            for id in &filtered {
                prop_assert!(predicate(model.node(id).unwrap()));
                let position = all[cursor..].iter().position(|candidate| candidate == id);
                prop_assert!(position.is_some());
                cursor += position.unwrap() + 1;
            }
            let expected = labels.iter().filter(|l| l.contains(needle.as_str())).count();
            prop_assert_eq!(filtered.len(), expected);
        }
    }
}
