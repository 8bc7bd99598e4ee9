/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Memoized node filters.

use super::{GraphModel, Node, NodeId};

/// Named predicate whose result is cached against the model version.
///
/// Output is in node insertion order, so a re-run on an unchanged model is
/// byte-for-byte the same list.
pub struct NodeFilter {
    name: String,
    predicate: Box<dyn Fn(&Node) -> bool + Send + Sync>,
    cached: Option<(u64, Vec<NodeId>)>,
}

impl NodeFilter {
    pub fn new(
        name: impl Into<String>,
        predicate: impl Fn(&Node) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            predicate: Box::new(predicate),
            cached: None,
        }
    }

    /// Nodes the user hid from the canvas.
    pub fn hidden() -> Self {
        Self::new("hidden", |node| node.hidden)
    }

    /// Nodes of one type, matched case-insensitively.
    pub fn by_type(node_type: impl Into<String>) -> Self {
        let node_type: String = node_type.into();
        let name = format!("type:{node_type}");
        Self::new(name, move |node| node.node_type.eq_ignore_ascii_case(&node_type))
    }

    /// Nodes whose label contains `needle`, ignoring case.
    pub fn label_contains(needle: impl Into<String>) -> Self {
        let needle = needle.into().to_lowercase();
        let name = format!("label:{needle}");
        Self::new(name, move |node| node.label.to_lowercase().contains(&needle))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matches(&self, node: &Node) -> bool {
        (self.predicate)(node)
    }

    /// Matching ids, recomputed only when the model version moved.
    pub fn apply(&mut self, model: &GraphModel) -> &[NodeId] {
        let version = model.version();
        let stale = self
            .cached
            .as_ref()
            .is_none_or(|(cached_version, _)| *cached_version != version);
        if stale {
            let ids = model
                .filtered_nodes(|node| (self.predicate)(node))
                .map(|node| node.id().clone())
                .collect();
            self.cached = Some((version, ids));
        }
        self.cached.as_ref().map(|(_, ids)| ids.as_slice()).unwrap_or(&[])
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}

impl std::fmt::Debug for NodeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeFilter")
            .field("name", &self.name)
            .field("cached", &self.cached.as_ref().map(|(version, _)| version))
            .finish()
    }
}
