/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Canonical node/edge selection state.

use indexmap::IndexSet;

use super::{EdgeId, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionUpdateMode {
    #[default]
    Replace,
    Add,
    Toggle,
}

/// Selected nodes and edges, in selection order.
///
/// The owning [`GraphModel`](super::GraphModel) prunes ids that no longer
/// exist after every structural mutation, so consumers can rely on every
/// entry resolving.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionState {
    nodes: IndexSet<NodeId>,
    edges: IndexSet<EdgeId>,
    primary: Option<NodeId>,
    revision: u64,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Monotonic revision incremented whenever the selection changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Primary selected node (most recently selected).
    pub fn primary(&self) -> Option<&NodeId> {
        self.primary.as_ref()
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.contains(id)
    }

    pub fn contains_edge(&self, id: &EdgeId) -> bool {
        self.edges.contains(id)
    }

    /// Selected nodes in the order they were selected.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = &EdgeId> {
        self.edges.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Click-style selection: `multi_select` toggles membership, otherwise
    /// the node becomes the only selected entity. Re-clicking the sole
    /// selected node deselects it.
    pub fn select(&mut self, id: NodeId, multi_select: bool) {
        if multi_select {
            if self.nodes.shift_remove(&id) {
                self.primary = self.nodes.last().cloned();
            } else {
                self.nodes.insert(id.clone());
                self.primary = Some(id);
            }
            self.touch();
            return;
        }

        if self.nodes.len() == 1 && self.edges.is_empty() && self.primary.as_ref() == Some(&id) {
            self.clear();
            return;
        }

        self.nodes.clear();
        self.edges.clear();
        self.nodes.insert(id.clone());
        self.primary = Some(id);
        self.touch();
    }

    pub fn clear(&mut self) {
        if self.is_empty() && self.primary.is_none() {
            return;
        }
        self.nodes.clear();
        self.edges.clear();
        self.primary = None;
        self.touch();
    }

    pub fn update_many(&mut self, ids: impl IntoIterator<Item = NodeId>, mode: SelectionUpdateMode) {
        match mode {
            SelectionUpdateMode::Replace => {
                self.nodes.clear();
                self.edges.clear();
                self.nodes.extend(ids);
                self.primary = self.nodes.last().cloned();
                self.touch();
            },
            SelectionUpdateMode::Add => {
                let mut changed = false;
                for id in ids {
                    if self.nodes.insert(id.clone()) {
                        self.primary = Some(id);
                        changed = true;
                    }
                }
                if changed {
                    self.touch();
                }
            },
            SelectionUpdateMode::Toggle => {
                let mut changed = false;
                for id in ids {
                    if !self.nodes.shift_remove(&id) {
                        self.nodes.insert(id);
                    }
                    changed = true;
                }
                self.primary = self.nodes.last().cloned();
                if changed {
                    self.touch();
                }
            },
        }
    }

    pub fn update_edges(&mut self, ids: impl IntoIterator<Item = EdgeId>, mode: SelectionUpdateMode) {
        match mode {
            SelectionUpdateMode::Replace => {
                self.nodes.clear();
                self.primary = None;
                self.edges.clear();
                self.edges.extend(ids);
            },
            SelectionUpdateMode::Add => self.edges.extend(ids),
            SelectionUpdateMode::Toggle => {
                for id in ids {
                    if !self.edges.shift_remove(&id) {
                        self.edges.insert(id);
                    }
                }
            },
        }
        self.touch();
    }

    /// Drop every id rejected by the predicates. Returns whether anything
    /// was removed.
    pub(crate) fn retain(
        &mut self,
        keep_node: impl Fn(&NodeId) -> bool,
        keep_edge: impl Fn(&EdgeId) -> bool,
    ) -> bool {
        let before = (self.nodes.len(), self.edges.len());
        self.nodes.retain(|id| keep_node(id));
        self.edges.retain(|id| keep_edge(id));
        if self.primary.as_ref().is_some_and(|id| !self.nodes.contains(id)) {
            self.primary = self.nodes.last().cloned();
        }
        let changed = before != (self.nodes.len(), self.edges.len());
        if changed {
            self.touch();
        }
        changed
    }

    fn touch(&mut self) {
        self.revision = self.revision.saturating_add(1);
    }
}
