/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Connection points ("handles") and their capacity rules.
//!
//! Attachment counts are derived from the edges currently in the
//! [`GraphModel`], never cached, so removing an edge restores
//! connectability immediately. Edges that carry no handle side (for example
//! edges fetched from the backend) are unanchored and do not count against
//! any handle.

use std::collections::HashMap;
use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use super::{Edge, EdgeSpec, GraphModel, NodeId};
use crate::error::{CanvasError, CanvasResult};

pub const DEFAULT_MAX_CONNECTIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleSide {
    Top,
    Bottom,
    Left,
    Right,
}

impl HandleSide {
    pub const ALL: [Self; 4] = [Self::Top, Self::Right, Self::Bottom, Self::Left];

    /// Side-default role: edges leave through right/bottom and arrive
    /// through left/top.
    pub fn default_role(self) -> HandleRole {
        match self {
            Self::Right | Self::Bottom => HandleRole::Source,
            Self::Left | Self::Top => HandleRole::Target,
        }
    }
}

impl fmt::Display for HandleSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Left => "left",
            Self::Right => "right",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleRole {
    Source,
    Target,
}

impl fmt::Display for HandleRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Source => "source",
            Self::Target => "target",
        })
    }
}

/// A connection point attached to a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandleId {
    pub node: NodeId,
    pub side: HandleSide,
    pub role: HandleRole,
}

impl HandleId {
    pub fn new(node: NodeId, side: HandleSide, role: HandleRole) -> Self {
        Self { node, side, role }
    }

    /// The handle a node exposes on `side`, with that side's default role.
    pub fn on_side(node: NodeId, side: HandleSide) -> Self {
        Self::new(node, side, side.default_role())
    }

    /// The four handles every node renders.
    pub fn all_for(node: &NodeId) -> [HandleId; 4] {
        HandleSide::ALL.map(|side| Self::on_side(node.clone(), side))
    }
}

impl Edge {
    /// Whether this edge is anchored at `handle`.
    pub fn attaches_to(&self, handle: &HandleId) -> bool {
        match handle.role {
            HandleRole::Source => {
                self.source() == &handle.node && self.source_handle == Some(handle.side)
            },
            HandleRole::Target => {
                self.target() == &handle.node && self.target_handle == Some(handle.side)
            },
        }
    }
}

/// Attachment snapshot for one handle, consumed by rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleState {
    pub handle: HandleId,
    pub attached: usize,
    pub max_connections: usize,
}

impl HandleState {
    pub fn is_saturated(&self) -> bool {
        self.attached >= self.max_connections
    }

    /// Saturated handles render as non-interactive.
    pub fn is_interactive(&self) -> bool {
        !self.is_saturated()
    }
}

/// Per-connection-point capacity rules.
#[derive(Debug, Clone)]
pub struct ConnectionConstraints {
    default_max: usize,
    overrides: HashMap<HandleId, usize>,
}

impl ConnectionConstraints {
    pub fn new(default_max: usize) -> Self {
        Self {
            default_max,
            overrides: HashMap::new(),
        }
    }

    pub fn set_capacity(&mut self, handle: HandleId, max_connections: usize) {
        self.overrides.insert(handle, max_connections);
    }

    pub fn capacity(&self, handle: &HandleId) -> usize {
        self.overrides
            .get(handle)
            .copied()
            .unwrap_or(self.default_max)
    }

    pub fn attached_count(&self, model: &GraphModel, handle: &HandleId) -> usize {
        model
            .incident_edges(&handle.node)
            .filter(|edge| edge.attaches_to(handle))
            .count()
    }

    pub fn state(&self, model: &GraphModel, handle: &HandleId) -> HandleState {
        HandleState {
            handle: handle.clone(),
            attached: self.attached_count(model, handle),
            max_connections: self.capacity(handle),
        }
    }

    /// States for the four handles of `node`, in [`HandleSide::ALL`] order.
    pub fn node_states(&self, model: &GraphModel, node: &NodeId) -> Vec<HandleState> {
        HandleId::all_for(node)
            .iter()
            .map(|handle| self.state(model, handle))
            .collect()
    }

    /// False once the handle's attached-edge count reaches its capacity, or
    /// when the owning node does not exist.
    pub fn can_connect(&self, model: &GraphModel, handle: &HandleId) -> bool {
        model.contains_node(&handle.node) && !self.state(model, handle).is_saturated()
    }

    pub fn check(&self, model: &GraphModel, handle: &HandleId) -> CanvasResult<()> {
        if !model.contains_node(&handle.node) {
            return Err(CanvasError::missing_node(&handle.node));
        }
        let state = self.state(model, handle);
        if state.is_saturated() {
            debug!(
                "connection point {}/{} on `{}` is saturated ({}/{})",
                handle.side, handle.role, handle.node, state.attached, state.max_connections
            );
            return Err(CanvasError::Capacity {
                node: handle.node.clone(),
                side: handle.side,
                role: handle.role,
                max: state.max_connections,
            });
        }
        Ok(())
    }

    /// Check the connection points an edge about to be added would occupy.
    /// Sides left unset on `spec` are unanchored and always pass.
    pub fn check_edge(
        &self,
        model: &GraphModel,
        source: &NodeId,
        target: &NodeId,
        spec: &EdgeSpec,
    ) -> CanvasResult<()> {
        if let Some(side) = spec.source_handle {
            self.check(model, &HandleId::new(source.clone(), side, HandleRole::Source))?;
        }
        if let Some(side) = spec.target_handle {
            self.check(model, &HandleId::new(target.clone(), side, HandleRole::Target))?;
        }
        Ok(())
    }

    /// Validate a gesture that started at `from` and ended at `to`.
    ///
    /// Returns the pair ordered as (source-role handle, target-role handle).
    pub fn resolve_connection(
        &self,
        model: &GraphModel,
        from: &HandleId,
        to: &HandleId,
    ) -> CanvasResult<(HandleId, HandleId)> {
        if from.role == to.role {
            return Err(CanvasError::Validation(format!(
                "cannot connect two {} handles",
                from.role
            )));
        }
        if from == to {
            return Err(CanvasError::Validation(
                "cannot connect a handle to itself".to_string(),
            ));
        }
        self.check(model, from)?;
        self.check(model, to)?;
        let pair = match from.role {
            HandleRole::Source => (from.clone(), to.clone()),
            HandleRole::Target => (to.clone(), from.clone()),
        };
        Ok(pair)
    }
}

impl Default for ConnectionConstraints {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONNECTIONS)
    }
}
