/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Error taxonomy for canvas operations.
//!
//! `Validation` and `Reference` errors propagate to the caller of a graph
//! operation. `Capacity` and `Payload` exist so lower layers can describe a
//! rejection, but the interaction and drop boundaries turn them into
//! rejected outcomes instead of surfacing them.

use std::fmt;

use crate::config::ConfigError;
use crate::graph::NodeId;
use crate::graph::handles::{HandleRole, HandleSide};
use crate::persistence::PersistenceError;
use crate::services::ServiceError;

/// Which kind of graph entity a [`CanvasError::Reference`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Node,
    Edge,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Node => f.write_str("node"),
            EntityKind::Edge => f.write_str("edge"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    /// Malformed or disallowed operation, e.g. merging a node into itself.
    #[error("validation error: {0}")]
    Validation(String),

    /// The operation targets an id that does not exist.
    #[error("{kind} `{id}` does not exist")]
    Reference { kind: EntityKind, id: String },

    /// A connection was attempted against a saturated connection point.
    #[error("connection point {side}/{role} on node `{node}` is saturated ({max} connections)")]
    Capacity {
        node: NodeId,
        side: HandleSide,
        role: HandleRole,
        max: usize,
    },

    /// A drag payload could not be decoded.
    #[error("undecodable drag payload: {0}")]
    Payload(String),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl CanvasError {
    pub(crate) fn missing_node(id: &NodeId) -> Self {
        CanvasError::Reference {
            kind: EntityKind::Node,
            id: id.to_string(),
        }
    }

    pub(crate) fn missing_edge(id: impl fmt::Display) -> Self {
        CanvasError::Reference {
            kind: EntityKind::Edge,
            id: id.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, CanvasError::Validation(_))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, CanvasError::Reference { .. })
    }
}

pub type CanvasResult<T> = Result<T, CanvasError>;
