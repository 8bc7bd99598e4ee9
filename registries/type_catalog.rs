/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Node and edge type catalog.
//!
//! The backend publishes the authoritative catalog; the seeded defaults let
//! a canvas work before (or without) that fetch. Keys are matched
//! case-insensitively after trimming.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub const EDGE_TYPE_RELATED_TO: &str = "related_to";
pub const EDGE_TYPE_LINKS_TO: &str = "links_to";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeTypeEntry {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub color: Option<String>,
    /// Known attribute names for this type; anything else on a node lives in
    /// its extension map.
    #[serde(default)]
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EdgeTypePolicy {
    #[serde(default)]
    pub allow_self_loops: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeTypeEntry {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub policy: EdgeTypePolicy,
}

/// Wire form of the catalog as served by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeCatalogSnapshot {
    #[serde(default)]
    pub node_types: Vec<NodeTypeEntry>,
    #[serde(default)]
    pub edge_types: Vec<EdgeTypeEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeCatalog {
    node_types: IndexMap<String, NodeTypeEntry>,
    edge_types: IndexMap<String, EdgeTypeEntry>,
}

fn normalize(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

impl TypeCatalog {
    pub fn empty() -> Self {
        Self {
            node_types: IndexMap::new(),
            edge_types: IndexMap::new(),
        }
    }

    pub fn from_snapshot(snapshot: TypeCatalogSnapshot) -> Self {
        let mut catalog = Self::empty();
        for entry in snapshot.node_types {
            catalog.register_node_type(entry);
        }
        for entry in snapshot.edge_types {
            catalog.register_edge_type(entry);
        }
        catalog
    }

    pub fn to_snapshot(&self) -> TypeCatalogSnapshot {
        TypeCatalogSnapshot {
            node_types: self.node_types.values().cloned().collect(),
            edge_types: self.edge_types.values().cloned().collect(),
        }
    }

    pub fn register_node_type(&mut self, entry: NodeTypeEntry) {
        self.node_types.insert(normalize(&entry.key), entry);
    }

    pub fn register_edge_type(&mut self, entry: EdgeTypeEntry) {
        self.edge_types.insert(normalize(&entry.key), entry);
    }

    pub fn register_core_seed_defaults(&mut self) {
        for (key, label, color) in [
            ("person", "Person", "#4f86f7"),
            ("organization", "Organization", "#f78c4f"),
            ("domain", "Domain", "#4fb7a3"),
            ("website", "Website", "#8f6ef7"),
            ("ip", "IP address", "#d1b04b"),
            ("email", "Email", "#e05d7b"),
            ("phone", "Phone", "#5db0e0"),
            ("username", "Username", "#7bc86c"),
        ] {
            self.register_node_type(NodeTypeEntry {
                key: key.to_string(),
                label: label.to_string(),
                color: Some(color.to_string()),
                fields: Vec::new(),
            });
        }
        for (key, label, allow_self_loops) in [
            (EDGE_TYPE_RELATED_TO, "Related to", false),
            ("owns", "Owns", false),
            ("resolves_to", "Resolves to", false),
            (EDGE_TYPE_LINKS_TO, "Links to", true),
        ] {
            self.register_edge_type(EdgeTypeEntry {
                key: key.to_string(),
                label: label.to_string(),
                policy: EdgeTypePolicy { allow_self_loops },
            });
        }
    }

    pub fn is_known_node_type(&self, key: &str) -> bool {
        self.node_types.contains_key(&normalize(key))
    }

    pub fn node_type(&self, key: &str) -> Option<&NodeTypeEntry> {
        self.node_types.get(&normalize(key))
    }

    pub fn node_types(&self) -> impl Iterator<Item = &NodeTypeEntry> {
        self.node_types.values()
    }

    pub fn edge_types(&self) -> impl Iterator<Item = &EdgeTypeEntry> {
        self.edge_types.values()
    }

    /// Policy for an edge type. Unregistered edge types are accepted with
    /// the default policy (self-loops rejected).
    pub fn edge_policy(&self, key: &str) -> EdgeTypePolicy {
        self.edge_types
            .get(&normalize(key))
            .map(|entry| entry.policy)
            .unwrap_or_default()
    }
}

impl Default for TypeCatalog {
    fn default() -> Self {
        let mut catalog = Self::empty();
        catalog.register_core_seed_defaults();
        catalog
    }
}
