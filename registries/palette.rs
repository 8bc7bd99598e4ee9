/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Palette of action items that can be dragged onto the canvas.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::type_catalog::TypeCatalog;
use crate::graph::{Extensions, NodeSpec};

/// A creatable entry in the side palette.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    pub key: String,
    pub label: String,
    /// Node type the created node gets.
    pub node_type: String,
    /// Extension values pre-filled into the creation form.
    #[serde(default)]
    pub defaults: Extensions,
}

impl ActionItem {
    /// Creation request pre-populated from this item. The label starts
    /// empty; the creation flow asks for it.
    pub fn node_spec(&self) -> NodeSpec {
        NodeSpec {
            node_type: self.node_type.clone(),
            extensions: self.defaults.clone(),
            ..NodeSpec::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaletteCatalog {
    items: IndexMap<String, ActionItem>,
}

impl PaletteCatalog {
    /// One item per node type, keyed by the type key.
    pub fn from_type_catalog(catalog: &TypeCatalog) -> Self {
        let mut palette = Self::default();
        for entry in catalog.node_types() {
            palette.register(ActionItem {
                key: entry.key.clone(),
                label: entry.label.clone(),
                node_type: entry.key.clone(),
                defaults: Extensions::new(),
            });
        }
        palette
    }

    pub fn register(&mut self, item: ActionItem) {
        self.items.insert(item.key.clone(), item);
    }

    pub fn get(&self, key: &str) -> Option<&ActionItem> {
        self.items.get(key)
    }

    pub fn items(&self) -> impl Iterator<Item = &ActionItem> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_mirrors_type_catalog_order() {
        let palette = PaletteCatalog::from_type_catalog(&TypeCatalog::default());
        let keys: Vec<&str> = palette.items().map(|item| item.key.as_str()).collect();
        assert_eq!(keys.first(), Some(&"person"));
        assert_eq!(palette.len(), TypeCatalog::default().node_types().count());
    }

    #[test]
    fn test_item_spec_carries_defaults() {
        let mut palette = PaletteCatalog::default();
        let mut defaults = Extensions::new();
        defaults.insert("port".to_string(), serde_json::json!(443));
        palette.register(ActionItem {
            key: "https_site".to_string(),
            label: "HTTPS site".to_string(),
            node_type: "website".to_string(),
            defaults,
        });

        let spec = palette.get("https_site").unwrap().node_spec();
        assert_eq!(spec.node_type, "website");
        assert_eq!(spec.extensions["port"], serde_json::json!(443));
        assert!(palette.get("missing").is_none());
    }
}
