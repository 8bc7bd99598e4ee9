/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Canvas configuration.
//!
//! Every section is `#[serde(default)]`, so a TOML file only needs to name
//! the values it overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::graph::handles::DEFAULT_MAX_CONNECTIONS;
use crate::registries::physics_profile::PHYSICS_ID_DEFAULT;
use crate::registries::type_catalog::EDGE_TYPE_RELATED_TO;
use crate::render::context_menu::MenuGeometry;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid canvas config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub viewport: ViewportConfig,
    pub handles: HandleConfig,
    pub context_menu: MenuGeometry,
    pub layout: LayoutConfig,
    pub drop: DropConfig,
    pub interaction: InteractionConfig,
}

impl CanvasConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Multiplicative step for zoom in/out.
    pub zoom_step: f32,
    /// Screen-space margin around the fitted bounding box.
    pub fit_margin: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.1,
            max_zoom: 10.0,
            zoom_step: 1.1,
            fit_margin: 40.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandleConfig {
    pub max_connections: usize,
}

impl Default for HandleConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Id resolved through the physics profile registry.
    pub physics_profile: String,
    /// Hard cap on force simulation steps per run.
    pub max_force_steps: usize,
    /// Steps run between progress snapshots.
    pub chunk_steps: usize,
    pub layer_spacing: f32,
    pub node_spacing: f32,
    /// Barycenter sweeps (down then up counts as two).
    pub ordering_sweeps: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            physics_profile: PHYSICS_ID_DEFAULT.to_string(),
            max_force_steps: 500,
            chunk_steps: 25,
            layer_spacing: 150.0,
            node_spacing: 120.0,
            ordering_sweeps: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DropConfig {
    /// JSON key holding the palette item key in a drop payload.
    pub payload_key: String,
    pub leave_debounce_ms: u64,
}

impl DropConfig {
    pub fn leave_debounce(&self) -> Duration {
        Duration::from_millis(self.leave_debounce_ms)
    }
}

impl Default for DropConfig {
    fn default() -> Self {
        Self {
            payload_key: "itemKey".to_string(),
            leave_debounce_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LassoModeConfig {
    /// Lasso only with a modifier held.
    #[default]
    Modifier,
    /// Every drag on empty canvas is a lasso.
    Always,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Node box edge length in graph units, used for hit-testing and lasso.
    pub node_size: f32,
    /// Screen-space pick radius around a handle.
    pub handle_radius: f32,
    /// Pointer travel in screen pixels before a press on a node becomes a
    /// drag rather than a click.
    pub drag_threshold: f32,
    /// Edge type used for edges drawn by hand.
    pub default_edge_type: String,
    pub lasso_mode: LassoModeConfig,
}

impl InteractionConfig {
    pub fn lasso_always(&self) -> bool {
        self.lasso_mode == LassoModeConfig::Always
    }
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            node_size: 60.0,
            handle_radius: 8.0,
            drag_threshold: 3.0,
            default_edge_type: EDGE_TYPE_RELATED_TO.to_string(),
            lasso_mode: LassoModeConfig::default(),
        }
    }
}
