/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Client-side preference storage.
//!
//! A [`PreferenceStore`] is a flat key/value store of JSON documents. The
//! file-backed store keeps one `<key>.json` per key under a directory,
//! by default `<config dir>/sketch-canvas/preferences`.
//!
//! Reads never fail hard: a missing, unreadable or undecodable document is
//! logged and treated as absent so the canvas falls back to defaults.

pub mod types;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub use types::{CanvasViewPreferences, CardLayout, CardLayoutEntry, ViewMode};

pub const VIEW_PREFERENCES_KEY: &str = "sketch-canvas.view";
pub const CARD_LAYOUT_KEY: &str = "sketch-canvas.cards";

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("preference store I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode preference: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("invalid preference key `{0}`")]
    InvalidKey(String),
}

pub trait PreferenceStore {
    /// Raw JSON document for `key`, if present.
    fn get_raw(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    fn set_raw(&mut self, key: &str, value: String) -> Result<(), PersistenceError>;

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError>;
}

/// Decode the document stored under `key`. Missing or broken documents
/// yield `None`.
pub fn load_json<T: DeserializeOwned>(store: &dyn PreferenceStore, key: &str) -> Option<T> {
    let raw = match store.get_raw(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!("Failed to read preference `{key}`: {e}");
            return None;
        },
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring undecodable preference `{key}`: {e}");
            None
        },
    }
}

pub fn save_json<T: Serialize>(
    store: &mut dyn PreferenceStore,
    key: &str,
    value: &T,
) -> Result<(), PersistenceError> {
    let raw = serde_json::to_string_pretty(value)?;
    store.set_raw(key, raw)
}

/// Keys end up as file names, so only `[A-Za-z0-9._-]` is accepted.
fn validate_key(key: &str) -> Result<(), PersistenceError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
    if valid {
        Ok(())
    } else {
        Err(PersistenceError::InvalidKey(key.to_string()))
    }
}

/// In-process store; nothing survives the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryPreferenceStore {
    entries: HashMap<String, String>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        validate_key(key)?;
        Ok(self.entries.get(key).cloned())
    }

    fn set_raw(&mut self, key: &str, value: String) -> Result<(), PersistenceError> {
        validate_key(key)?;
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        validate_key(key)?;
        self.entries.remove(key);
        Ok(())
    }
}

/// One JSON file per key under `dir`.
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    dir: PathBuf,
}

impl FilePreferenceStore {
    /// Open or create a store at the given directory.
    pub fn open(dir: PathBuf) -> Result<Self, PersistenceError> {
        fs::create_dir_all(&dir).map_err(|source| PersistenceError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Default storage directory, if the platform has a config directory.
    pub fn default_dir() -> Option<PathBuf> {
        let mut dir = dirs::config_dir()?;
        dir.push("sketch-canvas");
        dir.push("preferences");
        Some(dir)
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, PersistenceError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(PersistenceError::Io { path, source }),
        }
    }

    fn set_raw(&mut self, key: &str, value: String) -> Result<(), PersistenceError> {
        let path = self.path_for(key)?;
        // Write-then-rename so a crash never leaves a truncated document.
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value).map_err(|source| PersistenceError::Io {
            path: staging.clone(),
            source,
        })?;
        fs::rename(&staging, &path).map_err(|source| PersistenceError::Io {
            path: path.clone(),
            source,
        })
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PersistenceError::Io { path, source }),
        }
    }
}
