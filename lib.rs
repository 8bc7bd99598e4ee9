/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Interactive sketch-graph canvas.
//!
//! The crate is UI-toolkit agnostic: hosts feed pointer, keyboard and drop
//! events into [`app::CanvasApp`], draw the [`render::Scene`] it produces,
//! and react to the [`app::CanvasEvent`]s it queues.

pub mod app;
pub mod config;
pub mod error;
pub mod graph;
pub mod input;
pub mod layout;
pub mod persistence;
pub mod registries;
pub mod render;
pub mod services;
pub mod viewport;

pub use app::{CanvasApp, CanvasEvent, CanvasIntent};
pub use error::{CanvasError, CanvasResult};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
