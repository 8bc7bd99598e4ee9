/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! External palette drops onto the canvas.
//!
//! A drop payload is JSON text carrying a palette item key, e.g.
//! `{"itemKey": "person"}`. Bad payloads and unknown keys are logged and
//! discarded; they never reach the model.

use std::time::{Duration, Instant};

use euclid::default::Point2D;
use log::{debug, warn};
use serde_json::Value;

use super::{InteractionController, NodeCreationRequest};
use crate::config::DropConfig;
use crate::error::{CanvasError, CanvasResult};
use crate::registries::palette::PaletteCatalog;
use crate::viewport::ViewportController;

#[derive(Debug, Clone)]
pub struct DragDropBridge {
    payload_key: String,
    leave: DragLeaveDebounce,
}

impl DragDropBridge {
    pub fn new(config: &DropConfig) -> Self {
        Self {
            payload_key: config.payload_key.clone(),
            leave: DragLeaveDebounce::new(config.leave_debounce()),
        }
    }

    /// Extract the palette item key from a drop payload.
    pub fn decode(&self, payload: &str) -> CanvasResult<String> {
        let value: Value = serde_json::from_str(payload)
            .map_err(|err| CanvasError::Payload(format!("payload is not JSON: {err}")))?;
        match value.get(&self.payload_key) {
            Some(Value::String(key)) if !key.is_empty() => Ok(key.clone()),
            Some(_) => Err(CanvasError::Payload(format!(
                "`{}` is not a non-empty string",
                self.payload_key
            ))),
            None => Err(CanvasError::Payload(format!(
                "payload has no `{}`",
                self.payload_key
            ))),
        }
    }

    /// Handle a drop at `screen`. Returns the creation request to open, or
    /// `None` when the drop was discarded.
    pub fn on_drop(
        &mut self,
        payload: &str,
        screen: Point2D<f32>,
        palette: &PaletteCatalog,
        controller: &mut InteractionController,
        viewport: &ViewportController,
    ) -> Option<NodeCreationRequest> {
        self.leave.reset();
        let key = match self.decode(payload) {
            Ok(key) => key,
            Err(err) => {
                warn!("discarding canvas drop: {err}");
                return None;
            },
        };
        let Some(item) = palette.get(&key) else {
            warn!("discarding canvas drop: unknown palette item `{key}`");
            return None;
        };
        controller.request_node_creation(item, screen, viewport)
    }

    pub fn on_drag_enter(&mut self, now: Instant) {
        self.leave.enter(now);
    }

    pub fn on_drag_leave(&mut self, now: Instant) {
        self.leave.leave(now);
    }

    /// True while a drag hovers the canvas, including the debounce window
    /// after a leave.
    pub fn is_drag_over(&mut self, now: Instant) -> bool {
        self.leave.poll(now)
    }
}

impl Default for DragDropBridge {
    fn default() -> Self {
        Self::new(&DropConfig::default())
    }
}

/// Drag-over tracking with a delayed leave.
///
/// A leave only takes effect once `delay` has passed without a new enter,
/// so crossing a child element's boundary does not flicker the drop
/// highlight.
#[derive(Debug, Clone)]
pub struct DragLeaveDebounce {
    delay: Duration,
    over: bool,
    pending_leave: Option<Instant>,
}

impl DragLeaveDebounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            over: false,
            pending_leave: None,
        }
    }

    pub fn enter(&mut self, _now: Instant) {
        if self.pending_leave.take().is_some() {
            debug!("drag re-entered canvas; pending leave cancelled");
        }
        self.over = true;
    }

    pub fn leave(&mut self, now: Instant) {
        if self.over && self.pending_leave.is_none() {
            self.pending_leave = Some(now);
        }
    }

    /// Settle a pending leave whose delay has elapsed, then report whether
    /// the drag is still over the canvas.
    pub fn poll(&mut self, now: Instant) -> bool {
        if let Some(started) = self.pending_leave
            && now.saturating_duration_since(started) >= self.delay
        {
            self.pending_leave = None;
            self.over = false;
        }
        self.over
    }

    pub fn reset(&mut self) {
        self.over = false;
        self.pending_leave = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphModel;
    use crate::registries::type_catalog::TypeCatalog;

    fn palette() -> PaletteCatalog {
        PaletteCatalog::from_type_catalog(&TypeCatalog::default())
    }

    #[test]
    fn test_decode_reads_item_key() {
        let bridge = DragDropBridge::default();
        assert_eq!(bridge.decode(r#"{"itemKey":"person"}"#).unwrap(), "person");
    }

    #[test]
    fn test_decode_errors_are_payload_errors() {
        let bridge = DragDropBridge::default();
        for payload in ["not json", r#"{"other":"x"}"#, r#"{"itemKey":7}"#, r#"{"itemKey":""}"#, "[]"] {
            let err = bridge.decode(payload).unwrap_err();
            assert!(matches!(err, CanvasError::Payload(_)), "{payload}: {err}");
        }
    }

    #[test]
    fn test_malformed_drop_is_discarded_without_mutation() {
        let model = GraphModel::default();
        let mut bridge = DragDropBridge::default();
        let mut controller = InteractionController::default();
        let viewport = ViewportController::default();

        let request = bridge.on_drop(
            "{{{",
            Point2D::new(10.0, 10.0),
            &palette(),
            &mut controller,
            &viewport,
        );
        assert!(request.is_none());
        assert_eq!(model.node_count(), 0);
        assert!(controller.state().is_idle());
    }

    #[test]
    fn test_unknown_item_is_discarded() {
        let mut bridge = DragDropBridge::default();
        let mut controller = InteractionController::default();
        let request = bridge.on_drop(
            r#"{"itemKey":"spaceship"}"#,
            Point2D::new(10.0, 10.0),
            &palette(),
            &mut controller,
            &ViewportController::default(),
        );
        assert!(request.is_none());
    }

    #[test]
    fn test_known_item_requests_creation_at_drop_point() {
        let mut bridge = DragDropBridge::default();
        let mut controller = InteractionController::default();
        let mut viewport = ViewportController::default();
        viewport.set_pan(euclid::default::Vector2D::new(100.0, 0.0));

        let request = bridge
            .on_drop(
                r#"{"itemKey":"domain"}"#,
                Point2D::new(150.0, 40.0),
                &palette(),
                &mut controller,
                &viewport,
            )
            .unwrap();
        assert_eq!(request.item_key, "domain");
        assert_eq!(request.spec.node_type, "domain");
        assert_eq!(request.position, Point2D::new(50.0, 40.0));
    }

    #[test]
    fn test_leave_is_debounced() {
        let start = Instant::now();
        let mut debounce = DragLeaveDebounce::new(Duration::from_millis(100));
        debounce.enter(start);
        debounce.leave(start + Duration::from_millis(10));

        assert!(debounce.poll(start + Duration::from_millis(60)));
        assert!(!debounce.poll(start + Duration::from_millis(110)));
    }

    #[test]
    fn test_enter_within_window_cancels_leave() {
        let start = Instant::now();
        let mut debounce = DragLeaveDebounce::new(Duration::from_millis(100));
        debounce.enter(start);
        debounce.leave(start + Duration::from_millis(10));
        debounce.enter(start + Duration::from_millis(50));

        assert!(debounce.poll(start + Duration::from_millis(500)));
    }

    #[test]
    fn test_leave_without_enter_is_noop() {
        let start = Instant::now();
        let mut debounce = DragLeaveDebounce::new(Duration::from_millis(100));
        debounce.leave(start);
        assert!(!debounce.poll(start));
        assert!(!debounce.poll(start + Duration::from_secs(1)));
    }
}
