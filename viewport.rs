/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Zoom and pan over the graph plane.
//!
//! `screen = graph * zoom + pan`, so the two conversions are exact inverses
//! for any zoom inside the configured bounds.

use euclid::default::{Box2D, Point2D, Size2D, Vector2D};

use crate::config::ViewportConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct ViewportController {
    zoom: f32,
    pan: Vector2D<f32>,
    size: Size2D<f32>,
    pub zoom_min: f32,
    pub zoom_max: f32,
    zoom_step: f32,
    fit_margin: f32,
}

impl ViewportController {
    pub fn new(config: &ViewportConfig, size: Size2D<f32>) -> Self {
        Self {
            zoom: 1.0,
            pan: Vector2D::zero(),
            size,
            zoom_min: config.min_zoom,
            zoom_max: config.max_zoom,
            zoom_step: config.zoom_step,
            fit_margin: config.fit_margin,
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn pan(&self) -> Vector2D<f32> {
        self.pan
    }

    /// Visible area in screen pixels.
    pub fn size(&self) -> Size2D<f32> {
        self.size
    }

    pub fn resize(&mut self, size: Size2D<f32>) {
        self.size = size;
    }

    /// Clamp a zoom value to the allowed range.
    pub fn clamp(&self, zoom: f32) -> f32 {
        zoom.max(self.zoom_min).min(self.zoom_max)
    }

    pub fn set_pan(&mut self, pan: Vector2D<f32>) {
        self.pan = pan;
    }

    pub fn pan_by(&mut self, delta: Vector2D<f32>) {
        self.pan += delta;
    }

    pub fn screen_to_graph(&self, point: Point2D<f32>) -> Point2D<f32> {
        ((point.to_vector() - self.pan) / self.zoom).to_point()
    }

    pub fn graph_to_screen(&self, point: Point2D<f32>) -> Point2D<f32> {
        (point.to_vector() * self.zoom + self.pan).to_point()
    }

    fn center(&self) -> Point2D<f32> {
        Point2D::new(self.size.width * 0.5, self.size.height * 0.5)
    }

    /// Set the zoom keeping the graph point under `anchor` (screen space)
    /// fixed.
    pub fn zoom_at(&mut self, anchor: Point2D<f32>, zoom: f32) {
        let graph_anchor = self.screen_to_graph(anchor);
        self.zoom = self.clamp(zoom);
        self.pan = anchor.to_vector() - graph_anchor.to_vector() * self.zoom;
    }

    pub fn zoom_in(&mut self) {
        self.zoom_at(self.center(), self.zoom * self.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_at(self.center(), self.zoom / self.zoom_step);
    }

    /// Back to 1:1 around the viewport center.
    pub fn reset_zoom(&mut self) {
        self.zoom_at(self.center(), 1.0);
    }

    /// Fit the bounding box of `points` plus the fit margin into the visible
    /// area, centered. Returns false, leaving the viewport untouched, when
    /// there is nothing to fit or the viewport has no area.
    pub fn zoom_to_fit<I>(&mut self, points: I) -> bool
    where
        I: IntoIterator<Item = Point2D<f32>>,
    {
        let Some(bounds) = bounding_box(points) else {
            return false;
        };
        if self.size.width <= f32::EPSILON || self.size.height <= f32::EPSILON {
            return false;
        }

        let bounds = bounds.inflate(self.fit_margin, self.fit_margin);
        let box_width = bounds.width().max(f32::EPSILON);
        let box_height = bounds.height().max(f32::EPSILON);
        let zoom = self.clamp((self.size.width / box_width).min(self.size.height / box_height));

        self.zoom = zoom;
        self.pan = self.center().to_vector() - bounds.center().to_vector() * zoom;
        true
    }
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new(&ViewportConfig::default(), Size2D::new(800.0, 600.0))
    }
}

fn bounding_box(points: impl IntoIterator<Item = Point2D<f32>>) -> Option<Box2D<f32>> {
    let mut points = points.into_iter().filter(|p| p.x.is_finite() && p.y.is_finite());
    let first = points.next()?;
    Some(points.fold(Box2D::new(first, first), |acc, p| {
        Box2D::new(acc.min.min(p), acc.max.max(p))
    }))
}
