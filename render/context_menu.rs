/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Context-menu placement inside the canvas wrapper.
//!
//! [`place`] is pure: the same inputs always produce the same placement.

use serde::{Deserialize, Serialize};

/// Nominal menu size and clamping bounds, in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuGeometry {
    pub menu_width: f32,
    pub menu_height: f32,
    pub padding: f32,
    pub min_width: f32,
    pub max_width: f32,
    pub min_height: f32,
    pub max_height: f32,
}

impl Default for MenuGeometry {
    fn default() -> Self {
        Self {
            menu_width: 320.0,
            menu_height: 250.0,
            padding: 20.0,
            min_width: 280.0,
            max_width: 320.0,
            min_height: 200.0,
            max_height: 500.0,
        }
    }
}

/// Horizontal anchor: distance from the wrapper's left or right edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HorizontalAnchor {
    Left(f32),
    Right(f32),
}

impl HorizontalAnchor {
    pub fn offset(self) -> f32 {
        match self {
            Self::Left(offset) | Self::Right(offset) => offset,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VerticalAnchor {
    Top(f32),
    Bottom(f32),
}

impl VerticalAnchor {
    pub fn offset(self) -> f32 {
        match self {
            Self::Top(offset) | Self::Bottom(offset) => offset,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MenuPlacement {
    pub horizontal: HorizontalAnchor,
    pub vertical: VerticalAnchor,
    pub width: f32,
    pub height: f32,
}

impl MenuPlacement {
    pub fn left(&self) -> Option<f32> {
        match self.horizontal {
            HorizontalAnchor::Left(offset) => Some(offset),
            HorizontalAnchor::Right(_) => None,
        }
    }

    pub fn right(&self) -> Option<f32> {
        match self.horizontal {
            HorizontalAnchor::Right(offset) => Some(offset),
            HorizontalAnchor::Left(_) => None,
        }
    }

    pub fn top(&self) -> Option<f32> {
        match self.vertical {
            VerticalAnchor::Top(offset) => Some(offset),
            VerticalAnchor::Bottom(_) => None,
        }
    }

    pub fn bottom(&self) -> Option<f32> {
        match self.vertical {
            VerticalAnchor::Bottom(offset) => Some(offset),
            VerticalAnchor::Top(_) => None,
        }
    }
}

/// Place a menu opened at (`raw_left`, `raw_top`), relative to the wrapper's
/// top-left corner.
///
/// A menu that would overflow an edge is anchored from the opposite edge
/// instead. The final size is the space left beyond the anchor, clamped to
/// the geometry bounds.
pub fn place(
    raw_top: f32,
    raw_left: f32,
    wrapper_width: f32,
    wrapper_height: f32,
    geometry: &MenuGeometry,
) -> MenuPlacement {
    let horizontal = if raw_left + geometry.menu_width + geometry.padding > wrapper_width {
        HorizontalAnchor::Right(wrapper_width - raw_left)
    } else {
        HorizontalAnchor::Left(raw_left)
    };
    let vertical = if raw_top + geometry.menu_height + geometry.padding > wrapper_height {
        VerticalAnchor::Bottom(wrapper_height - raw_top)
    } else {
        VerticalAnchor::Top(raw_top)
    };

    let available_width = wrapper_width - horizontal.offset() - geometry.padding;
    let available_height = wrapper_height - vertical.offset() - geometry.padding;

    // Configured bounds may be inverted; `f32::clamp` panics on that.
    MenuPlacement {
        horizontal,
        vertical,
        width: available_width.max(geometry.min_width).min(geometry.max_width),
        height: available_height.max(geometry.min_height).min(geometry.max_height),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_overflow_right_anchors_from_right_edge() {
        let placement = place(50.0, 750.0, 800.0, 600.0, &MenuGeometry::default());

        assert_eq!(placement.right(), Some(50.0));
        assert_eq!(placement.left(), None);
        assert_eq!(placement.top(), Some(50.0));
        assert_eq!(placement.bottom(), None);
        assert!((280.0..=320.0).contains(&placement.width));
        assert!((200.0..=500.0).contains(&placement.height));
        assert_eq!(placement.width, 320.0);
        assert_eq!(placement.height, 500.0);
    }

    #[rstest]
    #[case::fits(100.0, 100.0, Some(100.0), None, Some(100.0), None)]
    #[case::exact_right_fit(100.0, 460.0, Some(460.0), None, Some(100.0), None)]
    #[case::one_past_right(100.0, 461.0, None, Some(339.0), Some(100.0), None)]
    #[case::overflow_bottom(400.0, 100.0, Some(100.0), None, None, Some(200.0))]
    #[case::overflow_both(590.0, 790.0, None, Some(10.0), None, Some(10.0))]
    fn test_exactly_one_anchor_per_axis(
        #[case] raw_top: f32,
        #[case] raw_left: f32,
        #[case] left: Option<f32>,
        #[case] right: Option<f32>,
        #[case] top: Option<f32>,
        #[case] bottom: Option<f32>,
    ) {
        let placement = place(raw_top, raw_left, 800.0, 600.0, &MenuGeometry::default());
        assert_eq!(placement.left(), left);
        assert_eq!(placement.right(), right);
        assert_eq!(placement.top(), top);
        assert_eq!(placement.bottom(), bottom);
    }

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(300.0, 700.0)]
    #[case(599.0, 799.0)]
    #[case(-40.0, -40.0)]
    fn test_size_stays_within_bounds(#[case] raw_top: f32, #[case] raw_left: f32) {
        let geometry = MenuGeometry::default();
        let placement = place(raw_top, raw_left, 800.0, 600.0, &geometry);
        assert!(placement.width >= geometry.min_width && placement.width <= geometry.max_width);
        assert!(placement.height >= geometry.min_height && placement.height <= geometry.max_height);
    }

    #[test]
    fn test_small_wrapper_clamps_to_minimum() {
        let placement = place(10.0, 10.0, 200.0, 150.0, &MenuGeometry::default());
        assert_eq!(placement.width, 280.0);
        assert_eq!(placement.height, 200.0);
    }
}
