/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Keyboard shortcuts for the canvas.

use keyboard_types::{Key, KeyState, KeyboardEvent, Modifiers, NamedKey};

use crate::app::CanvasIntent;

/// Keyboard actions collected from key events.
///
/// Detection is kept separate from application so the mapping can be tested
/// without a running canvas.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct KeyboardActions {
    pub cancel: bool,
    pub delete_selected: bool,
    pub select_all: bool,
    pub zoom_in: bool,
    pub zoom_out: bool,
    pub zoom_reset: bool,
    pub zoom_to_selected: bool,
    pub fit_to_screen: bool,
}

/// Collect keyboard actions from a batch of key events. Key-up events are
/// ignored.
pub fn collect_actions(events: &[KeyboardEvent]) -> KeyboardActions {
    let mut actions = KeyboardActions::default();
    for event in events.iter().filter(|event| event.state == KeyState::Down) {
        let command = event.modifiers.intersects(Modifiers::CONTROL | Modifiers::META);
        match &event.key {
            Key::Named(NamedKey::Escape) => actions.cancel = true,
            // Delete / Backspace: remove selected nodes and edges
            Key::Named(NamedKey::Delete | NamedKey::Backspace) if !command => {
                actions.delete_selected = true;
            },
            Key::Character(text) => match text.as_str() {
                "a" | "A" if command => actions.select_all = true,
                "+" | "=" if !command => actions.zoom_in = true,
                "-" if !command => actions.zoom_out = true,
                "0" if !command => actions.zoom_reset = true,
                // Z: focus selection, F: fit everything
                "z" | "Z" if !command => actions.zoom_to_selected = true,
                "f" | "F" if !command => actions.fit_to_screen = true,
                _ => {},
            },
            _ => {},
        }
    }
    actions
}

/// Convert keyboard actions to canvas intents without applying them.
pub fn intents_from_actions(actions: &KeyboardActions) -> Vec<CanvasIntent> {
    let mut intents = Vec::new();
    if actions.cancel {
        intents.push(CanvasIntent::CancelGesture);
    }
    if actions.delete_selected {
        intents.push(CanvasIntent::RemoveSelection);
    }
    if actions.select_all {
        intents.push(CanvasIntent::SelectAll);
    }
    if actions.zoom_in {
        intents.push(CanvasIntent::ZoomIn);
    }
    if actions.zoom_out {
        intents.push(CanvasIntent::ZoomOut);
    }
    if actions.zoom_reset {
        intents.push(CanvasIntent::ZoomReset);
    }
    if actions.zoom_to_selected {
        intents.push(CanvasIntent::ZoomToSelection);
    }
    if actions.fit_to_screen {
        intents.push(CanvasIntent::FitToScreen);
    }
    intents
}
