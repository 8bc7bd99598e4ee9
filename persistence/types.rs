/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Serializable preference documents.

use serde::{Deserialize, Serialize};

use crate::layout::LayoutStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Graph,
    Table,
    Map,
}

/// Layout strategy and view mode, restored when a sketch is reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CanvasViewPreferences {
    pub layout_strategy: LayoutStrategy,
    pub view_mode: ViewMode,
}

/// Side-panel cards in their initial order.
pub const DEFAULT_CARD_ORDER: [&str; 4] = ["entities", "relationships", "notes", "timeline"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardLayoutEntry {
    pub id: String,
    #[serde(default)]
    pub editing: bool,
}

/// Ordered side-panel cards with a per-card editing flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardLayout {
    cards: Vec<CardLayoutEntry>,
}

impl CardLayout {
    pub fn cards(&self) -> &[CardLayoutEntry] {
        &self.cards
    }

    pub fn order(&self) -> Vec<&str> {
        self.cards.iter().map(|card| card.id.as_str()).collect()
    }

    pub fn is_editing(&self, id: &str) -> bool {
        self.cards.iter().any(|card| card.id == id && card.editing)
    }

    /// Move the card at `from` to position `to`. Returns false when either
    /// index is out of range.
    pub fn move_card(&mut self, from: usize, to: usize) -> bool {
        if from >= self.cards.len() || to >= self.cards.len() {
            return false;
        }
        let card = self.cards.remove(from);
        self.cards.insert(to, card);
        true
    }

    /// Flip the editing flag of `id`. Returns the new flag, or `None` for an
    /// unknown card.
    pub fn toggle_editing(&mut self, id: &str) -> Option<bool> {
        let card = self.cards.iter_mut().find(|card| card.id == id)?;
        card.editing = !card.editing;
        Some(card.editing)
    }

    /// Repair a layout read from storage: unknown and duplicate cards are
    /// dropped and default cards that are missing are appended in default
    /// order.
    pub fn reconciled(self) -> Self {
        let mut cards: Vec<CardLayoutEntry> = Vec::with_capacity(DEFAULT_CARD_ORDER.len());
        for card in self.cards {
            if DEFAULT_CARD_ORDER.contains(&card.id.as_str())
                && !cards.iter().any(|kept| kept.id == card.id)
            {
                cards.push(card);
            }
        }
        for id in DEFAULT_CARD_ORDER {
            if !cards.iter().any(|kept| kept.id == id) {
                cards.push(CardLayoutEntry {
                    id: id.to_string(),
                    editing: false,
                });
            }
        }
        Self { cards }
    }
}

impl Default for CardLayout {
    fn default() -> Self {
        Self {
            cards: DEFAULT_CARD_ORDER
                .iter()
                .map(|id| CardLayoutEntry {
                    id: id.to_string(),
                    editing: false,
                })
                .collect(),
        }
    }
}
