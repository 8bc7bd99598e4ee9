/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Action catalogue for the canvas context menu.
//!
//! The menu draws its content from [`list_actions_for_context`] rather than
//! from a hardcoded list. Each returned [`ActionEntry`] carries enough
//! metadata for the menu to render the action and decide whether it is
//! currently enabled.

use crate::input::MenuTarget;
use crate::layout::LayoutStrategy;

/// Logical grouping of actions, used for separators and ordering.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ActionCategory {
    Node,
    Edge,
    Graph,
    Layout,
}

impl ActionCategory {
    /// Display label for the category group heading.
    pub fn label(self) -> &'static str {
        match self {
            Self::Node => "Node",
            Self::Edge => "Edge",
            Self::Graph => "Graph",
            Self::Layout => "Layout",
        }
    }
}

/// Stable identifier for a menu action.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ActionId {
    // Node actions
    NodeDelete,
    NodePinToggle,
    NodeCollapseToggle,
    NodeHide,
    NodeSelectNeighbors,
    NodeMergeSelected,
    // Edge actions
    EdgeDelete,
    // Graph actions
    GraphFit,
    GraphZoomToSelection,
    GraphResetZoom,
    GraphSelectAll,
    GraphClearSelection,
    GraphShowHidden,
    // Layout actions
    LayoutNone,
    LayoutForce,
    LayoutHierarchical,
}

impl ActionId {
    pub const ALL: [Self; 16] = [
        Self::NodeDelete,
        Self::NodePinToggle,
        Self::NodeCollapseToggle,
        Self::NodeHide,
        Self::NodeSelectNeighbors,
        Self::NodeMergeSelected,
        Self::EdgeDelete,
        Self::GraphFit,
        Self::GraphZoomToSelection,
        Self::GraphResetZoom,
        Self::GraphSelectAll,
        Self::GraphClearSelection,
        Self::GraphShowHidden,
        Self::LayoutNone,
        Self::LayoutForce,
        Self::LayoutHierarchical,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::NodeDelete => "Delete Node",
            Self::NodePinToggle => "Toggle Pin",
            Self::NodeCollapseToggle => "Collapse / Expand",
            Self::NodeHide => "Hide Node",
            Self::NodeSelectNeighbors => "Select Neighbors",
            Self::NodeMergeSelected => "Merge Selected Into This",
            Self::EdgeDelete => "Delete Relationship",
            Self::GraphFit => "Fit Graph to Screen",
            Self::GraphZoomToSelection => "Zoom to Selection",
            Self::GraphResetZoom => "Reset Zoom",
            Self::GraphSelectAll => "Select All",
            Self::GraphClearSelection => "Clear Selection",
            Self::GraphShowHidden => "Show Hidden Nodes",
            Self::LayoutNone => "Manual Layout",
            Self::LayoutForce => "Force Layout",
            Self::LayoutHierarchical => "Hierarchical Layout",
        }
    }

    pub fn category(self) -> ActionCategory {
        match self {
            Self::NodeDelete
            | Self::NodePinToggle
            | Self::NodeCollapseToggle
            | Self::NodeHide
            | Self::NodeSelectNeighbors
            | Self::NodeMergeSelected => ActionCategory::Node,
            Self::EdgeDelete => ActionCategory::Edge,
            Self::GraphFit
            | Self::GraphZoomToSelection
            | Self::GraphResetZoom
            | Self::GraphSelectAll
            | Self::GraphClearSelection
            | Self::GraphShowHidden => ActionCategory::Graph,
            Self::LayoutNone | Self::LayoutForce | Self::LayoutHierarchical => {
                ActionCategory::Layout
            },
        }
    }

    /// Strategy selected by a layout action.
    pub fn layout_strategy(self) -> Option<LayoutStrategy> {
        match self {
            Self::LayoutNone => Some(LayoutStrategy::None),
            Self::LayoutForce => Some(LayoutStrategy::Force),
            Self::LayoutHierarchical => Some(LayoutStrategy::Hierarchical),
            _ => None,
        }
    }
}

/// Context passed to [`list_actions_for_context`] to drive scope and
/// enabled state.
#[derive(Clone, Debug)]
pub struct ActionContext {
    /// What the menu was opened on.
    pub target: MenuTarget,
    pub selected_nodes: usize,
    pub hidden_nodes: usize,
    pub layout: LayoutStrategy,
}

impl Default for ActionContext {
    fn default() -> Self {
        Self {
            target: MenuTarget::Canvas,
            selected_nodes: 0,
            hidden_nodes: 0,
            layout: LayoutStrategy::None,
        }
    }
}

/// A single resolved action entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionEntry {
    pub id: ActionId,
    pub enabled: bool,
}

/// Actions for the menu target, ordered by category, with enabled state
/// resolved. Disabled actions are included so the menu can grey them out.
///
/// A node menu lists node actions, an edge menu lists edge actions, and a
/// canvas menu lists graph and layout actions.
pub fn list_actions_for_context(context: &ActionContext) -> Vec<ActionEntry> {
    use ActionId::*;

    let any_selected = context.selected_nodes > 0;
    let entries: Vec<(ActionId, bool)> = match &context.target {
        MenuTarget::Node(_) => vec![
            (NodeDelete, true),
            (NodePinToggle, true),
            (NodeCollapseToggle, true),
            (NodeHide, true),
            (NodeSelectNeighbors, true),
            // Needs at least one other selected node to fold in.
            (NodeMergeSelected, context.selected_nodes >= 2),
        ],
        MenuTarget::Edge(_) => vec![(EdgeDelete, true)],
        MenuTarget::Canvas => vec![
            (GraphFit, true),
            (GraphZoomToSelection, any_selected),
            (GraphResetZoom, true),
            (GraphSelectAll, true),
            (GraphClearSelection, any_selected),
            (GraphShowHidden, context.hidden_nodes > 0),
            (LayoutNone, context.layout != LayoutStrategy::None),
            (LayoutForce, context.layout != LayoutStrategy::Force),
            (LayoutHierarchical, context.layout != LayoutStrategy::Hierarchical),
        ],
    };

    entries
        .into_iter()
        .map(|(id, enabled)| ActionEntry { id, enabled })
        .collect()
}

/// Only the actions of `category`, resolved for `context`.
pub fn list_actions_for_category(
    context: &ActionContext,
    category: ActionCategory,
) -> Vec<ActionEntry> {
    list_actions_for_context(context)
        .into_iter()
        .filter(|e| e.id.category() == category)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeId, NodeId};

    fn node_context(selected_nodes: usize) -> ActionContext {
        ActionContext {
            target: MenuTarget::Node(NodeId::from("n1")),
            selected_nodes,
            ..ActionContext::default()
        }
    }

    fn entry(entries: &[ActionEntry], id: ActionId) -> &ActionEntry {
        entries.iter().find(|e| e.id == id).unwrap()
    }

    #[test]
    fn test_node_menu_lists_only_node_actions() {
        let entries = list_actions_for_context(&node_context(1));
        assert!(!entries.is_empty());
        assert!(entries.iter().all(|e| e.id.category() == ActionCategory::Node));
    }

    #[test]
    fn test_merge_needs_two_selected_nodes() {
        assert!(!entry(&list_actions_for_context(&node_context(1)), ActionId::NodeMergeSelected).enabled);
        assert!(entry(&list_actions_for_context(&node_context(2)), ActionId::NodeMergeSelected).enabled);
    }

    #[test]
    fn test_edge_menu_lists_delete() {
        let context = ActionContext {
            target: MenuTarget::Edge(EdgeId::from("e1")),
            ..ActionContext::default()
        };
        assert_eq!(
            list_actions_for_context(&context),
            vec![ActionEntry {
                id: ActionId::EdgeDelete,
                enabled: true,
            }]
        );
    }

    #[test]
    fn test_canvas_menu_disables_active_layout() {
        let context = ActionContext {
            layout: LayoutStrategy::Force,
            ..ActionContext::default()
        };
        let layout = list_actions_for_category(&context, ActionCategory::Layout);
        assert_eq!(layout.len(), 3);
        assert!(!entry(&layout, ActionId::LayoutForce).enabled);
        assert!(entry(&layout, ActionId::LayoutHierarchical).enabled);
    }

    #[test]
    fn test_selection_actions_follow_selection() {
        let empty = list_actions_for_context(&ActionContext::default());
        assert!(!entry(&empty, ActionId::GraphZoomToSelection).enabled);
        assert!(!entry(&empty, ActionId::GraphShowHidden).enabled);

        let selected = list_actions_for_context(&ActionContext {
            selected_nodes: 3,
            hidden_nodes: 1,
            ..ActionContext::default()
        });
        assert!(entry(&selected, ActionId::GraphZoomToSelection).enabled);
        assert!(entry(&selected, ActionId::GraphClearSelection).enabled);
        assert!(entry(&selected, ActionId::GraphShowHidden).enabled);
    }

    #[test]
    fn test_action_labels_are_nonempty_and_layout_ids_map() {
        for id in ActionId::ALL {
            assert!(!id.label().is_empty(), "{id:?} has empty label");
            assert_eq!(
                id.layout_strategy().is_some(),
                id.category() == ActionCategory::Layout
            );
        }
    }
}
