/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Canvas state container.
//!
//! [`CanvasApp`] wires the graph model, connection constraints, viewport,
//! layout engine, interaction controller and drop bridge together. All
//! changes go through [`CanvasIntent`]s applied by [`CanvasApp::apply_intent`];
//! notifications for the surrounding UI queue up as [`CanvasEvent`]s and are
//! drained with [`CanvasApp::take_events`].

use std::time::Instant;

use euclid::default::{Point2D, Size2D};
use keyboard_types::KeyboardEvent;
use log::{debug, warn};

use crate::config::CanvasConfig;
use crate::error::{CanvasError, CanvasResult};
use crate::graph::filter::NodeFilter;
use crate::graph::handles::{ConnectionConstraints, HandleId};
use crate::graph::snapshot::SketchSnapshot;
use crate::graph::{
    EdgeId, EdgeSpec, GraphModel, NodeId, NodePatch, NodeSpec, SelectionUpdateMode,
};
use crate::input::drop::DragDropBridge;
use crate::input::keyboard;
use crate::input::{
    CanvasContext, HitTarget, InteractionController, InteractionOutcome, InteractionState, MenuTarget,
    NodeCreationRequest, PointerButton, PointerEvent, PointerModifiers,
};
use crate::layout::{ForceLayoutHandle, LayoutEngine, LayoutProgress, LayoutStrategy};
use crate::persistence::{
    self, CARD_LAYOUT_KEY, CanvasViewPreferences, CardLayout, PreferenceStore,
    VIEW_PREFERENCES_KEY, ViewMode,
};
use crate::registries::palette::PaletteCatalog;
use crate::registries::type_catalog::TypeCatalog;
use crate::render::action_registry::{self, ActionContext, ActionEntry, ActionId};
use crate::render::context_menu::MenuPlacement;
use crate::render::{self, Scene};
use crate::viewport::ViewportController;

/// A single state change requested of the canvas.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasIntent {
    /// Pointer event with its hit target already resolved.
    Pointer(PointerEvent),
    /// Palette drop carrying a JSON payload.
    Drop {
        payload: String,
        screen: Point2D<f32>,
    },
    CancelGesture,
    CreateNode(NodeSpec),
    CreateEdge {
        source: NodeId,
        target: NodeId,
        spec: EdgeSpec,
    },
    UpdateNode {
        id: NodeId,
        patch: NodePatch,
    },
    RemoveNodes(Vec<NodeId>),
    RemoveEdges(Vec<EdgeId>),
    /// Remove selected nodes (with incident edges) and selected edges.
    RemoveSelection,
    MergeNodes {
        primary: NodeId,
        secondaries: Vec<NodeId>,
    },
    SetNodePinned {
        id: NodeId,
        pinned: bool,
    },
    SetNodeHidden {
        id: NodeId,
        hidden: bool,
    },
    SetNodeCollapsed {
        id: NodeId,
        collapsed: bool,
    },
    ShowHiddenNodes,
    SelectNode {
        id: NodeId,
        multi_select: bool,
    },
    UpdateSelection {
        ids: Vec<NodeId>,
        mode: SelectionUpdateMode,
    },
    SelectNeighbors(NodeId),
    SelectAll,
    ClearSelection,
    ZoomIn,
    ZoomOut,
    ZoomReset,
    ZoomToSelection,
    FitToScreen,
    Resize(Size2D<f32>),
    SetLayoutStrategy(LayoutStrategy),
    SetPhysicsProfile(String),
    /// Recompute the current layout from scratch.
    Relayout,
    SetViewMode(ViewMode),
    MoveCard {
        from: usize,
        to: usize,
    },
    ToggleCardEditing(String),
    /// Replace the whole graph, e.g. after fetching a sketch.
    LoadSnapshot(SketchSnapshot),
}

/// Notification for the surrounding UI.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    /// An edge was drawn between two connection points.
    Connect {
        edge: EdgeId,
        source: HandleId,
        target: HandleId,
    },
    /// Node positions changed through a drag or a layout pass.
    NodesChange(Vec<NodeId>),
    SelectionChange {
        nodes: Vec<NodeId>,
        edges: Vec<EdgeId>,
    },
    ContextMenuRequest {
        anchor: Point2D<f32>,
        target: MenuTarget,
        placement: MenuPlacement,
        actions: Vec<ActionEntry>,
    },
    ContextMenuClosed,
    CreateNodeRequest(NodeCreationRequest),
}

pub struct CanvasApp {
    config: CanvasConfig,
    model: GraphModel,
    constraints: ConnectionConstraints,
    viewport: ViewportController,
    layout: LayoutEngine,
    interaction: InteractionController,
    drop: DragDropBridge,
    palette: PaletteCatalog,
    preferences: CanvasViewPreferences,
    cards: CardLayout,
    hidden_nodes: NodeFilter,
    events: Vec<CanvasEvent>,
}

impl CanvasApp {
    pub fn new(config: CanvasConfig, catalog: TypeCatalog, size: Size2D<f32>) -> Self {
        Self {
            constraints: ConnectionConstraints::new(config.handles.max_connections),
            viewport: ViewportController::new(&config.viewport, size),
            layout: LayoutEngine::new(config.layout.clone()),
            interaction: InteractionController::new(
                config.interaction.clone(),
                config.context_menu,
            ),
            drop: DragDropBridge::new(&config.drop),
            palette: PaletteCatalog::from_type_catalog(&catalog),
            model: GraphModel::new(catalog),
            preferences: CanvasViewPreferences::default(),
            cards: CardLayout::default(),
            hidden_nodes: NodeFilter::hidden(),
            events: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn model(&self) -> &GraphModel {
        &self.model
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn layout(&self) -> &LayoutEngine {
        &self.layout
    }

    pub fn layout_mut(&mut self) -> &mut LayoutEngine {
        &mut self.layout
    }

    pub fn constraints(&self) -> &ConnectionConstraints {
        &self.constraints
    }

    pub fn constraints_mut(&mut self) -> &mut ConnectionConstraints {
        &mut self.constraints
    }

    pub fn palette_mut(&mut self) -> &mut PaletteCatalog {
        &mut self.palette
    }

    pub fn interaction_state(&self) -> &InteractionState {
        self.interaction.state()
    }

    pub fn preferences(&self) -> CanvasViewPreferences {
        self.preferences
    }

    pub fn cards(&self) -> &CardLayout {
        &self.cards
    }

    /// Drain queued events, oldest first.
    pub fn take_events(&mut self) -> Vec<CanvasEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn scene(&self) -> Scene {
        render::build_scene(
            &self.model,
            &self.viewport,
            &self.constraints,
            self.interaction.state(),
            &self.config.interaction,
        )
    }

    pub fn hit_test(&self, screen: Point2D<f32>) -> HitTarget {
        render::hit_test(
            &self.model,
            &self.viewport,
            self.interaction.state(),
            &self.config.interaction,
            screen,
        )
    }

    /// Hit-test and apply a pointer press.
    pub fn pointer_down(
        &mut self,
        screen: Point2D<f32>,
        button: PointerButton,
        modifiers: PointerModifiers,
    ) -> CanvasResult<()> {
        let target = self.hit_test(screen);
        self.apply_intent(CanvasIntent::Pointer(PointerEvent::Down {
            screen,
            target,
            button,
            modifiers,
        }))
    }

    pub fn pointer_move(&mut self, screen: Point2D<f32>) -> CanvasResult<()> {
        self.apply_intent(CanvasIntent::Pointer(PointerEvent::Move { screen }))
    }

    pub fn pointer_up(&mut self, screen: Point2D<f32>) -> CanvasResult<()> {
        let target = self.hit_test(screen);
        self.apply_intent(CanvasIntent::Pointer(PointerEvent::Up { screen, target }))
    }

    pub fn drag_enter(&mut self, now: Instant) {
        self.drop.on_drag_enter(now);
    }

    pub fn drag_leave(&mut self, now: Instant) {
        self.drop.on_drag_leave(now);
    }

    pub fn is_drag_over(&mut self, now: Instant) -> bool {
        self.drop.is_drag_over(now)
    }

    /// Map a batch of key events to intents and apply them.
    pub fn handle_keyboard(&mut self, events: &[KeyboardEvent]) -> CanvasResult<()> {
        let actions = keyboard::collect_actions(events);
        self.apply_intents(keyboard::intents_from_actions(&actions))
    }

    /// Apply intents in order, stopping at the first error.
    pub fn apply_intents<I>(&mut self, intents: I) -> CanvasResult<()>
    where
        I: IntoIterator<Item = CanvasIntent>,
    {
        for intent in intents {
            self.apply_intent(intent)?;
        }
        Ok(())
    }

    /// Apply one intent. On error the interaction controller is back in
    /// `Idle` before the error is returned.
    pub fn apply_intent(&mut self, intent: CanvasIntent) -> CanvasResult<()> {
        let selection_revision = self.model.selection().revision();
        let shape = (self.model.node_count(), self.model.edge_count());

        let result = self.reduce(intent);
        if let Err(err) = &result {
            debug!("intent failed: {err}");
            self.interaction.reset(&mut self.model);
        }

        if shape != (self.model.node_count(), self.model.edge_count()) {
            let moved = self.layout.on_model_changed(&mut self.model);
            self.push_moved(moved);
        }
        if self.model.selection().revision() != selection_revision {
            let selection = self.model.selection();
            self.events.push(CanvasEvent::SelectionChange {
                nodes: selection.nodes().cloned().collect(),
                edges: selection.edges().cloned().collect(),
            });
        }
        result
    }

    /// Advance a running force layout by one chunk.
    pub fn tick_layout(&mut self) -> Option<LayoutProgress> {
        let budget = self.config.layout.chunk_steps.max(1);
        let progress = self.layout.tick(&mut self.model, budget)?;
        self.push_moved(progress.positions.iter().map(|(id, _)| id.clone()).collect());
        Some(progress)
    }

    /// Run the force layout as a background task on the current tokio
    /// runtime. Forward its snapshots to [`Self::accept_layout_progress`].
    pub fn spawn_force_layout(&mut self) -> ForceLayoutHandle {
        self.preferences.layout_strategy = LayoutStrategy::Force;
        self.layout.spawn_force(&self.model)
    }

    /// Replacement for a background layout task that a structural change
    /// superseded. Snapshots from the old task are rejected from then on.
    pub fn take_respawned_layout(&mut self) -> Option<ForceLayoutHandle> {
        self.layout.take_respawned()
    }

    /// Apply a snapshot received from a background layout task.
    pub fn accept_layout_progress(&mut self, progress: &LayoutProgress) -> bool {
        let accepted = self.layout.accept(progress, &mut self.model);
        if accepted {
            self.push_moved(progress.positions.iter().map(|(id, _)| id.clone()).collect());
        }
        accepted
    }

    /// Restore persisted view preferences and card layout. Missing or
    /// unreadable documents leave the defaults in place.
    pub fn load_preferences(&mut self, store: &dyn PreferenceStore) {
        if let Some(preferences) =
            persistence::load_json::<CanvasViewPreferences>(store, VIEW_PREFERENCES_KEY)
        {
            self.preferences = preferences;
            let moved = self
                .layout
                .set_strategy(preferences.layout_strategy, &mut self.model);
            self.push_moved(moved);
        }
        if let Some(cards) = persistence::load_json::<CardLayout>(store, CARD_LAYOUT_KEY) {
            self.cards = cards.reconciled();
        }
    }

    pub fn save_preferences(&self, store: &mut dyn PreferenceStore) -> CanvasResult<()> {
        persistence::save_json(store, VIEW_PREFERENCES_KEY, &self.preferences)?;
        persistence::save_json(store, CARD_LAYOUT_KEY, &self.cards)?;
        Ok(())
    }

    fn reduce(&mut self, intent: CanvasIntent) -> CanvasResult<()> {
        if is_structural(&intent) && !self.interaction.state().is_idle() {
            debug!(
                "structural change cancels {} gesture",
                self.interaction.state().name()
            );
            self.interaction.reset(&mut self.model);
        }

        match intent {
            CanvasIntent::Pointer(event) => self.handle_pointer(event)?,
            CanvasIntent::Drop { payload, screen } => {
                if let Some(request) = self.drop.on_drop(
                    &payload,
                    screen,
                    &self.palette,
                    &mut self.interaction,
                    &self.viewport,
                ) {
                    self.events.push(CanvasEvent::CreateNodeRequest(request));
                }
            },
            CanvasIntent::CancelGesture => self.handle_pointer(PointerEvent::Cancel)?,
            CanvasIntent::CreateNode(spec) => {
                self.model.add_node(spec)?;
            },
            CanvasIntent::CreateEdge {
                source,
                target,
                spec,
            } => {
                self.model.validate_edge(&source, &target, &spec.edge_type)?;
                self.constraints
                    .check_edge(&self.model, &source, &target, &spec)?;
                self.model.add_edge(&source, &target, spec)?;
            },
            CanvasIntent::UpdateNode { id, patch } => self.model.update_node(&id, patch)?,
            CanvasIntent::RemoveNodes(ids) => {
                let removed = self.model.remove_nodes(&ids);
                if removed < ids.len() {
                    debug!(
                        "{} of {} node id(s) were already absent",
                        ids.len() - removed,
                        ids.len()
                    );
                }
            },
            CanvasIntent::RemoveEdges(ids) => {
                if let Some(missing) = ids.iter().find(|id| !self.model.contains_edge(id)) {
                    return Err(CanvasError::missing_edge(missing));
                }
                self.model.remove_edges(&ids);
            },
            CanvasIntent::RemoveSelection => {
                let nodes: Vec<NodeId> = self.model.selection().nodes().cloned().collect();
                let edges: Vec<EdgeId> = self.model.selection().edges().cloned().collect();
                self.model.remove_edges(&edges);
                self.model.remove_nodes(&nodes);
            },
            CanvasIntent::MergeNodes {
                primary,
                secondaries,
            } => self.model.merge_nodes(&primary, &secondaries)?,
            CanvasIntent::SetNodePinned { id, pinned } => self.model.set_node_pinned(&id, pinned)?,
            CanvasIntent::SetNodeHidden { id, hidden } => self.model.set_node_hidden(&id, hidden)?,
            CanvasIntent::SetNodeCollapsed { id, collapsed } => {
                self.model.set_node_collapsed(&id, collapsed)?
            },
            CanvasIntent::ShowHiddenNodes => {
                let hidden = self.hidden_nodes.apply(&self.model).to_vec();
                for id in &hidden {
                    self.model.set_node_hidden(id, false)?;
                }
            },
            CanvasIntent::SelectNode { id, multi_select } => {
                if !self.model.select_node(&id, multi_select) {
                    return Err(CanvasError::missing_node(&id));
                }
            },
            CanvasIntent::UpdateSelection { ids, mode } => self.model.update_selection(ids, mode),
            CanvasIntent::SelectNeighbors(id) => {
                if !self.model.contains_node(&id) {
                    return Err(CanvasError::missing_node(&id));
                }
                let mut ids = vec![id.clone()];
                ids.extend(self.model.neighbors(&id).map(|(node, _)| node.id().clone()));
                self.model.update_selection(ids, SelectionUpdateMode::Replace);
            },
            CanvasIntent::SelectAll => self.model.select_all(),
            CanvasIntent::ClearSelection => self.model.clear_selection(),
            CanvasIntent::ZoomIn => self.viewport.zoom_in(),
            CanvasIntent::ZoomOut => self.viewport.zoom_out(),
            CanvasIntent::ZoomReset => self.viewport.reset_zoom(),
            CanvasIntent::ZoomToSelection => self.zoom_to_selection(),
            CanvasIntent::FitToScreen => self.fit_to_screen(),
            CanvasIntent::Resize(size) => self.viewport.resize(size),
            CanvasIntent::SetLayoutStrategy(strategy) => {
                self.preferences.layout_strategy = strategy;
                let moved = self.layout.set_strategy(strategy, &mut self.model);
                self.push_moved(moved);
            },
            CanvasIntent::SetPhysicsProfile(physics_id) => {
                if !self.layout.set_physics_profile(&physics_id) {
                    warn!("unknown physics profile `{physics_id}`; using default");
                }
            },
            CanvasIntent::Relayout => {
                let moved = self.layout.recompute(&mut self.model);
                self.push_moved(moved);
            },
            CanvasIntent::SetViewMode(mode) => self.preferences.view_mode = mode,
            CanvasIntent::MoveCard { from, to } => {
                if !self.cards.move_card(from, to) {
                    return Err(CanvasError::Validation(format!(
                        "cannot move card {from} to {to}"
                    )));
                }
            },
            CanvasIntent::ToggleCardEditing(id) => {
                if self.cards.toggle_editing(&id).is_none() {
                    return Err(CanvasError::Validation(format!("unknown card `{id}`")));
                }
            },
            CanvasIntent::LoadSnapshot(snapshot) => {
                self.layout.cancel();
                let catalog = self.model.catalog().clone();
                self.model = GraphModel::from_snapshot(snapshot, catalog);
                self.hidden_nodes.invalidate();
                let moved = self.layout.recompute(&mut self.model);
                self.push_moved(moved);
            },
        }
        Ok(())
    }

    fn handle_pointer(&mut self, event: PointerEvent) -> CanvasResult<()> {
        let mut ctx = CanvasContext {
            model: &mut self.model,
            constraints: &self.constraints,
            viewport: &self.viewport,
        };
        match self.interaction.handle(event, &mut ctx)? {
            InteractionOutcome::Connected {
                edge,
                source,
                target,
            } => self.events.push(CanvasEvent::Connect {
                edge,
                source,
                target,
            }),
            InteractionOutcome::NodesMoved(ids) => self.push_moved(ids),
            InteractionOutcome::MenuOpened {
                anchor,
                target,
                placement,
            } => {
                let actions = action_registry::list_actions_for_context(&self.action_context(&target));
                self.events.push(CanvasEvent::ContextMenuRequest {
                    anchor,
                    target,
                    placement,
                    actions,
                });
            },
            InteractionOutcome::MenuAction { action, target } => {
                self.events.push(CanvasEvent::ContextMenuClosed);
                self.run_menu_action(action, target)?;
            },
            InteractionOutcome::MenuClosed => self.events.push(CanvasEvent::ContextMenuClosed),
            InteractionOutcome::Ignored
            | InteractionOutcome::Started
            | InteractionOutcome::Updated
            | InteractionOutcome::DragReverted
            | InteractionOutcome::ConnectRejected
            | InteractionOutcome::SelectionChanged
            | InteractionOutcome::Cancelled => {},
        }
        Ok(())
    }

    fn action_context(&mut self, target: &MenuTarget) -> ActionContext {
        ActionContext {
            target: target.clone(),
            selected_nodes: self.model.selection().node_count(),
            hidden_nodes: self.hidden_nodes.apply(&self.model).len(),
            layout: self.layout.strategy(),
        }
    }

    fn run_menu_action(&mut self, action: ActionId, target: MenuTarget) -> CanvasResult<()> {
        let entry = action_registry::list_actions_for_context(&self.action_context(&target))
            .into_iter()
            .find(|entry| entry.id == action);
        if !entry.is_some_and(|entry| entry.enabled) {
            debug!("menu action {action:?} is not available for {target:?}");
            return Ok(());
        }
        match intent_for_action(action, &target, &self.model) {
            Some(intent) => self.reduce(intent),
            None => Ok(()),
        }
    }

    fn zoom_to_selection(&mut self) {
        let points: Vec<Point2D<f32>> = self
            .model
            .selection()
            .nodes()
            .filter_map(|id| self.model.node(id))
            .filter(|node| !node.hidden)
            .filter_map(|node| node.position)
            .collect();
        if !self.viewport.zoom_to_fit(points) {
            self.fit_to_screen();
        }
    }

    fn fit_to_screen(&mut self) {
        let points = self
            .model
            .nodes()
            .filter(|node| !node.hidden)
            .filter_map(|node| node.position);
        if !self.viewport.zoom_to_fit(points) {
            debug!("nothing to fit");
        }
    }

    fn push_moved(&mut self, moved: Vec<NodeId>) {
        if !moved.is_empty() {
            self.events.push(CanvasEvent::NodesChange(moved));
        }
    }
}

impl Default for CanvasApp {
    fn default() -> Self {
        Self::new(
            CanvasConfig::default(),
            TypeCatalog::default(),
            Size2D::new(800.0, 600.0),
        )
    }
}

/// Intents that change the node or edge sets.
fn is_structural(intent: &CanvasIntent) -> bool {
    matches!(
        intent,
        CanvasIntent::CreateNode(_)
            | CanvasIntent::CreateEdge { .. }
            | CanvasIntent::RemoveNodes(_)
            | CanvasIntent::RemoveEdges(_)
            | CanvasIntent::RemoveSelection
            | CanvasIntent::MergeNodes { .. }
            | CanvasIntent::LoadSnapshot(_)
    )
}

/// Translate a context-menu action into the intent it stands for.
fn intent_for_action(action: ActionId, target: &MenuTarget, model: &GraphModel) -> Option<CanvasIntent> {
    if let Some(strategy) = action.layout_strategy() {
        return Some(CanvasIntent::SetLayoutStrategy(strategy));
    }
    let intent = match (action, target) {
        (ActionId::NodeDelete, MenuTarget::Node(id)) => CanvasIntent::RemoveNodes(vec![id.clone()]),
        (ActionId::NodePinToggle, MenuTarget::Node(id)) => CanvasIntent::SetNodePinned {
            id: id.clone(),
            pinned: !model.node(id)?.pinned,
        },
        (ActionId::NodeCollapseToggle, MenuTarget::Node(id)) => CanvasIntent::SetNodeCollapsed {
            id: id.clone(),
            collapsed: !model.node(id)?.collapsed,
        },
        (ActionId::NodeHide, MenuTarget::Node(id)) => CanvasIntent::SetNodeHidden {
            id: id.clone(),
            hidden: true,
        },
        (ActionId::NodeSelectNeighbors, MenuTarget::Node(id)) => {
            CanvasIntent::SelectNeighbors(id.clone())
        },
        (ActionId::NodeMergeSelected, MenuTarget::Node(id)) => CanvasIntent::MergeNodes {
            primary: id.clone(),
            secondaries: model
                .selection()
                .nodes()
                .filter(|selected| *selected != id)
                .cloned()
                .collect(),
        },
        (ActionId::EdgeDelete, MenuTarget::Edge(id)) => CanvasIntent::RemoveEdges(vec![id.clone()]),
        (ActionId::GraphFit, _) => CanvasIntent::FitToScreen,
        (ActionId::GraphZoomToSelection, _) => CanvasIntent::ZoomToSelection,
        (ActionId::GraphResetZoom, _) => CanvasIntent::ZoomReset,
        (ActionId::GraphSelectAll, _) => CanvasIntent::SelectAll,
        (ActionId::GraphClearSelection, _) => CanvasIntent::ClearSelection,
        (ActionId::GraphShowHidden, _) => CanvasIntent::ShowHiddenNodes,
        _ => return None,
    };
    Some(intent)
}
