/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Pointer interaction state machine.
//!
//! Gestures are modal: exactly one [`InteractionState`] is active, a new
//! gesture can only start from `Idle`, and events that do not belong to the
//! active state are ignored. `Cancel` returns to `Idle` from anywhere.
//!
//! The controller has no rendering surface; hit targets arrive already
//! resolved (see [`crate::render::hit_test`]), which keeps every transition
//! unit-testable.

use euclid::default::Point2D;
use log::debug;

use crate::config::InteractionConfig;
use crate::error::{CanvasError, CanvasResult};
use crate::graph::handles::{ConnectionConstraints, HandleId};
use crate::graph::{EdgeId, EdgeSpec, GraphModel, NodeId, NodeSpec, SelectionUpdateMode};
use crate::registries::palette::ActionItem;
use crate::render::action_registry::ActionId;
use crate::render::context_menu::{self, MenuGeometry, MenuPlacement};
use crate::render::spatial_index::{NodeSpatialIndex, rect_from_corners};
use crate::viewport::ViewportController;

pub mod drop;
pub mod keyboard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerModifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl PointerModifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
    };

    pub fn any(self) -> bool {
        self.shift || self.ctrl || self.alt
    }

    fn held(self) -> usize {
        [self.shift, self.ctrl, self.alt]
            .into_iter()
            .filter(|held| *held)
            .count()
    }

    /// Selection mode for a lasso. The single modifier that starts a lasso
    /// replaces the selection; a second modifier on top adds, or toggles
    /// when alt is one of them.
    pub fn lasso_mode(self) -> SelectionUpdateMode {
        if self.held() < 2 {
            SelectionUpdateMode::Replace
        } else if self.alt {
            SelectionUpdateMode::Toggle
        } else {
            SelectionUpdateMode::Add
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
}

/// What lies under the pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitTarget {
    Canvas,
    Node(NodeId),
    Handle(HandleId),
    Edge(EdgeId),
    /// Inside the open context menu.
    Menu,
}

/// What a context menu was opened on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuTarget {
    Canvas,
    Node(NodeId),
    Edge(EdgeId),
}

impl MenuTarget {
    fn from_hit(target: &HitTarget) -> Self {
        match target {
            HitTarget::Node(id) => Self::Node(id.clone()),
            HitTarget::Handle(handle) => Self::Node(handle.node.clone()),
            HitTarget::Edge(id) => Self::Edge(id.clone()),
            HitTarget::Canvas | HitTarget::Menu => Self::Canvas,
        }
    }
}

/// Pointer positions are in screen space, relative to the canvas wrapper.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerEvent {
    Down {
        screen: Point2D<f32>,
        target: HitTarget,
        button: PointerButton,
        modifiers: PointerModifiers,
    },
    Move {
        screen: Point2D<f32>,
    },
    Up {
        screen: Point2D<f32>,
        target: HitTarget,
    },
    LongPress {
        screen: Point2D<f32>,
        target: HitTarget,
    },
    MenuAction(ActionId),
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    DraggingNodes {
        ids: Vec<NodeId>,
        origins: Vec<Point2D<f32>>,
        /// Node under the pointer at press time.
        pressed: NodeId,
        /// Press point in screen and graph space.
        press_screen: Point2D<f32>,
        press_graph: Point2D<f32>,
        moved: bool,
        additive: bool,
    },
    Connecting {
        source: HandleId,
        pointer: Point2D<f32>,
    },
    LassoSelecting {
        /// Graph-space corner where the lasso started.
        origin: Point2D<f32>,
        current: Point2D<f32>,
        mode: SelectionUpdateMode,
    },
    ContextMenuOpen {
        anchor: Point2D<f32>,
        target: MenuTarget,
        placement: MenuPlacement,
    },
}

impl InteractionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::DraggingNodes { .. } => "dragging",
            Self::Connecting { .. } => "connecting",
            Self::LassoSelecting { .. } => "lasso",
            Self::ContextMenuOpen { .. } => "context-menu",
        }
    }
}

/// Request to open the node-creation flow.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeCreationRequest {
    pub item_key: String,
    pub spec: NodeSpec,
    /// Graph-space drop point.
    pub position: Point2D<f32>,
}

/// Result of feeding one event to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionOutcome {
    /// Event does not apply to the current state.
    Ignored,
    /// A gesture began.
    Started,
    /// The active gesture moved.
    Updated,
    NodesMoved(Vec<NodeId>),
    DragReverted,
    Connected {
        edge: EdgeId,
        source: HandleId,
        target: HandleId,
    },
    /// Connect gesture ended without an edge.
    ConnectRejected,
    SelectionChanged,
    MenuOpened {
        anchor: Point2D<f32>,
        target: MenuTarget,
        placement: MenuPlacement,
    },
    MenuAction {
        action: ActionId,
        target: MenuTarget,
    },
    MenuClosed,
    Cancelled,
}

/// Borrowed collaborators for one event.
pub struct CanvasContext<'a> {
    pub model: &'a mut GraphModel,
    pub constraints: &'a ConnectionConstraints,
    pub viewport: &'a ViewportController,
}

#[derive(Debug, Clone)]
pub struct InteractionController {
    state: InteractionState,
    config: InteractionConfig,
    menu_geometry: MenuGeometry,
}

impl InteractionController {
    pub fn new(config: InteractionConfig, menu_geometry: MenuGeometry) -> Self {
        Self {
            state: InteractionState::Idle,
            config,
            menu_geometry,
        }
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    /// Feed one pointer event.
    ///
    /// On error the controller is back in `Idle` (a drag in progress is
    /// reverted first) and the error is returned to the caller.
    pub fn handle(
        &mut self,
        event: PointerEvent,
        ctx: &mut CanvasContext<'_>,
    ) -> CanvasResult<InteractionOutcome> {
        let result = self.transition(event, ctx);
        if let Err(err) = &result {
            debug!("interaction error in {} state: {err}", self.state.name());
            self.reset(ctx.model);
        }
        result
    }

    /// Drop any gesture and return to `Idle`, reverting an unfinished drag.
    pub fn reset(&mut self, model: &mut GraphModel) {
        if let InteractionState::DraggingNodes { ids, origins, .. } =
            std::mem::take(&mut self.state)
        {
            model.apply_positions(ids.into_iter().zip(origins));
        }
    }

    /// Open the node-creation flow for a palette item dropped at `screen`.
    /// Only possible while idle.
    pub fn request_node_creation(
        &mut self,
        item: &ActionItem,
        screen: Point2D<f32>,
        viewport: &ViewportController,
    ) -> Option<NodeCreationRequest> {
        if !self.state.is_idle() {
            debug!(
                "ignoring node creation for `{}` during {} gesture",
                item.key,
                self.state.name()
            );
            return None;
        }
        let position = viewport.screen_to_graph(screen);
        Some(NodeCreationRequest {
            item_key: item.key.clone(),
            spec: item.node_spec().at(position),
            position,
        })
    }

    fn transition(
        &mut self,
        event: PointerEvent,
        ctx: &mut CanvasContext<'_>,
    ) -> CanvasResult<InteractionOutcome> {
        if matches!(event, PointerEvent::Cancel) {
            return Ok(self.cancel(ctx.model));
        }
        match std::mem::take(&mut self.state) {
            InteractionState::Idle => self.from_idle(event, ctx),
            InteractionState::DraggingNodes {
                ids,
                origins,
                pressed,
                press_screen,
                press_graph,
                moved,
                additive,
            } => {
                let drag = Drag {
                    ids,
                    origins,
                    pressed,
                    press_screen,
                    press_graph,
                    moved,
                    additive,
                };
                self.while_dragging(drag, event, ctx)
            },
            InteractionState::Connecting { source, pointer } => {
                self.while_connecting(source, pointer, event, ctx)
            },
            InteractionState::LassoSelecting {
                origin,
                current,
                mode,
            } => self.while_lasso(origin, current, mode, event, ctx),
            InteractionState::ContextMenuOpen {
                anchor,
                target,
                placement,
            } => Ok(self.while_menu_open(anchor, target, placement, event)),
        }
    }

    fn cancel(&mut self, model: &mut GraphModel) -> InteractionOutcome {
        let outcome = match &self.state {
            InteractionState::Idle => InteractionOutcome::Ignored,
            InteractionState::DraggingNodes { .. } => InteractionOutcome::DragReverted,
            InteractionState::ContextMenuOpen { .. } => InteractionOutcome::MenuClosed,
            InteractionState::Connecting { .. } | InteractionState::LassoSelecting { .. } => {
                InteractionOutcome::Cancelled
            },
        };
        self.reset(model);
        outcome
    }

    fn from_idle(
        &mut self,
        event: PointerEvent,
        ctx: &mut CanvasContext<'_>,
    ) -> CanvasResult<InteractionOutcome> {
        match event {
            PointerEvent::Down {
                screen,
                target,
                button: PointerButton::Secondary,
                ..
            }
            | PointerEvent::LongPress { screen, target } => {
                if target == HitTarget::Menu {
                    return Ok(InteractionOutcome::Ignored);
                }
                Ok(self.open_menu(screen, MenuTarget::from_hit(&target), ctx.viewport))
            },
            PointerEvent::Down {
                screen,
                target,
                button: PointerButton::Primary,
                modifiers,
            } => match target {
                HitTarget::Handle(handle) => {
                    if !ctx.constraints.can_connect(ctx.model, &handle) {
                        debug!(
                            "connection point {}/{} on `{}` is not connectable",
                            handle.side, handle.role, handle.node
                        );
                        return Ok(InteractionOutcome::ConnectRejected);
                    }
                    self.state = InteractionState::Connecting {
                        source: handle,
                        pointer: screen,
                    };
                    Ok(InteractionOutcome::Started)
                },
                HitTarget::Node(id) => Ok(self.start_drag(id, screen, modifiers, ctx)),
                HitTarget::Edge(id) => {
                    let mode = if modifiers.any() {
                        SelectionUpdateMode::Toggle
                    } else {
                        SelectionUpdateMode::Replace
                    };
                    ctx.model.update_edge_selection(vec![id], mode);
                    Ok(InteractionOutcome::SelectionChanged)
                },
                HitTarget::Canvas => {
                    if modifiers.any() || self.config.lasso_always() {
                        let origin = ctx.viewport.screen_to_graph(screen);
                        self.state = InteractionState::LassoSelecting {
                            origin,
                            current: origin,
                            mode: modifiers.lasso_mode(),
                        };
                        return Ok(InteractionOutcome::Started);
                    }
                    if ctx.model.selection().is_empty() {
                        return Ok(InteractionOutcome::Ignored);
                    }
                    ctx.model.clear_selection();
                    Ok(InteractionOutcome::SelectionChanged)
                },
                HitTarget::Menu => Ok(InteractionOutcome::Ignored),
            },
            PointerEvent::Move { .. }
            | PointerEvent::Up { .. }
            | PointerEvent::MenuAction(_)
            | PointerEvent::Cancel => Ok(InteractionOutcome::Ignored),
        }
    }

    fn start_drag(
        &mut self,
        pressed: NodeId,
        screen: Point2D<f32>,
        modifiers: PointerModifiers,
        ctx: &mut CanvasContext<'_>,
    ) -> InteractionOutcome {
        let group: Vec<NodeId> = if ctx.model.selection().contains_node(&pressed) {
            ctx.model.selection().nodes().cloned().collect()
        } else {
            vec![pressed.clone()]
        };
        let mut ids = Vec::with_capacity(group.len());
        let mut origins = Vec::with_capacity(group.len());
        for id in group {
            if let Some(position) = ctx.model.node(&id).and_then(|node| node.position) {
                ids.push(id);
                origins.push(position);
            }
        }
        if !ids.contains(&pressed) {
            return InteractionOutcome::Ignored;
        }
        self.state = InteractionState::DraggingNodes {
            ids,
            origins,
            pressed,
            press_screen: screen,
            press_graph: ctx.viewport.screen_to_graph(screen),
            moved: false,
            additive: modifiers.ctrl || modifiers.shift,
        };
        InteractionOutcome::Started
    }

    fn while_dragging(
        &mut self,
        mut drag: Drag,
        event: PointerEvent,
        ctx: &mut CanvasContext<'_>,
    ) -> CanvasResult<InteractionOutcome> {
        match event {
            PointerEvent::Move { screen } => {
                if !drag.moved
                    && (screen - drag.press_screen).length() < self.config.drag_threshold
                {
                    self.state = drag.into_state();
                    return Ok(InteractionOutcome::Updated);
                }
                drag.moved = true;
                drag.follow(ctx, screen);
                self.state = drag.into_state();
                Ok(InteractionOutcome::Updated)
            },
            PointerEvent::Up { screen, .. } => {
                if !drag.moved {
                    // A press without travel is a click.
                    if !ctx.model.select_node(&drag.pressed, drag.additive) {
                        return Err(CanvasError::missing_node(&drag.pressed));
                    }
                    return Ok(InteractionOutcome::SelectionChanged);
                }
                let moved = drag.follow(ctx, screen);
                Ok(InteractionOutcome::NodesMoved(moved))
            },
            _ => {
                self.state = drag.into_state();
                Ok(InteractionOutcome::Ignored)
            },
        }
    }

    fn while_connecting(
        &mut self,
        source: HandleId,
        pointer: Point2D<f32>,
        event: PointerEvent,
        ctx: &mut CanvasContext<'_>,
    ) -> CanvasResult<InteractionOutcome> {
        match event {
            PointerEvent::Move { screen } => {
                self.state = InteractionState::Connecting {
                    source,
                    pointer: screen,
                };
                Ok(InteractionOutcome::Updated)
            },
            PointerEvent::Up {
                target: HitTarget::Handle(end),
                ..
            } => {
                let (from, to) = match ctx.constraints.resolve_connection(ctx.model, &source, &end) {
                    Ok(pair) => pair,
                    Err(err) => {
                        debug!("connection rejected: {err}");
                        return Ok(InteractionOutcome::ConnectRejected);
                    },
                };
                let spec = EdgeSpec::new(self.config.default_edge_type.clone())
                    .with_handles(from.side, to.side);
                let edge = ctx.model.add_edge(&from.node, &to.node, spec)?;
                Ok(InteractionOutcome::Connected {
                    edge,
                    source: from,
                    target: to,
                })
            },
            PointerEvent::Up { .. } => Ok(InteractionOutcome::ConnectRejected),
            _ => {
                self.state = InteractionState::Connecting { source, pointer };
                Ok(InteractionOutcome::Ignored)
            },
        }
    }

    fn while_lasso(
        &mut self,
        origin: Point2D<f32>,
        current: Point2D<f32>,
        mode: SelectionUpdateMode,
        event: PointerEvent,
        ctx: &mut CanvasContext<'_>,
    ) -> CanvasResult<InteractionOutcome> {
        match event {
            PointerEvent::Move { screen } => {
                self.state = InteractionState::LassoSelecting {
                    origin,
                    current: ctx.viewport.screen_to_graph(screen),
                    mode,
                };
                Ok(InteractionOutcome::Updated)
            },
            PointerEvent::Up { screen, .. } => {
                let rect = rect_from_corners(origin, ctx.viewport.screen_to_graph(screen));
                let index = NodeSpatialIndex::from_model(ctx.model, self.config.node_size);
                let hits = index.nodes_intersecting(rect);
                debug!("lasso selected {} node(s)", hits.len());
                ctx.model.update_selection(hits, mode);
                Ok(InteractionOutcome::SelectionChanged)
            },
            _ => {
                self.state = InteractionState::LassoSelecting {
                    origin,
                    current,
                    mode,
                };
                Ok(InteractionOutcome::Ignored)
            },
        }
    }

    fn while_menu_open(
        &mut self,
        anchor: Point2D<f32>,
        target: MenuTarget,
        placement: MenuPlacement,
        event: PointerEvent,
    ) -> InteractionOutcome {
        match event {
            PointerEvent::MenuAction(action) => InteractionOutcome::MenuAction { action, target },
            PointerEvent::Down { target: hit, .. } if hit != HitTarget::Menu => {
                InteractionOutcome::MenuClosed
            },
            _ => {
                self.state = InteractionState::ContextMenuOpen {
                    anchor,
                    target,
                    placement,
                };
                InteractionOutcome::Ignored
            },
        }
    }

    fn open_menu(
        &mut self,
        anchor: Point2D<f32>,
        target: MenuTarget,
        viewport: &ViewportController,
    ) -> InteractionOutcome {
        let size = viewport.size();
        let placement = context_menu::place(
            anchor.y,
            anchor.x,
            size.width,
            size.height,
            &self.menu_geometry,
        );
        self.state = InteractionState::ContextMenuOpen {
            anchor,
            target: target.clone(),
            placement,
        };
        InteractionOutcome::MenuOpened {
            anchor,
            target,
            placement,
        }
    }
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new(InteractionConfig::default(), MenuGeometry::default())
    }
}

/// Unpacked `DraggingNodes` state.
struct Drag {
    ids: Vec<NodeId>,
    origins: Vec<Point2D<f32>>,
    pressed: NodeId,
    press_screen: Point2D<f32>,
    press_graph: Point2D<f32>,
    moved: bool,
    additive: bool,
}

impl Drag {
    /// Move every dragged node by the pointer travel since the press.
    fn follow(&self, ctx: &mut CanvasContext<'_>, screen: Point2D<f32>) -> Vec<NodeId> {
        let delta = ctx.viewport.screen_to_graph(screen) - self.press_graph;
        ctx.model.apply_positions(
            self.ids
                .iter()
                .cloned()
                .zip(self.origins.iter().map(|origin| *origin + delta)),
        )
    }

    fn into_state(self) -> InteractionState {
        InteractionState::DraggingNodes {
            ids: self.ids,
            origins: self.origins,
            pressed: self.pressed,
            press_screen: self.press_screen,
            press_graph: self.press_graph,
            moved: self.moved,
            additive: self.additive,
        }
    }
}
