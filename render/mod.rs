/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Presentation layer for the canvas.
//!
//! Nothing here draws. [`build_scene`] turns the model into screen-space
//! descriptors for whatever surface renders them, and [`hit_test`] resolves
//! a screen point into the [`HitTarget`] the interaction controller expects.

use euclid::default::{Box2D, Point2D, Size2D};

use crate::config::InteractionConfig;
use crate::graph::handles::{ConnectionConstraints, HandleId, HandleSide, HandleState};
use crate::graph::{Edge, EdgeId, GraphModel, Node, NodeId};
use crate::input::{HitTarget, InteractionState};
use crate::viewport::ViewportController;

pub mod action_registry;
pub mod context_menu;
pub mod spatial_index;

use context_menu::{HorizontalAnchor, MenuPlacement, VerticalAnchor};
use spatial_index::{NodeSpatialIndex, rect_from_corners};

#[derive(Debug, Clone, PartialEq)]
pub struct SceneHandle {
    pub state: HandleState,
    pub center: Point2D<f32>,
    /// False once saturated; drawn dimmed and refuses new connections.
    pub interactive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub id: NodeId,
    pub label: String,
    pub node_type: String,
    pub color: Option<String>,
    /// Screen-space box.
    pub bounds: Box2D<f32>,
    pub selected: bool,
    pub primary: bool,
    pub pinned: bool,
    pub collapsed: bool,
    pub handles: Vec<SceneHandle>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneEdge {
    pub id: EdgeId,
    pub label: Option<String>,
    pub edge_type: String,
    pub from: Point2D<f32>,
    pub to: Point2D<f32>,
    pub selected: bool,
}

/// Overlay for the active gesture.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneOverlay {
    None,
    /// Rubber-band line from a handle to the pointer.
    ConnectionPreview {
        from: Point2D<f32>,
        to: Point2D<f32>,
    },
    Lasso(Box2D<f32>),
    ContextMenu(Box2D<f32>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub nodes: Vec<SceneNode>,
    pub edges: Vec<SceneEdge>,
    pub overlay: SceneOverlay,
}

/// Graph-space center of `side` on a node box of edge length `node_size`.
pub fn handle_anchor(center: Point2D<f32>, side: HandleSide, node_size: f32) -> Point2D<f32> {
    let half = node_size / 2.0;
    match side {
        HandleSide::Top => Point2D::new(center.x, center.y - half),
        HandleSide::Bottom => Point2D::new(center.x, center.y + half),
        HandleSide::Left => Point2D::new(center.x - half, center.y),
        HandleSide::Right => Point2D::new(center.x + half, center.y),
    }
}

/// Screen-space descriptors for every visible, positioned node and every
/// edge whose endpoints are both drawn. Nodes keep insertion order, so later
/// nodes paint over earlier ones.
pub fn build_scene(
    model: &GraphModel,
    viewport: &ViewportController,
    constraints: &ConnectionConstraints,
    interaction: &InteractionState,
    config: &InteractionConfig,
) -> Scene {
    let selection = model.selection();
    let half = config.node_size / 2.0;

    let nodes: Vec<SceneNode> = visible_nodes(model)
        .map(|(node, center)| {
            let min = viewport.graph_to_screen(Point2D::new(center.x - half, center.y - half));
            let max = viewport.graph_to_screen(Point2D::new(center.x + half, center.y + half));
            let handles = constraints
                .node_states(model, node.id())
                .into_iter()
                .map(|state| SceneHandle {
                    center: viewport.graph_to_screen(handle_anchor(
                        center,
                        state.handle.side,
                        config.node_size,
                    )),
                    interactive: state.is_interactive(),
                    state,
                })
                .collect();
            SceneNode {
                id: node.id().clone(),
                label: node.label.clone(),
                node_type: node.node_type.clone(),
                color: node.style.color.clone(),
                bounds: Box2D::new(min, max),
                selected: selection.contains_node(node.id()),
                primary: selection.primary() == Some(node.id()),
                pinned: node.pinned,
                collapsed: node.collapsed,
                handles,
            }
        })
        .collect();

    let edges = model
        .edges()
        .filter_map(|edge| {
            let (from, to) = edge_endpoints(model, edge, config.node_size)?;
            Some(SceneEdge {
                id: edge.id().clone(),
                label: (!edge.label.is_empty()).then(|| edge.label.clone()),
                edge_type: edge.edge_type.clone(),
                from: viewport.graph_to_screen(from),
                to: viewport.graph_to_screen(to),
                selected: selection.contains_edge(edge.id()),
            })
        })
        .collect();

    let overlay = match interaction {
        InteractionState::Connecting { source, pointer } => model
            .node(&source.node)
            .and_then(|node| node.position)
            .map(|center| SceneOverlay::ConnectionPreview {
                from: viewport.graph_to_screen(handle_anchor(center, source.side, config.node_size)),
                to: *pointer,
            })
            .unwrap_or(SceneOverlay::None),
        InteractionState::LassoSelecting {
            origin, current, ..
        } => SceneOverlay::Lasso(rect_from_corners(
            viewport.graph_to_screen(*origin),
            viewport.graph_to_screen(*current),
        )),
        InteractionState::ContextMenuOpen { placement, .. } => {
            SceneOverlay::ContextMenu(menu_rect(placement, viewport.size()))
        },
        InteractionState::Idle | InteractionState::DraggingNodes { .. } => SceneOverlay::None,
    };

    Scene {
        nodes,
        edges,
        overlay,
    }
}

/// Resolve what lies under `screen`.
///
/// Precedence: an open context menu, then connection handles, then nodes
/// (topmost first), then edges, then empty canvas.
pub fn hit_test(
    model: &GraphModel,
    viewport: &ViewportController,
    interaction: &InteractionState,
    config: &InteractionConfig,
    screen: Point2D<f32>,
) -> HitTarget {
    if let InteractionState::ContextMenuOpen { placement, .. } = interaction
        && menu_rect(placement, viewport.size()).contains(screen)
    {
        return HitTarget::Menu;
    }

    let mut best_handle: Option<(f32, HandleId)> = None;
    for (node, center) in visible_nodes(model) {
        for handle in HandleId::all_for(node.id()) {
            let anchor =
                viewport.graph_to_screen(handle_anchor(center, handle.side, config.node_size));
            let distance = (anchor - screen).length();
            if distance <= config.handle_radius
                && best_handle
                    .as_ref()
                    .is_none_or(|(best, _)| distance <= *best)
            {
                best_handle = Some((distance, handle));
            }
        }
    }
    if let Some((_, handle)) = best_handle {
        return HitTarget::Handle(handle);
    }

    let point = viewport.screen_to_graph(screen);
    if let Some(id) = NodeSpatialIndex::from_model(model, config.node_size).node_at(point) {
        return HitTarget::Node(id);
    }

    let tolerance = config.handle_radius / viewport.zoom();
    let mut best_edge: Option<(f32, &EdgeId)> = None;
    for edge in model.edges() {
        let Some((from, to)) = edge_endpoints(model, edge, config.node_size) else {
            continue;
        };
        let distance = distance_to_segment(point, from, to);
        if distance <= tolerance && best_edge.is_none_or(|(best, _)| distance <= best) {
            best_edge = Some((distance, edge.id()));
        }
    }
    if let Some((_, id)) = best_edge {
        return HitTarget::Edge(id.clone());
    }

    HitTarget::Canvas
}

/// Screen-space rectangle of a placed menu inside a wrapper of `wrapper`
/// size.
pub fn menu_rect(placement: &MenuPlacement, wrapper: Size2D<f32>) -> Box2D<f32> {
    let left = match placement.horizontal {
        HorizontalAnchor::Left(offset) => offset,
        HorizontalAnchor::Right(offset) => wrapper.width - offset - placement.width,
    };
    let top = match placement.vertical {
        VerticalAnchor::Top(offset) => offset,
        VerticalAnchor::Bottom(offset) => wrapper.height - offset - placement.height,
    };
    Box2D::new(
        Point2D::new(left, top),
        Point2D::new(left + placement.width, top + placement.height),
    )
}

fn visible_nodes(model: &GraphModel) -> impl Iterator<Item = (&Node, Point2D<f32>)> {
    model
        .nodes()
        .filter(|node| !node.hidden)
        .filter_map(|node| node.position.map(|position| (node, position)))
}

/// Graph-space endpoints of `edge`: the attached handle when one is set,
/// the node center otherwise. `None` when either end is hidden or
/// unpositioned.
fn edge_endpoints(
    model: &GraphModel,
    edge: &Edge,
    node_size: f32,
) -> Option<(Point2D<f32>, Point2D<f32>)> {
    let end = |id: &NodeId, side: Option<HandleSide>| {
        let node = model.node(id).filter(|node| !node.hidden)?;
        let center = node.position?;
        Some(match side {
            Some(side) => handle_anchor(center, side, node_size),
            None => center,
        })
    };
    Some((
        end(edge.source(), edge.source_handle)?,
        end(edge.target(), edge.target_handle)?,
    ))
}

fn distance_to_segment(point: Point2D<f32>, a: Point2D<f32>, b: Point2D<f32>) -> f32 {
    let ab = b - a;
    let length_sq = ab.square_length();
    if length_sq <= f32::EPSILON {
        return (point - a).length();
    }
    let t = ((point - a).dot(ab) / length_sq).clamp(0.0, 1.0);
    (point - (a + ab * t)).length()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeSpec, NodeSpec};
    use crate::render::context_menu::{self, MenuGeometry};

    fn model_with_pair() -> (GraphModel, NodeId, NodeId, EdgeId) {
        let mut model = GraphModel::default();
        let a = model
            .add_node(NodeSpec::new("person", "a").at(Point2D::new(100.0, 100.0)))
            .unwrap();
        let b = model
            .add_node(NodeSpec::new("person", "b").at(Point2D::new(400.0, 100.0)))
            .unwrap();
        let edge = model
            .add_edge(
                &a,
                &b,
                EdgeSpec::new("related_to").with_handles(HandleSide::Right, HandleSide::Left),
            )
            .unwrap();
        (model, a, b, edge)
    }

    fn hit(model: &GraphModel, x: f32, y: f32) -> HitTarget {
        hit_test(
            model,
            &ViewportController::default(),
            &InteractionState::Idle,
            &InteractionConfig::default(),
            Point2D::new(x, y),
        )
    }

    #[test]
    fn test_hit_precedence() {
        let (model, a, _, edge) = model_with_pair();
        assert_eq!(
            hit(&model, 131.0, 100.0),
            HitTarget::Handle(HandleId::on_side(a.clone(), HandleSide::Right))
        );
        assert_eq!(hit(&model, 100.0, 100.0), HitTarget::Node(a));
        assert_eq!(hit(&model, 250.0, 103.0), HitTarget::Edge(edge));
        assert_eq!(hit(&model, 250.0, 300.0), HitTarget::Canvas);
    }

    #[test]
    fn test_hidden_nodes_are_not_hit_or_drawn() {
        let (mut model, a, _, _) = model_with_pair();
        model.set_node_hidden(&a, true).unwrap();
        assert_eq!(hit(&model, 100.0, 100.0), HitTarget::Canvas);

        let scene = build_scene(
            &model,
            &ViewportController::default(),
            &ConnectionConstraints::default(),
            &InteractionState::Idle,
            &InteractionConfig::default(),
        );
        assert_eq!(scene.nodes.len(), 1);
        assert!(scene.edges.is_empty());
    }

    #[test]
    fn test_scene_reports_saturated_handles() {
        let (model, a, _, _) = model_with_pair();
        let mut constraints = ConnectionConstraints::default();
        constraints.set_capacity(HandleId::on_side(a.clone(), HandleSide::Right), 1);

        let scene = build_scene(
            &model,
            &ViewportController::default(),
            &constraints,
            &InteractionState::Idle,
            &InteractionConfig::default(),
        );
        let node = scene.nodes.iter().find(|node| node.id == a).unwrap();
        let right = node
            .handles
            .iter()
            .find(|handle| handle.state.handle.side == HandleSide::Right)
            .unwrap();
        assert!(!right.interactive);
        assert_eq!(right.center, Point2D::new(130.0, 100.0));
        assert!(node.handles.iter().filter(|h| h.interactive).count() == 3);
    }

    #[test]
    fn test_scene_follows_viewport() {
        let (model, a, _, _) = model_with_pair();
        let mut viewport = ViewportController::default();
        viewport.zoom_at(Point2D::new(0.0, 0.0), 2.0);
        let scene = build_scene(
            &model,
            &viewport,
            &ConnectionConstraints::default(),
            &InteractionState::Idle,
            &InteractionConfig::default(),
        );
        let node = scene.nodes.iter().find(|node| node.id == a).unwrap();
        assert_eq!(node.bounds.min, Point2D::new(140.0, 140.0));
        assert_eq!(node.bounds.max, Point2D::new(260.0, 260.0));
    }

    #[test]
    fn test_open_menu_captures_hits() {
        let (model, _, _, _) = model_with_pair();
        let viewport = ViewportController::default();
        let placement = context_menu::place(50.0, 750.0, 800.0, 600.0, &MenuGeometry::default());
        let state = InteractionState::ContextMenuOpen {
            anchor: Point2D::new(750.0, 50.0),
            target: crate::input::MenuTarget::Canvas,
            placement,
        };

        let rect = menu_rect(&placement, viewport.size());
        assert_eq!(rect.max.x, 750.0);
        let inside = Point2D::new(rect.min.x + 10.0, rect.min.y + 10.0);
        assert_eq!(
            hit_test(&model, &viewport, &state, &InteractionConfig::default(), inside),
            HitTarget::Menu
        );
    }
}
