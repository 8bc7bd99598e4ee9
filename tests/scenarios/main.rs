/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use euclid::default::{Point2D, Size2D};
use keyboard_types::{Code, Key, KeyState, KeyboardEvent, Location, Modifiers, NamedKey};
use sketch_canvas::config::CanvasConfig;
use sketch_canvas::graph::snapshot::SketchSnapshot;
use sketch_canvas::graph::{EdgeId, EdgeSpec, GraphModel, NodeId, NodeSpec};
use sketch_canvas::input::{PointerButton, PointerModifiers};
use sketch_canvas::layout::{LayoutOutcome, LayoutStrategy};
use sketch_canvas::persistence::{FilePreferenceStore, ViewMode};
use sketch_canvas::registries::type_catalog::TypeCatalog;
use sketch_canvas::services::{MemorySketchService, SketchService, SketchSession};
use sketch_canvas::{CanvasApp, CanvasEvent, CanvasIntent, VERSION};
use tempfile::TempDir;

fn canvas() -> CanvasApp {
    CanvasApp::new(
        CanvasConfig::default(),
        TypeCatalog::default(),
        Size2D::new(800.0, 600.0),
    )
}

fn place(app: &mut CanvasApp, label: &str, x: f32, y: f32) -> NodeId {
    app.apply_intent(CanvasIntent::CreateNode(
        NodeSpec::new("person", label).at(Point2D::new(x, y)),
    ))
    .unwrap();
    app.model()
        .nodes()
        .find(|node| node.label == label)
        .unwrap()
        .id()
        .clone()
}

fn press(app: &mut CanvasApp, x: f32, y: f32) {
    app.pointer_down(Point2D::new(x, y), PointerButton::Primary, PointerModifiers::NONE)
        .unwrap();
}

fn drag_to(app: &mut CanvasApp, x: f32, y: f32) {
    app.pointer_move(Point2D::new(x, y)).unwrap();
    app.pointer_up(Point2D::new(x, y)).unwrap();
}

fn key(key: Key, modifiers: Modifiers) -> KeyboardEvent {
    KeyboardEvent {
        state: KeyState::Down,
        key,
        code: Code::Unidentified,
        location: Location::Standard,
        modifiers,
        repeat: false,
        is_composing: false,
    }
}

#[test]
fn scenarios_binary_smoke_runs() {
    assert!(!VERSION.is_empty());
}

#[test]
fn connection_point_capacity_scenario() {
    let mut app = canvas();
    let hub = place(&mut app, "hub", 100.0, 350.0);
    let leaves: Vec<NodeId> = (0..6)
        .map(|i| place(&mut app, &format!("leaf-{i}"), 400.0, 50.0 + 120.0 * i as f32))
        .collect();

    // Hub's right connection point sits at x = 130, each leaf's left one at x = 370.
    for i in 0..6 {
        press(&mut app, 130.0, 350.0);
        drag_to(&mut app, 370.0, 50.0 + 120.0 * i as f32);
        assert!(app.interaction_state().is_idle());
    }
    assert_eq!(app.model().edge_count(), 5);
    assert!(
        app.model()
            .neighbors(&hub)
            .all(|(node, _)| node.id() != &leaves[5])
    );

    let first = app.model().edges().next().unwrap().id().clone();
    app.apply_intent(CanvasIntent::RemoveEdges(vec![first])).unwrap();
    assert_eq!(app.model().edge_count(), 4);

    press(&mut app, 130.0, 350.0);
    drag_to(&mut app, 370.0, 650.0);
    assert_eq!(app.model().edge_count(), 5);
    assert!(
        app.model()
            .neighbors(&hub)
            .any(|(node, _)| node.id() == &leaves[5])
    );
}

#[test]
fn malformed_drop_leaves_canvas_untouched() {
    let mut app = canvas();
    place(&mut app, "a", 0.0, 0.0);
    app.take_events();

    for payload in ["not json at all", r#"{"other":"person"}"#, r#"{"itemKey":"unicorn"}"#] {
        app.apply_intent(CanvasIntent::Drop {
            payload: payload.to_string(),
            screen: Point2D::new(300.0, 300.0),
        })
        .unwrap();
    }
    assert_eq!(app.model().node_count(), 1);
    assert_eq!(app.model().edge_count(), 0);
    assert!(app.take_events().is_empty());
}

#[test]
fn drop_then_create_scenario() {
    let mut app = canvas();
    app.apply_intent(CanvasIntent::Drop {
        payload: r#"{"itemKey":"organization"}"#.to_string(),
        screen: Point2D::new(250.0, 150.0),
    })
    .unwrap();
    let Some(CanvasEvent::CreateNodeRequest(request)) = app.take_events().pop() else {
        panic!("drop did not request node creation");
    };
    assert_eq!(request.position, Point2D::new(250.0, 150.0));

    let mut spec = request.spec;
    spec.label = "ACME".to_string();
    app.apply_intent(CanvasIntent::CreateNode(spec)).unwrap();
    let node = app.model().nodes().next().unwrap();
    assert_eq!(node.node_type, "organization");
    assert_eq!(node.position, Some(Point2D::new(250.0, 150.0)));
}

fn lasso(app: &mut CanvasApp, from: (f32, f32), to: (f32, f32), modifiers: PointerModifiers) {
    app.pointer_down(Point2D::new(from.0, from.1), PointerButton::Primary, modifiers)
        .unwrap();
    drag_to(app, to.0, to.1);
}

#[test]
fn lasso_with_modifier_replaces_selection() {
    let mut app = canvas();
    let a = place(&mut app, "a", 100.0, 100.0);
    let b = place(&mut app, "b", 200.0, 200.0);
    let c = place(&mut app, "c", 500.0, 500.0);
    app.apply_intent(CanvasIntent::SelectNode {
        id: c.clone(),
        multi_select: false,
    })
    .unwrap();

    let shift = PointerModifiers {
        shift: true,
        ..PointerModifiers::NONE
    };
    lasso(&mut app, (20.0, 20.0), (260.0, 260.0), shift);

    assert_eq!(app.model().selected_node_ids(), vec![a, b]);
}

#[test]
fn lasso_with_two_modifiers_adds_to_selection() {
    let mut app = canvas();
    let a = place(&mut app, "a", 100.0, 100.0);
    let c = place(&mut app, "c", 500.0, 500.0);
    app.apply_intent(CanvasIntent::SelectNode {
        id: c.clone(),
        multi_select: false,
    })
    .unwrap();

    let shift_ctrl = PointerModifiers {
        shift: true,
        ctrl: true,
        alt: false,
    };
    lasso(&mut app, (20.0, 20.0), (160.0, 160.0), shift_ctrl);

    assert_eq!(app.model().selected_node_ids(), vec![c, a]);
}

#[test]
fn empty_modifier_lasso_clears_prior_selection() {
    for modifiers in [
        PointerModifiers {
            shift: true,
            ..PointerModifiers::NONE
        },
        PointerModifiers {
            ctrl: true,
            ..PointerModifiers::NONE
        },
        PointerModifiers {
            alt: true,
            ..PointerModifiers::NONE
        },
    ] {
        let mut app = canvas();
        let a = place(&mut app, "a", 100.0, 100.0);
        app.apply_intent(CanvasIntent::SelectNode {
            id: a.clone(),
            multi_select: false,
        })
        .unwrap();

        lasso(&mut app, (400.0, 400.0), (450.0, 450.0), modifiers);
        assert!(app.model().selection().is_empty(), "{modifiers:?}");
        assert!(app.model().contains_node(&a));
    }
}

#[test]
fn empty_lasso_clears_selection() {
    let config = CanvasConfig::from_toml_str("[interaction]\nlasso_mode = \"always\"\n").unwrap();
    let mut app = CanvasApp::new(config, TypeCatalog::default(), Size2D::new(800.0, 600.0));
    let a = place(&mut app, "a", 100.0, 100.0);
    app.apply_intent(CanvasIntent::SelectAll).unwrap();

    press(&mut app, 400.0, 400.0);
    drag_to(&mut app, 450.0, 450.0);

    assert!(app.model().selection().is_empty());
    assert!(app.model().contains_node(&a));
}

#[test]
fn escape_reverts_group_drag() {
    let mut app = canvas();
    let a = place(&mut app, "a", 100.0, 100.0);
    let b = place(&mut app, "b", 300.0, 100.0);
    app.apply_intent(CanvasIntent::SelectAll).unwrap();

    press(&mut app, 100.0, 100.0);
    app.pointer_move(Point2D::new(150.0, 180.0)).unwrap();
    assert_eq!(
        app.model().node(&b).unwrap().position,
        Some(Point2D::new(350.0, 180.0))
    );

    app.handle_keyboard(&[key(Key::Named(NamedKey::Escape), Modifiers::empty())])
        .unwrap();
    assert!(app.interaction_state().is_idle());
    assert_eq!(app.model().node(&a).unwrap().position, Some(Point2D::new(100.0, 100.0)));
    assert_eq!(app.model().node(&b).unwrap().position, Some(Point2D::new(300.0, 100.0)));
}

#[test]
fn keyboard_select_all_and_delete() {
    let mut app = canvas();
    let a = place(&mut app, "a", 0.0, 0.0);
    let b = place(&mut app, "b", 200.0, 0.0);
    app.apply_intent(CanvasIntent::CreateEdge {
        source: a,
        target: b,
        spec: EdgeSpec::new("related_to"),
    })
    .unwrap();

    app.handle_keyboard(&[key(Key::Character("a".to_string()), Modifiers::CONTROL)])
        .unwrap();
    assert_eq!(app.model().selection().node_count(), 2);
    app.handle_keyboard(&[key(Key::Named(NamedKey::Delete), Modifiers::empty())])
        .unwrap();
    assert_eq!(app.model().node_count(), 0);
    assert_eq!(app.model().edge_count(), 0);
}

#[test]
fn hierarchical_layout_breaks_cycles() {
    let mut model = GraphModel::new(TypeCatalog::default());
    let ids: Vec<NodeId> = ["A", "B", "C"]
        .iter()
        .map(|label| model.add_node(NodeSpec::new("person", *label)).unwrap())
        .collect();
    for (from, to) in [(0, 1), (1, 2), (2, 0)] {
        model
            .add_edge(&ids[from], &ids[to], EdgeSpec::new("related_to"))
            .unwrap();
    }

    let mut app = canvas();
    app.apply_intents([
        CanvasIntent::LoadSnapshot(model.to_snapshot()),
        CanvasIntent::SetLayoutStrategy(LayoutStrategy::Hierarchical),
    ])
    .unwrap();

    let ys: Vec<f32> = ids
        .iter()
        .map(|id| app.model().node(id).unwrap().position.unwrap().y)
        .collect();
    // Three nodes on a reversed cycle end up on three distinct layers.
    let mut layers = ys.clone();
    layers.sort_by(f32::total_cmp);
    layers.dedup();
    assert_eq!(layers.len(), 3);
}

#[test]
fn synchronous_force_layout_moves_free_nodes_only() {
    let mut app = canvas();
    let a = place(&mut app, "a", 0.0, 0.0);
    let b = place(&mut app, "b", 5.0, 0.0);
    let c = place(&mut app, "c", 10.0, 0.0);
    app.apply_intent(CanvasIntent::SetNodePinned {
        id: a.clone(),
        pinned: true,
    })
    .unwrap();
    app.apply_intent(CanvasIntent::SetLayoutStrategy(LayoutStrategy::Force))
        .unwrap();
    app.take_events();

    let mut last = None;
    while let Some(progress) = app.tick_layout() {
        last = Some(progress);
    }
    assert!(last.unwrap().is_final());
    assert_eq!(app.model().node(&a).unwrap().position, Some(Point2D::new(0.0, 0.0)));
    let b_pos = app.model().node(&b).unwrap().position.unwrap();
    let c_pos = app.model().node(&c).unwrap().position.unwrap();
    assert!((c_pos - b_pos).length() > 5.0);
    assert!(
        app.take_events()
            .iter()
            .any(|event| matches!(event, CanvasEvent::NodesChange(_)))
    );
}

#[tokio::test]
async fn background_force_layout_streams_positions() {
    let mut app = canvas();
    place(&mut app, "a", 0.0, 0.0);
    place(&mut app, "b", 1.0, 1.0);

    let mut handle = app.spawn_force_layout();
    let mut accepted = 0;
    while let Some(progress) = handle.progress.recv().await {
        if app.accept_layout_progress(&progress) {
            accepted += 1;
        }
    }
    assert!(accepted > 0);
    assert!(!app.layout().is_running());
    assert_eq!(app.preferences().layout_strategy, LayoutStrategy::Force);
}

#[tokio::test]
async fn adding_node_respawns_background_layout() {
    let mut app = canvas();
    place(&mut app, "a", 0.0, 0.0);
    place(&mut app, "b", 1.0, 1.0);

    let mut first = app.spawn_force_layout();
    let stale = first.progress.recv().await.unwrap();
    assert!(app.take_respawned_layout().is_none());

    let late = place(&mut app, "late", 2.0, 2.0);
    let mut second = app.take_respawned_layout().unwrap();
    assert!(second.generation > first.generation);
    assert!(!app.accept_layout_progress(&stale));

    while let Some(progress) = second.progress.recv().await {
        assert!(app.accept_layout_progress(&progress));
    }
    assert!(!app.layout().is_running());
    assert_ne!(app.model().node(&late).unwrap().position, Some(Point2D::new(2.0, 2.0)));
}

#[tokio::test]
async fn switching_strategy_cancels_background_layout() {
    let mut app = canvas();
    for i in 0..20 {
        place(&mut app, &format!("n{i}"), i as f32, 0.0);
    }
    let handle = app.spawn_force_layout();
    let generation = handle.generation;
    app.apply_intent(CanvasIntent::SetLayoutStrategy(LayoutStrategy::None))
        .unwrap();

    assert_ne!(app.layout().generation(), generation);
    // The task never got to run before the switch.
    assert_eq!(handle.finish().await, LayoutOutcome::Cancelled { steps: 0 });
    assert!(!app.layout().is_running());
}

#[tokio::test]
async fn session_snapshot_feeds_canvas() {
    let service = MemorySketchService::new();
    service.insert_sketch("investigation", SketchSnapshot::default());
    let mut session = SketchSession::open(service, "investigation").await.unwrap();
    let a = session
        .create_node(NodeSpec::new("person", "Ada").at(Point2D::new(100.0, 100.0)))
        .await
        .unwrap();
    let b = session
        .create_node(NodeSpec::new("organization", "ACME").at(Point2D::new(300.0, 100.0)))
        .await
        .unwrap();
    session
        .create_edge(&a, &b, EdgeSpec::new("related_to"))
        .await
        .unwrap();

    let mut app = canvas();
    app.apply_intent(CanvasIntent::LoadSnapshot(session.model().to_snapshot()))
        .unwrap();
    assert_eq!(app.model().node_count(), 2);
    assert_eq!(app.model().edge_count(), 1);

    let scene = app.scene();
    assert_eq!(scene.nodes.len(), 2);
    assert_eq!(scene.edges.len(), 1);

    // A collaborator links a new domain to Ada; expanding Ada pulls it in.
    let collaborator = session.service().clone();
    let domain = NodeId::from("acme-domain");
    collaborator
        .create_node("investigation", &domain, &NodeSpec::new("domain", "acme.test"))
        .await
        .unwrap();
    collaborator
        .create_edge("investigation", &EdgeId::from("ada-owns"), &a, &domain, &EdgeSpec::new("owns"))
        .await
        .unwrap();
    assert_eq!(session.load_neighbors(&a).await.unwrap(), vec![domain]);

    app.apply_intent(CanvasIntent::LoadSnapshot(session.model().to_snapshot()))
        .unwrap();
    assert_eq!(app.model().node_count(), 3);
    assert_eq!(app.model().neighbors(&a).count(), 2);
}

#[test]
fn preferences_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("prefs");
    {
        let mut app = canvas();
        app.apply_intents([
            CanvasIntent::SetViewMode(ViewMode::Table),
            CanvasIntent::ToggleCardEditing("notes".to_string()),
            CanvasIntent::MoveCard { from: 2, to: 0 },
        ])
        .unwrap();
        let mut store = FilePreferenceStore::open(path.clone()).unwrap();
        app.save_preferences(&mut store).unwrap();
    }

    let store = FilePreferenceStore::open(path).unwrap();
    let mut app = canvas();
    app.load_preferences(&store);
    assert_eq!(app.preferences().view_mode, ViewMode::Table);
    assert_eq!(app.cards().order()[0], "notes");
    assert!(app.cards().is_editing("notes"));
}
