//! Integration tests: host input through the visualizer (jv-editor).
//!
//! Drives the full loop the host runs: load data, feed pointer/wheel
//! events with timestamps, tick animation frames, read snapshots.

use jv_core::collision::rectangles_overlap;
use jv_core::config::VisualizerConfig;
use jv_core::error::VisualizerError;
use jv_core::model::VisualNode;
use jv_core::transform::{DataTransformer, TransformContext, TransformerChain};
use jv_editor::input::InputEvent;
use jv_editor::visualizer::Visualizer;
use kurbo::{Point, Vec2};
use pretty_assertions::assert_eq;
use serde_json::Value;

const LIBRARY: &str = include_str!("fixtures/library.json");

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn loaded(config: VisualizerConfig) -> Visualizer {
    init_logs();
    let mut vis = Visualizer::new(VisualizerConfig {
        collision: jv_core::config::CollisionConfig {
            jitter_seed: Some(11),
            ..config.collision.clone()
        },
        ..config
    });
    assert!(vis.set_json(LIBRARY), "fixture failed to load: {:?}", vis.error());
    vis
}

/// Client point 10 units into `id`'s box.
fn grab_point(vis: &Visualizer, id: &str) -> Point {
    let origin = vis.position(id).unwrap_or_else(|| panic!("{id} has no position"));
    vis.view().content_to_view(origin + Vec2::new(10.0, 10.0))
}

/// A client point far from every node.
const EMPTY_SPACE: Point = Point::new(-5000.0, -5000.0);

fn down(p: Point) -> InputEvent {
    InputEvent::from_pointer_down(p.x, p.y)
}

fn drag_to(p: Point) -> InputEvent {
    InputEvent::from_pointer_drag(p.x, p.y)
}

fn up(p: Point) -> InputEvent {
    InputEvent::from_pointer_up(p.x, p.y)
}

// ─── Loading ─────────────────────────────────────────────────────────────

#[test]
fn loading_builds_a_separated_centered_scene() {
    let mut vis = loaded(VisualizerConfig::default());
    assert_eq!(vis.tree().len(), 15);
    assert_eq!(vis.links().len(), 14);
    assert_eq!(vis.link_paths().count(), 14);
    assert_eq!(vis.relaxation().map(|r| r.converged), Some(true));

    let snap = vis.snapshot(0.0);
    assert!(snap.error.is_none());
    assert_eq!(snap.nodes.len(), 15);
    assert_eq!(snap.links.len(), 14);

    for (i, a) in snap.nodes.iter().enumerate() {
        for b in &snap.nodes[i + 1..] {
            assert!(!rectangles_overlap(a.rect, b.rect, 15.0), "{} overlaps {}", a.id, b.id);
        }
    }

    // Content is centered on the view origin.
    let bounds = snap
        .nodes
        .iter()
        .map(|n| n.screen_rect)
        .reduce(|a, b| a.union(b))
        .expect("scene has nodes");
    let c = bounds.center();
    assert!(c.x.abs() < 1e-6 && c.y.abs() < 1e-6, "content centered at {c:?}");
}

#[test]
fn reloading_keeps_the_users_view() {
    let mut vis = loaded(VisualizerConfig::default());
    vis.zoom_in(0.0);
    let view = vis.view();
    assert!(vis.set_json(LIBRARY));
    assert_eq!(vis.view(), view);
}

#[test]
fn invalid_json_shows_error_indicator() {
    let mut vis = loaded(VisualizerConfig::default());
    assert!(!vis.set_json("{ \"shelves\": [1, 2"));

    let snap = vis.snapshot(0.0);
    let err = snap.error.expect("error indicator");
    assert!(err.message.starts_with("invalid JSON"), "{}", err.message);
    assert_eq!(err.position, Point::new(20.0, 40.0));
    assert!(snap.nodes.is_empty());
    assert!(snap.links.is_empty());

    assert!(vis.set_json(LIBRARY));
    assert!(vis.snapshot(0.0).error.is_none());
}

struct Rejecting;

impl DataTransformer for Rejecting {
    fn name(&self) -> &'static str {
        "rejecting"
    }

    fn can_handle(&self, data: &Value, _ctx: &TransformContext) -> bool {
        data.is_string()
    }

    fn transform(
        &self,
        _data: &Value,
        _level: u32,
        _parent_key: &str,
        _ctx: &mut TransformContext,
    ) -> Result<Vec<VisualNode>, VisualizerError> {
        Err(VisualizerError::Transform("bare strings are not documents".into()))
    }
}

#[test]
fn transform_failure_is_reported_not_raised() {
    init_logs();
    let mut vis = Visualizer::default().with_transformers(TransformerChain::new(vec![Box::new(Rejecting)]));
    assert!(!vis.set_data(&Value::String("hello".into())));
    assert!(matches!(vis.error(), Some(VisualizerError::Transform(_))));
    assert!(vis.snapshot(0.0).error.is_some());

    // Anything else falls through to the generic walker.
    assert!(vis.set_json(r#"{"a":1}"#));
    assert_eq!(vis.tree().len(), 2);
}

#[test]
fn value_provider_overrides_leaf_text() {
    init_logs();
    let mut vis = Visualizer::default().with_value_provider(|v| match v {
        Value::Number(n) => Ok(Some(format!("#{n}"))),
        Value::Bool(_) => Err("booleans unsupported".into()),
        _ => Ok(None),
    });
    assert!(vis.set_json(r#"{"a":1,"b":"x","c":true}"#));
    let value = |id: &str| {
        let id = jv_core::NodeId::intern(id);
        vis.tree().get(id).and_then(|n| n.value.clone())
    };
    assert_eq!(value("a_leaf").as_deref(), Some("#1"));
    assert_eq!(value("b_leaf").as_deref(), Some("x"));
    assert_eq!(value("c_leaf").as_deref(), Some("true"));
}

// ─── Drag ────────────────────────────────────────────────────────────────

#[test]
fn drag_moves_node_and_nudges_children_on_drop() {
    let mut vis = loaded(VisualizerConfig::default());
    let children = ["[0]_object", "[1]_object", "[2]_object"];
    let before: Vec<Point> = children.iter().map(|id| vis.position(id).unwrap()).collect();
    let start = vis.position("shelves_array").unwrap();

    let grab = grab_point(&vis, "shelves_array");
    assert!(vis.handle_event(&down(grab), 0.0));
    assert!(vis.is_dragging());
    assert!(!vis.is_panning());

    vis.handle_event(&drag_to(grab + Vec2::new(0.0, 400.0)), 10.0);
    assert!(vis.needs_frame());
    vis.on_animation_frame(16.0);
    let moved = vis.position("shelves_array").unwrap();
    assert_eq!(moved, start + Vec2::new(0.0, 400.0));

    let snap = vis.snapshot(16.0);
    let frame = snap.nodes.iter().find(|n| n.id.as_str() == "shelves_array").unwrap();
    assert!(frame.dragging);

    assert!(vis.handle_event(&up(grab + Vec2::new(0.0, 400.0)), 20.0));
    assert!(!vis.is_dragging());
    assert!(vis.highlighted().is_empty());

    let spacing = vis.config().layout.spacing();
    for (i, (id, old)) in children.iter().zip(&before).enumerate() {
        let ideal = Point::new(moved.x + spacing.x, moved.y + (i as f64 - 1.0) * spacing.y);
        let expected = old.lerp(ideal, 0.3);
        let got = vis.position(id).unwrap();
        assert!((got - expected).hypot() < 1e-9, "{id}: {got:?} != {expected:?}");
    }

    // Links were re-routed from the dropped node's right edge.
    let path = vis
        .link_paths()
        .find(|p| p.source.as_str() == "shelves_array" && p.target.as_str() == "[0]_object")
        .unwrap();
    assert!((path.curve.p0.y - (moved.y + 20.0)).abs() < 1e-9);
}

#[test]
fn drag_onto_neighbor_highlights_until_drop() {
    let mut vis = loaded(VisualizerConfig::default());
    let grab = grab_point(&vis, "staff_object");
    let target = grab_point(&vis, "opened_leaf");

    vis.handle_event(&down(grab), 0.0);
    vis.handle_event(&drag_to(target), 140.0);
    vis.on_animation_frame(150.0);

    let opened = jv_core::NodeId::intern("opened_leaf");
    assert!(vis.highlighted().contains(&opened));
    let snap = vis.snapshot(150.0);
    assert!(snap.nodes.iter().any(|n| n.id == opened && n.highlighted));

    vis.handle_event(&up(target), 200.0);
    assert!(vis.snapshot(200.0).nodes.iter().all(|n| !n.highlighted && !n.dragging));
}

#[test]
fn released_button_seen_on_move_ends_drag() {
    let mut vis = loaded(VisualizerConfig::default());
    let grab = grab_point(&vis, "opened_leaf");
    vis.handle_event(&down(grab), 0.0);
    vis.handle_event(
        &InputEvent::PointerMove {
            x: grab.x + 50.0,
            y: grab.y,
            buttons: 0,
        },
        10.0,
    );
    assert!(!vis.is_dragging());
    assert!(!vis.is_panning());
}

#[test]
fn new_data_invalidates_drag_in_flight() {
    let mut vis = loaded(VisualizerConfig::default());
    let grab = grab_point(&vis, "opened_leaf");
    vis.handle_event(&down(grab), 0.0);
    vis.handle_event(&drag_to(grab + Vec2::new(300.0, 0.0)), 5.0);
    assert!(vis.needs_frame());

    assert!(vis.set_json(LIBRARY));
    assert!(!vis.is_dragging());
    assert!(!vis.needs_frame());
    let resting = vis.position("opened_leaf");
    assert!(!vis.on_animation_frame(16.0));
    assert_eq!(vis.position("opened_leaf"), resting);
}

#[test]
fn disabled_dragging_starts_pan_instead() {
    let mut vis = loaded(VisualizerConfig {
        enable_dragging: false,
        ..VisualizerConfig::default()
    });
    let grab = grab_point(&vis, "opened_leaf");
    let node = vis.position("opened_leaf");
    let pan = vis.pan();

    assert!(vis.handle_event(&down(grab), 0.0));
    assert!(vis.is_panning());
    assert!(!vis.is_dragging());

    vis.handle_event(&drag_to(grab + Vec2::new(30.0, 10.0)), 16.0);
    assert_eq!(vis.pan(), pan + Vec2::new(30.0, 10.0));
    assert_eq!(vis.position("opened_leaf"), node);
    assert_eq!(vis.dragged(), None);
}

// ─── Pan / zoom ──────────────────────────────────────────────────────────

fn fast_pan(vis: &mut Visualizer) {
    let mut p = EMPTY_SPACE;
    vis.handle_event(&down(p), 0.0);
    for i in 0..7 {
        p += Vec2::new(12.0, 0.0);
        vis.handle_event(&drag_to(p), f64::from(i) * 16.0);
    }
}

#[test]
fn fast_release_coasts_then_stops() {
    let mut vis = loaded(VisualizerConfig::default());
    fast_pan(&mut vis);
    assert!(vis.is_panning());
    let released = vis.pan();
    vis.handle_event(&up(EMPTY_SPACE), 100.0);
    assert!(vis.has_momentum());

    let mut frames = 0;
    let mut now = 100.0;
    while vis.on_animation_frame(now) {
        frames += 1;
        now += 16.0;
        assert!(frames < 200, "momentum never stopped");
    }
    assert!(!vis.has_momentum());
    assert!(vis.pan().x > released.x);
    assert_eq!(vis.pan().y, released.y);
}

#[test]
fn leaving_the_canvas_mid_pan_does_not_fling() {
    let mut vis = loaded(VisualizerConfig::default());
    fast_pan(&mut vis);
    let pan = vis.pan();
    assert!(vis.handle_event(&InputEvent::PointerLeave, 100.0));
    assert!(!vis.is_panning());
    assert!(!vis.has_momentum());
    assert!(!vis.on_animation_frame(116.0));
    assert_eq!(vis.pan(), pan);
}

#[test]
fn press_during_momentum_stops_it() {
    let mut vis = loaded(VisualizerConfig::default());
    fast_pan(&mut vis);
    vis.handle_event(&up(EMPTY_SPACE), 100.0);
    assert!(vis.has_momentum());
    vis.handle_event(&down(EMPTY_SPACE), 110.0);
    assert!(!vis.has_momentum());
    assert!(vis.is_panning());
}

#[test]
fn view_changes_never_move_nodes() {
    let mut vis = loaded(VisualizerConfig::default());
    let snapshot_positions = |vis: &Visualizer| -> Vec<Option<Point>> {
        vis.tree()
            .flattened_ids()
            .iter()
            .map(|&id| vis.positions().get(id))
            .collect()
    };
    let before = snapshot_positions(&vis);

    fast_pan(&mut vis);
    vis.handle_event(&up(EMPTY_SPACE), 100.0);
    let mut now = 100.0;
    while vis.on_animation_frame(now) {
        now += 16.0;
    }
    vis.zoom_in(now);
    vis.zoom_to_point(40.0, 40.0, -30.0, now);
    vis.reset_zoom(now);

    assert_eq!(snapshot_positions(&vis), before);
}

#[test]
fn wheel_zoom_keeps_content_under_pointer() {
    let mut vis = loaded(VisualizerConfig::default());
    let origin = Point::new(120.0, 64.0);
    vis.set_view_origin(origin);
    let client = Point::new(333.0, 210.0);
    let local = client - origin.to_vec2();

    let before = vis.view().view_to_content(local);
    for i in 0..5 {
        vis.handle_event(
            &InputEvent::Wheel {
                x: client.x,
                y: client.y,
                delta_y: -100.0,
            },
            f64::from(i),
        );
    }
    let after = vis.view().view_to_content(local);
    assert!((vis.zoom() - 105.0).abs() < 1e-9);
    assert!((before - after).hypot() < 1e-9, "{before:?} -> {after:?}");
}

#[test]
fn zoom_indicator_in_snapshot() {
    let mut vis = loaded(VisualizerConfig::default());
    assert_eq!(vis.snapshot(0.0).zoom_indicator, None);
    vis.zoom_out(1000.0);
    assert_eq!(vis.snapshot(1500.0).zoom_indicator.as_deref(), Some("90%"));
    assert_eq!(vis.snapshot(1800.0).zoom_indicator, None);
    vis.reset_zoom(2000.0);
    assert_eq!(vis.snapshot(2000.0).zoom_indicator.as_deref(), Some("100%"));
    assert!(vis.view().is_untouched());
}

#[test]
fn wheel_ignored_when_zooming_disabled() {
    let mut vis = loaded(VisualizerConfig {
        enable_zooming: false,
        ..VisualizerConfig::default()
    });
    let zoom = vis.zoom();
    assert!(!vis.handle_event(
        &InputEvent::Wheel {
            x: 0.0,
            y: 0.0,
            delta_y: 1.0
        },
        0.0
    ));
    assert_eq!(vis.zoom(), zoom);
}
