//! The visualizer: owns the scene and routes host input.
//!
//! Holds the node tree, the shared position store, the routed link paths
//! and both interaction controllers. The host feeds it data, input events
//! and animation-frame ticks, and reads back a [`RenderSnapshot`].
//!
//! Data flow per data change:
//!
//! ```text
//! JSON → TransformerChain → NodeTree → StyleSheet → layout → relaxation
//!      → initial centering → link routing
//! ```
//!
//! Drag and pan never run together: a press on a node (with dragging
//! enabled) starts a drag, any other press starts a pan.

use crate::drag::DragController;
use crate::input::{InputEvent, PRIMARY_BUTTON};
use crate::pan_zoom::PanZoomController;
use jv_core::collision::{CollisionEngine, NodeSet, RelaxationOutcome};
use jv_core::config::{ViewportSize, VisualizerConfig};
use jv_core::error::VisualizerError;
use jv_core::id::NodeId;
use jv_core::layout::{apply_positions_to_nodes, calculate_layout, center_content_initially, reorder_connected_nodes};
use jv_core::model::{Link, NodeTree};
use jv_core::positions::PositionStore;
use jv_core::style::{RendererRegistry, StyleSheet};
use jv_core::transform::{TransformContext, TransformerChain};
use jv_core::view::ViewTransform;
use jv_core::NodeIndex;
use jv_render::hit::hit_test;
use jv_render::links::{LinkPath, route_link};
use jv_render::snapshot::{Overlay, RenderSnapshot, build_snapshot};
use kurbo::{Point, Vec2};
use serde_json::Value;
use smallvec::SmallVec;
use std::rc::Rc;

type SharedValueProvider = Rc<dyn Fn(&Value) -> Result<Option<String>, String>>;

pub struct Visualizer {
    config: VisualizerConfig,
    transformers: TransformerChain,
    renderers: RendererRegistry,
    value_provider: Option<SharedValueProvider>,

    tree: NodeTree,
    /// Flattened pre-order working set.
    order: Vec<NodeIndex>,
    links: Vec<Link>,
    sheet: StyleSheet,
    store: PositionStore,
    /// Routed geometry, index-aligned with `links`.
    link_paths: Vec<Option<LinkPath>>,

    collision: CollisionEngine,
    pan_zoom: PanZoomController,
    drag: DragController,
    /// Client-space position of the view's top-left corner.
    view_origin: Point,
    relaxation: Option<RelaxationOutcome>,
    error: Option<VisualizerError>,
}

impl std::fmt::Debug for Visualizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Visualizer")
            .field("nodes", &self.order.len())
            .field("links", &self.links.len())
            .field("view", &self.pan_zoom.view())
            .field("dragging", &self.drag.dragged())
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new(VisualizerConfig::default())
    }
}

impl Visualizer {
    /// Generic JSON walker and the default renderer.
    pub fn new(config: VisualizerConfig) -> Self {
        Self {
            collision: CollisionEngine::new(&config.collision),
            pan_zoom: PanZoomController::new(&config),
            drag: DragController::new(&config.drag),
            config,
            transformers: TransformerChain::default(),
            renderers: RendererRegistry::default(),
            value_provider: None,
            tree: NodeTree::new(),
            order: Vec::new(),
            links: Vec::new(),
            sheet: StyleSheet::default(),
            store: PositionStore::new(),
            link_paths: Vec::new(),
            view_origin: Point::ZERO,
            relaxation: None,
            error: None,
        }
    }

    /// Collection walker, entity/container renderers, subtree layout.
    pub fn hierarchical() -> Self {
        Self::new(VisualizerConfig::hierarchical())
            .with_transformers(TransformerChain::hierarchical())
            .with_renderers(RendererRegistry::hierarchical())
    }

    #[must_use]
    pub fn with_transformers(mut self, transformers: TransformerChain) -> Self {
        self.transformers = transformers;
        self
    }

    #[must_use]
    pub fn with_renderers(mut self, renderers: RendererRegistry) -> Self {
        self.renderers = renderers;
        self
    }

    /// Override leaf display values. `Ok(None)` keeps the default text.
    #[must_use]
    pub fn with_value_provider<F>(mut self, provider: F) -> Self
    where
        F: Fn(&Value) -> Result<Option<String>, String> + 'static,
    {
        self.value_provider = Some(Rc::new(provider));
        self
    }

    pub fn set_view_origin(&mut self, origin: Point) {
        self.view_origin = origin;
    }

    pub fn set_viewport(&mut self, viewport: ViewportSize) {
        self.config.viewport = viewport;
        self.pan_zoom.set_viewport(viewport);
    }

    // ─── Data ────────────────────────────────────────────────────────────

    /// Parse JSON text and show it. Returns `false` (and shows the error
    /// in the canvas) if the text is not valid JSON or the transform fails.
    pub fn set_json(&mut self, text: &str) -> bool {
        match serde_json::from_str::<Value>(text) {
            Ok(data) => self.set_data(&data),
            Err(err) => {
                self.invalidate_interaction();
                self.fail(err.into());
                false
            }
        }
    }

    /// Replace the scene with `data`. Any drag or momentum in flight is
    /// cancelled first.
    pub fn set_data(&mut self, data: &Value) -> bool {
        self.invalidate_interaction();
        match self.rebuild(data) {
            Ok(()) => {
                self.error = None;
                true
            }
            Err(err) => {
                self.fail(err);
                false
            }
        }
    }

    fn fail(&mut self, err: VisualizerError) {
        log::warn!("{err}");
        self.clear_scene();
        self.error = Some(err);
    }

    fn clear_scene(&mut self) {
        self.tree = NodeTree::new();
        self.order.clear();
        self.links.clear();
        self.sheet = StyleSheet::default();
        self.store.clear();
        self.link_paths.clear();
        self.relaxation = None;
    }

    fn invalidate_interaction(&mut self) {
        if self.drag.end().is_some() {
            log::debug!("drag invalidated by data change");
        }
        self.pan_zoom.cancel_pan();
        self.pan_zoom.cancel_momentum();
    }

    fn transform_context(&self) -> TransformContext {
        let ctx = TransformContext::new(self.config.max_depth);
        match &self.value_provider {
            Some(provider) => {
                let provider = Rc::clone(provider);
                ctx.with_value_provider(Box::new(move |v: &Value| provider(v)))
            }
            None => ctx,
        }
    }

    fn rebuild(&mut self, data: &Value) -> Result<(), VisualizerError> {
        let mut ctx = self.transform_context();
        let tree = self.transformers.transform_data(data, &mut ctx)?;

        self.clear_scene();
        self.order = tree.flatten();
        self.links = tree.links();
        self.sheet = self.renderers.resolve_pass(&tree);
        self.tree = tree;

        let set = NodeSet::new(&self.tree, &self.order, &self.sheet);
        let positions = calculate_layout(&set, &self.links, &self.config.layout);
        apply_positions_to_nodes(&self.tree, &positions, &mut self.store);
        let outcome = self.collision.resolve_initial_collisions(&set, &mut self.store);
        self.relaxation = Some(outcome);

        let pan = center_content_initially(&set, &self.store, &self.pan_zoom.view());
        self.pan_zoom.set_pan(pan);
        self.link_paths = self.links.iter().map(|l| route_link(&set, &self.store, l)).collect();

        log::debug!(
            "scene rebuilt: {} nodes, {} links, relaxation {} passes",
            self.order.len(),
            self.links.len(),
            outcome.iterations
        );
        Ok(())
    }

    // ─── Input ───────────────────────────────────────────────────────────

    fn to_view(&self, x: f64, y: f64) -> Point {
        Point::new(x, y) - self.view_origin.to_vec2()
    }

    fn to_content(&self, view: Point) -> Point {
        self.pan_zoom.view().view_to_content(view)
    }

    /// Route one host event. Returns `true` if the view state changed.
    pub fn handle_event(&mut self, event: &InputEvent, now_ms: f64) -> bool {
        match *event {
            InputEvent::PointerDown { x, y, button, .. } => {
                if button != PRIMARY_BUTTON {
                    return false;
                }
                let view = self.to_view(x, y);
                self.pointer_down(view, now_ms)
            }
            InputEvent::PointerMove { x, y, buttons } => {
                let view = self.to_view(x, y);
                if self.drag.is_dragging() {
                    let content = self.to_content(view);
                    if !self.drag.pointer_move(content, buttons) {
                        self.finish_drag();
                    }
                    true
                } else {
                    self.pan_zoom.pan_move(view, now_ms)
                }
            }
            InputEvent::PointerUp { .. } => {
                if self.drag.is_dragging() {
                    self.finish_drag();
                    true
                } else if self.pan_zoom.is_panning() {
                    self.pan_zoom.end_pan();
                    true
                } else {
                    false
                }
            }
            InputEvent::PointerLeave => {
                if self.drag.is_dragging() {
                    self.finish_drag();
                    true
                } else if self.pan_zoom.is_panning() {
                    self.pan_zoom.cancel_pan();
                    true
                } else {
                    false
                }
            }
            InputEvent::Wheel { x, y, delta_y } => {
                if !self.config.enable_zooming {
                    return false;
                }
                let view = self.to_view(x, y);
                self.pan_zoom.on_wheel(view, delta_y, now_ms);
                true
            }
        }
    }

    fn pointer_down(&mut self, view: Point, now_ms: f64) -> bool {
        self.pan_zoom.cancel_momentum();
        if self.drag.is_dragging() {
            self.finish_drag();
        }

        let content = self.to_content(view);
        let hit = if self.config.enable_dragging {
            let set = NodeSet::new(&self.tree, &self.order, &self.sheet);
            hit_test(&set, &self.store, content)
        } else {
            None
        };

        if let Some((node, origin)) = hit.and_then(|id| Some((id, self.store.get(id)?))) {
            self.drag.begin(node, content, origin, now_ms);
            true
        } else if self.config.enable_panning {
            self.pan_zoom.begin_pan(view);
            true
        } else {
            false
        }
    }

    /// End the active drag: clear feedback, re-route links and nudge the
    /// dropped node's outgoing neighbors.
    fn finish_drag(&mut self) {
        let Some(node) = self.drag.end() else {
            return;
        };
        self.refresh_all_links();
        if self.config.drag.reorder_neighbors {
            let moved = reorder_connected_nodes(
                node,
                &self.links,
                &mut self.store,
                self.config.layout.spacing(),
                self.config.drag.reorder_factor,
            );
            if !moved.is_empty() {
                log::debug!("reordered {} neighbors of {node}", moved.len());
                self.refresh_all_links();
            }
        }
    }

    // ─── Frames ──────────────────────────────────────────────────────────

    /// Run deferred per-frame work. Returns `true` if another frame is
    /// wanted.
    pub fn on_animation_frame(&mut self, now_ms: f64) -> bool {
        if self.drag.is_dragging() {
            // Live sizes: a stateful renderer may have changed since the pass.
            let set = NodeSet::new(&self.tree, &self.order, &self.renderers);
            let frame = self.drag.on_frame(now_ms, &self.collision, &set, &mut self.store);
            if let Some(frame) = frame {
                log::trace!("drag frame {} -> ({:.1}, {:.1})", frame.node, frame.position.x, frame.position.y);
                if frame.refresh_links {
                    self.refresh_incident_links(frame.node);
                }
            }
        }
        self.pan_zoom.on_frame();
        self.needs_frame()
    }

    /// Work is waiting for the next animation frame.
    pub fn needs_frame(&self) -> bool {
        self.drag.has_pending_frame() || self.pan_zoom.has_momentum()
    }

    fn refresh_incident_links(&mut self, id: NodeId) {
        let set = NodeSet::new(&self.tree, &self.order, &self.sheet);
        for (link, path) in self.links.iter().zip(self.link_paths.iter_mut()) {
            if link.touches(id) {
                *path = route_link(&set, &self.store, link);
            }
        }
    }

    fn refresh_all_links(&mut self) {
        let set = NodeSet::new(&self.tree, &self.order, &self.sheet);
        self.link_paths = self.links.iter().map(|l| route_link(&set, &self.store, l)).collect();
    }

    // ─── View ────────────────────────────────────────────────────────────

    pub fn zoom_in(&mut self, now_ms: f64) -> bool {
        self.pan_zoom.zoom_in(now_ms)
    }

    pub fn zoom_out(&mut self, now_ms: f64) -> bool {
        self.pan_zoom.zoom_out(now_ms)
    }

    pub fn reset_zoom(&mut self, now_ms: f64) {
        self.pan_zoom.reset_zoom(now_ms);
    }

    /// Zoom by `delta` percent points around a client-space point.
    pub fn zoom_to_point(&mut self, x: f64, y: f64, delta: f64, now_ms: f64) -> bool {
        let view = self.to_view(x, y);
        self.pan_zoom.zoom_at(view, delta, now_ms)
    }

    // ─── Output ──────────────────────────────────────────────────────────

    /// Project the current state for drawing. A failing pass is captured
    /// into the error indicator instead of reaching the host.
    pub fn snapshot(&mut self, now_ms: f64) -> RenderSnapshot {
        let view = self.pan_zoom.view();
        if let Some(err) = &self.error {
            return RenderSnapshot::failed(view, err);
        }

        let set = NodeSet::new(&self.tree, &self.order, &self.sheet);
        let paths: Vec<LinkPath> = self.link_paths.iter().flatten().copied().collect();
        let overlay = Overlay {
            dragging: self.drag.dragged(),
            highlighted: SmallVec::from_slice(self.drag.highlighted()),
            panning: self.pan_zoom.is_panning(),
            zoom_indicator: self.pan_zoom.zoom_indicator(now_ms),
        };
        match build_snapshot(&set, &self.store, &self.sheet, &self.renderers, &paths, view, &overlay) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                log::warn!("{err}");
                let failed = RenderSnapshot::failed(view, &err);
                self.error = Some(err);
                failed
            }
        }
    }

    pub fn config(&self) -> &VisualizerConfig {
        &self.config
    }

    pub fn view(&self) -> ViewTransform {
        self.pan_zoom.view()
    }

    pub fn zoom(&self) -> f64 {
        self.pan_zoom.zoom()
    }

    pub fn pan(&self) -> Vec2 {
        self.pan_zoom.pan()
    }

    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Routed links, skipping any whose endpoints lack a position.
    pub fn link_paths(&self) -> impl Iterator<Item = &LinkPath> + '_ {
        self.link_paths.iter().flatten()
    }

    pub fn positions(&self) -> &PositionStore {
        &self.store
    }

    pub fn position(&self, id: &str) -> Option<Point> {
        self.store.get(NodeId::intern(id))
    }

    /// Outcome of the last relaxation pass.
    pub fn relaxation(&self) -> Option<RelaxationOutcome> {
        self.relaxation
    }

    pub fn error(&self) -> Option<&VisualizerError> {
        self.error.as_ref()
    }

    pub fn dragged(&self) -> Option<NodeId> {
        self.drag.dragged()
    }

    pub fn highlighted(&self) -> &[NodeId] {
        self.drag.highlighted()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    pub fn is_panning(&self) -> bool {
        self.pan_zoom.is_panning()
    }

    pub fn has_momentum(&self) -> bool {
        self.pan_zoom.has_momentum()
    }
}
