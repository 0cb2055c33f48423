//! Render snapshot: everything a drawing surface needs for one frame.
//!
//! Built on demand from the position store, the pass's style sheet and the
//! routed links. Serializes to JSON for hosts that draw elsewhere.

use crate::links::LinkPath;
use jv_core::collision::NodeSet;
use jv_core::error::VisualizerError;
use jv_core::id::NodeId;
use jv_core::positions::PositionStore;
use jv_core::style::{ContentItem, NodeStyle, RendererRegistry, StyleSheet};
use jv_core::view::ViewTransform;
use kurbo::{Point, Rect};
use serde::Serialize;
use smallvec::SmallVec;

/// Where the error text is drawn, in view space.
pub const ERROR_POSITION: Point = Point::new(20.0, 40.0);

/// A failure surfaced inside the canvas instead of to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorIndicator {
    pub message: String,
    pub position: Point,
}

impl ErrorIndicator {
    pub fn new(err: &VisualizerError) -> Self {
        Self {
            message: err.to_string(),
            position: ERROR_POSITION,
        }
    }
}

/// Interaction state drawn on top of the plain scene.
#[derive(Debug, Clone, Default)]
pub struct Overlay {
    pub dragging: Option<NodeId>,
    pub highlighted: SmallVec<[NodeId; 8]>,
    pub panning: bool,
    /// Zoom level text, while the indicator is up.
    pub zoom_indicator: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeFrame {
    pub id: NodeId,
    pub name: String,
    /// Content-space box.
    pub rect: Rect,
    /// View-space box.
    pub screen_rect: Rect,
    pub style: NodeStyle,
    pub content: Vec<ContentItem>,
    pub dragging: bool,
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkFrame {
    pub source: NodeId,
    pub target: NodeId,
    /// SVG path data in content space.
    pub d: String,
}

impl From<&LinkPath> for LinkFrame {
    fn from(path: &LinkPath) -> Self {
        Self {
            source: path.source,
            target: path.target,
            d: path.to_svg_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderSnapshot {
    pub transform: ViewTransform,
    /// `transform` attribute for the content group.
    pub content_transform: String,
    pub nodes: Vec<NodeFrame>,
    pub links: Vec<LinkFrame>,
    pub panning: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoom_indicator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorIndicator>,
}

impl RenderSnapshot {
    /// An empty scene showing only `err`.
    pub fn failed(view: ViewTransform, err: &VisualizerError) -> Self {
        Self {
            transform: view,
            content_transform: view.to_svg(),
            nodes: Vec::new(),
            links: Vec::new(),
            panning: false,
            zoom_indicator: None,
            error: Some(ErrorIndicator::new(err)),
        }
    }
}

/// Project the current state into a snapshot.
///
/// # Errors
/// [`VisualizerError::Render`] if a node's position is not finite; nothing
/// sensible can be drawn for it.
pub fn build_snapshot(
    set: &NodeSet<'_>,
    store: &PositionStore,
    sheet: &StyleSheet,
    registry: &RendererRegistry,
    links: &[LinkPath],
    view: ViewTransform,
    overlay: &Overlay,
) -> Result<RenderSnapshot, VisualizerError> {
    let mut nodes = Vec::with_capacity(set.order.len());
    for &idx in set.order {
        let node = set.tree.node(idx);
        let Some(origin) = store.get(node.id) else {
            continue;
        };
        if !origin.is_finite() {
            return Err(VisualizerError::Render(format!(
                "node {} has a non-finite position ({}, {})",
                node.id, origin.x, origin.y
            )));
        }
        let (style, size) = match sheet.get(node.id) {
            Some(resolved) => (resolved.style.clone(), resolved.size),
            None => {
                let style = registry.style_of(node);
                let size = style.size();
                (style, size)
            }
        };
        let rect = Rect::from_origin_size(origin, size);
        nodes.push(NodeFrame {
            id: node.id,
            name: node.name.clone(),
            rect,
            screen_rect: view.content_to_view_rect(rect),
            content: registry.content_of(node, size),
            style,
            dragging: overlay.dragging == Some(node.id),
            highlighted: overlay.highlighted.contains(&node.id),
        });
    }

    Ok(RenderSnapshot {
        transform: view,
        content_transform: view.to_svg(),
        nodes,
        links: links.iter().map(LinkFrame::from).collect(),
        panning: overlay.panning,
        zoom_indicator: overlay.zoom_indicator.clone(),
        error: None,
    })
}
