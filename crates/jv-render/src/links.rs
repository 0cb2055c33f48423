//! Link geometry.
//!
//! Each parent→child link is drawn as a horizontal S-curve from the middle
//! of the source's right edge to the middle of the target's left edge.

use jv_core::collision::NodeSet;
use jv_core::id::NodeId;
use jv_core::model::Link;
use jv_core::positions::PositionStore;
use kurbo::{CubicBez, Point, Rect};
use serde::Serialize;

/// Upper bound on the horizontal control-point offset.
pub const MAX_CONTROL_OFFSET: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinkPath {
    pub source: NodeId,
    pub target: NodeId,
    pub curve: CubicBez,
}

impl LinkPath {
    /// SVG path data: `M x1 y1 C cx1 cy1, cx2 cy2, x2 y2`.
    pub fn to_svg_path(&self) -> String {
        let CubicBez { p0, p1, p2, p3 } = self.curve;
        format!(
            "M {} {} C {} {}, {} {}, {} {}",
            p0.x, p0.y, p1.x, p1.y, p2.x, p2.y, p3.x, p3.y
        )
    }
}

/// Right-middle of `source`, left-middle of `target`.
pub fn link_anchors(source: Rect, target: Rect) -> (Point, Point) {
    (
        Point::new(source.x1, source.y0 + source.height() / 2.0),
        Point::new(target.x0, target.y0 + target.height() / 2.0),
    )
}

pub fn link_curve(from: Point, to: Point) -> CubicBez {
    let offset = ((to.x - from.x).abs() * 0.5).min(MAX_CONTROL_OFFSET);
    CubicBez::new(
        from,
        Point::new(from.x + offset, from.y),
        Point::new(to.x - offset, to.y),
        to,
    )
}

/// Route one link, or `None` if either end has no position.
pub fn route_link(set: &NodeSet<'_>, store: &PositionStore, link: &Link) -> Option<LinkPath> {
    let rect = |id: NodeId| set.tree.index_of(id).and_then(|idx| set.rect(store, idx));
    let (Some(source), Some(target)) = (rect(link.source), rect(link.target)) else {
        log::debug!("skipping link {} -> {}: endpoint not positioned", link.source, link.target);
        return None;
    };
    let (from, to) = link_anchors(source, target);
    Some(LinkPath {
        source: link.source,
        target: link.target,
        curve: link_curve(from, to),
    })
}

/// Route every link whose endpoints are both positioned.
pub fn route_links(set: &NodeSet<'_>, store: &PositionStore, links: &[Link]) -> Vec<LinkPath> {
    links.iter().filter_map(|l| route_link(set, store, l)).collect()
}
