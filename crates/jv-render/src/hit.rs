//! Hit testing: point → node lookup.
//!
//! Nodes paint in traversal order, so the walk runs back to front and the
//! last painted node under the point wins.

use jv_core::collision::NodeSet;
use jv_core::id::NodeId;
use jv_core::positions::PositionStore;
use kurbo::{Point, Rect};

/// Find the topmost node at content-space point `p`.
/// Returns `None` if no node is hit (background).
pub fn hit_test(set: &NodeSet<'_>, store: &PositionStore, p: Point) -> Option<NodeId> {
    set.order
        .iter()
        .rev()
        .find(|&&idx| set.rect(store, idx).is_some_and(|r| contains_inclusive(r, p)))
        .map(|&idx| set.id(idx))
}

/// Edges count as inside; a press on the border still grabs the node.
fn contains_inclusive(r: Rect, p: Point) -> bool {
    p.x >= r.x0 && p.x <= r.x1 && p.y >= r.y0 && p.y <= r.y1
}
