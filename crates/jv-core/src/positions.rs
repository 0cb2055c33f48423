//! The shared node-position store.
//!
//! One id-indexed map of content-space origins. The layout calculator and
//! the drag controller write to it; collision, hit testing and rendering
//! only read. Replacing the tree means clearing the store.

use crate::id::NodeId;
use kurbo::{Point, Rect, Size};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct PositionStore {
    positions: HashMap<NodeId, Point>,
}

impl PositionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Top-left corner of `id` in content space, if laid out.
    pub fn get(&self, id: NodeId) -> Option<Point> {
        self.positions.get(&id).copied()
    }

    pub fn set(&mut self, id: NodeId, pos: Point) {
        self.positions.insert(id, pos);
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.positions.contains_key(&id)
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Bounding box of `id` given its size.
    pub fn rect_of(&self, id: NodeId, size: Size) -> Option<Rect> {
        self.get(id).map(|p| Rect::from_origin_size(p, size))
    }
}
