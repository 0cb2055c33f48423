//! Layout calculator.
//!
//! Seeds the position store from the node tree. Three strategies:
//!
//! - **Level grid**: one column per tree level, one row per node within it.
//! - **Subtree center**: fixed row height; each parent sits midway between
//!   its first and last child.
//! - **Tree packing**: two passes. Subtree extents bottom-up from measured
//!   node heights, then slots top-down, then parents re-centered on their
//!   children.
//!
//! Strategies do not avoid overlap themselves; the collision engine runs
//! afterwards.

use crate::collision::NodeSet;
use crate::config::{LayoutConfig, LayoutStrategy, Spacing};
use crate::id::NodeId;
use crate::model::{Link, NodeTree};
use crate::positions::PositionStore;
use crate::view::ViewTransform;
use kurbo::{Point, Rect, Vec2};
use petgraph::graph::NodeIndex;
use serde::Serialize;
use std::collections::HashMap;

/// Row height assumed by the subtree-center strategy.
const SUBTREE_ROW_HEIGHT: f64 = 40.0;
/// Vertical gap between sibling subtrees.
const SIBLING_GAP: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutPosition {
    pub node_id: NodeId,
    pub x: f64,
    pub y: f64,
}

impl LayoutPosition {
    pub fn new(node_id: NodeId, x: f64, y: f64) -> Self {
        Self { node_id, x, y }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

pub trait LayoutProvider {
    fn name(&self) -> &'static str;

    fn calculate_layout(&self, set: &NodeSet<'_>, links: &[Link], config: &LayoutConfig) -> Vec<LayoutPosition>;
}

// ─── Level grid ──────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct LevelGridLayout;

impl LayoutProvider for LevelGridLayout {
    fn name(&self) -> &'static str {
        "level grid"
    }

    fn calculate_layout(&self, set: &NodeSet<'_>, _links: &[Link], config: &LayoutConfig) -> Vec<LayoutPosition> {
        let spacing = config.spacing();
        let pad = config.padding;
        let mut row_of_level: HashMap<u32, usize> = HashMap::new();

        set.order
            .iter()
            .map(|&idx| {
                let node = set.tree.node(idx);
                let row = row_of_level.entry(node.level).or_insert(0);
                let y = pad.top + *row as f64 * spacing.y;
                *row += 1;
                LayoutPosition::new(node.id, pad.left + f64::from(node.level) * spacing.x, y)
            })
            .collect()
    }
}

// ─── Subtree center ──────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct SubtreeCenterLayout;

impl SubtreeCenterLayout {
    /// Places the subtree of `idx` starting at `top`; returns its height.
    /// Depth is bounded by the tree's own depth cap.
    fn place(
        tree: &NodeTree,
        idx: NodeIndex,
        x: f64,
        top: f64,
        spacing: Spacing,
        out: &mut HashMap<NodeIndex, Point>,
    ) -> f64 {
        out.insert(idx, Point::new(x, top));
        let children = tree.children(idx);
        if children.is_empty() {
            return SUBTREE_ROW_HEIGHT;
        }

        let mut child_top = top + SUBTREE_ROW_HEIGHT + SIBLING_GAP;
        let mut total = SUBTREE_ROW_HEIGHT + SIBLING_GAP;
        for &child in &children {
            let h = Self::place(tree, child, x + spacing.x, child_top, spacing, out);
            child_top += h + SIBLING_GAP;
            total += h + SIBLING_GAP;
        }

        if children.len() > 1 {
            let first = out[&children[0]].y;
            let last = out[&children[children.len() - 1]].y;
            if let Some(p) = out.get_mut(&idx) {
                p.y = first + (last - first) / 2.0;
            }
        }
        total - SIBLING_GAP
    }
}

impl LayoutProvider for SubtreeCenterLayout {
    fn name(&self) -> &'static str {
        "subtree center"
    }

    fn calculate_layout(&self, set: &NodeSet<'_>, _links: &[Link], config: &LayoutConfig) -> Vec<LayoutPosition> {
        let spacing = config.spacing();
        let mut placed = HashMap::with_capacity(set.order.len());
        let mut top = config.padding.top;
        for &root in &set.tree.roots {
            let h = Self::place(set.tree, root, config.padding.left, top, spacing, &mut placed);
            top += h + SIBLING_GAP;
        }
        positions_in_order(set, &placed)
    }
}

// ─── Tree packing ────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct TreePackingLayout;

impl LayoutProvider for TreePackingLayout {
    fn name(&self) -> &'static str {
        "tree packing"
    }

    fn calculate_layout(&self, set: &NodeSet<'_>, _links: &[Link], config: &LayoutConfig) -> Vec<LayoutPosition> {
        let tree = set.tree;
        let spacing = config.spacing();
        let order = tree.flatten();
        let block = |children: &[NodeIndex], extent: &HashMap<NodeIndex, f64>| {
            let sum: f64 = children.iter().map(|c| extent[c]).sum();
            sum + SIBLING_GAP * children.len().saturating_sub(1) as f64
        };

        // Pass 1: subtree extents, children before parents.
        let mut extent: HashMap<NodeIndex, f64> = HashMap::with_capacity(order.len());
        for &idx in order.iter().rev() {
            let own = set.size(idx).height;
            let children = tree.children(idx);
            let e = if children.is_empty() {
                own
            } else {
                own.max(block(&children, &extent))
            };
            extent.insert(idx, e);
        }

        // Pass 2: slots, parents before children.
        let mut slot_top: HashMap<NodeIndex, f64> = HashMap::with_capacity(order.len());
        let mut x: HashMap<NodeIndex, f64> = HashMap::with_capacity(order.len());
        let mut top = config.padding.top;
        for &root in &tree.roots {
            slot_top.insert(root, top);
            x.insert(root, config.padding.left);
            top += extent[&root] + SIBLING_GAP;
        }
        for &idx in &order {
            let children = tree.children(idx);
            if children.is_empty() {
                continue;
            }
            let mut cursor = slot_top[&idx] + (extent[&idx] - block(&children, &extent)) / 2.0;
            let child_x = x[&idx] + spacing.x;
            for &c in &children {
                slot_top.insert(c, cursor);
                x.insert(c, child_x);
                cursor += extent[&c] + SIBLING_GAP;
            }
        }

        // Pass 3: leaves centered in their slot, parents between first and
        // last child.
        let mut placed: HashMap<NodeIndex, Point> = HashMap::with_capacity(order.len());
        for &idx in order.iter().rev() {
            let children = tree.children(idx);
            let y = match (children.first(), children.last()) {
                (Some(first), Some(last)) => (placed[first].y + placed[last].y) / 2.0,
                _ => slot_top[&idx] + (extent[&idx] - set.size(idx).height) / 2.0,
            };
            placed.insert(idx, Point::new(x[&idx], y));
        }

        positions_in_order(set, &placed)
    }
}

fn positions_in_order(set: &NodeSet<'_>, placed: &HashMap<NodeIndex, Point>) -> Vec<LayoutPosition> {
    set.order
        .iter()
        .filter_map(|&idx| placed.get(&idx).map(|p| LayoutPosition::new(set.id(idx), p.x, p.y)))
        .collect()
}

// ─── Entry points ────────────────────────────────────────────────────────

pub fn provider_for(strategy: LayoutStrategy) -> &'static dyn LayoutProvider {
    match strategy {
        LayoutStrategy::LevelGrid => &LevelGridLayout,
        LayoutStrategy::SubtreeCenter => &SubtreeCenterLayout,
        LayoutStrategy::TreePacking => &TreePackingLayout,
    }
}

/// Run the configured strategy over the node set.
pub fn calculate_layout(set: &NodeSet<'_>, links: &[Link], config: &LayoutConfig) -> Vec<LayoutPosition> {
    let provider = provider_for(config.strategy);
    log::debug!("layout: {} nodes, {}", set.order.len(), provider.name());
    provider.calculate_layout(set, links, config)
}

/// Write positions into the store. Positions for ids not in `tree` are
/// ignored.
pub fn apply_positions_to_nodes(tree: &NodeTree, positions: &[LayoutPosition], store: &mut PositionStore) {
    for pos in positions {
        if tree.index_of(pos.node_id).is_some() {
            store.set(pos.node_id, pos.point());
        } else {
            log::trace!("layout position for unknown node {}", pos.node_id);
        }
    }
}

/// Bounding box of every positioned node.
pub fn content_bounds(set: &NodeSet<'_>, store: &PositionStore) -> Option<Rect> {
    set.order
        .iter()
        .filter_map(|&idx| set.rect(store, idx))
        .reduce(|a, b| a.union(b))
}

/// Pan that centers the content on the view origin, applied only while the
/// view is untouched (zoom 100%, pan at origin). Otherwise the current pan.
pub fn center_content_initially(set: &NodeSet<'_>, store: &PositionStore, view: &ViewTransform) -> Vec2 {
    match content_bounds(set, store) {
        Some(bounds) if view.is_untouched() => -bounds.center().to_vec2(),
        _ => view.pan,
    }
}

/// Nudge the targets of `moved`'s outgoing links part of the way toward
/// an evenly spread column one spacing step to its right. Incoming links
/// are left alone. Returns the ids that moved.
pub fn reorder_connected_nodes(
    moved: NodeId,
    links: &[Link],
    store: &mut PositionStore,
    spacing: Spacing,
    factor: f64,
) -> Vec<NodeId> {
    let Some(origin) = store.get(moved) else {
        return Vec::new();
    };
    let factor = factor.clamp(0.0, 1.0);
    let targets: Vec<NodeId> = links
        .iter()
        .filter(|l| l.source == moved && store.contains(l.target))
        .map(|l| l.target)
        .collect();

    let mid = (targets.len() as f64 - 1.0) / 2.0;
    for (i, &id) in targets.iter().enumerate() {
        let ideal = Point::new(origin.x + spacing.x, origin.y + (i as f64 - mid) * spacing.y);
        if let Some(current) = store.get(id) {
            store.set(id, current.lerp(ideal, factor));
        }
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeKind, VisualNode};
    use crate::style::{RendererRegistry, UniformSize};
    use pretty_assertions::assert_eq;

    fn leaf(id: &str, level: u32) -> VisualNode {
        VisualNode::new(id, id, NodeKind::Leaf, level)
    }

    /// lt_root → [lt_a → [lt_c], lt_b]
    fn sample_tree() -> NodeTree {
        let a = VisualNode::new("lt_a", "a", NodeKind::Object, 1).with_children(vec![leaf("lt_c", 2)]);
        let root = VisualNode::new("lt_root", "root", NodeKind::Root, 0).with_children(vec![a, leaf("lt_b", 1)]);
        NodeTree::from_roots(vec![root])
    }

    fn pos_of(positions: &[LayoutPosition], id: &str) -> Point {
        positions
            .iter()
            .find(|p| p.node_id.as_str() == id)
            .map(LayoutPosition::point)
            .unwrap_or_else(|| panic!("no position for {id}"))
    }

    fn layout(tree: &NodeTree, strategy: LayoutStrategy) -> Vec<LayoutPosition> {
        let order = tree.flatten();
        let sizes = UniformSize::default();
        let set = NodeSet::new(tree, &order, &sizes);
        let config = LayoutConfig {
            strategy,
            ..LayoutConfig::default()
        };
        calculate_layout(&set, &tree.links(), &config)
    }

    #[test]
    fn level_grid_columns_and_rows() {
        let tree = sample_tree();
        let positions = layout(&tree, LayoutStrategy::LevelGrid);
        assert_eq!(pos_of(&positions, "lt_root"), Point::new(40.0, 40.0));
        assert_eq!(pos_of(&positions, "lt_a"), Point::new(240.0, 40.0));
        assert_eq!(pos_of(&positions, "lt_b"), Point::new(240.0, 120.0));
        assert_eq!(pos_of(&positions, "lt_c"), Point::new(440.0, 40.0));
    }

    #[test]
    fn subtree_center_centers_parent_between_children() {
        let root = VisualNode::new("sc_root", "root", NodeKind::Root, 0)
            .with_children(vec![leaf("sc_1", 1), leaf("sc_2", 1)]);
        let tree = NodeTree::from_roots(vec![root]);
        let positions = layout(&tree, LayoutStrategy::SubtreeCenter);
        assert_eq!(pos_of(&positions, "sc_1"), Point::new(240.0, 100.0));
        assert_eq!(pos_of(&positions, "sc_2"), Point::new(240.0, 160.0));
        assert_eq!(pos_of(&positions, "sc_root"), Point::new(40.0, 130.0));
    }

    #[test]
    fn tree_packing_slots_by_extent() {
        let tree = sample_tree();
        let positions = layout(&tree, LayoutStrategy::TreePacking);
        // Extents: c=40, a=40, b=40, root=100. Slots: a@40, b@100.
        assert_eq!(pos_of(&positions, "lt_c"), Point::new(440.0, 40.0));
        assert_eq!(pos_of(&positions, "lt_a"), Point::new(240.0, 40.0));
        assert_eq!(pos_of(&positions, "lt_b"), Point::new(240.0, 100.0));
        assert_eq!(pos_of(&positions, "lt_root"), Point::new(40.0, 70.0));
    }

    #[test]
    fn tree_packing_keeps_subtrees_apart() {
        let big = VisualNode::new("tp_big", "big", NodeKind::Object, 1)
            .with_children(vec![leaf("tp_x", 2), leaf("tp_y", 2), leaf("tp_z", 2)]);
        let root = VisualNode::new("tp_root", "root", NodeKind::Root, 0).with_children(vec![big, leaf("tp_small", 1)]);
        let tree = NodeTree::from_roots(vec![root]);
        let positions = layout(&tree, LayoutStrategy::TreePacking);

        // big's slot is 160 tall, so small starts below it.
        assert_eq!(pos_of(&positions, "tp_x").y, 40.0);
        assert_eq!(pos_of(&positions, "tp_z").y, 160.0);
        assert_eq!(pos_of(&positions, "tp_big").y, 100.0);
        assert_eq!(pos_of(&positions, "tp_small").y, 220.0);
        assert_eq!(pos_of(&positions, "tp_root").y, 160.0);
    }

    #[test]
    fn layouts_are_idempotent() {
        let tree = sample_tree();
        for strategy in [LayoutStrategy::LevelGrid, LayoutStrategy::SubtreeCenter, LayoutStrategy::TreePacking] {
            assert_eq!(layout(&tree, strategy), layout(&tree, strategy), "{strategy:?}");
        }
    }

    #[test]
    fn empty_and_single_node_trees() {
        let empty = NodeTree::new();
        let single = NodeTree::from_roots(vec![leaf("lt_single", 0)]);
        for strategy in [LayoutStrategy::LevelGrid, LayoutStrategy::SubtreeCenter, LayoutStrategy::TreePacking] {
            assert!(layout(&empty, strategy).is_empty());
            assert_eq!(
                layout(&single, strategy),
                vec![LayoutPosition::new(NodeId::intern("lt_single"), 40.0, 40.0)],
                "{strategy:?}"
            );
        }
    }

    #[test]
    fn unknown_positions_are_ignored() {
        let tree = sample_tree();
        let mut store = PositionStore::new();
        let positions = vec![
            LayoutPosition::new(NodeId::intern("lt_a"), 1.0, 2.0),
            LayoutPosition::new(NodeId::intern("lt_nowhere"), 3.0, 4.0),
        ];
        apply_positions_to_nodes(&tree, &positions, &mut store);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(NodeId::intern("lt_a")), Some(Point::new(1.0, 2.0)));
    }

    #[test]
    fn centering_uses_default_box_for_unstyled_nodes() {
        let root = VisualNode::new("cc_root", "r", NodeKind::Root, 0).with_children(vec![leaf("cc_leaf", 1)]);
        let tree = NodeTree::from_roots(vec![root]);
        let order = tree.flatten();
        let registry = RendererRegistry::new(Vec::new());
        let set = NodeSet::new(&tree, &order, &registry);
        let mut store = PositionStore::new();
        store.set(NodeId::intern("cc_root"), Point::new(0.0, 0.0));
        store.set(NodeId::intern("cc_leaf"), Point::new(200.0, 100.0));

        // Bounds (0,0)-(360,140).
        let pan = center_content_initially(&set, &store, &ViewTransform::default());
        assert_eq!(pan, Vec2::new(-180.0, -70.0));

        let touched = ViewTransform {
            pan: Vec2::ZERO,
            zoom: 150.0,
        };
        assert_eq!(center_content_initially(&set, &store, &touched), Vec2::ZERO);
        assert_eq!(
            center_content_initially(&set, &PositionStore::new(), &ViewTransform::default()),
            Vec2::ZERO
        );
    }

    #[test]
    fn reorder_nudges_outgoing_neighbors_only() {
        let (p, c1, c2, gp) = (
            NodeId::intern("ro_parent"),
            NodeId::intern("ro_c1"),
            NodeId::intern("ro_c2"),
            NodeId::intern("ro_grand"),
        );
        let links = vec![Link::new(gp, p), Link::new(p, c1), Link::new(p, c2)];
        let mut store = PositionStore::new();
        store.set(p, Point::ZERO);
        store.set(c1, Point::new(500.0, 500.0));
        store.set(c2, Point::new(500.0, 500.0));
        store.set(gp, Point::new(-300.0, 0.0));

        let moved = reorder_connected_nodes(p, &links, &mut store, Spacing { x: 200.0, y: 80.0 }, 0.3);
        assert_eq!(moved, vec![c1, c2]);

        let close = |a: Point, b: Point| (a - b).hypot() < 1e-9;
        assert!(close(store.get(c1).unwrap(), Point::new(410.0, 338.0)));
        assert!(close(store.get(c2).unwrap(), Point::new(410.0, 362.0)));
        assert_eq!(store.get(gp), Some(Point::new(-300.0, 0.0)));
    }
}
