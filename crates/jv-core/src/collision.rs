//! Geometry and collision engine.
//!
//! Plain AABB tests over the flattened node list. Positions come from the
//! [`PositionStore`] and sizes from a [`SizeSource`], queried on every
//! check. Traversal order breaks ties, so runs on the same input converge
//! to the same layout (given a seeded jitter RNG).

use crate::config::CollisionConfig;
use crate::id::NodeId;
use crate::model::NodeTree;
use crate::positions::PositionStore;
use crate::style::SizeSource;
use kurbo::{Point, Rect, Size};
use petgraph::graph::NodeIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smallvec::SmallVec;

/// Extra horizontal gap used by the relaxation fallback.
const FALLBACK_GAP: f64 = 20.0;
/// Half-range of the fallback's vertical jitter.
const FALLBACK_JITTER: f64 = 50.0;

/// Whether two boxes come closer than `margin` on both axes.
///
/// Boxes exactly `margin` apart do not overlap.
pub fn rectangles_overlap(a: Rect, b: Rect, margin: f64) -> bool {
    !(a.x1 + margin <= b.x0 || b.x1 + margin <= a.x0 || a.y1 + margin <= b.y0 || b.y1 + margin <= a.y0)
}

/// The working set for collision checks: nodes in traversal order plus the
/// size lookup to use for them.
#[derive(Clone, Copy)]
pub struct NodeSet<'a> {
    pub tree: &'a NodeTree,
    pub order: &'a [NodeIndex],
    pub sizes: &'a dyn SizeSource,
}

impl<'a> NodeSet<'a> {
    pub fn new(tree: &'a NodeTree, order: &'a [NodeIndex], sizes: &'a dyn SizeSource) -> Self {
        Self { tree, order, sizes }
    }

    pub fn id(&self, idx: NodeIndex) -> NodeId {
        self.tree.node(idx).id
    }

    pub fn size(&self, idx: NodeIndex) -> Size {
        self.sizes.size_of(self.tree.node(idx))
    }

    /// Current box of `idx`, if it has a position.
    pub fn rect(&self, store: &PositionStore, idx: NodeIndex) -> Option<Rect> {
        store.rect_of(self.id(idx), self.size(idx))
    }
}

/// Result of a relaxation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelaxationOutcome {
    /// Full passes performed.
    pub iterations: usize,
    /// `false` when the iteration cap was hit with overlaps remaining.
    pub converged: bool,
}

#[derive(Debug, Clone)]
pub struct CollisionEngine {
    margin: f64,
    grid_size: f64,
    max_iterations: usize,
    rng: StdRng,
}

impl CollisionEngine {
    pub fn new(config: &CollisionConfig) -> Self {
        let rng = match config.jitter_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            margin: config.margin.max(0.0),
            grid_size: config.grid_size,
            max_iterations: config.max_iterations.max(1),
            rng,
        }
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }

    /// Round `p` to the snapping grid. A non-positive grid disables snapping.
    pub fn snap(&self, p: Point) -> Point {
        let g = self.grid_size;
        if g > 0.0 && g.is_finite() {
            Point::new((p.x / g).round() * g, (p.y / g).round() * g)
        } else {
            p
        }
    }

    /// Whether `node` placed at `at` clears every other positioned node.
    pub fn is_position_valid(&self, set: &NodeSet<'_>, store: &PositionStore, node: NodeIndex, at: Point) -> bool {
        let rect = Rect::from_origin_size(at, set.size(node));
        set.order
            .iter()
            .filter(|&&other| other != node)
            .filter_map(|&other| set.rect(store, other))
            .all(|other| !rectangles_overlap(rect, other, self.margin))
    }

    /// Nearest of the eight canonical placements around `obstacle` that is
    /// valid against all other nodes, or `None` if every one collides.
    pub fn find_closest_valid_position(
        &self,
        set: &NodeSet<'_>,
        store: &PositionStore,
        node: NodeIndex,
        target: Point,
        obstacle: Rect,
    ) -> Option<Point> {
        let size = set.size(node);
        let m = self.margin;
        let right = obstacle.x1 + m;
        let left = obstacle.x0 - size.width - m;
        let below = obstacle.y1 + m;
        let above = obstacle.y0 - size.height - m;
        let candidates = [
            Point::new(right, target.y),
            Point::new(left, target.y),
            Point::new(target.x, below),
            Point::new(target.x, above),
            Point::new(right, below),
            Point::new(left, above),
            Point::new(right, above),
            Point::new(left, below),
        ];

        let mut best: Option<(f64, Point)> = None;
        for pos in candidates {
            let d = pos.distance(target);
            if best.is_none_or(|(bd, _)| d < bd) && self.is_position_valid(set, store, node, pos) {
                best = Some((d, pos));
            }
        }
        best.map(|(_, p)| p)
    }

    /// Position for `node` dragged to `target`: the snapped target when it
    /// is free, else the nearest canonical placement around the first node
    /// it hits. Falls back to the snapped target when nothing is free.
    pub fn find_valid_position(&self, set: &NodeSet<'_>, store: &PositionStore, node: NodeIndex, target: Point) -> Point {
        let snapped = self.snap(target);
        let rect = Rect::from_origin_size(snapped, set.size(node));
        let hit = set
            .order
            .iter()
            .filter(|&&other| other != node)
            .filter_map(|&other| set.rect(store, other))
            .find(|other| rectangles_overlap(rect, *other, self.margin));

        match hit {
            Some(obstacle) => self
                .find_closest_valid_position(set, store, node, snapped, obstacle)
                .unwrap_or(snapped),
            None => snapped,
        }
    }

    /// Ids of the nodes `node` would overlap at `target`. Read-only.
    pub fn highlight_collisions(
        &self,
        set: &NodeSet<'_>,
        store: &PositionStore,
        node: NodeIndex,
        target: Point,
    ) -> SmallVec<[NodeId; 8]> {
        let rect = Rect::from_origin_size(target, set.size(node));
        set.order
            .iter()
            .filter(|&&other| other != node)
            .filter_map(|&other| Some((set.id(other), set.rect(store, other)?)))
            .filter(|(_, other)| rectangles_overlap(rect, *other, self.margin))
            .map(|(id, _)| id)
            .collect()
    }

    /// Pairwise relaxation until a full pass finds no overlap or the
    /// iteration cap is hit. For each overlapping pair the later node moves.
    pub fn resolve_initial_collisions(&mut self, set: &NodeSet<'_>, store: &mut PositionStore) -> RelaxationOutcome {
        let mut iterations = 0;
        let mut has_collisions = true;

        while has_collisions && iterations < self.max_iterations {
            has_collisions = false;
            iterations += 1;

            for (i, &a) in set.order.iter().enumerate() {
                for &b in &set.order[i + 1..] {
                    // A may itself have moved earlier in this pass.
                    let Some(rect_a) = set.rect(store, a) else {
                        break;
                    };
                    let Some(rect_b) = set.rect(store, b) else {
                        continue;
                    };
                    if !rectangles_overlap(rect_a, rect_b, self.margin) {
                        continue;
                    }
                    has_collisions = true;

                    let moved = self
                        .find_closest_valid_position(set, store, b, rect_b.origin(), rect_a)
                        .unwrap_or_else(|| {
                            let jitter = self.rng.gen_range(-FALLBACK_JITTER..FALLBACK_JITTER);
                            Point::new(rect_a.x1 + self.margin + FALLBACK_GAP, rect_a.y0 + jitter)
                        });
                    store.set(set.id(b), moved);
                }
            }
        }

        let converged = !has_collisions;
        if converged {
            log::debug!("collision relaxation converged after {iterations} passes");
        } else {
            log::warn!("collision relaxation hit the iteration cap ({iterations}); overlaps may remain");
        }
        RelaxationOutcome { iterations, converged }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeKind, VisualNode};
    use crate::style::UniformSize;

    fn flat_tree(n: usize) -> NodeTree {
        let children = (1..n)
            .map(|i| VisualNode::new(&format!("cd_{i}"), format!("n{i}"), NodeKind::Leaf, 1))
            .collect();
        let root = VisualNode::new("cd_0", "root", NodeKind::Root, 0).with_children(children);
        NodeTree::from_roots(vec![root])
    }

    fn engine(seed: u64) -> CollisionEngine {
        CollisionEngine::new(&CollisionConfig {
            jitter_seed: Some(seed),
            ..CollisionConfig::default()
        })
    }

    fn assert_no_overlaps(set: &NodeSet<'_>, store: &PositionStore, margin: f64) {
        for (i, &a) in set.order.iter().enumerate() {
            for &b in &set.order[i + 1..] {
                let (ra, rb) = (set.rect(store, a).unwrap(), set.rect(store, b).unwrap());
                assert!(
                    !rectangles_overlap(ra, rb, margin),
                    "{} at {ra:?} overlaps {} at {rb:?}",
                    set.id(a),
                    set.id(b)
                );
            }
        }
    }

    #[test]
    fn boxes_exactly_margin_apart_are_valid() {
        let a = Rect::new(0.0, 0.0, 160.0, 40.0);
        let touching = Rect::new(0.0, 55.0, 160.0, 95.0);
        let closer = Rect::new(0.0, 54.9, 160.0, 94.9);
        assert!(!rectangles_overlap(a, touching, 15.0));
        assert!(rectangles_overlap(a, closer, 15.0));
        assert!(!rectangles_overlap(a, Rect::new(160.0, 0.0, 320.0, 40.0), 0.0));
    }

    #[test]
    fn two_stacked_nodes_separate_below() {
        let tree = flat_tree(2);
        let order = tree.flatten();
        let sizes = UniformSize::default();
        let set = NodeSet::new(&tree, &order, &sizes);
        let mut store = PositionStore::new();
        store.set(set.id(order[0]), Point::ZERO);
        store.set(set.id(order[1]), Point::ZERO);

        let outcome = engine(1).resolve_initial_collisions(&set, &mut store);
        assert_eq!(outcome, RelaxationOutcome { iterations: 2, converged: true });
        assert_eq!(store.get(set.id(order[0])), Some(Point::ZERO));
        // "below" is the first of the two nearest (55 away) canonical offsets.
        assert_eq!(store.get(set.id(order[1])), Some(Point::new(0.0, 55.0)));
        assert_no_overlaps(&set, &store, 15.0);
    }

    #[test]
    fn nodes_at_origin_still_participate() {
        let tree = flat_tree(2);
        let order = tree.flatten();
        let sizes = UniformSize::default();
        let set = NodeSet::new(&tree, &order, &sizes);
        let mut store = PositionStore::new();
        store.set(set.id(order[0]), Point::new(0.0, 100.0));
        store.set(set.id(order[1]), Point::new(0.0, 110.0));

        let outcome = engine(2).resolve_initial_collisions(&set, &mut store);
        assert!(outcome.converged);
        assert_no_overlaps(&set, &store, 15.0);
    }

    #[test]
    fn pile_of_nodes_relaxes_without_overlap() {
        let tree = flat_tree(8);
        let order = tree.flatten();
        let sizes = UniformSize::default();
        let set = NodeSet::new(&tree, &order, &sizes);
        let mut store = PositionStore::new();
        for &idx in &order {
            store.set(set.id(idx), Point::new(40.0, 40.0));
        }

        let outcome = engine(7).resolve_initial_collisions(&set, &mut store);
        assert!(outcome.converged, "relaxation did not converge: {outcome:?}");
        assert_no_overlaps(&set, &store, 15.0);
    }

    #[test]
    fn same_seed_gives_same_layout() {
        let tree = flat_tree(12);
        let order = tree.flatten();
        let sizes = UniformSize::default();
        let set = NodeSet::new(&tree, &order, &sizes);
        let run = |seed| {
            let mut store = PositionStore::new();
            for &idx in &order {
                store.set(set.id(idx), Point::new(0.0, 0.0));
            }
            engine(seed).resolve_initial_collisions(&set, &mut store);
            order.iter().map(|&i| store.get(set.id(i))).collect::<Vec<_>>()
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn unpositioned_nodes_are_ignored() {
        let tree = flat_tree(3);
        let order = tree.flatten();
        let sizes = UniformSize::default();
        let set = NodeSet::new(&tree, &order, &sizes);
        let mut store = PositionStore::new();
        store.set(set.id(order[0]), Point::ZERO);
        store.set(set.id(order[2]), Point::new(0.0, 200.0));

        let outcome = engine(3).resolve_initial_collisions(&set, &mut store);
        assert_eq!(outcome.iterations, 1);
        assert!(!store.contains(set.id(order[1])));
    }

    #[test]
    fn drag_target_snaps_when_free() {
        let tree = flat_tree(2);
        let order = tree.flatten();
        let sizes = UniformSize::default();
        let set = NodeSet::new(&tree, &order, &sizes);
        let mut store = PositionStore::new();
        store.set(set.id(order[0]), Point::ZERO);
        store.set(set.id(order[1]), Point::new(400.0, 0.0));

        let e = engine(0);
        let p = e.find_valid_position(&set, &store, order[1], Point::new(403.0, 96.0));
        assert_eq!(p, Point::new(400.0, 100.0));
    }

    #[test]
    fn drag_onto_obstacle_moves_to_nearest_side() {
        let tree = flat_tree(2);
        let order = tree.flatten();
        let sizes = UniformSize::default();
        let set = NodeSet::new(&tree, &order, &sizes);
        let mut store = PositionStore::new();
        store.set(set.id(order[0]), Point::ZERO);
        store.set(set.id(order[1]), Point::new(400.0, 0.0));

        let e = engine(0);
        // Snapped to (150, 10): right of the obstacle is 25 away.
        let p = e.find_valid_position(&set, &store, order[1], Point::new(148.0, 12.0));
        assert_eq!(p, Point::new(175.0, 10.0));
        assert!(e.is_position_valid(&set, &store, order[1], p));
    }

    #[test]
    fn highlight_reports_overlapped_ids() {
        let tree = flat_tree(3);
        let order = tree.flatten();
        let sizes = UniformSize::default();
        let set = NodeSet::new(&tree, &order, &sizes);
        let mut store = PositionStore::new();
        store.set(set.id(order[0]), Point::ZERO);
        store.set(set.id(order[1]), Point::new(0.0, 300.0));
        store.set(set.id(order[2]), Point::new(500.0, 0.0));

        let hits = engine(0).highlight_collisions(&set, &store, order[2], Point::new(20.0, 20.0));
        assert_eq!(hits.as_slice(), &[set.id(order[0])]);
        // Nothing moved.
        assert_eq!(store.get(set.id(order[2])), Some(Point::new(500.0, 0.0)));
    }
}
