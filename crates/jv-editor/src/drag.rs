//! Node drag controller.
//!
//! Pointer moves only record the latest content-space pointer; all work
//! happens once per animation frame in [`DragController::on_frame`]:
//!
//! 1. candidate = pointer − grab offset
//! 2. past the initial delay, and at most once per collision interval,
//!    resolve the candidate against the other nodes and refresh the
//!    highlight set (highlights persist between checks)
//! 3. move part of the way from the last committed position
//! 4. commit to the position store; flag a link refresh when its throttle
//!    allows

use crate::frame::{FrameSlot, Throttle};
use crate::input::primary_held;
use jv_core::collision::{CollisionEngine, NodeSet};
use jv_core::config::DragConfig;
use jv_core::id::NodeId;
use jv_core::positions::PositionStore;
use kurbo::{Point, Vec2};
use smallvec::SmallVec;

/// What one drag frame did.
#[derive(Debug, Clone, PartialEq)]
pub struct DragFrame {
    pub node: NodeId,
    /// Committed content-space origin.
    pub position: Point,
    /// Incident links should be re-routed this frame.
    pub refresh_links: bool,
    /// A collision check ran this frame.
    pub checked_collisions: bool,
}

#[derive(Debug, Clone)]
struct DragSession {
    node: NodeId,
    /// Pointer minus node origin at press time.
    offset: Vec2,
    started_at: f64,
    pending: FrameSlot<Point>,
    last_committed: Option<Point>,
    collision_throttle: Throttle,
    link_throttle: Throttle,
    highlighted: SmallVec<[NodeId; 8]>,
}

#[derive(Debug, Clone)]
pub struct DragController {
    config: DragConfig,
    smoothing: f64,
    session: Option<DragSession>,
}

impl DragController {
    pub fn new(config: &DragConfig) -> Self {
        let smoothing = if config.smoothing > 0.0 && config.smoothing <= 1.0 {
            config.smoothing
        } else {
            DragConfig::default().smoothing
        };
        Self {
            config: config.clone(),
            smoothing,
            session: None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    pub fn dragged(&self) -> Option<NodeId> {
        self.session.as_ref().map(|s| s.node)
    }

    /// Nodes the dragged node overlapped at the last collision check.
    pub fn highlighted(&self) -> &[NodeId] {
        match &self.session {
            Some(s) => &s.highlighted,
            None => &[],
        }
    }

    /// A frame is waiting to process a pointer move.
    pub fn has_pending_frame(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.pending.is_pending())
    }

    /// Start dragging `node`, grabbed at content point `pointer` while its
    /// origin sits at `origin`.
    pub fn begin(&mut self, node: NodeId, pointer: Point, origin: Point, now_ms: f64) {
        log::debug!("drag start {node} at ({}, {})", origin.x, origin.y);
        self.session = Some(DragSession {
            node,
            offset: pointer - origin,
            started_at: now_ms,
            pending: FrameSlot::new(),
            last_committed: None,
            collision_throttle: Throttle::new(self.config.collision_interval_ms),
            link_throttle: Throttle::new(self.config.link_refresh_interval_ms),
            highlighted: SmallVec::new(),
        });
    }

    /// Where the node would go for content pointer `pointer`, before
    /// collision handling and smoothing.
    pub fn candidate(&self, pointer: Point) -> Option<Point> {
        self.session.as_ref().map(|s| pointer - s.offset)
    }

    /// Record a pointer move. Returns `false` when there is no drag or the
    /// primary button is no longer held; the caller should end the drag.
    pub fn pointer_move(&mut self, pointer: Point, buttons: u16) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if !primary_held(buttons) {
            return false;
        }
        if session.pending.schedule(pointer) {
            log::trace!("drag frame superseded");
        }
        true
    }

    /// Process the pending pointer move, if any.
    pub fn on_frame(
        &mut self,
        now_ms: f64,
        engine: &CollisionEngine,
        set: &NodeSet<'_>,
        store: &mut PositionStore,
    ) -> Option<DragFrame> {
        let session = self.session.as_mut()?;
        let pointer = session.pending.take()?;
        let idx = set.tree.index_of(session.node)?;
        let candidate = pointer - session.offset;

        let mut target = candidate;
        let checked = now_ms - session.started_at > self.config.initial_delay_ms
            && session.collision_throttle.try_fire(now_ms);
        if checked {
            target = engine.find_valid_position(set, store, idx, candidate);
            session.highlighted = engine.highlight_collisions(set, store, idx, candidate);
        }

        let position = match session.last_committed {
            Some(last) => last.lerp(target, self.smoothing),
            None => target,
        };
        store.set(session.node, position);
        session.last_committed = Some(position);

        Some(DragFrame {
            node: session.node,
            position,
            refresh_links: session.link_throttle.try_fire(now_ms),
            checked_collisions: checked,
        })
    }

    /// Finish the drag. Pending moves are discarded and highlights cleared.
    pub fn end(&mut self) -> Option<NodeId> {
        let session = self.session.take()?;
        log::debug!("drag end {}", session.node);
        Some(session.node)
    }
}
