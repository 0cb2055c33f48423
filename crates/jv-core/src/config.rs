//! Visualizer configuration.
//!
//! Every option is optional in the serialized form; missing fields take the
//! documented defaults. Nonsensical values (negative spacing, inverted zoom
//! range) are sanitized by the accessor methods instead of being rejected.

use crate::error::VisualizerError;
use serde::{Deserialize, Serialize};

// ─── Layout ───────────────────────────────────────────────────────────────

/// Which layout strategy seeds node positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LayoutStrategy {
    /// Column per tree level, rows by order within the level.
    #[default]
    LevelGrid,
    /// Each parent centered between its first and last child, fixed row height.
    SubtreeCenter,
    /// Two-pass packing by measured subtree extent.
    TreePacking,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spacing {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Padding {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Padding {
    pub const fn uniform(v: f64) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Distance between columns (x) and rows (y). Default: **200 × 80**.
    pub node_spacing: Spacing,
    /// Content padding. Default: **40** on every side.
    pub padding: Padding,
    /// Default: **level grid**.
    pub strategy: LayoutStrategy,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_spacing: Spacing { x: 200.0, y: 80.0 },
            padding: Padding::uniform(40.0),
            strategy: LayoutStrategy::LevelGrid,
        }
    }
}

impl LayoutConfig {
    /// Node spacing with non-positive components replaced by the defaults.
    pub fn spacing(&self) -> Spacing {
        let d = Self::default().node_spacing;
        Spacing {
            x: positive_or(self.node_spacing.x, d.x),
            y: positive_or(self.node_spacing.y, d.y),
        }
    }
}

// ─── Collision ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CollisionConfig {
    /// Minimum clearance between node boxes. Default: **15**.
    pub margin: f64,
    /// Drag targets snap to this grid; `0` disables snapping. Default: **10**.
    pub grid_size: f64,
    /// Cap on full relaxation passes. Default: **100**.
    pub max_iterations: usize,
    /// Seed for the fallback jitter. `None` seeds from entropy, which makes
    /// degraded layouts differ between runs.
    pub jitter_seed: Option<u64>,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            margin: 15.0,
            grid_size: 10.0,
            max_iterations: 100,
            jitter_seed: None,
        }
    }
}

// ─── Drag ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DragConfig {
    /// Minimum time between collision checks while dragging. Default: **50 ms**.
    pub collision_interval_ms: f64,
    /// No collision checks this soon after the press. Default: **100 ms**.
    pub initial_delay_ms: f64,
    /// Fraction of the way each frame moves toward the new candidate.
    /// `1.0` disables smoothing. Default: **0.3**.
    pub smoothing: f64,
    /// Minimum time between incident-link refreshes. Default: **100 ms**.
    pub link_refresh_interval_ms: f64,
    /// Nudge outgoing neighbors after a drop. Default: **true**.
    pub reorder_neighbors: bool,
    /// Interpolation factor for the neighbor nudge. Default: **0.3**.
    pub reorder_factor: f64,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            collision_interval_ms: 50.0,
            initial_delay_ms: 100.0,
            smoothing: 0.3,
            link_refresh_interval_ms: 100.0,
            reorder_neighbors: true,
            reorder_factor: 0.3,
        }
    }
}

// ─── Momentum ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MomentumConfig {
    /// Per-frame velocity multiplier. Default: **0.92**.
    pub decay: f64,
    /// Momentum stops once both components fall to this. Default: **0.1**.
    pub min_velocity: f64,
    /// Pan samples older than this are dropped. Default: **100 ms**.
    pub history_window_ms: f64,
    /// Cap on the time-based velocity scale. Default: **2.0**.
    pub max_velocity_scale: f64,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            decay: 0.92,
            min_velocity: 0.1,
            history_window_ms: 100.0,
            max_velocity_scale: 2.0,
        }
    }
}

impl MomentumConfig {
    /// Decay factor forced into `(0, 1)` so momentum always terminates.
    pub fn decay_factor(&self) -> f64 {
        if self.decay > 0.0 && self.decay < 1.0 {
            self.decay
        } else {
            Self::default().decay
        }
    }

    /// Stop threshold, forced positive so a decaying fling always stops.
    pub fn min_velocity(&self) -> f64 {
        positive_or(self.min_velocity, Self::default().min_velocity)
    }

    /// Cap on the release velocity scale, forced positive so a fling never
    /// runs against the gesture.
    pub fn max_velocity_scale(&self) -> f64 {
        positive_or(self.max_velocity_scale, Self::default().max_velocity_scale)
    }

    /// History window; an empty window would never fling.
    pub fn history_window_ms(&self) -> f64 {
        positive_or(self.history_window_ms, Self::default().history_window_ms)
    }
}

// ─── Top level ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: f64,
    pub height: f64,
}

impl Default for ViewportSize {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VisualizerConfig {
    /// Default: **true**.
    pub enable_panning: bool,
    /// Default: **true**.
    pub enable_zooming: bool,
    /// Default: **true**.
    pub enable_dragging: bool,
    /// Multiplies pointer deltas while panning. Default: **1.0**.
    pub pan_speed_multiplier: f64,
    /// Multiplies wheel and button zoom steps. Default: **1.0**.
    pub zoom_speed_multiplier: f64,
    /// Zoom range in percent. Default: **10 – 1000**.
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub layout: LayoutConfig,
    pub collision: CollisionConfig,
    pub drag: DragConfig,
    pub momentum: MomentumConfig,
    /// How long the zoom indicator stays up. Default: **800 ms**.
    pub zoom_indicator_ms: f64,
    /// Transform depth limit; deeper values become truncated leaves.
    pub max_depth: Option<u32>,
    pub viewport: ViewportSize,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            enable_panning: true,
            enable_zooming: true,
            enable_dragging: true,
            pan_speed_multiplier: 1.0,
            zoom_speed_multiplier: 1.0,
            min_zoom: 10.0,
            max_zoom: 1000.0,
            layout: LayoutConfig::default(),
            collision: CollisionConfig::default(),
            drag: DragConfig::default(),
            momentum: MomentumConfig::default(),
            zoom_indicator_ms: 800.0,
            max_depth: None,
            viewport: ViewportSize::default(),
        }
    }
}

impl VisualizerConfig {
    /// Parse a (possibly partial) JSON configuration.
    ///
    /// # Errors
    /// Returns [`VisualizerError::InvalidJson`] if the text is not valid JSON
    /// or a field has the wrong type.
    pub fn from_json(text: &str) -> Result<Self, VisualizerError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Preset for collection-shaped data: wide spacing, subtree-centered tree.
    pub fn hierarchical() -> Self {
        Self {
            layout: LayoutConfig {
                node_spacing: Spacing { x: 280.0, y: 120.0 },
                padding: Padding::uniform(40.0),
                strategy: LayoutStrategy::SubtreeCenter,
            },
            ..Self::default()
        }
    }

    /// Zoom range, normalized so that `0 < min <= max`.
    pub fn zoom_bounds(&self) -> (f64, f64) {
        let d = Self::default();
        let min = positive_or(self.min_zoom, d.min_zoom);
        let max = positive_or(self.max_zoom, d.max_zoom);
        if min <= max { (min, max) } else { (max, min) }
    }

    pub fn pan_speed(&self) -> f64 {
        positive_or(self.pan_speed_multiplier, 1.0)
    }

    pub fn zoom_speed(&self) -> f64 {
        positive_or(self.zoom_speed_multiplier, 1.0)
    }
}

fn positive_or(v: f64, fallback: f64) -> f64 {
    if v.is_finite() && v > 0.0 { v } else { fallback }
}
