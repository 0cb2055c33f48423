//! Pan/zoom controller.
//!
//! Owns the view transform. Panning is a small state machine:
//!
//! ```text
//! Idle ──press──▶ Panning ──release (fast)──▶ Momentum ──decayed──▶ Idle
//!                    │  └──release (slow)──▶ Idle
//!                    └──leave──▶ Idle (no fling)
//! ```
//!
//! A new press cancels momentum. Zoom is independent of the pan state and
//! always keeps the content point under the anchor fixed.

use crate::frame::Timer;
use jv_core::config::{MomentumConfig, ViewportSize, VisualizerConfig};
use jv_core::view::{DEFAULT_ZOOM, ViewTransform};
use kurbo::{Point, Vec2};

/// Zoom step (percent points) of the zoom buttons at speed 1.
const BUTTON_ZOOM_STEP: f64 = 10.0;
/// Zoom step (percent points) of one wheel notch at speed 1.
const WHEEL_ZOOM_STEP: f64 = 1.0;

/// One pointer-move contribution to the pan, for the velocity estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanSample {
    pub delta: Vec2,
    pub time: f64,
}

#[derive(Debug, Clone, PartialEq)]
enum PanPhase {
    Idle,
    Panning { last: Point, history: Vec<PanSample> },
    Momentum { velocity: Vec2 },
}

/// Release velocity from the retained pan history.
///
/// Averages the deltas of samples with a positive gap to their predecessor
/// over the whole history, then scales by `100 / elapsed`, capped at
/// [`MomentumConfig::max_velocity_scale`]. Fewer than two samples means no fling.
pub fn release_velocity(history: &[PanSample], config: &MomentumConfig) -> Vec2 {
    if history.len() < 2 {
        return Vec2::ZERO;
    }
    let mut total = Vec2::ZERO;
    let mut elapsed = 0.0;
    for pair in history.windows(2) {
        let dt = pair[1].time - pair[0].time;
        if dt > 0.0 {
            total += pair[1].delta;
            elapsed += dt;
        }
    }
    if elapsed <= 0.0 {
        return Vec2::ZERO;
    }
    let scale = (100.0 / elapsed).min(config.max_velocity_scale());
    total / history.len() as f64 * scale
}

#[derive(Debug, Clone)]
pub struct PanZoomController {
    view: ViewTransform,
    phase: PanPhase,
    indicator: Timer,
    min_zoom: f64,
    max_zoom: f64,
    pan_speed: f64,
    zoom_speed: f64,
    enable_zooming: bool,
    momentum: MomentumConfig,
    indicator_ms: f64,
    viewport: ViewportSize,
}

impl PanZoomController {
    pub fn new(config: &VisualizerConfig) -> Self {
        let (min_zoom, max_zoom) = config.zoom_bounds();
        Self {
            view: ViewTransform::default(),
            phase: PanPhase::Idle,
            indicator: Timer::new(),
            min_zoom,
            max_zoom,
            pan_speed: config.pan_speed(),
            zoom_speed: config.zoom_speed(),
            enable_zooming: config.enable_zooming,
            momentum: config.momentum.clone(),
            indicator_ms: config.zoom_indicator_ms,
            viewport: config.viewport,
        }
    }

    pub fn view(&self) -> ViewTransform {
        self.view
    }

    pub fn zoom(&self) -> f64 {
        self.view.zoom
    }

    pub fn pan(&self) -> Vec2 {
        self.view.pan
    }

    pub fn set_pan(&mut self, pan: Vec2) {
        self.view.pan = pan;
    }

    pub fn set_viewport(&mut self, viewport: ViewportSize) {
        self.viewport = viewport;
    }

    pub fn is_panning(&self) -> bool {
        matches!(self.phase, PanPhase::Panning { .. })
    }

    pub fn has_momentum(&self) -> bool {
        matches!(self.phase, PanPhase::Momentum { .. })
    }

    /// Current momentum velocity, zero when not coasting.
    pub fn velocity(&self) -> Vec2 {
        match self.phase {
            PanPhase::Momentum { velocity } => velocity,
            _ => Vec2::ZERO,
        }
    }

    // ─── Pan gesture ─────────────────────────────────────────────────────

    /// Start panning at view point `p`. Cancels any momentum.
    pub fn begin_pan(&mut self, p: Point) {
        if self.has_momentum() {
            log::debug!("momentum cancelled by new pan");
        }
        log::debug!("pan start at ({}, {})", p.x, p.y);
        self.phase = PanPhase::Panning {
            last: p,
            history: Vec::new(),
        };
    }

    /// Apply a pointer move while panning. Returns `false` when not panning.
    pub fn pan_move(&mut self, p: Point, now_ms: f64) -> bool {
        let PanPhase::Panning { last, history } = &mut self.phase else {
            return false;
        };
        let delta = (p - *last) * self.pan_speed;
        self.view.pan += delta;
        *last = p;

        history.push(PanSample { delta, time: now_ms });
        let cutoff = now_ms - self.momentum.history_window_ms();
        history.retain(|s| s.time > cutoff);
        true
    }

    /// Release: start momentum if the recent motion was fast enough.
    /// Returns `true` if momentum started.
    pub fn end_pan(&mut self) -> bool {
        let PanPhase::Panning { history, .. } = &self.phase else {
            return false;
        };
        let velocity = release_velocity(history, &self.momentum);
        let min = self.momentum.min_velocity();
        if velocity.x.abs() > min || velocity.y.abs() > min {
            log::debug!("pan end, momentum start v=({:.2}, {:.2})", velocity.x, velocity.y);
            self.phase = PanPhase::Momentum { velocity };
            true
        } else {
            log::debug!("pan end");
            self.phase = PanPhase::Idle;
            false
        }
    }

    /// Pointer left the surface: stop without momentum.
    pub fn cancel_pan(&mut self) {
        if self.is_panning() {
            log::debug!("pan cancelled (pointer left)");
            self.phase = PanPhase::Idle;
        }
    }

    pub fn cancel_momentum(&mut self) {
        if self.has_momentum() {
            log::debug!("momentum cancelled");
            self.phase = PanPhase::Idle;
        }
    }

    /// Advance momentum by one animation frame. Returns `true` while more
    /// frames are wanted.
    pub fn on_frame(&mut self) -> bool {
        let PanPhase::Momentum { velocity } = &mut self.phase else {
            return false;
        };
        *velocity *= self.momentum.decay_factor();
        self.view.pan += *velocity;
        log::trace!("momentum step v=({:.3}, {:.3})", velocity.x, velocity.y);

        let min = self.momentum.min_velocity();
        if velocity.x.abs() > min || velocity.y.abs() > min {
            true
        } else {
            log::debug!("momentum stopped");
            self.phase = PanPhase::Idle;
            false
        }
    }

    // ─── Zoom ────────────────────────────────────────────────────────────

    /// Change zoom by `delta` percent points, keeping the content point
    /// under view point `p` fixed. Clamped to the zoom range; returns
    /// `false` if the zoom did not change. Non-finite input is ignored.
    pub fn zoom_to_point(&mut self, p: Point, delta: f64) -> bool {
        if !delta.is_finite() || !p.is_finite() {
            return false;
        }
        let old = self.view.scale();
        let new = (old + delta / 100.0).clamp(self.min_zoom / 100.0, self.max_zoom / 100.0);
        if new == old {
            return false;
        }
        let world = self.view.view_to_content(p);
        self.view.zoom = new * 100.0;
        self.view.pan = p.to_vec2() - world.to_vec2() * new;
        true
    }

    /// Wheel zoom anchored at view point `p`. Scrolling down zooms out.
    pub fn on_wheel(&mut self, p: Point, delta_y: f64, now_ms: f64) -> bool {
        if !self.enable_zooming {
            return false;
        }
        let step = WHEEL_ZOOM_STEP * self.zoom_speed;
        let delta = if delta_y > 0.0 { -step } else { step };
        self.zoom_at(p, delta, now_ms)
    }

    /// [`zoom_to_point`](Self::zoom_to_point) plus the zoom indicator.
    pub fn zoom_at(&mut self, p: Point, delta: f64, now_ms: f64) -> bool {
        let changed = self.zoom_to_point(p, delta);
        self.show_indicator(now_ms);
        changed
    }

    fn view_center(&self) -> Point {
        Point::new(self.viewport.width / 2.0, self.viewport.height / 2.0)
    }

    pub fn zoom_in(&mut self, now_ms: f64) -> bool {
        let center = self.view_center();
        self.zoom_at(center, BUTTON_ZOOM_STEP * self.zoom_speed, now_ms)
    }

    pub fn zoom_out(&mut self, now_ms: f64) -> bool {
        let center = self.view_center();
        self.zoom_at(center, -BUTTON_ZOOM_STEP * self.zoom_speed, now_ms)
    }

    /// Back to 100% with the content origin at the view origin.
    pub fn reset_zoom(&mut self, now_ms: f64) {
        self.view = ViewTransform {
            pan: Vec2::ZERO,
            zoom: DEFAULT_ZOOM,
        };
        self.show_indicator(now_ms);
    }

    fn show_indicator(&mut self, now_ms: f64) {
        self.indicator.start(now_ms, self.indicator_ms);
    }

    /// Zoom level text while the indicator is visible.
    pub fn zoom_indicator(&self, now_ms: f64) -> Option<String> {
        self.indicator
            .is_active(now_ms)
            .then(|| format!("{}%", self.view.zoom.round()))
    }
}
