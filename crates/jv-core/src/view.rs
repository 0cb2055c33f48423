//! View transform: content space ↔ view space.
//!
//! Rendering applies `translate(pan) scale(zoom / 100)`; every pointer
//! position is mapped back through the inverse before use.

use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Zoom level (percent) of an untouched view.
pub const DEFAULT_ZOOM: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewTransform {
    /// Where the content-space origin sits in view space.
    pub pan: Vec2,
    /// Zoom level in percent, 100 = 1:1. Always positive.
    pub zoom: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: DEFAULT_ZOOM,
        }
    }
}

impl ViewTransform {
    pub fn scale(&self) -> f64 {
        self.zoom / 100.0
    }

    /// True until the user (or centering) has moved or zoomed the view.
    pub fn is_untouched(&self) -> bool {
        self.zoom == DEFAULT_ZOOM && self.pan == Vec2::ZERO
    }

    pub fn view_to_content(&self, p: Point) -> Point {
        let s = self.scale();
        Point::new((p.x - self.pan.x) / s, (p.y - self.pan.y) / s)
    }

    pub fn content_to_view(&self, p: Point) -> Point {
        let s = self.scale();
        Point::new(p.x * s + self.pan.x, p.y * s + self.pan.y)
    }

    pub fn content_to_view_rect(&self, r: Rect) -> Rect {
        let p0 = self.content_to_view(Point::new(r.x0, r.y0));
        let p1 = self.content_to_view(Point::new(r.x1, r.y1));
        Rect::from_points(p0, p1)
    }

    /// SVG `transform` attribute text for the content group.
    pub fn to_svg(&self) -> String {
        format!(
            "translate({}, {}) scale({})",
            self.pan.x,
            self.pan.y,
            self.scale()
        )
    }
}
