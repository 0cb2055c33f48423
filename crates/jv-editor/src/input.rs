//! Input abstraction layer.
//!
//! Normalizes pointer and wheel events from the host surface into a
//! unified `InputEvent` enum. Coordinates are client space; the
//! visualizer maps them through its view origin and transform.

use kurbo::Point;

/// `button` value of the primary (left) button on press.
pub const PRIMARY_BUTTON: u16 = 0;
/// Bit of the primary button in a `buttons` mask.
pub const PRIMARY_MASK: u16 = 1;

/// A normalized input event.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Pointer pressed.
    PointerDown {
        x: f64,
        y: f64,
        /// Which button changed state.
        button: u16,
        /// Mask of buttons held after the press.
        buttons: u16,
    },

    /// Pointer moved; `buttons` is the mask of buttons currently held.
    PointerMove { x: f64, y: f64, buttons: u16 },

    /// Pointer released.
    PointerUp { x: f64, y: f64 },

    /// Pointer left the tracking surface.
    PointerLeave,

    /// Wheel; positive `delta_y` scrolls down (zooms out).
    Wheel { x: f64, y: f64, delta_y: f64 },
}

impl InputEvent {
    /// Primary-button press at (x, y).
    pub fn from_pointer_down(x: f64, y: f64) -> Self {
        Self::PointerDown {
            x,
            y,
            button: PRIMARY_BUTTON,
            buttons: PRIMARY_MASK,
        }
    }

    /// Move with the primary button held.
    pub fn from_pointer_drag(x: f64, y: f64) -> Self {
        Self::PointerMove {
            x,
            y,
            buttons: PRIMARY_MASK,
        }
    }

    pub fn from_pointer_up(x: f64, y: f64) -> Self {
        Self::PointerUp { x, y }
    }

    /// Extract position if this event carries one.
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::PointerDown { x, y, .. }
            | Self::PointerMove { x, y, .. }
            | Self::PointerUp { x, y }
            | Self::Wheel { x, y, .. } => Some(Point::new(*x, *y)),
            Self::PointerLeave => None,
        }
    }
}

/// Whether a `buttons` mask has the primary button held.
pub fn primary_held(buttons: u16) -> bool {
    buttons & PRIMARY_MASK != 0
}
