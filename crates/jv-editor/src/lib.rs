pub mod drag;
pub mod frame;
pub mod input;
pub mod pan_zoom;
pub mod visualizer;

pub use drag::{DragController, DragFrame};
pub use frame::{FrameSlot, Throttle, Timer};
pub use input::InputEvent;
pub use pan_zoom::PanZoomController;
pub use visualizer::Visualizer;
