pub mod hit;
pub mod links;
pub mod snapshot;

pub use hit::hit_test;
pub use links::{LinkPath, route_link, route_links};
pub use snapshot::{ErrorIndicator, Overlay, RenderSnapshot, build_snapshot};
