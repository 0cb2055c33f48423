pub mod collision;
pub mod config;
pub mod error;
pub mod id;
pub mod layout;
pub mod model;
pub mod positions;
pub mod style;
pub mod transform;
pub mod view;

pub use collision::{CollisionEngine, NodeSet, RelaxationOutcome, rectangles_overlap};
pub use config::{LayoutStrategy, VisualizerConfig};
pub use error::VisualizerError;
pub use id::NodeId;
pub use layout::{LayoutPosition, apply_positions_to_nodes, calculate_layout, center_content_initially};
pub use model::*;
pub use positions::PositionStore;
pub use style::{NodeRenderer, NodeStyle, RendererRegistry, SizeSource, StyleSheet};
pub use transform::{DataTransformer, TransformContext, TransformerChain};
pub use view::ViewTransform;

// Re-export petgraph types so downstream crates don't need a direct dependency
pub use petgraph::graph::NodeIndex;
