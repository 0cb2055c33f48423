//! Error type for the few operations that can genuinely fail.
//!
//! Layout degradation, missing styles, out-of-range zoom and degenerate
//! gestures are handled where they are detected and never reach this type.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisualizerError {
    /// Input text was not valid JSON.
    InvalidJson(String),
    /// A data transformer rejected its input.
    Transform(String),
    /// A render pass failed after the data was accepted.
    Render(String),
}

impl fmt::Display for VisualizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidJson(msg) => write!(f, "invalid JSON: {msg}"),
            Self::Transform(msg) => write!(f, "transform failed: {msg}"),
            Self::Render(msg) => write!(f, "render failed: {msg}"),
        }
    }
}

impl std::error::Error for VisualizerError {}

impl From<serde_json::Error> for VisualizerError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidJson(err.to_string())
    }
}
