//! Error types for terrain graph generation

use std::fmt;

/// Errors that can occur during graph construction or queries
#[derive(Debug, Clone)]
pub enum TerrainError {
    /// Configuration validation failed
    InvalidConfig(String),
    /// The input cell diagram is structurally unusable (degenerate geometry,
    /// a boundary loop that cannot close, or a site with no segments)
    MalformedDiagram(String),
    /// Requested cell ID does not exist
    CellNotFound(usize),
}

impl fmt::Display for TerrainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerrainError::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            TerrainError::MalformedDiagram(msg) => write!(f, "malformed diagram: {}", msg),
            TerrainError::CellNotFound(id) => write!(f, "cell not found: {}", id),
        }
    }
}

impl std::error::Error for TerrainError {}

/// Result type alias for terrain operations
pub type Result<T> = std::result::Result<T, TerrainError>;
