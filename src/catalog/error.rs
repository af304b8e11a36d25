use crate::geometry::GeometryError;
use crate::plot::{PlotId, ValidationError};
use crate::store::StoreError;
use std::fmt;

/// Failures of plot queries and writes
#[derive(Debug, Clone, PartialEq)]
pub enum PlotError {
    /// Request body is not a plot record
    InvalidBody(String),
    /// Input geometry cannot be parsed or serialized
    MalformedGeometry(GeometryError),
    /// Scalar attributes rejected (unknown type, bad id, non-finite number)
    InvalidPlot(ValidationError),
    /// Update targeted an id with no row
    NotFound(PlotId),
    /// Store rejected a write
    WriteFailed(String),
    /// Store rejected a read
    QueryFailed(String),
}

impl PlotError {
    pub(crate) fn from_read(e: StoreError) -> Self {
        PlotError::QueryFailed(e.to_string())
    }

    pub(crate) fn from_write(e: StoreError) -> Self {
        PlotError::WriteFailed(e.to_string())
    }
}

impl fmt::Display for PlotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlotError::InvalidBody(msg) => write!(f, "invalid plot body: {}", msg),
            PlotError::MalformedGeometry(e) => write!(f, "malformed geometry: {}", e),
            PlotError::InvalidPlot(e) => write!(f, "invalid plot: {}", e),
            PlotError::NotFound(id) => write!(f, "plot {} not found", id),
            PlotError::WriteFailed(msg) => write!(f, "write failed: {}", msg),
            PlotError::QueryFailed(msg) => write!(f, "query failed: {}", msg),
        }
    }
}

impl std::error::Error for PlotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlotError::MalformedGeometry(e) => Some(e),
            PlotError::InvalidPlot(e) => Some(e),
            _ => None,
        }
    }
}
