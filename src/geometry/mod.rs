//! GeoJSON geometry codec for plot outlines.
//!
//! The store hands geometry over as GeoJSON text (`ST_AsGeoJSON` on PostGIS,
//! the raw column on SQLite) and takes it back the same way
//! (`ST_GeomFromGeoJSON`). This module converts between that text and the
//! structured [`PlotGeometry`] used everywhere else.
//!
//! Coordinates pass through untouched: no re-projection, simplification,
//! reordering or deduplication. Only polygons and multi-polygons are accepted.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

mod validation;

pub use validation::validate;

/// `[longitude, latitude]`, optionally followed by an altitude.
pub type Position = Vec<f64>;

/// Closed sequence of positions (first position equals the last).
pub type Ring = Vec<Position>;

/// Plot outline in geographic coordinates.
///
/// Serializes as a GeoJSON geometry object, e.g.
/// `{"type": "Polygon", "coordinates": [[[lon, lat], ...]]}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum PlotGeometry {
    /// Exterior ring followed by any interior rings (holes)
    Polygon(Vec<Ring>),
    /// One ring list per member polygon
    MultiPolygon(Vec<Vec<Ring>>),
}

impl PlotGeometry {
    /// GeoJSON geometry type name
    pub fn type_name(&self) -> &'static str {
        match self {
            PlotGeometry::Polygon(_) => "Polygon",
            PlotGeometry::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// Iterate over every ring of every member polygon, in document order
    pub fn rings(&self) -> Box<dyn Iterator<Item = &Ring> + '_> {
        match self {
            PlotGeometry::Polygon(rings) => Box::new(rings.iter()),
            PlotGeometry::MultiPolygon(polygons) => Box::new(polygons.iter().flatten()),
        }
    }

    /// Total number of rings
    pub fn ring_count(&self) -> usize {
        self.rings().count()
    }

    /// Total number of positions across all rings
    pub fn point_count(&self) -> usize {
        self.rings().map(Vec::len).sum()
    }
}

/// Reasons a geometry cannot be decoded or encoded
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryError {
    InvalidJson(String),
    UnsupportedType(String),
    InvalidCoordinates(String),
    Empty,
    RingTooShort { points: usize },
    UnclosedRing,
    InvalidPosition { ordinates: usize },
    NonFiniteOrdinate,
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryError::InvalidJson(msg) => write!(f, "geometry is not valid JSON: {}", msg),
            GeometryError::UnsupportedType(t) => {
                write!(f, "unsupported geometry type '{}': expected Polygon or MultiPolygon", t)
            }
            GeometryError::InvalidCoordinates(msg) => {
                write!(f, "invalid coordinates: {}", msg)
            }
            GeometryError::Empty => write!(f, "geometry has no rings"),
            GeometryError::RingTooShort { points } => {
                write!(f, "ring has {} positions, at least 4 are required", points)
            }
            GeometryError::UnclosedRing => write!(f, "ring is not closed"),
            GeometryError::InvalidPosition { ordinates } => {
                write!(f, "position has {} ordinates, expected 2 or 3", ordinates)
            }
            GeometryError::NonFiniteOrdinate => write!(f, "position contains a non-finite ordinate"),
        }
    }
}

impl std::error::Error for GeometryError {}

/// Parse stored GeoJSON text into a validated geometry.
pub fn decode(text: &str) -> Result<PlotGeometry, GeometryError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| GeometryError::InvalidJson(e.to_string()))?;
    from_value(value)
}

/// Convert a caller-supplied GeoJSON geometry object into a validated geometry.
pub fn from_value(value: Value) -> Result<PlotGeometry, GeometryError> {
    let geometry_type = match value.get("type") {
        Some(Value::String(t)) => t.clone(),
        Some(other) => return Err(GeometryError::UnsupportedType(other.to_string())),
        None => return Err(GeometryError::UnsupportedType("<missing>".to_string())),
    };

    if geometry_type != "Polygon" && geometry_type != "MultiPolygon" {
        return Err(GeometryError::UnsupportedType(geometry_type));
    }

    let geometry: PlotGeometry = serde_json::from_value(value)
        .map_err(|e| GeometryError::InvalidCoordinates(e.to_string()))?;

    validate(&geometry)?;
    Ok(geometry)
}

/// Serialize a geometry into the GeoJSON text the store's geometry
/// constructor expects. Fails if the geometry is not well formed.
pub fn encode(geometry: &PlotGeometry) -> Result<String, GeometryError> {
    validate(geometry)?;
    serde_json::to_string(geometry).map_err(|e| GeometryError::InvalidCoordinates(e.to_string()))
}
