use crate::geometry::PlotGeometry;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

mod feature;
mod validation;
#[cfg(test)]
mod tests;

pub use feature::{Feature, FeatureCollection, PlotProperties};
pub use validation::{validate, ValidationError};

/// Store-assigned plot identity
pub type PlotId = i64;

/// Industry category a plot is allotted to.
///
/// This is the closed set of categories viewers filter on. The wire tag is
/// exact and case-sensitive (`"IT"`, not `"it"`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndustryType {
    #[serde(rename = "chemical")]
    Chemical,
    #[serde(rename = "textile")]
    Textile,
    #[serde(rename = "IT")]
    It,
    #[serde(rename = "automobile")]
    Automobile,
    #[serde(rename = "paper")]
    Paper,
}

impl IndustryType {
    pub const ALL: [IndustryType; 5] = [
        IndustryType::Chemical,
        IndustryType::Textile,
        IndustryType::It,
        IndustryType::Automobile,
        IndustryType::Paper,
    ];

    /// Tag as stored in the `type` column and sent on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            IndustryType::Chemical => "chemical",
            IndustryType::Textile => "textile",
            IndustryType::It => "IT",
            IndustryType::Automobile => "automobile",
            IndustryType::Paper => "paper",
        }
    }
}

impl fmt::Display for IndustryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndustryType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IndustryType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownIndustryType(s.to_string()))
    }
}

/// A plot's `type` as stored.
///
/// Writes only ever store a known [`IndustryType`], but rows written before
/// the category set was fixed may carry any text. Those are kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlotType {
    Known(IndustryType),
    Other(String),
}

impl PlotType {
    pub fn as_str(&self) -> &str {
        match self {
            PlotType::Known(t) => t.as_str(),
            PlotType::Other(tag) => tag,
        }
    }

    pub fn known(&self) -> Option<IndustryType> {
        match self {
            PlotType::Known(t) => Some(*t),
            PlotType::Other(_) => None,
        }
    }
}

impl From<IndustryType> for PlotType {
    fn from(t: IndustryType) -> Self {
        PlotType::Known(t)
    }
}

impl From<String> for PlotType {
    fn from(tag: String) -> Self {
        match tag.parse() {
            Ok(t) => PlotType::Known(t),
            Err(_) => PlotType::Other(tag),
        }
    }
}

impl PartialEq<IndustryType> for PlotType {
    fn eq(&self, other: &IndustryType) -> bool {
        self.known() == Some(*other)
    }
}

impl fmt::Display for PlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A land-allotment plot with its outline
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plot {
    pub id: PlotId,
    pub name: String,
    pub area: f64,
    #[serde(rename = "type")]
    pub plot_type: PlotType,
    pub status: String,
    /// Distance to the nearest road
    pub disroad: f64,
    /// Distance to the nearest water body
    pub diswater: f64,
    pub elephase: f64,
    pub geometry: PlotGeometry,
}

impl Plot {
    /// Scalar attributes as GeoJSON feature properties
    pub fn properties(&self) -> PlotProperties {
        PlotProperties {
            id: self.id,
            name: self.name.clone(),
            area: self.area,
            plot_type: self.plot_type.clone(),
            status: self.status.clone(),
            disroad: self.disroad,
            diswater: self.diswater,
            elephase: self.elephase,
        }
    }

    pub fn to_feature(&self) -> Feature {
        Feature::new(self.geometry.clone(), self.properties())
    }
}

/// Write request body for `POST /add-plot`.
///
/// `id` absent or null creates a plot; present replaces that plot in full.
/// `type` and `geom` stay loosely typed here so that bad values surface as
/// validation and geometry errors rather than body parse failures.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlotInput {
    #[serde(default)]
    pub id: Option<PlotId>,
    pub name: String,
    pub area: f64,
    #[serde(rename = "type")]
    pub plot_type: String,
    pub status: String,
    pub disroad: f64,
    pub diswater: f64,
    /// Desktop editors post this field as text, e.g. `"3"`
    #[serde(deserialize_with = "number_or_numeric_string")]
    pub elephase: f64,
    pub geom: Value,
}

fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(f64),
        Text(String),
    }

    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => Ok(n),
        NumberOrText::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("expected a number, got '{}'", text))),
    }
}
