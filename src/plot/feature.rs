use super::{Plot, PlotId, PlotType};
use crate::geometry::PlotGeometry;
use serde::{Deserialize, Serialize};

/// GeoJSON `FeatureCollection` of plots
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub collection_type: String,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            collection_type: "FeatureCollection".to_string(),
            features,
        }
    }

    pub fn from_plots(plots: &[Plot]) -> Self {
        Self::new(plots.iter().map(Plot::to_feature).collect())
    }

    /// Collection holding exactly one plot (change notifications)
    pub fn single(plot: &Plot) -> Self {
        Self::new(vec![plot.to_feature()])
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// GeoJSON `Feature` pairing a plot outline with its attributes
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub feature_type: String,
    pub geometry: PlotGeometry,
    pub properties: PlotProperties,
}

impl Feature {
    pub fn new(geometry: PlotGeometry, properties: PlotProperties) -> Self {
        Self {
            feature_type: "Feature".to_string(),
            geometry,
            properties,
        }
    }
}

/// Feature properties, in the shape viewers render tooltips from
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlotProperties {
    pub id: PlotId,
    pub name: String,
    pub area: f64,
    #[serde(rename = "type")]
    pub plot_type: PlotType,
    pub status: String,
    pub disroad: f64,
    pub diswater: f64,
    pub elephase: f64,
}
