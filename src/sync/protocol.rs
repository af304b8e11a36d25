use crate::plot::FeatureCollection;
use serde::{Deserialize, Serialize};

/// Viewer → Server events.
///
/// Frames are JSON envelopes `{"event": <name>, "data": <payload>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientMessage {
    /// Request the full plot set
    #[serde(rename = "get-all-plots")]
    GetAllPlots,
    /// Request plots of one industry type
    #[serde(rename = "get-plots-by-type")]
    GetPlotsByType(String),
}

/// Server → Viewer events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerMessage {
    /// Response to `get-all-plots`
    #[serde(rename = "all-plots")]
    AllPlots(FeatureCollection),
    /// Response to `get-plots-by-type`, or a newly created plot
    #[serde(rename = "new-plots")]
    NewPlots(FeatureCollection),
    /// A plot was replaced (single-feature collection)
    #[serde(rename = "update-plot")]
    UpdatePlot(FeatureCollection),
    /// A request failed
    #[serde(rename = "error")]
    Error(String),
}

/// Message sent when a viewer request cannot be served
pub const FETCH_ERROR_MESSAGE: &str = "Error fetching plots.";

/// Message sent when a viewer frame is not a known request
pub const UNRECOGNISED_REQUEST_MESSAGE: &str = "Unrecognised request.";

impl ServerMessage {
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerMessage::AllPlots(_) => "all-plots",
            ServerMessage::NewPlots(_) => "new-plots",
            ServerMessage::UpdatePlot(_) => "update-plot",
            ServerMessage::Error(_) => "error",
        }
    }

    pub fn fetch_error() -> Self {
        ServerMessage::Error(FETCH_ERROR_MESSAGE.to_string())
    }

    pub fn unrecognised_request() -> Self {
        ServerMessage::Error(UNRECOGNISED_REQUEST_MESSAGE.to_string())
    }
}
