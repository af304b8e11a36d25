use crate::plot::{FeatureCollection, IndustryType, Plot};
use crate::sync::protocol::ServerMessage;
use chrono::{DateTime, Utc};
use std::fmt;

/// Which upsert branch produced a change
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Created => f.write_str("created"),
            ChangeKind::Updated => f.write_str("updated"),
        }
    }
}

/// A persisted plot write, fanned out to viewer sessions
#[derive(Clone, Debug)]
pub struct PlotChanged {
    pub kind: ChangeKind,
    pub plot: Plot,
    /// Type the plot had before an update, when it was a known type
    pub previous_type: Option<IndustryType>,
    pub timestamp: DateTime<Utc>,
}

impl PlotChanged {
    pub fn created(plot: Plot) -> Self {
        Self {
            kind: ChangeKind::Created,
            plot,
            previous_type: None,
            timestamp: Utc::now(),
        }
    }

    pub fn updated(plot: Plot, previous_type: Option<IndustryType>) -> Self {
        Self {
            kind: ChangeKind::Updated,
            plot,
            previous_type,
            timestamp: Utc::now(),
        }
    }

    /// Whether a session filtering on `filter` should see this change.
    ///
    /// No filter sees everything. An update is also delivered to sessions
    /// filtering on the plot's previous type so they can drop it.
    pub fn matches(&self, filter: Option<IndustryType>) -> bool {
        match filter {
            None => true,
            Some(t) => self.plot.plot_type == t || self.previous_type == Some(t),
        }
    }

    /// Wire message: `new-plots` for creations, `update-plot` for updates
    pub fn to_message(&self) -> ServerMessage {
        let collection = FeatureCollection::single(&self.plot);
        match self.kind {
            ChangeKind::Created => ServerMessage::NewPlots(collection),
            ChangeKind::Updated => ServerMessage::UpdatePlot(collection),
        }
    }
}
