use crate::config::FanoutPolicy;
use crate::plot::IndustryType;
use crate::sync::change::PlotChanged;
use crate::sync::protocol::ServerMessage;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Identifier of one connected viewer session
pub type SessionId = Uuid;

/// Lifecycle of a viewer session.
///
/// `Connected` → `Subscribed(filter)` → `Disconnected`. A `Connected`
/// session behaves as subscribed to all plots until it declares a filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Subscribed(Option<IndustryType>),
    Disconnected,
}

impl SessionState {
    /// Active type filter (`None` means all plots)
    pub fn filter(&self) -> Option<IndustryType> {
        match self {
            SessionState::Subscribed(filter) => *filter,
            SessionState::Connected | SessionState::Disconnected => None,
        }
    }
}

struct SessionHandle {
    state: SessionState,
    outbound: mpsc::Sender<ServerMessage>,
    connected_at: DateTime<Utc>,
}

/// Live session registry and fan-out.
///
/// Holds each session's last-declared filter and a bounded outbound queue.
/// Under [`FanoutPolicy::All`] every change goes to every live session; under
/// [`FanoutPolicy::Filtered`] it is matched against each session's filter at
/// delivery time. Delivery is best effort: a full queue drops the message for
/// that session only.
pub struct SyncBroadcaster {
    sessions: DashMap<SessionId, SessionHandle>,
    queue_capacity: usize,
    policy: FanoutPolicy,
}

impl SyncBroadcaster {
    /// Broadcaster that delivers every change to every session
    pub fn new(queue_capacity: usize) -> Self {
        Self::with_policy(queue_capacity, FanoutPolicy::All)
    }

    pub fn with_policy(queue_capacity: usize, policy: FanoutPolicy) -> Self {
        Self {
            sessions: DashMap::new(),
            queue_capacity: queue_capacity.max(1),
            policy,
        }
    }

    pub fn policy(&self) -> FanoutPolicy {
        self.policy
    }

    /// Register a new session in `Connected` state.
    ///
    /// Returns the session id and the receiving end of its outbound queue.
    /// Nothing is pushed until the viewer asks or a change is published.
    pub fn connect(&self) -> (SessionId, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let session_id = Uuid::now_v7();

        self.sessions.insert(
            session_id,
            SessionHandle {
                state: SessionState::Connected,
                outbound: tx,
                connected_at: Utc::now(),
            },
        );

        info!(session_id = %session_id, sessions = self.sessions.len(), "Viewer session connected");
        (session_id, rx)
    }

    /// Record the session's filter. Returns false for unknown sessions.
    pub fn subscribe(&self, session_id: SessionId, filter: Option<IndustryType>) -> bool {
        match self.sessions.get_mut(&session_id) {
            Some(mut handle) => {
                handle.state = SessionState::Subscribed(filter);
                debug!(
                    session_id = %session_id,
                    filter = filter.map(|t| t.as_str()).unwrap_or("all"),
                    "Session filter updated"
                );
                true
            }
            None => false,
        }
    }

    /// Remove a session. Returns false if it was already gone.
    pub fn disconnect(&self, session_id: SessionId) -> bool {
        match self.sessions.remove(&session_id) {
            Some((_, handle)) => {
                let duration = Utc::now() - handle.connected_at;
                info!(
                    session_id = %session_id,
                    connected_seconds = duration.num_seconds(),
                    "Viewer session disconnected"
                );
                true
            }
            None => false,
        }
    }

    /// Drop every session; their outbound queues close
    pub fn disconnect_all(&self) {
        let count = self.sessions.len();
        self.sessions.clear();
        if count > 0 {
            info!(sessions = count, "Disconnected all viewer sessions");
        }
    }

    pub fn session_state(&self, session_id: SessionId) -> SessionState {
        self.sessions
            .get(&session_id)
            .map(|handle| handle.state)
            .unwrap_or(SessionState::Disconnected)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Queue a message for one session only
    pub fn send_to(&self, session_id: SessionId, message: ServerMessage) -> bool {
        let result = match self.sessions.get(&session_id) {
            Some(handle) => handle.outbound.try_send(message),
            None => return false,
        };

        match result {
            Ok(()) => true,
            Err(TrySendError::Full(message)) => {
                warn!(
                    session_id = %session_id,
                    event = message.event_name(),
                    "Session queue full, dropping message"
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.prune(&[session_id]);
                false
            }
        }
    }

    /// Fan a change out to the sessions selected by the fan-out policy.
    ///
    /// Returns the number of sessions the message was queued for.
    pub fn publish(&self, change: &PlotChanged) -> usize {
        let message = change.to_message();
        let mut delivered = 0;
        let mut closed = Vec::new();

        for entry in self.sessions.iter() {
            if self.policy == FanoutPolicy::Filtered && !change.matches(entry.state.filter()) {
                continue;
            }
            match entry.outbound.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(
                        session_id = %entry.key(),
                        plot_id = change.plot.id,
                        "Session queue full, dropping change"
                    );
                }
                Err(TrySendError::Closed(_)) => closed.push(*entry.key()),
            }
        }

        // Sessions whose receiver is gone are removed outside the iteration
        self.prune(&closed);

        debug!(
            plot_id = change.plot.id,
            kind = %change.kind,
            delivered = delivered,
            "Change published"
        );
        delivered
    }

    fn prune(&self, session_ids: &[SessionId]) {
        for session_id in session_ids {
            if self.sessions.remove(session_id).is_some() {
                debug!(session_id = %session_id, "Removed session with closed queue");
            }
        }
    }
}

impl Default for SyncBroadcaster {
    fn default() -> Self {
        let config = crate::config::SyncConfig::default();
        Self::with_policy(config.session_queue_capacity, config.fanout)
    }
}
