// Viewer pub/sub: session registry, change fan-out, WebSocket sessions

mod broadcaster;
mod change;
pub mod manager;
pub mod protocol;

pub use broadcaster::{SessionId, SessionState, SyncBroadcaster};
pub use change::{ChangeKind, PlotChanged};
pub use manager::ConnectionManager;
pub use protocol::{ClientMessage, ServerMessage};
