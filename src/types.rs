use std::time::Duration;

use crate::error::RealtimeError;

// Constants
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_RECONNECTION_ATTEMPTS: u32 = 5;
pub const DEFAULT_RECONNECTION_DELAY: Duration = Duration::from_millis(1000);
pub const CONNECTION_EVENT_CAPACITY: usize = 64;

pub type Result<Type> = std::result::Result<Type, RealtimeError>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting {
        attempt: u32,
    },
    /// Retry bound exhausted. Terminal until `connect` is called again.
    Failed,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

/// Lifecycle notifications published by a [`crate::client::RealtimeClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected,
    Disconnected,
    ConnectError(String),
    Reconnecting { attempt: u32 },
    ReconnectFailed { attempts: u32 },
}
