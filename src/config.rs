use std::time::Duration;

use crate::{
    error::RealtimeError,
    protocol_objects::{AuthPayload, Participant},
    types::{
        DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_IDLE_TIMEOUT, DEFAULT_RECONNECTION_ATTEMPTS,
        DEFAULT_RECONNECTION_DELAY, Result,
    },
    utils::{http_to_ws, is_http_url, is_ws_url},
};

pub const API_BASE_URL_VAR: &str = "API_BASE_URL";
pub const NOTIFICATIONS_URL_VAR: &str = "NOTIFICATIONS_URL";
pub const CHAT_SERVER_URL_VAR: &str = "CHAT_SERVER_URL";

/// Addresses the application needs at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub api_base_url: String,
    pub notifications_url: String,
    pub chat_server_url: String,
}

impl AppConfig {
    /// Reads `.env` (if present) and the process environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| dotenv::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| RealtimeError::MissingEnv {
                    name: String::from(name),
                })
        };

        let api_base_url = required(API_BASE_URL_VAR)?;
        let notifications_url = required(NOTIFICATIONS_URL_VAR)?;
        let chat_server_url = lookup(CHAT_SERVER_URL_VAR)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| api_base_url.clone());

        if !is_http_url(&api_base_url) {
            return Err(RealtimeError::InvalidUrl { url: api_base_url });
        }
        for url in [&notifications_url, &chat_server_url] {
            if !is_ws_url(url) {
                return Err(RealtimeError::InvalidUrl { url: url.clone() });
            }
        }

        Ok(Self {
            api_base_url,
            notifications_url,
            chat_server_url,
        })
    }
}

/// Validated target of a realtime connection.
///
/// Authenticated configs carry the room and participant sent in the
/// handshake; a config that names neither is only usable for streams that
/// identify themselves later (see [`crate::notification::NotificationStream`]).
#[derive(Clone, Debug, PartialEq)]
pub struct ConnectionConfig {
    url: String,
    auth: Option<AuthPayload>,
}

impl ConnectionConfig {
    pub fn new(address: &str, room: &str, participant: Participant) -> Result<Self> {
        let url = Self::validate_address(address)?;

        if room.trim().is_empty() {
            return Err(RealtimeError::invalid_config("room is required"));
        }
        if participant.id.trim().is_empty() {
            return Err(RealtimeError::invalid_config("participant id is required"));
        }
        if participant.name.trim().is_empty() {
            return Err(RealtimeError::invalid_config("participant name is required"));
        }

        Ok(Self {
            url,
            auth: Some(AuthPayload {
                room: String::from(room),
                participant,
            }),
        })
    }

    pub fn unauthenticated(address: &str) -> Result<Self> {
        Ok(Self {
            url: Self::validate_address(address)?,
            auth: None,
        })
    }

    fn validate_address(address: &str) -> Result<String> {
        if !is_ws_url(address) {
            return Err(RealtimeError::InvalidUrl {
                url: String::from(address),
            });
        }
        Ok(http_to_ws(address))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn auth(&self) -> Option<&AuthPayload> {
        self.auth.as_ref()
    }

    pub fn room(&self) -> Option<&str> {
        self.auth.as_ref().map(|auth| auth.room.as_str())
    }

    pub fn participant(&self) -> Option<&Participant> {
        self.auth.as_ref().map(|auth| &auth.participant)
    }

    /// Whether `other` names the same live connection (address, room, participant id).
    pub fn same_identity(&self, other: &ConnectionConfig) -> bool {
        self.url == other.url
            && self.room() == other.room()
            && self.participant().map(|p| &p.id) == other.participant().map(|p| &p.id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub auto_reconnect: bool,
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            max_attempts: DEFAULT_RECONNECTION_ATTEMPTS,
            delay: DEFAULT_RECONNECTION_DELAY,
        }
    }
}

impl ReconnectPolicy {
    pub fn disabled() -> Self {
        Self {
            auto_reconnect: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Heartbeat cadence and the silence after which a connection counts as dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeepAlivePolicy {
    pub heartbeat_interval: Duration,
    pub idle_timeout: Duration,
}

impl Default for KeepAlivePolicy {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

impl KeepAlivePolicy {
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    #[must_use]
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (String::from(*k), String::from(*v)))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn app_config_requires_api_and_notifications() {
        let err = AppConfig::from_lookup(lookup(&[(API_BASE_URL_VAR, "http://api")]))
            .expect_err("notifications url is required");
        assert!(matches!(err, RealtimeError::MissingEnv { ref name } if name == NOTIFICATIONS_URL_VAR));

        let err = AppConfig::from_lookup(lookup(&[(NOTIFICATIONS_URL_VAR, "ws://n"), (API_BASE_URL_VAR, "  ")]))
            .expect_err("blank api url is missing");
        assert!(matches!(err, RealtimeError::MissingEnv { ref name } if name == API_BASE_URL_VAR));
    }

    #[test]
    fn api_base_must_be_http() {
        let err = AppConfig::from_lookup(lookup(&[
            (API_BASE_URL_VAR, "ws://api.example.com"),
            (NOTIFICATIONS_URL_VAR, "wss://notify.example.com"),
        ]))
        .expect_err("websocket api url is rejected");
        assert!(matches!(err, RealtimeError::InvalidUrl { ref url } if url == "ws://api.example.com"));
    }

    #[test]
    fn chat_server_defaults_to_api_base() {
        let config = AppConfig::from_lookup(lookup(&[
            (API_BASE_URL_VAR, "https://api.example.com"),
            (NOTIFICATIONS_URL_VAR, "wss://notify.example.com"),
        ]))
        .expect("config should load");

        assert_eq!(config.chat_server_url, "https://api.example.com");
    }

    #[test]
    fn connection_config_rejects_incomplete_auth() {
        let ana = Participant::new("u1", "Ana");

        assert!(matches!(
            ConnectionConfig::new("ws://chat", "", ana.clone()),
            Err(RealtimeError::InvalidConfig { .. })
        ));
        assert!(matches!(
            ConnectionConfig::new("ws://chat", "R1", Participant::new("", "Ana")),
            Err(RealtimeError::InvalidConfig { .. })
        ));
        assert!(matches!(
            ConnectionConfig::new("ws://chat", "R1", Participant::new("u1", " ")),
            Err(RealtimeError::InvalidConfig { .. })
        ));
        assert!(matches!(
            ConnectionConfig::new("chat", "R1", ana),
            Err(RealtimeError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn identity_ignores_profile_changes() {
        let config = ConnectionConfig::new("http://chat", "R1", Participant::new("u1", "Ana"))
            .expect("valid config");
        assert_eq!(config.url(), "ws://chat");

        let renamed = ConnectionConfig::new("http://chat", "R1", Participant::new("u1", "Anna"))
            .expect("valid config");
        let other_room = ConnectionConfig::new("http://chat", "R2", Participant::new("u1", "Ana"))
            .expect("valid config");

        assert!(config.same_identity(&renamed));
        assert!(!config.same_identity(&other_room));
    }
}
