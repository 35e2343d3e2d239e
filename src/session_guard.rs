use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::{
    api::{ApiClient, LOGIN_ROUTE},
    error::RealtimeError,
    types::{DEFAULT_TIMEOUT, Result},
};

pub const ROOMS_ROUTE: &str = "/planning-poker";
pub const NO_SESSION_NOTICE: &str = "You are not part of an active planning session.";
pub const SESSION_EXPIRED_NOTICE: &str = "Your session has expired. Please sign in again.";
const VALIDATE_PATH: &str = "/planning-poker/sessions/validate";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMembership {
    pub session_id: String,
    pub participant_id: String,
    pub active: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum GuardState {
    #[default]
    Loading,
    Validating,
    ActiveSession(SessionMembership),
    NoSession,
}

/// Where the view should go once the guard has settled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Render the protected view at its canonical route.
    Enter {
        route: String,
        membership: SessionMembership,
    },
    /// Leave for `route` (the room listing, or the login page once the
    /// session can no longer be refreshed) and show `notice`.
    Redirect { route: String, notice: String },
}

pub fn room_route(session_id: &str) -> String {
    format!("{ROOMS_ROUTE}/room/{session_id}")
}

/// Asks the backend whether the current participant holds a membership.
pub trait SessionValidator: Send + Sync {
    fn validate(
        &self,
        room_id: Option<&str>,
    ) -> impl Future<Output = Result<Option<SessionMembership>>> + Send;
}

/// Gate in front of a planning-poker room.
///
/// Starts in [`GuardState::Loading`]; [`SessionGuard::check`] moves it
/// through `Validating` to either `ActiveSession` or `NoSession`. A
/// validation call that exceeds the timeout counts as no session.
pub struct SessionGuard<V> {
    validator: V,
    timeout: Duration,
    state: watch::Sender<GuardState>,
}

impl<V: SessionValidator> SessionGuard<V> {
    pub fn new(validator: V) -> Self {
        let (state, _) = watch::channel(GuardState::Loading);
        Self {
            validator,
            timeout: DEFAULT_TIMEOUT,
            state,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn state(&self) -> GuardState {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<GuardState> {
        self.state.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        matches!(*self.state.borrow(), GuardState::Loading | GuardState::Validating)
    }

    /// Protected children may render only while a membership is active.
    pub fn can_render(&self) -> bool {
        matches!(*self.state.borrow(), GuardState::ActiveSession(_))
    }

    pub async fn check(&self, room_id: Option<&str>) -> GuardOutcome {
        self.state.send_replace(GuardState::Validating);

        let validated = match tokio::time::timeout(self.timeout, self.validator.validate(room_id)).await {
            Ok(result) => result,
            Err(_) => Err(RealtimeError::ValidationTimeout(self.timeout)),
        };

        match validated {
            Ok(Some(membership)) if membership.active => {
                info!(session_id = %membership.session_id, "active planning session");
                let route = room_route(&membership.session_id);
                self.state
                    .send_replace(GuardState::ActiveSession(membership.clone()));
                GuardOutcome::Enter { route, membership }
            }
            Ok(_) => {
                info!(room_id = ?room_id, "no active planning session");
                self.reject()
            }
            Err(RealtimeError::SessionExpired) => {
                warn!(room_id = ?room_id, "session expired during validation");
                self.state.send_replace(GuardState::NoSession);
                GuardOutcome::Redirect {
                    route: String::from(LOGIN_ROUTE),
                    notice: String::from(SESSION_EXPIRED_NOTICE),
                }
            }
            Err(error) => {
                warn!(room_id = ?room_id, %error, "session validation failed");
                self.reject()
            }
        }
    }

    fn reject(&self) -> GuardOutcome {
        self.state.send_replace(GuardState::NoSession);
        GuardOutcome::Redirect {
            route: String::from(ROOMS_ROUTE),
            notice: String::from(NO_SESSION_NOTICE),
        }
    }
}

/// [`SessionValidator`] backed by the REST API. A 404 means no session.
pub struct HttpSessionValidator {
    api: ApiClient,
}

impl HttpSessionValidator {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

impl SessionValidator for HttpSessionValidator {
    async fn validate(&self, room_id: Option<&str>) -> Result<Option<SessionMembership>> {
        let query: Vec<(&str, &str)> = room_id.map(|room| ("roomId", room)).into_iter().collect();

        match self.api.get_json(VALIDATE_PATH, &query).await {
            Ok(membership) => Ok(Some(membership)),
            Err(RealtimeError::RequestFailed { status, .. })
                if status == StatusCode::NOT_FOUND.as_u16() =>
            {
                Ok(None)
            }
            Err(RealtimeError::RequestFailed { status, message }) => {
                Err(RealtimeError::ValidationFailed {
                    reason: format!("{status}: {message}"),
                })
            }
            Err(error) => Err(error),
        }
    }
}
