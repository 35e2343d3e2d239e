use serde::{Deserialize, Serialize};

use super::participant::Participant;

/// Handshake sent as the first frame of every authenticated connection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthPayload {
    pub room: String,
    #[serde(rename = "user")]
    pub participant: Participant,
}
