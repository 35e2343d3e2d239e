use serde::{Deserialize, Serialize};

/// Outbound chat line. Carries no correlation id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SendMessage {
    pub sender: String,
    pub body: String,
}
