use serde::{Deserialize, Serialize};

use super::payload::Payload;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(flatten)]
    pub payload: Payload,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
}

impl From<Payload> for Message {
    fn from(payload: Payload) -> Self {
        Self {
            payload,
            room: None,
        }
    }
}
