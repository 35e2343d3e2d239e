use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "type")]
    pub category: String,
    #[serde(rename = "message")]
    pub text: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}
