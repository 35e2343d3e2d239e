use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub body: String,
    pub sender: String,
    #[serde(default = "Utc::now")]
    pub sent_at: DateTime<Utc>,
    #[serde(default)]
    pub status: DeliveryStatus,
}

/// Client-side delivery stage. Only moves forward.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    #[default]
    Sending,
    Sent,
    Delivered,
}

impl DeliveryStatus {
    pub const SENT_AFTER: Duration = Duration::from_millis(1000);
    pub const DELIVERED_AFTER: Duration = Duration::from_millis(2000);

    /// Stage reached by a simulated message `elapsed` after creation.
    pub fn after(elapsed: Duration) -> Self {
        if elapsed >= Self::DELIVERED_AFTER {
            DeliveryStatus::Delivered
        } else if elapsed >= Self::SENT_AFTER {
            DeliveryStatus::Sent
        } else {
            DeliveryStatus::Sending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_boundaries() {
        assert_eq!(DeliveryStatus::after(Duration::ZERO), DeliveryStatus::Sending);
        assert_eq!(DeliveryStatus::after(Duration::from_millis(999)), DeliveryStatus::Sending);
        assert_eq!(DeliveryStatus::after(Duration::from_millis(1000)), DeliveryStatus::Sent);
        assert_eq!(DeliveryStatus::after(Duration::from_millis(1999)), DeliveryStatus::Sent);
        assert_eq!(DeliveryStatus::after(Duration::from_millis(2000)), DeliveryStatus::Delivered);
    }

    #[test]
    fn stages_are_ordered() {
        assert!(DeliveryStatus::Sending < DeliveryStatus::Sent);
        assert!(DeliveryStatus::Sent < DeliveryStatus::Delivered);
    }
}
