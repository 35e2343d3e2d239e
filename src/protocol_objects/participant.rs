use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Profile attributes the server sends that this crate does not interpret.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Participant {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = Some(last_name.into());
        self
    }

    pub fn display_name(&self) -> String {
        match self.last_name.as_deref() {
            Some(last_name) if !last_name.is_empty() => format!("{} {last_name}", self.name),
            _ => self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn display_name_joins_first_and_last() {
        let ana = Participant::new("u1", "Ana").with_last_name("G");
        assert_eq!(ana.display_name(), "Ana G");
        assert_eq!(Participant::new("u2", "Bo").display_name(), "Bo");
    }

    #[test]
    fn unknown_profile_fields_are_preserved() {
        let participant: Participant = serde_json::from_value(json!({
            "id": "u2",
            "name": "Lia",
            "lastName": "M",
            "role": "scrum-master"
        }))
        .expect("participant should decode");

        assert_eq!(participant.last_name.as_deref(), Some("M"));
        assert_eq!(participant.attributes["role"], "scrum-master");
        assert_eq!(serde_json::to_value(&participant).expect("encode")["role"], "scrum-master");
    }
}
