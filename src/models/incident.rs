use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::error;

use crate::error::BridgeError;

/// ServiceNow incident as embedded in the "Move to Linear" button.
///
/// Every field is optional on the wire; [`Incident::decode`] applies the
/// defaults once so the rest of the service never has to.
#[derive(Debug, Deserialize)]
struct IncidentRecord {
    #[serde(default, deserialize_with = "display_value")]
    number: Option<String>,
    #[serde(default, deserialize_with = "display_value")]
    short_description: Option<String>,
    #[serde(default, deserialize_with = "display_value")]
    state: Option<String>,
    #[serde(default, deserialize_with = "display_value")]
    priority: Option<String>,
    #[serde(default, deserialize_with = "display_value")]
    assignment_group: Option<String>,
    #[serde(default, deserialize_with = "display_value")]
    assigned_to: Option<String>,
    #[serde(default, deserialize_with = "display_value")]
    assignee_id: Option<String>,
    #[serde(default, deserialize_with = "display_value")]
    description: Option<String>,
    #[serde(default, deserialize_with = "display_value")]
    sys_id: Option<String>,
    #[serde(default, deserialize_with = "nullable_list")]
    comments: Vec<JournalRecord>,
    #[serde(default, deserialize_with = "nullable_list")]
    work_notes: Vec<JournalRecord>,
}

#[derive(Debug, Deserialize)]
struct JournalRecord {
    #[serde(default, deserialize_with = "display_value")]
    created_by: Option<String>,
    #[serde(default, deserialize_with = "display_value")]
    created_on: Option<String>,
    #[serde(default, deserialize_with = "display_value")]
    value: Option<String>,
}

/// An incident with every documented default applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Incident {
    pub number: String,
    pub short_description: String,
    pub state: String,
    pub priority: String,
    pub assignment_group: String,
    pub assigned_to: String,
    /// Linear user id of the assignee, if one was picked in Slack.
    pub assignee_id: Option<String>,
    pub description: String,
    pub sys_id: String,
    pub comments: Vec<Comment>,
    pub work_notes: Vec<Comment>,
}

/// A single journal entry (additional comment or work note).
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub created_by: String,
    pub created_on: String,
    pub value: String,
}

impl Incident {
    pub fn decode(raw: &str) -> Result<Self, BridgeError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let record: IncidentRecord = serde_path_to_error::deserialize(&mut deserializer)
            .map_err(|e| {
                error!("Failed to parse incident record: {}", e);
                BridgeError::InvalidPayload(format!("incident record: {e}"))
            })?;
        Ok(Self::from(record))
    }

    /// Records the user picked in Slack as the assignee.
    pub fn assign(&mut self, display_name: impl Into<String>, user_id: impl Into<String>) {
        self.assigned_to = display_name.into();
        self.assignee_id = Some(user_id.into());
    }
}

impl From<IncidentRecord> for Incident {
    fn from(record: IncidentRecord) -> Self {
        let or = |value: Option<String>, default: &str| value.unwrap_or_else(|| default.to_string());
        Self {
            number: or(record.number, "Unknown"),
            short_description: or(record.short_description, "No description"),
            state: or(record.state, "Unknown"),
            priority: or(record.priority, "Unknown"),
            assignment_group: or(record.assignment_group, "N/A"),
            assigned_to: or(record.assigned_to, "Unassigned"),
            assignee_id: record.assignee_id,
            description: or(record.description, "No description provided"),
            sys_id: or(record.sys_id, ""),
            comments: record.comments.into_iter().map(Comment::from).collect(),
            work_notes: record.work_notes.into_iter().map(Comment::from).collect(),
        }
    }
}

impl From<JournalRecord> for Comment {
    fn from(record: JournalRecord) -> Self {
        Self {
            created_by: record.created_by.unwrap_or_else(|| "Unknown".to_string()),
            created_on: record.created_on.unwrap_or_else(|| "Unknown time".to_string()),
            value: record.value.unwrap_or_default(),
        }
    }
}

/// ServiceNow fields arrive as plain strings, numbers, or reference objects
/// carrying a `display_value`. Empty strings count as absent.
fn display_value<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let text = match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(Value::Object(mut map)) => match map.remove("display_value") {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        },
        Some(Value::Array(_)) => {
            return Err(serde::de::Error::custom("expected a string, found an array"));
        }
    };
    Ok(text.filter(|s| !s.is_empty()))
}

fn nullable_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn applies_defaults_to_missing_fields() {
        let incident = Incident::decode("{}").unwrap();
        assert_eq!(incident.number, "Unknown");
        assert_eq!(incident.short_description, "No description");
        assert_eq!(incident.state, "Unknown");
        assert_eq!(incident.priority, "Unknown");
        assert_eq!(incident.assignment_group, "N/A");
        assert_eq!(incident.assigned_to, "Unassigned");
        assert_eq!(incident.description, "No description provided");
        assert_eq!(incident.sys_id, "");
        assert_eq!(incident.assignee_id, None);
        assert!(incident.comments.is_empty());
        assert!(incident.work_notes.is_empty());
    }

    #[test]
    fn accepts_reference_objects_and_numbers() {
        let raw = json!({
            "number": "INC0010001",
            "priority": 2,
            "assignment_group": { "display_value": "Network", "link": "https://sn/api/group/1" },
            "short_description": "",
            "comments": null,
            "work_notes": [{ "created_by": "admin", "value": "rebooted" }],
        });

        let incident = Incident::decode(&raw.to_string()).unwrap();
        assert_eq!(incident.number, "INC0010001");
        assert_eq!(incident.priority, "2");
        assert_eq!(incident.assignment_group, "Network");
        assert_eq!(incident.short_description, "No description");
        assert!(incident.comments.is_empty());
        assert_eq!(
            incident.work_notes,
            vec![Comment {
                created_by: "admin".into(),
                created_on: "Unknown time".into(),
                value: "rebooted".into(),
            }]
        );
    }

    #[test]
    fn rejects_non_object_records() {
        assert!(matches!(
            Incident::decode("\"INC001\""),
            Err(BridgeError::InvalidPayload(_))
        ));
        assert!(matches!(
            Incident::decode("not json"),
            Err(BridgeError::InvalidPayload(_))
        ));
    }

    #[test]
    fn assign_overrides_existing_assignee() {
        let mut incident =
            Incident::decode(r#"{"assigned_to":"Old Owner","assignee_id":"U0"}"#).unwrap();
        incident.assign("Bob", "U123");
        assert_eq!(incident.assigned_to, "Bob");
        assert_eq!(incident.assignee_id.as_deref(), Some("U123"));
    }
}
