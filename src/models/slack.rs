use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::error;

use crate::error::BridgeError;

/// The only interaction kind this service answers.
pub const BLOCK_ACTIONS: &str = "block_actions";

/// Action id of the user picker shown next to an incident.
pub const ASSIGN_USER: &str = "assign_user";

/// Action id of the "Move to Linear" button.
pub const MOVE_TO_LINEAR: &str = "move_to_linear";

/// Form body Slack posts to the interactivity endpoint.
#[derive(Debug, Deserialize)]
pub struct InteractionForm {
    /// JSON encoded [`InteractionPayload`].
    pub payload: Option<String>,
}

/// A user's click or selection inside a Slack message.
#[derive(Debug, Deserialize)]
pub struct InteractionPayload {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub actions: Vec<SlackAction>,
    #[serde(default)]
    pub state: Option<InteractionState>,
}

/// Current values of every input in the message, keyed by block id and then
/// by action id. Key order follows the payload.
#[derive(Debug, Default, Deserialize)]
pub struct InteractionState {
    #[serde(default)]
    pub values: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct SlackAction {
    pub action_id: String,
    #[serde(default)]
    pub selected_option: Option<SelectedOption>,
    /// For buttons, the serialized incident the button was rendered for.
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SelectedOption {
    pub text: TextObject,
    pub value: String,
}

/// Slack composition text object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextObject {
    #[serde(rename = "type", default = "plain_text")]
    pub kind: String,
    pub text: String,
}

fn plain_text() -> String {
    "plain_text".to_string()
}

impl InteractionPayload {
    /// Decodes the raw `payload` form field, rejecting anything that is not a
    /// block action.
    pub fn parse(raw: &str) -> Result<Self, BridgeError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let payload: InteractionPayload = serde_path_to_error::deserialize(&mut deserializer)
            .map_err(|e| {
                error!("Failed to parse Slack interaction payload: {}", e);
                BridgeError::InvalidPayload(e.to_string())
            })?;

        if payload.kind != BLOCK_ACTIONS {
            return Err(BridgeError::InvalidPayload(format!(
                "unsupported interaction type '{}'",
                payload.kind
            )));
        }
        Ok(payload)
    }

    /// Walks every block in the form state and returns the `assign_user`
    /// selection. Blocks are visited in payload order and the last completed
    /// selection wins.
    pub fn assignee_selection(&self) -> Option<SelectedOption> {
        let values = &self.state.as_ref()?.values;
        values
            .values()
            .filter_map(|block| block.get(ASSIGN_USER)?.get("selected_option"))
            .filter(|option| !option.is_null())
            .filter_map(|option| serde_json::from_value::<SelectedOption>(option.clone()).ok())
            .last()
    }
}
