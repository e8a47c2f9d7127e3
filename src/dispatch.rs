use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    AppState,
    error::BridgeError,
    models::{
        incident::Incident,
        notification::SlackMessage,
        slack::{ASSIGN_USER, InteractionPayload, MOVE_TO_LINEAR, SlackAction},
    },
    ticket::create_ticket,
};

/// Routes one Slack interaction to its handler.
///
/// `raw` is the `payload` form field. Every shape problem is turned into a
/// [`BridgeError`] here; nothing below this point sees unparsed JSON.
#[tracing::instrument(skip_all, fields(request_id = %Uuid::new_v4(), action_id))]
pub async fn handle_interaction(
    state: &AppState,
    raw: Option<&str>,
) -> Result<SlackMessage, BridgeError> {
    let raw = raw
        .filter(|raw| !raw.trim().is_empty())
        .ok_or_else(|| BridgeError::InvalidPayload("missing payload field".into()))?;
    let payload = InteractionPayload::parse(raw)?;

    let Some(action) = payload.actions.first() else {
        warn!("interaction carried no actions");
        return Err(BridgeError::UnhandledAction);
    };
    tracing::Span::current().record("action_id", action.action_id.as_str());
    info!("received Slack action");

    match action.action_id.as_str() {
        ASSIGN_USER => assign_user(action),
        MOVE_TO_LINEAR => move_to_linear(state, &payload, action).await,
        other => {
            warn!("Unhandled action type: {}", other);
            Err(BridgeError::UnhandledAction)
        }
    }
}

fn assign_user(action: &SlackAction) -> Result<SlackMessage, BridgeError> {
    let option = action.selected_option.as_ref().ok_or_else(|| {
        BridgeError::InvalidPayload("assign_user action without a selected option".into())
    })?;
    info!(user = %option.value, "user selected");

    Ok(SlackMessage {
        text: format!("User selected: {}", option.text.text),
        blocks: Vec::new(),
    })
}

async fn move_to_linear(
    state: &AppState,
    payload: &InteractionPayload,
    action: &SlackAction,
) -> Result<SlackMessage, BridgeError> {
    let value = action.value.as_deref().ok_or_else(|| {
        BridgeError::InvalidPayload("move_to_linear action without an incident".into())
    })?;
    let mut incident = Incident::decode(value)?;

    if let Some(option) = payload.assignee_selection() {
        info!(assignee = %option.value, "assigning ticket to {}", option.text.text);
        incident.assign(option.text.text, option.value);
    }

    create_ticket(state, &incident).await
}
