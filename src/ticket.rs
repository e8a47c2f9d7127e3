use chrono::Utc;
use tracing::{error, info, warn};

use crate::{
    AppState,
    error::BridgeError,
    models::{
        incident::Incident,
        linear::IssueCreateInput,
        notification::{SlackMessage, build_acknowledgement, build_notification},
    },
};

/// Creates the Linear issue for an incident and announces it in Slack.
///
/// If Linear rejects the assignee of a request that carried an `assigneeId`,
/// the request is sent once more without it. A request without an assignee
/// is never retried.
/// The Slack announcement is best effort: its outcome is only logged and
/// never changes the acknowledgement returned here.
#[tracing::instrument(skip_all, fields(incident = %incident.number))]
pub async fn create_ticket(
    state: &AppState,
    incident: &Incident,
) -> Result<SlackMessage, BridgeError> {
    let mut input = IssueCreateInput::from_incident(incident, &state.config);
    info!(
        "Creating {} ticket '{}' (assignee: {})",
        state.tracker.name(),
        input.title,
        input.assignee_id.as_deref().unwrap_or("none")
    );

    let outcome = match state.tracker.create_issue(&input).await {
        Err(BridgeError::RetryableAssignee(message)) if input.assignee_id.is_some() => {
            warn!(%message, "assignee rejected, retrying without assigneeId");
            input.assignee_id = None;
            state.tracker.create_issue(&input).await
        }
        other => other,
    };

    let issue = outcome.map_err(|error| {
        error!(%error, "failed to create {} ticket", state.tracker.name());
        match error {
            BridgeError::RetryableAssignee(message) => BridgeError::RemoteApi(message),
            other => other,
        }
    })?;
    info!(
        id = %issue.id,
        url = %issue.url,
        number = issue.number,
        "created {} ticket",
        state.tracker.name()
    );

    let ack = build_acknowledgement(&issue);

    let message = build_notification(incident, &issue, Utc::now());
    if let Err(error) = state.notifier.notify(&message).await {
        error!(%error, "failed to send Slack notification");
    }

    Ok(ack)
}
