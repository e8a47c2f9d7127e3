use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Everything that can go wrong between receiving a Slack interaction and
/// answering it.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// One or more required settings were absent at startup.
    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingConfiguration(Vec<&'static str>),

    /// The inbound payload was absent, malformed or of an unsupported kind.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Unhandled action type")]
    UnhandledAction,

    /// Linear rejected the request or answered with something unusable.
    #[error("{0}")]
    RemoteApi(String),

    /// Linear rejected the `assigneeId` field; the request may be resent without it.
    #[error("{0}")]
    RetryableAssignee(String),

    #[error("Notification delivery failed: {0}")]
    Notification(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for BridgeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BridgeError::RemoteApi(format!("request timed out: {err}"))
        } else {
            BridgeError::RemoteApi(err.to_string())
        }
    }
}

impl BridgeError {
    pub fn status(&self) -> StatusCode {
        match self {
            BridgeError::InvalidPayload(_) | BridgeError::UnhandledAction => StatusCode::BAD_REQUEST,
            // Remote failures are reported back to Slack as a normal acknowledgement.
            BridgeError::RemoteApi(_) | BridgeError::RetryableAssignee(_) => StatusCode::OK,
            BridgeError::MissingConfiguration(_)
            | BridgeError::Notification(_)
            | BridgeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            BridgeError::RemoteApi(_) | BridgeError::RetryableAssignee(_) => {
                json!({ "text": format!("Failed to create Linear ticket: {self}") })
            }
            BridgeError::InvalidPayload(_) | BridgeError::UnhandledAction => {
                json!({ "error": self.to_string() })
            }
            _ => json!({ "error": "Internal server error" }),
        };
        (status, Json(body)).into_response()
    }
}
