use anyhow::{Context, bail};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::ticketsystem::TicketSystem;
use crate::error::BridgeError;

pub const ISSUE_CREATE_MUTATION: &str = "\
mutation IssueCreate($title: String!, $description: String, $teamId: String!, $assigneeId: String) {
  issueCreate(input: { title: $title, description: $description, teamId: $teamId, assigneeId: $assigneeId }) {
    success
    issue { id identifier number title url }
  }
}";

const VIEWER_QUERY: &str = "query { viewer { id } }";

/// Variables of the `issueCreate` mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCreateInput {
    pub title: String,
    pub description: String,
    pub team_id: String,
    /// Omitted entirely when unset so Linear leaves the issue unassigned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a, V> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    variables: Option<V>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCreateData {
    pub issue_create: Option<IssueCreatePayload>,
}

#[derive(Debug, Deserialize)]
pub struct IssueCreatePayload {
    pub success: bool,
    pub issue: Option<CreatedIssue>,
}

/// Summary of an issue Linear created.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatedIssue {
    pub id: String,
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(deserialize_with = "issue_number")]
    pub number: u64,
    pub title: String,
    pub url: String,
}

/// Linear types issue numbers as `Float`.
fn issue_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .ok_or_else(|| serde::de::Error::custom(format!("invalid issue number {n}"))),
        Value::String(s) => s.parse().map_err(serde::de::Error::custom),
        other => Err(serde::de::Error::custom(format!(
            "expected an issue number, found {other}"
        ))),
    }
}

impl GraphQlResponse<IssueCreateData> {
    /// Classifies an `issueCreate` response. Only the first top-level error
    /// decides whether the assignee was the problem.
    pub fn into_outcome(self) -> Result<CreatedIssue, BridgeError> {
        if let Some(first) = self.errors.as_ref().and_then(|errors| errors.first()) {
            if first.message.contains("assigneeId") {
                return Err(BridgeError::RetryableAssignee(first.message.clone()));
            }
            return Err(BridgeError::RemoteApi(first.message.clone()));
        }

        let payload = self
            .data
            .and_then(|data| data.issue_create)
            .ok_or_else(|| {
                BridgeError::RemoteApi("Linear response carried no issueCreate result".into())
            })?;

        match payload {
            IssueCreatePayload {
                success: true,
                issue: Some(issue),
            } => Ok(issue),
            IssueCreatePayload { success: true, issue: None } => Err(BridgeError::RemoteApi(
                "Linear reported success without returning the issue".into(),
            )),
            IssueCreatePayload { success: false, .. } => {
                Err(BridgeError::RemoteApi("Linear did not create the issue".into()))
            }
        }
    }
}

/// Linear GraphQL API client.
pub struct LinearSystem {
    client: Client,
    api_url: String,
    api_key: SecretString,
}

impl LinearSystem {
    pub fn new(client: Client, api_url: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            api_key,
        }
    }

    async fn post<V: Serialize>(
        &self,
        query: &str,
        variables: Option<V>,
    ) -> Result<(reqwest::StatusCode, String), reqwest::Error> {
        let resp = self
            .client
            .post(&self.api_url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&GraphQlRequest { query, variables })
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        Ok((status, body))
    }
}

#[async_trait]
impl TicketSystem for LinearSystem {
    fn name(&self) -> &'static str {
        "Linear"
    }

    #[tracing::instrument(skip_all, fields(assigned = input.assignee_id.is_some()))]
    async fn create_issue(&self, input: &IssueCreateInput) -> Result<CreatedIssue, BridgeError> {
        debug!("Linear Request: {:?}", json!(input));

        let (status, body) = self.post(ISSUE_CREATE_MUTATION, Some(input)).await?;
        info!("Linear Response ({}): {}", status, body);

        // GraphQL errors may arrive with a 4xx status, so the body is read first.
        let resp: GraphQlResponse<IssueCreateData> = {
            let mut deserializer = serde_json::Deserializer::from_str(&body);
            serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
                warn!("Failed to parse Linear response: {}", e);
                BridgeError::RemoteApi(format!("unexpected response from Linear ({status}): {e}"))
            })?
        };

        if !status.is_success() && resp.errors.as_ref().is_none_or(|e| e.is_empty()) {
            return Err(BridgeError::RemoteApi(format!(
                "Linear API returned status {status}"
            )));
        }

        resp.into_outcome()
    }

    async fn check_connection(&self) -> anyhow::Result<()> {
        let (status, body) = self
            .post::<Value>(VIEWER_QUERY, None)
            .await
            .context("failed to send request to Linear API")?;
        if !status.is_success() {
            bail!("Linear API test failed ({status}): {body}");
        }
        let resp: GraphQlResponse<Value> =
            serde_json::from_str(&body).context("failed to parse Linear viewer response")?;
        if let Some(error) = resp.errors.as_ref().and_then(|e| e.first()) {
            bail!("Linear API test failed: {}", error.message);
        }
        Ok(())
    }
}
