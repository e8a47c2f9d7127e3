use anyhow::{Context, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{incident::Incident, linear::CreatedIssue, slack::TextObject};
use crate::error::BridgeError;

/// A Slack message with Block Kit layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlackMessage {
    /// Fallback text, also used for the notification itself.
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header {
        text: TextObject,
    },
    Section {
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<TextObject>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        fields: Vec<TextObject>,
    },
    Context {
        elements: Vec<TextObject>,
    },
}

fn plain(text: impl Into<String>) -> TextObject {
    TextObject {
        kind: "plain_text".into(),
        text: text.into(),
    }
}

fn mrkdwn(text: impl Into<String>) -> TextObject {
    TextObject {
        kind: "mrkdwn".into(),
        text: text.into(),
    }
}

/// Slack link markup pointing at the new Linear issue.
pub fn issue_link(issue: &CreatedIssue) -> String {
    format!("<{}|#{}>", issue.url, issue.number)
}

/// Builds the on-call announcement for an incident that was moved to Linear.
pub fn build_notification(
    incident: &Incident,
    issue: &CreatedIssue,
    moved_at: DateTime<Utc>,
) -> SlackMessage {
    SlackMessage {
        text: format!(
            "<!here> Incident {} has been moved to Linear",
            incident.number
        ),
        blocks: vec![
            Block::Header {
                text: plain("🎫 Incident moved to Linear"),
            },
            Block::Section {
                text: None,
                fields: vec![
                    mrkdwn(format!("*Incident:*\n{}", incident.number)),
                    mrkdwn(format!("*Linear Ticket:*\n{}", issue_link(issue))),
                ],
            },
            Block::Section {
                text: None,
                fields: vec![
                    mrkdwn(format!("*Short Description:*\n{}", incident.short_description)),
                    mrkdwn(format!("*Assigned To:*\n{}", incident.assigned_to)),
                ],
            },
            Block::Context {
                elements: vec![mrkdwn(format!(
                    "Moved from ServiceNow by the Slack-Linear bridge at {}",
                    moved_at.format("%Y-%m-%d %H:%M:%S UTC")
                ))],
            },
        ],
    }
}

/// Reply shown to the user who clicked "Move to Linear".
pub fn build_acknowledgement(issue: &CreatedIssue) -> SlackMessage {
    let link = issue_link(issue);
    SlackMessage {
        text: format!("Successfully created Linear ticket {link}"),
        blocks: vec![Block::Section {
            text: Some(mrkdwn(format!(
                ":white_check_mark: Created Linear ticket {}{link}: *{}*",
                issue.identifier.as_deref().map(|id| format!("{id} ")).unwrap_or_default(),
                issue.title
            ))),
            fields: Vec::new(),
        }],
    }
}

/// Somewhere to announce created tickets.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &SlackMessage) -> Result<(), BridgeError>;

    /// Cheap authenticated call used once at startup.
    async fn check_connection(&self) -> anyhow::Result<()>;
}

/// Posts to a Slack incoming webhook and checks the bot token via `auth.test`.
pub struct SlackNotifier {
    client: Client,
    webhook_url: String,
    api_url: String,
    bot_token: SecretString,
}

#[derive(Debug, Deserialize)]
struct AuthTestResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

impl SlackNotifier {
    pub fn new(
        client: Client,
        webhook_url: impl Into<String>,
        api_url: impl Into<String>,
        bot_token: SecretString,
    ) -> Self {
        Self {
            client,
            webhook_url: webhook_url.into(),
            api_url: api_url.into(),
            bot_token,
        }
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, message: &SlackMessage) -> Result<(), BridgeError> {
        let resp = self
            .client
            .post(&self.webhook_url)
            .json(message)
            .send()
            .await
            .map_err(|e| BridgeError::Notification(e.to_string()))?;

        let status = resp.status();
        info!("Slack notification sent. Status: {}", status);
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_else(|e| {
                warn!("Failed to read Slack webhook response body: {}", e);
                "<unreadable body>".to_string()
            });
            return Err(BridgeError::Notification(format!("{status}: {body}")));
        }
        Ok(())
    }

    async fn check_connection(&self) -> anyhow::Result<()> {
        let resp: AuthTestResponse = self
            .client
            .post(format!("{}/auth.test", self.api_url))
            .bearer_auth(self.bot_token.expose_secret())
            .send()
            .await
            .context("failed to send request to Slack API")?
            .json()
            .await
            .context("failed to parse Slack auth.test response")?;

        if !resp.ok {
            bail!(
                "Slack API test failed: {}",
                resp.error.as_deref().unwrap_or("unknown error")
            );
        }
        Ok(())
    }
}
