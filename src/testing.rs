//! In-memory collaborators for handler tests.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use clap::Parser;

use crate::{
    AppState, Cli,
    config::Config,
    error::BridgeError,
    models::{
        linear::{CreatedIssue, IssueCreateInput},
        notification::{Notifier, SlackMessage},
        ticketsystem::TicketSystem,
    },
};

pub fn test_config(linear_api_url: &str, slack_webhook_url: &str) -> Config {
    let cli = Cli::try_parse_from([
        "slack-linear-bridge",
        "--linear-api-key",
        "lin_api_test",
        "--linear-team-id",
        "team-1",
        "--slack-bot-token",
        "xoxb-test",
        "--servicenow-url",
        "https://acme.service-now.com",
        "--slack-webhook-url",
        slack_webhook_url,
        "--linear-api-url",
        linear_api_url,
        "--http-timeout-secs",
        "5",
    ])
    .unwrap();
    Config::from_cli(cli).unwrap()
}

pub fn test_state(tracker: Arc<FakeTracker>, notifier: Arc<FakeNotifier>) -> AppState {
    AppState {
        config: test_config("http://linear.invalid/graphql", "http://slack.invalid/hook"),
        tracker,
        notifier,
    }
}

pub fn created_issue() -> CreatedIssue {
    CreatedIssue {
        id: "9cfb482a".into(),
        identifier: Some("ENG-42".into()),
        number: 42,
        title: "Disk full".into(),
        url: "https://linear.app/acme/issue/ENG-42".into(),
    }
}

/// Answers create requests from a script and remembers what it was sent.
pub struct FakeTracker {
    responses: Mutex<VecDeque<Result<CreatedIssue, BridgeError>>>,
    requests: Mutex<Vec<IssueCreateInput>>,
}

impl FakeTracker {
    pub fn new(responses: Vec<Result<CreatedIssue, BridgeError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<IssueCreateInput> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TicketSystem for FakeTracker {
    fn name(&self) -> &'static str {
        "Linear"
    }

    async fn create_issue(&self, input: &IssueCreateInput) -> Result<CreatedIssue, BridgeError> {
        self.requests.lock().unwrap().push(input.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BridgeError::RemoteApi("no scripted response".into())))
    }

    async fn check_connection(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeNotifier {
    fail: bool,
    messages: Mutex<Vec<SlackMessage>>,
}

impl FakeNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<SlackMessage> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn notify(&self, message: &SlackMessage) -> Result<(), BridgeError> {
        self.messages.lock().unwrap().push(message.clone());
        if self.fail {
            return Err(BridgeError::Notification("webhook unavailable".into()));
        }
        Ok(())
    }

    async fn check_connection(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
