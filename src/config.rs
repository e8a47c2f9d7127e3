use std::time::Duration;

use reqwest::Client;
use secrecy::SecretString;

use crate::{Cli, error::BridgeError};

/// Read-only settings shared by every request.
#[derive(Debug)]
pub struct Config {
    pub linear: LinearConfig,
    pub slack: SlackConfig,
    pub servicenow_url: String,
    pub port: u16,
    pub http_timeout: Duration,
    pub skip_startup_checks: bool,
}

#[derive(Debug)]
pub struct LinearConfig {
    pub api_url: String,
    pub api_key: SecretString,
    pub team_id: String,
}

#[derive(Debug)]
pub struct SlackConfig {
    pub api_url: String,
    pub bot_token: SecretString,
    pub webhook_url: String,
}

impl Config {
    /// Validates the command line, reporting every missing required value at once.
    pub fn from_cli(cli: Cli) -> Result<Self, BridgeError> {
        let mut missing = Vec::new();
        let mut require = |value: Option<String>, name: &'static str| {
            match value.filter(|v| !v.trim().is_empty()) {
                Some(v) => v,
                None => {
                    missing.push(name);
                    String::new()
                }
            }
        };

        let api_key = require(cli.linear_api_key, "LINEAR_API_KEY");
        let team_id = require(cli.linear_team_id, "LINEAR_TEAM_ID");
        let bot_token = require(cli.slack_bot_token, "SLACK_BOT_TOKEN");
        let servicenow_url = require(cli.servicenow_url, "SERVICENOW_URL");
        let webhook_url = require(cli.slack_webhook_url, "SLACK_WEBHOOK_URL");

        if !missing.is_empty() {
            return Err(BridgeError::MissingConfiguration(missing));
        }

        Ok(Self {
            linear: LinearConfig {
                api_url: cli.linear_api_url,
                api_key: SecretString::from(api_key),
                team_id,
            },
            slack: SlackConfig {
                api_url: cli.slack_api_url.trim_end_matches('/').to_string(),
                bot_token: SecretString::from(bot_token),
                webhook_url,
            },
            servicenow_url,
            port: cli.port,
            http_timeout: Duration::from_secs(cli.http_timeout_secs),
            skip_startup_checks: cli.skip_startup_checks,
        })
    }

    /// HTTP client used for every outbound call, bounded by the configured timeout.
    pub fn http_client(&self) -> Result<Client, BridgeError> {
        Client::builder()
            .timeout(self.http_timeout)
            .build()
            .map_err(|e| BridgeError::Internal(format!("failed to build HTTP client: {e}")))
    }
}
