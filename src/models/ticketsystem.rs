use async_trait::async_trait;

use super::linear::{CreatedIssue, IssueCreateInput};
use crate::error::BridgeError;

/// Trait defining the behavior of the project tracker tickets are created in
#[async_trait]
pub trait TicketSystem: Send + Sync {
    /// Get the name of the ticket system
    fn name(&self) -> &'static str;

    /// Sends a single create request.
    ///
    /// Returns [`BridgeError::RetryableAssignee`] when the tracker rejected the
    /// assignee and [`BridgeError::RemoteApi`] for every other failure.
    async fn create_issue(&self, input: &IssueCreateInput) -> Result<CreatedIssue, BridgeError>;

    /// Cheap authenticated call used once at startup.
    async fn check_connection(&self) -> anyhow::Result<()>;
}
