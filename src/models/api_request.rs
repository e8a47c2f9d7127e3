use tracing::debug;

use super::{comments::format_comments, incident::Incident, linear::IssueCreateInput};
use crate::config::Config;

/// Path of the incident form in the ServiceNow UI; the `sys_id` is appended.
const INCIDENT_PATH: &str = "/nav_to.do?uri=incident.do?sys_id=";

impl IssueCreateInput {
    pub fn from_incident(incident: &Incident, config: &Config) -> Self {
        debug!("Incident: {:?}", incident);
        Self {
            title: incident.short_description.clone(),
            description: build_description(incident, &config.servicenow_url),
            team_id: config.linear.team_id.clone(),
            assignee_id: incident.assignee_id.clone(),
        }
    }
}

pub fn incident_url(servicenow_url: &str, sys_id: &str) -> String {
    format!(
        "{}{}{}",
        servicenow_url.trim_end_matches('/'),
        INCIDENT_PATH,
        sys_id
    )
}

/// Markdown body of the Linear issue.
pub fn build_description(incident: &Incident, servicenow_url: &str) -> String {
    format!(
        "## ServiceNow Incident {number}\n\
         \n\
         **Incident Number:** {number}\n\
         **Short Description:** {short_description}\n\
         **State:** {state}\n\
         **Priority:** {priority}\n\
         **Assignment Group:** {assignment_group}\n\
         **Assigned To:** {assigned_to}\n\
         \n\
         **ServiceNow Link:** [{number}]({link})\n\
         \n\
         ### Description\n\
         {description}\n\
         \n\
         {comments}",
        number = incident.number,
        short_description = incident.short_description,
        state = incident.state,
        priority = incident.priority,
        assignment_group = incident.assignment_group,
        assigned_to = incident.assigned_to,
        link = incident_url(servicenow_url, &incident.sys_id),
        description = incident.description,
        comments = format_comments(&incident.comments, &incident.work_notes),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_joins_base_url_and_sys_id() {
        assert_eq!(
            incident_url("https://acme.service-now.com/", "46d44a"),
            "https://acme.service-now.com/nav_to.do?uri=incident.do?sys_id=46d44a"
        );
        assert_eq!(
            incident_url("https://acme.service-now.com", ""),
            "https://acme.service-now.com/nav_to.do?uri=incident.do?sys_id="
        );
    }

    #[test]
    fn description_embeds_incident_fields() {
        let incident = Incident::decode(
            r#"{
                "number": "INC001",
                "short_description": "Disk full",
                "state": "In Progress",
                "priority": "1 - Critical",
                "description": "/var is at 100%",
                "sys_id": "46d44a",
                "comments": [{"created_by": "jdoe", "created_on": "2024-05-01", "value": "Looking"}]
            }"#,
        )
        .unwrap();

        let description = build_description(&incident, "https://acme.service-now.com");
        assert!(description.starts_with("## ServiceNow Incident INC001\n\n"));
        assert!(description.contains("**State:** In Progress\n"));
        assert!(description.contains("**Priority:** 1 - Critical\n"));
        assert!(description.contains("**Assignment Group:** N/A\n"));
        assert!(description.contains("**Assigned To:** Unassigned\n"));
        assert!(description.contains(
            "[INC001](https://acme.service-now.com/nav_to.do?uri=incident.do?sys_id=46d44a)"
        ));
        assert!(description.contains("### Description\n/var is at 100%\n"));
        assert!(description.ends_with(
            "### Comments and Work Notes\n\n#### Additional Comments\n**jdoe - 2024-05-01**\nLooking\n"
        ));
    }
}
