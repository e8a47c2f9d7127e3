use super::incident::Comment;

/// Renders ServiceNow journal entries as a markdown section for the Linear
/// issue description. Entries keep the order they were given in.
pub fn format_comments(comments: &[Comment], work_notes: &[Comment]) -> String {
    let mut out = String::from("### Comments and Work Notes\n");

    for (heading, entries) in [("Additional Comments", comments), ("Work Notes", work_notes)] {
        if entries.is_empty() {
            continue;
        }
        out.push_str(&format!("\n#### {heading}\n"));
        let rendered: Vec<String> = entries
            .iter()
            .map(|c| format!("**{} - {}**\n{}", c.created_by, c.created_on, c.value))
            .collect();
        out.push_str(&rendered.join("\n\n"));
        out.push('\n');
    }

    out
}
