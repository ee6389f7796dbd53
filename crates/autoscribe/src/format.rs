use autoscribe_core::{MessageData, PartData, Role, ToolState};
use chrono::{DateTime, Utc};

/// A child session's transcript, ready for embedding into its root
/// session's document.
#[derive(Debug, Clone)]
pub struct ChildTranscript {
    /// Child session title (agent name or description).
    pub title: String,
    /// Child session creation time.
    pub created_at: DateTime<Utc>,
    /// All messages of the child session.
    pub messages: Vec<MessageData>,
}

/// Renders a complete session document: header, conversation, and an
/// embedded section per child session. Pure function of its inputs.
pub fn format_session(
    title: &str,
    created_at: DateTime<Utc>,
    messages: &[MessageData],
    children: &[ChildTranscript],
) -> String {
    let mut lines = vec![
        format!("# Session: {title}"),
        String::new(),
        format!("**Created:** {}", format_timestamp(created_at)),
        String::new(),
        "---".to_string(),
        String::new(),
        "## Conversation".to_string(),
        String::new(),
    ];

    for message in messages {
        lines.push(format_message(message));
        lines.push(String::new());
    }

    if !children.is_empty() {
        lines.push("---".to_string());
        lines.push(String::new());
        lines.push("## Child Sessions".to_string());
        lines.push(String::new());
        for child in children {
            lines.push(format_child(child));
            lines.push(String::new());
        }
    }

    lines.join("\n")
}

fn role_header(role: Role, level: &str) -> String {
    match role {
        Role::User => format!("{level} 👤 User"),
        Role::Assistant => format!("{level} 🤖 Assistant"),
    }
}

fn format_message(message: &MessageData) -> String {
    let mut lines = vec![
        role_header(message.role, "###"),
        format!("*{}*", format_timestamp(message.created_at)),
        String::new(),
    ];
    push_parts(&mut lines, &message.parts);
    lines.join("\n").trim().to_string()
}

fn push_parts(lines: &mut Vec<String>, parts: &[PartData]) {
    for part in parts {
        let formatted = format_part(part);
        if !formatted.is_empty() {
            lines.push(formatted);
            lines.push(String::new());
        }
    }
}

/// Renders one message part to markdown.
pub fn format_part(part: &PartData) -> String {
    match part {
        PartData::Text { text } => text.clone(),
        PartData::Tool { tool, state } => format_tool(tool, state),
        PartData::File {
            filename,
            url,
            mime,
            local_path,
        } => format_file(filename.as_deref(), url, mime, local_path.as_deref()),
        PartData::Reasoning { text } => format_reasoning(text),
        PartData::Other { part_type } => format!("*[{part_type} part]*"),
    }
}

fn format_tool(tool: &str, state: &ToolState) -> String {
    let mut lines = vec![
        format!("#### 🔧 Tool: {tool}"),
        format!("**Status:** {}", state.status),
    ];

    if let Some(title) = &state.title {
        lines.push(format!("**Title:** {title}"));
    }

    if let Some(input) = &state.input {
        if input.as_object().map_or(true, |o| !o.is_empty()) {
            lines.push(String::new());
            lines.push("**Input:**".to_string());
            lines.push("```json".to_string());
            lines.push(
                serde_json::to_string_pretty(input).unwrap_or_else(|_| input.to_string()),
            );
            lines.push("```".to_string());
        }
    }

    if let Some(output) = &state.output {
        lines.push(String::new());
        lines.push("**Output:**".to_string());
        lines.push("```".to_string());
        lines.push(output.clone());
        lines.push("```".to_string());
    }

    if let Some(error) = &state.error {
        lines.push(String::new());
        lines.push("**Error:**".to_string());
        lines.push("```".to_string());
        lines.push(error.clone());
        lines.push("```".to_string());
    }

    lines.join("\n")
}

fn format_file(filename: Option<&str>, url: &str, mime: &str, local_path: Option<&str>) -> String {
    let filename = filename.unwrap_or("unnamed");

    // An extracted image renders as an inline image link; everything else
    // renders as a file reference, omitting unextracted data: payloads.
    if let Some(local_path) = local_path {
        if mime.starts_with("image/") {
            return format!("![{filename}]({local_path})");
        }
    }

    let mut lines = vec![
        format!("📁 **File:** {filename}"),
        format!("- MIME: {mime}"),
    ];
    if !url.starts_with("data:") {
        lines.push(format!("- URL: {url}"));
    }
    lines.join("\n")
}

fn format_reasoning(text: &str) -> String {
    [
        "💭 **Reasoning:**",
        "",
        "<details>",
        "<summary>Click to expand reasoning</summary>",
        "",
        text,
        "",
        "</details>",
    ]
    .join("\n")
}

fn format_child(child: &ChildTranscript) -> String {
    let mut lines = vec![
        format!("### 📦 Subagent: {}", child.title),
        format!("*Started: {}*", format_timestamp(child.created_at)),
        String::new(),
    ];

    for message in &child.messages {
        lines.push(role_header(message.role, "####"));
        lines.push(format!("*{}*", format_timestamp(message.created_at)));
        lines.push(String::new());
        push_parts(&mut lines, &message.parts);
    }

    lines.join("\n").trim().to_string()
}

fn format_timestamp(date: DateTime<Utc>) -> String {
    date.format("%Y-%m-%d %H:%M:%S").to_string()
}
