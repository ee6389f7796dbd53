use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

#[allow(clippy::unwrap_used)]
static INVALID_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[/\\:*?"<>|\s]+"#).unwrap());

#[allow(clippy::unwrap_used)]
static REPEATED_HYPHENS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-{2,}").unwrap());

/// Reduces a topic to a filesystem-safe slug: path separators, shell
/// metacharacters, and whitespace become hyphens, runs collapse, edges are
/// trimmed, and the result is truncated to `max_length`. An empty result
/// falls back to `untitled`.
pub fn sanitize_topic(topic: &str, max_length: usize) -> String {
    let replaced = INVALID_FILENAME_CHARS.replace_all(topic, "-");
    let collapsed = REPEATED_HYPHENS.replace_all(&replaced, "-");
    let mut sanitized = collapsed.trim_matches('-').to_string();

    if sanitized.chars().count() > max_length {
        sanitized = sanitized.chars().take(max_length).collect();
        sanitized = sanitized.trim_matches('-').to_string();
    }

    if sanitized.is_empty() {
        "untitled".to_string()
    } else {
        sanitized
    }
}

/// Formats a timestamp for use in filenames: `YYYYMMDD-HH-MM-SS`.
pub fn format_file_date(date: DateTime<Utc>) -> String {
    date.format("%Y%m%d-%H-%M-%S").to_string()
}

/// Builds the transcript filename for a session: date prefix plus sanitized
/// topic, with a `.md` extension. Deterministic for a given topic and
/// creation time, which is what keeps re-flushes writing the same file.
pub fn generate_filename(topic: &str, created_at: DateTime<Utc>, max_topic_length: usize) -> String {
    format!(
        "{}-{}.md",
        format_file_date(created_at),
        sanitize_topic(topic, max_topic_length)
    )
}

/// Derives a short topic from the opening of a message: newlines and runs
/// of whitespace collapse to single spaces, and the result is cut at
/// `max_length`, preferring the last word boundary when one falls past the
/// halfway point.
pub fn extract_topic(message_text: &str, max_length: usize) -> String {
    let cleaned = message_text.split_whitespace().collect::<Vec<_>>().join(" ");

    if cleaned.chars().count() <= max_length {
        return if cleaned.is_empty() {
            "untitled".to_string()
        } else {
            cleaned
        };
    }

    let truncated: String = cleaned.chars().take(max_length).collect();
    if let Some(last_space) = truncated.rfind(' ') {
        if last_space > max_length / 2 {
            return truncated[..last_space].to_string();
        }
    }
    truncated
}
