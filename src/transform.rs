use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::jira::RawIssue;

const SUMMARY_MAX_CHARS: usize = 300;

/// One JSONL line. Field order is the on-disk order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub issue_key: String,
    pub title: Option<String>,
    pub status: Option<String>,
    pub project: Option<String>,
    pub reporter: Option<String>,
    pub assignee: Option<String>,
    pub priority: Option<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub labels: Vec<String>,
    pub description: String,
    pub comments: Vec<String>,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum Task {
    Summarisation { input: String, output: String },
    Classification { input: String, output: String },
    QuestionAnswering { question: String, answer: String },
}

pub fn transform_issue(issue: &RawIssue) -> OutputRecord {
    let fields = &issue.fields;
    let description = fields
        .description
        .as_ref()
        .map(extract_text)
        .unwrap_or_default();
    let comments: Vec<String> = fields
        .comment
        .as_ref()
        .map(|container| {
            container
                .comments
                .iter()
                .map(|c| extract_text(&c.body))
                .filter(|body| !body.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let mut combined = description.clone();
    if let Some(first) = comments.first() {
        combined.push('\n');
        combined.push_str(first);
    }
    let summary_text = truncate_with_ellipsis(&combined, SUMMARY_MAX_CHARS);
    let issue_type = fields.issuetype.as_ref().and_then(|t| t.name.clone());

    let tasks = vec![
        Task::Summarisation {
            input: description.clone(),
            output: summary_text.clone(),
        },
        Task::Classification {
            input: description.clone(),
            output: issue_type.unwrap_or_else(|| "Unknown".to_string()),
        },
        Task::QuestionAnswering {
            question: format!("What is the issue {} about?", issue.key),
            answer: summary_text,
        },
    ];

    OutputRecord {
        issue_key: issue.key.clone(),
        title: fields.summary.clone(),
        status: fields.status.as_ref().and_then(|s| s.name.clone()),
        project: fields.project.as_ref().and_then(|p| p.key.clone()),
        reporter: fields.reporter.as_ref().and_then(|u| u.display_name.clone()),
        assignee: fields.assignee.as_ref().and_then(|u| u.display_name.clone()),
        priority: fields.priority.as_ref().and_then(|p| p.name.clone()),
        created: fields.created.clone(),
        updated: fields.updated.clone(),
        labels: fields.labels.clone().unwrap_or_default(),
        description,
        comments,
        tasks,
    }
}

fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

// Plain strings pass through; rich-text documents are flattened to their text nodes.
fn extract_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(extract_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(map) => {
            if let Some(Value::String(text)) = map.get("text") {
                return text.clone();
            }

            if let Some(content) = map.get("content") {
                return extract_text(content);
            }

            String::new()
        }
        _ => String::new(),
    }
}
