use std::path::Path;
use std::sync::Arc;

use crate::fetch::iter_project_issues;
use crate::jira::{JiraClient, JiraError};
use crate::transform::{transform_issue, OutputRecord};
use crate::writer::{write_all, WriteError, WriteSummary};

/// Chains the projects in order into one lazy record stream. Once `max_issues`
/// records have been yielded the stream ends without polling the fetchers
/// again, so no further requests are made.
pub fn issue_stream<'a>(
    client: &'a JiraClient,
    projects: &'a [String],
    max_issues: Option<usize>,
) -> impl Iterator<Item = Result<OutputRecord, JiraError>> + 'a {
    projects
        .iter()
        .flat_map(move |project| iter_project_issues(client, project))
        .map(|item| item.map(|raw| transform_issue(&raw)))
        .take(max_issues.unwrap_or(usize::MAX))
}

/// Fetches, transforms and appends every issue of `projects`.
pub fn run(
    client: &JiraClient,
    projects: &[String],
    output_path: &Path,
    checkpoint_path: Option<&Path>,
    max_issues: Option<usize>,
) -> Result<WriteSummary, WriteError> {
    write_all(
        issue_stream(client, projects, max_issues),
        output_path,
        checkpoint_path,
        Arc::clone(client.metrics()),
    )
}
