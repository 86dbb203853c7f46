use std::collections::VecDeque;

use crate::jira::{JiraClient, JiraError, RawIssue};
use crate::logging;

/// Lazily walks every issue of one project: search pages in key order, then
/// one detail request per key.
///
/// Yields `Err` once and stops if a search page cannot be fetched. Issues
/// whose detail request fails are logged and skipped.
#[derive(Debug)]
pub struct ProjectIssues<'a> {
    client: &'a JiraClient,
    project: String,
    page_size: usize,
    start_at: usize,
    total: Option<usize>,
    pending: VecDeque<String>,
    exhausted: bool,
}

pub fn iter_project_issues<'a>(client: &'a JiraClient, project: &str) -> ProjectIssues<'a> {
    ProjectIssues {
        client,
        project: project.to_string(),
        page_size: client.page_size(),
        start_at: 0,
        total: None,
        pending: VecDeque::new(),
        exhausted: false,
    }
}

impl ProjectIssues<'_> {
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Total reported by the first search page, once it has been fetched.
    pub fn total(&self) -> Option<usize> {
        self.total
    }

    fn fetch_next_page(&mut self) -> Result<(), JiraError> {
        let page = self
            .client
            .search_issues(&self.project, self.start_at, self.page_size)?;

        let total = *self.total.get_or_insert_with(|| {
            logging::info(format!("project {}: total {} issues", self.project, page.total));
            page.total
        });

        if page.keys.is_empty() {
            self.exhausted = true;
            return Ok(());
        }

        self.start_at += page.keys.len();
        if self.start_at >= total {
            self.exhausted = true;
        }

        for key in page.keys {
            match key {
                Some(key) => self.pending.push_back(key),
                None => logging::warn(format!(
                    "project {}: search result without an issue key skipped",
                    self.project
                )),
            }
        }
        Ok(())
    }
}

impl Iterator for ProjectIssues<'_> {
    type Item = Result<RawIssue, JiraError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(key) = self.pending.pop_front() {
                match self.client.fetch_issue_details(&key) {
                    Ok(issue) => return Some(Ok(issue)),
                    Err(err) => {
                        self.client.metrics().inc_detail_failure();
                        logging::error(format!(
                            "failed to fetch details for issue {}: {}",
                            key, err
                        ));
                        continue;
                    }
                }
            }

            if self.exhausted {
                return None;
            }

            if let Err(err) = self.fetch_next_page() {
                self.exhausted = true;
                return Some(Err(err));
            }
        }
    }
}
