use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::config::AppConfig;
use crate::logging;
use crate::metrics::Metrics;

const SEARCH_FIELDS: &str =
    "summary,description,issuetype,status,priority,reporter,assignee,created,updated,labels";
const MAX_ERROR_BODY_CHARS: usize = 1000;

/// Bounded retry settings shared by every request a client issues.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff_factor: 1.0,
        }
    }
}

impl RetryPolicy {
    /// Wait applied after failed attempt `attempt` (0-based): `backoff_factor * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let seconds = self.backoff_factor * 2f64.powi(exponent);
        Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
    }
}

/// Blocking wait used between attempts. Replaceable so callers can observe waits.
pub type Sleeper = Arc<dyn Fn(Duration) + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum JiraError {
    #[error("jira request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("jira returned HTTP {status}: {body}")]
    Http { status: StatusCode, body: String },
    #[error("failed to decode jira response: {source}; body: {body}")]
    Decode {
        source: serde_json::Error,
        body: String,
    },
    #[error("invalid jira base url '{0}'")]
    InvalidBaseUrl(String),
    #[error("{method} {url} failed after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        method: Method,
        url: String,
        attempts: u32,
        #[source]
        source: Box<JiraError>,
    },
}

/// Raw issue detail as returned by `GET /issue/{key}?expand=comments`.
/// A payload without `key` keeps the key it was requested by.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawIssue {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub fields: RawFields,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFields {
    pub summary: Option<String>,
    pub description: Option<Value>,
    pub issuetype: Option<NamedObj>,
    pub status: Option<NamedObj>,
    pub priority: Option<NamedObj>,
    pub reporter: Option<UserObj>,
    pub assignee: Option<UserObj>,
    pub project: Option<ProjectObj>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub labels: Option<Vec<String>>,
    pub comment: Option<CommentContainer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamedObj {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserObj {
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectObj {
    pub key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentContainer {
    #[serde(default)]
    pub comments: Vec<CommentObj>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentObj {
    #[serde(default)]
    pub body: Value,
}

/// One page of the search endpoint, reduced to what pagination needs.
#[derive(Debug, Clone)]
pub struct SearchPage {
    pub keys: Vec<Option<String>>,
    pub total: usize,
}

#[derive(Clone)]
pub struct JiraClient {
    pub base_url: String,
    http: Client,
    policy: RetryPolicy,
    page_size: usize,
    default_retry_after: Duration,
    metrics: Arc<Metrics>,
    sleeper: Sleeper,
}

impl fmt::Debug for JiraClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JiraClient")
            .field("base_url", &self.base_url)
            .field("policy", &self.policy)
            .field("page_size", &self.page_size)
            .field("default_retry_after", &self.default_retry_after)
            .finish_non_exhaustive()
    }
}

impl JiraClient {
    pub fn new(base_url: &str) -> Result<Self, JiraError> {
        Self::new_with_metrics(
            base_url,
            RetryPolicy::default(),
            Duration::from_secs(30),
            Arc::new(Metrics::new()),
        )
    }

    pub fn new_with_metrics(
        base_url: &str,
        policy: RetryPolicy,
        timeout: Duration,
        metrics: Arc<Metrics>,
    ) -> Result<Self, JiraError> {
        let http = Client::builder().timeout(timeout).build()?;
        let normalized_base_url = normalize_base_url(base_url)?;
        Ok(Self {
            base_url: normalized_base_url,
            http,
            policy,
            page_size: 100,
            default_retry_after: Duration::from_secs(5),
            metrics,
            sleeper: Arc::new(thread::sleep),
        })
    }

    pub fn from_config(cfg: &AppConfig, metrics: Arc<Metrics>) -> Result<Self, JiraError> {
        Ok(
            Self::new_with_metrics(&cfg.jira.base_url, cfg.retry_policy(), cfg.timeout(), metrics)?
                .with_page_size(cfg.jira.page_size)
                .with_default_retry_after(cfg.default_retry_after()),
        )
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, 100);
        self
    }

    pub fn with_default_retry_after(mut self, wait: Duration) -> Self {
        self.default_retry_after = wait;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Sleeper) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Sends one request and reads its body, retrying 429, 5xx, other 4xx and
    /// transport failures (including a body that fails mid-read) until the
    /// policy is exhausted.
    pub fn execute(
        &self,
        method: Method,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<String, JiraError> {
        let mut attempt: u32 = 0;
        loop {
            self.metrics.inc_api_request();
            let failure = match self.http.request(method.clone(), url).query(params).send() {
                Ok(response) if response.status().is_success() => match response.text() {
                    Ok(body) => return Ok(body),
                    Err(err) => JiraError::Request(err),
                },
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::TOO_MANY_REQUESTS {
                        let wait = retry_after(&response, self.default_retry_after);
                        logging::warn(format!(
                            "rate limited (429) on {} {}; waiting {:.1}s before retry",
                            method,
                            url,
                            wait.as_secs_f64()
                        ));
                        (self.sleeper)(wait);
                    }
                    let body = response.text().unwrap_or_default();
                    JiraError::Http {
                        status,
                        body: short_body(&body),
                    }
                }
                Err(err) => JiraError::Request(err),
            };

            if attempt >= self.policy.max_retries {
                logging::error(format!("max retries exceeded for {} {}", method, url));
                return Err(JiraError::RetriesExhausted {
                    method,
                    url: url.to_string(),
                    attempts: attempt + 1,
                    source: Box::new(failure),
                });
            }

            let wait = self.policy.delay_for(attempt);
            logging::warn(format!(
                "request error: {}. retrying in {:.1}s (attempt {}/{})",
                failure,
                wait.as_secs_f64(),
                attempt + 1,
                self.policy.max_retries
            ));
            self.metrics.inc_retry();
            (self.sleeper)(wait);
            attempt += 1;
        }
    }

    pub fn search_issues(
        &self,
        project: &str,
        start_at: usize,
        max_results: usize,
    ) -> Result<SearchPage, JiraError> {
        let url = format!("{}/search", self.base_url);
        let params = [
            ("jql", format!("project={} order by key asc", project)),
            ("startAt", start_at.to_string()),
            ("maxResults", max_results.to_string()),
            ("fields", SEARCH_FIELDS.to_string()),
        ];
        let body = self.execute(Method::GET, &url, &params)?;
        let payload: SearchResponse = decode(&body)?;
        self.metrics.inc_page_fetched();
        logging::debug(format!(
            "jira search project={} start_at={} page_count={} total={}",
            project,
            start_at,
            payload.issues.len(),
            payload.total
        ));

        Ok(SearchPage {
            keys: payload.issues.into_iter().map(|issue| issue.key).collect(),
            total: payload.total,
        })
    }

    pub fn fetch_issue_details(&self, issue_key: &str) -> Result<RawIssue, JiraError> {
        let url = format!("{}/issue/{}", self.base_url, issue_key);
        let params = [("expand", "comments".to_string())];
        let body = self.execute(Method::GET, &url, &params)?;
        let mut issue: RawIssue = decode(&body)?;
        if issue.key.is_empty() {
            issue.key = issue_key.to_string();
        }
        self.metrics.inc_issue_fetched();
        Ok(issue)
    }
}

fn decode<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, JiraError> {
    serde_json::from_str(body).map_err(|source| JiraError::Decode {
        source,
        body: short_body(body),
    })
}

fn short_body(body: &str) -> String {
    if body.chars().count() > MAX_ERROR_BODY_CHARS {
        let head: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{}...", head)
    } else {
        body.to_string()
    }
}

fn retry_after(response: &Response, default: Duration) -> Duration {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|header| header.to_str().ok())
        .and_then(|value| value.trim().parse::<f64>().ok())
        .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())
        .unwrap_or(default)
}

fn normalize_base_url(raw: &str) -> Result<String, JiraError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(JiraError::InvalidBaseUrl(raw.to_string()));
    }

    let candidate = if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let parsed =
        reqwest::Url::parse(&candidate).map_err(|_| JiraError::InvalidBaseUrl(raw.to_string()))?;
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    total: usize,
    #[serde(default)]
    issues: Vec<SearchIssue>,
}

#[derive(Debug, Deserialize)]
struct SearchIssue {
    key: Option<String>,
}
