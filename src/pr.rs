use std::path::Path;

use serde_json::Value;

use crate::cli::Args;
use crate::error::{Error, Result};

const DEFAULT_SERVER_URL: &str = "https://github.com";

/// The pull request this run works on
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PullRequest {
    /// Repository owner (user or organisation)
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// The PR number
    pub number: u64,
    /// Login of whoever triggered the workflow
    pub actor: String,
    /// Web URL of the GitHub instance, without trailing slash
    pub server_url: String,
}

impl PullRequest {
    /// Creates a new PullRequest with default values
    pub fn new() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            ..Self::default()
        }
    }

    /// Sets owner and repo from an "owner/repo" string
    pub fn with_repository(mut self, full_name: &str) -> Result<Self> {
        let (owner, repo) = full_name
            .split_once('/')
            .filter(|(o, r)| !o.is_empty() && !r.is_empty() && !r.contains('/'))
            .ok_or_else(|| {
                Error::GitHubContext(format!("expected owner/repo, got {:?}", full_name))
            })?;
        self.owner = owner.to_string();
        self.repo = repo.to_string();
        Ok(self)
    }

    /// Sets the PR number and returns self for chaining
    pub fn with_number(mut self, number: u64) -> Self {
        self.number = number;
        self
    }

    /// Sets the actor and returns self for chaining
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    /// Sets the server URL and returns self for chaining
    pub fn with_server_url(mut self, url: &str) -> Self {
        self.server_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Resolve the PR from flags and the GitHub Actions environment
    pub fn from_args(args: &Args) -> Result<Self> {
        let repository = args
            .repository
            .as_deref()
            .ok_or_else(|| Error::GitHubContext("GITHUB_REPOSITORY is not set".into()))?;

        let number = match (args.pr_number, &args.event_path) {
            (Some(number), _) => number,
            (None, Some(path)) => number_from_event_file(path)?,
            (None, None) => {
                return Err(Error::GitHubContext(
                    "no --pr-number given and GITHUB_EVENT_PATH is not set".into(),
                ))
            }
        };

        let mut pr = Self::new()
            .with_repository(repository)?
            .with_number(number)
            .with_actor(args.actor.clone().unwrap_or_default());
        if let Some(url) = &args.server_url {
            pr = pr.with_server_url(url);
        }
        Ok(pr)
    }

    /// "owner/repo"
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    pub fn repo_url(&self) -> String {
        format!("{}/{}/{}", self.server_url, self.owner, self.repo)
    }

    pub fn url(&self) -> String {
        format!("{}/pull/{}", self.repo_url(), self.number)
    }
}

fn number_from_event_file(path: &Path) -> Result<u64> {
    let contents = std::fs::read_to_string(path)?;
    let event: Value = serde_json::from_str(&contents)?;
    number_from_event(&event)
}

/// Find the PR number in a workflow event payload
pub fn number_from_event(event: &Value) -> Result<u64> {
    [
        &event["pull_request"]["number"],
        &event["number"],
        &event["issue"]["number"],
    ]
    .into_iter()
    .find_map(Value::as_u64)
    .ok_or_else(|| Error::GitHubContext("event payload does not reference a pull request".into()))
}
