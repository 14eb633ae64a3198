use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::ticket::TicketId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Required input not provided: {0}")]
    MissingInput(&'static str),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Pull request context error: {0}")]
    GitHubContext(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("YouTrack responded with {status} for {url}")]
    Tracker { status: u16, url: String },

    #[error("GitHub responded with {status} for {url}: {message}")]
    GitHub {
        status: u16,
        url: String,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid ticket pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("Run did not finish within {0:?}")]
    DeadlineExceeded(Duration),

    #[error("{} step(s) failed: {}", .0.len(), join_failures(.0))]
    Steps(Vec<StepFailure>),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Where in the run a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Lookup,
    Fields,
    Comment,
    Transition,
    Relink,
    Summary,
    Labels,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Lookup => "lookup",
            Stage::Fields => "fields",
            Stage::Comment => "comment",
            Stage::Transition => "transition",
            Stage::Relink => "relink",
            Stage::Summary => "summary",
            Stage::Labels => "labels",
        };
        f.write_str(name)
    }
}

/// A failed step that did not stop the run; all of them are reported at the end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    /// The ticket ID, or "PR #n" for pull request side effects
    pub subject: String,
    pub stage: Stage,
    pub message: String,
}

impl StepFailure {
    pub fn ticket(ticket: &TicketId, stage: Stage, err: &Error) -> Self {
        Self {
            subject: ticket.to_string(),
            stage,
            message: err.to_string(),
        }
    }

    pub fn pull_request(number: u64, stage: Stage, err: &Error) -> Self {
        Self {
            subject: format!("PR #{}", number),
            stage,
            message: err.to_string(),
        }
    }
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.subject, self.stage, self.message)
    }
}

fn join_failures(failures: &[StepFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
