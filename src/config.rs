//! Configuration for youtrack-link
//!
//! Settings come from an optional YAML file and are overridden by flags or
//! the `INPUT_*` variables GitHub Actions sets. Everything that is compared
//! case-insensitively later on is lowercased here, once.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::error::{Error, Result};

const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub youtrack: YouTrackConfig,
    pub github: GitHubConfig,
    pub http: HttpConfig,

    #[serde(skip)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct YouTrackConfig {
    /// Base URL of the YouTrack instance, always ends with '/' once resolved
    pub url: String,
    pub token: String,
    /// Ticket prefix, e.g. "PROJ"
    pub project_id: String,
    /// Name of the custom field holding the workflow state (matched exactly)
    pub column_field: String,
    /// States that allow the automated move, lowercased
    pub column_triggers: Vec<String>,
    pub column_target: String,
    /// Custom fields turned into labels, lowercased
    pub label_fields: Vec<String>,
    pub label_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GitHubConfig {
    pub token: String,
    pub api_url: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: DEFAULT_GITHUB_API_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    pub request_timeout_secs: u64,
    pub run_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            run_timeout_secs: 300,
            max_retries: 3,
            retry_backoff_ms: 500,
        }
    }
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Config {
    /// Load a config file without resolving or validating it
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Build the effective configuration: file, then flags/env, then normalization
    pub fn resolve(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        config.apply_args(args);
        config.normalize();
        config.validate()?;

        Ok(config)
    }

    fn apply_args(&mut self, args: &Args) {
        fn set(target: &mut String, value: &Option<String>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }

        let yt = &mut self.youtrack;
        set(&mut yt.url, &args.yt_url);
        set(&mut yt.token, &args.yt_token);
        set(&mut yt.project_id, &args.yt_project_id);
        set(&mut yt.column_field, &args.yt_column_field);
        set(&mut yt.column_target, &args.yt_column_target);
        set(&mut yt.label_prefix, &args.yt_label_prefix);
        if let Some(triggers) = &args.yt_column_triggers {
            yt.column_triggers = split_list(triggers);
        }
        if let Some(fields) = &args.yt_label_fields {
            yt.label_fields = split_list(fields);
        }

        set(&mut self.github.token, &args.github_token);
        set(&mut self.github.api_url, &args.github_api_url);

        if let Some(secs) = args.request_timeout_secs {
            self.http.request_timeout_secs = secs;
        }
        if let Some(secs) = args.run_timeout_secs {
            self.http.run_timeout_secs = secs;
        }
        if let Some(retries) = args.max_retries {
            self.http.max_retries = retries;
        }
        if let Some(ms) = args.retry_backoff_ms {
            self.http.retry_backoff_ms = ms;
        }

        self.dry_run = self.dry_run || args.dry_run;
    }

    fn normalize(&mut self) {
        let yt = &mut self.youtrack;

        yt.url = yt.url.trim().to_string();
        if !yt.url.is_empty() && !yt.url.ends_with('/') {
            yt.url.push('/');
        }
        yt.project_id = yt.project_id.trim().to_string();
        yt.column_field = yt.column_field.trim().to_string();
        yt.column_target = yt.column_target.trim().to_string();
        yt.column_triggers = normalize_names(&yt.column_triggers);
        yt.label_fields = normalize_names(&yt.label_fields);

        self.github.api_url = self.github.api_url.trim_end_matches('/').to_string();
    }

    fn validate(&self) -> Result<()> {
        let yt = &self.youtrack;
        let required = [
            (yt.url.as_str(), "yt-url"),
            (yt.token.as_str(), "yt-token"),
            (yt.project_id.as_str(), "yt-project-id"),
            (yt.column_field.as_str(), "yt-column-field"),
            (yt.column_target.as_str(), "yt-column-target"),
            (self.github.token.as_str(), "github-token"),
        ];
        for (value, name) in required {
            if value.is_empty() {
                return Err(Error::MissingInput(name));
            }
        }

        if yt.column_triggers.is_empty() {
            return Err(Error::MissingInput("yt-column-triggers"));
        }

        if !yt.url.starts_with("http://") && !yt.url.starts_with("https://") {
            return Err(Error::Config(format!(
                "yt-url must be an http(s) URL, got {}",
                yt.url
            )));
        }

        Ok(())
    }
}

/// Split a comma-separated input, dropping blanks
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn normalize_names(names: &[String]) -> Vec<String> {
    names
        .iter()
        .map(|n| n.trim().to_lowercase())
        .filter(|n| !n.is_empty())
        .collect()
}
