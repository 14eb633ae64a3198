use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{GitHubConfig, HttpConfig};
use crate::error::{Error, Result};
use crate::pr::PullRequest;

const API_VERSION: &str = "2022-11-28";

// Request and response bodies for the REST endpoints

#[derive(Serialize, Deserialize, Debug)]
struct PullRequestBody {
    #[serde(default)]
    body: Option<String>,
}

#[derive(Serialize, Debug)]
struct UpdatePullRequest<'a> {
    body: &'a str,
}

#[derive(Serialize, Debug)]
struct CreateComment<'a> {
    body: &'a str,
}

#[derive(Serialize, Debug)]
struct AddLabels<'a> {
    labels: &'a [String],
}

#[derive(Deserialize, Debug, Default)]
struct ApiError {
    #[serde(default)]
    message: String,
}

/// Everything the run needs from the pull request host
#[async_trait]
pub trait PullRequestHost: Send + Sync {
    /// Current PR description; `None` when the PR has no body at all
    async fn description(&self) -> Result<Option<String>>;

    async fn update_description(&self, body: &str) -> Result<()>;

    async fn comment(&self, body: &str) -> Result<()>;

    async fn add_labels(&self, labels: &[String]) -> Result<()>;
}

/// GitHub REST client bound to one pull request
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    api_url: String,
    pr: PullRequest,
    dry_run: bool,
}

impl GitHubClient {
    pub fn new(
        config: &GitHubConfig,
        http: &HttpConfig,
        pr: PullRequest,
        dry_run: bool,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|_| Error::Config("github-token contains invalid characters".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            )),
        );
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(http.request_timeout())
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            pr,
            dry_run,
        })
    }

    fn pull_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/pulls/{}",
            self.api_url, self.pr.owner, self.pr.repo, self.pr.number
        )
    }

    fn issue_url(&self, tail: &str) -> String {
        format!(
            "{}/repos/{}/{}/issues/{}/{}",
            self.api_url, self.pr.owner, self.pr.repo, self.pr.number, tail
        )
    }

    async fn send(&self, request: RequestBuilder, url: &str) -> Result<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error: ApiError = response.json().await.unwrap_or_default();
        Err(Error::GitHub {
            status: status.as_u16(),
            url: url.to_string(),
            message: error.message,
        })
    }
}

#[async_trait]
impl PullRequestHost for GitHubClient {
    async fn description(&self) -> Result<Option<String>> {
        let url = self.pull_url();
        let response = self.send(self.client.get(&url), &url).await?;
        let pull: PullRequestBody = response.json().await?;
        Ok(pull.body)
    }

    async fn update_description(&self, body: &str) -> Result<()> {
        if self.dry_run {
            info!("Dry run - would update PR description to {:?}", body);
            return Ok(());
        }

        let url = self.pull_url();
        self.send(self.client.patch(&url).json(&UpdatePullRequest { body }), &url)
            .await?;
        info!("Updated PR description");
        Ok(())
    }

    async fn comment(&self, body: &str) -> Result<()> {
        if self.dry_run {
            info!("Dry run - would comment PR: {}", body);
            return Ok(());
        }

        let url = self.issue_url("comments");
        self.send(self.client.post(&url).json(&CreateComment { body }), &url)
            .await?;
        info!("Commented PR");
        Ok(())
    }

    async fn add_labels(&self, labels: &[String]) -> Result<()> {
        if self.dry_run {
            info!("Dry run - would label PR with {:?}", labels);
            return Ok(());
        }

        let url = self.issue_url("labels");
        self.send(self.client.post(&url).json(&AddLabels { labels }), &url)
            .await?;
        info!(count = labels.len(), "Labelled PR");
        Ok(())
    }
}
