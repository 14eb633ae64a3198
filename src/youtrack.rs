//! YouTrack REST adapter
//!
//! Only the handful of `api/issues/` endpoints the run needs: existence,
//! custom fields, comments and a field update.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::{HttpConfig, YouTrackConfig};
use crate::error::{Error, Result};
use crate::ticket::TicketId;

const ISSUES_PATH: &str = "api/issues/";
const FIELDS_QUERY: &str = "fields=name,id,value(name)";

/// Value of a custom field; only the display name is requested
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FieldValue {
    pub name: String,
}

/// One custom field of an issue
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CustomField {
    pub name: String,
    pub id: String,
    #[serde(default, deserialize_with = "named_value")]
    pub value: Option<FieldValue>,
}

impl CustomField {
    pub fn value_name(&self) -> Option<&str> {
        self.value.as_ref().map(|v| v.name.as_str())
    }
}

// Multi-value and simple (number, string, date) fields don't carry a `name`;
// they read as unset instead of failing the whole snapshot.
fn named_value<'de, D>(deserializer: D) -> std::result::Result<Option<FieldValue>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .get("name")
        .and_then(Value::as_str)
        .map(|name| FieldValue {
            name: name.to_string(),
        }))
}

/// Custom field with its name and value lowercased once, at fetch time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotField {
    pub field: CustomField,
    pub key: String,
    pub value_key: Option<String>,
}

/// All custom fields of one issue, in the order YouTrack returned them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketSnapshot {
    fields: Vec<SnapshotField>,
}

impl TicketSnapshot {
    pub fn new(fields: Vec<CustomField>) -> Self {
        let fields = fields
            .into_iter()
            .map(|field| SnapshotField {
                key: field.name.to_lowercase(),
                value_key: field.value_name().map(str::to_lowercase),
                field,
            })
            .collect();
        Self { fields }
    }

    /// Field whose name is exactly `name`
    pub fn field(&self, name: &str) -> Option<&SnapshotField> {
        self.fields.iter().find(|f| f.field.name == name)
    }

    /// Field whose lowercased name equals `key` (which must already be lowercase)
    pub fn field_by_key(&self, key: &str) -> Option<&SnapshotField> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Outcome of the existence check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Existence {
    Found,
    NotFound,
    /// Neither success nor 404
    Unknown(u16),
}

/// Everything the run needs from the issue tracker
#[async_trait]
pub trait TicketGateway: Send + Sync {
    async fn exists(&self, id: &TicketId) -> Result<Existence>;

    async fn fields(&self, id: &TicketId) -> Result<TicketSnapshot>;

    async fn comment(&self, id: &TicketId, text: &str) -> Result<()>;

    /// Set the state field `field_id` to the state named `target`
    async fn transition(&self, id: &TicketId, field_id: &str, target: &str) -> Result<()>;

    /// Browser link to the issue
    fn issue_link(&self, id: &TicketId) -> String;
}

#[derive(Debug, Clone)]
pub struct YouTrackClient {
    client: Client,
    base_url: String,
    api_url: String,
    max_retries: u32,
    retry_backoff: std::time::Duration,
    dry_run: bool,
}

impl YouTrackClient {
    /// `config.url` must already be normalized with a trailing slash
    pub fn new(config: &YouTrackConfig, http: &HttpConfig, dry_run: bool) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|_| Error::Config("yt-token contains invalid characters".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(http.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.clone(),
            api_url: format!("{}{}", config.url, ISSUES_PATH),
            max_retries: http.max_retries,
            retry_backoff: http.retry_backoff(),
            dry_run,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// GET with bounded retries on 5xx, timeouts and connection errors
    async fn get(&self, url: &str) -> Result<Response> {
        let mut attempt = 0;
        loop {
            let outcome = self.client.get(url).send().await;
            let retryable = match &outcome {
                Ok(response) => response.status().is_server_error(),
                Err(err) => err.is_timeout() || err.is_connect(),
            };

            if !retryable || attempt >= self.max_retries {
                return Ok(outcome?);
            }

            let delay = self.retry_backoff.saturating_mul(2u32.saturating_pow(attempt));
            match &outcome {
                Ok(response) => {
                    let status = response.status().as_u16();
                    warn!(url, status, ?delay, "Retrying YouTrack request")
                }
                Err(err) => warn!(url, error = %err, ?delay, "Retrying YouTrack request"),
            }
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn send(&self, request: RequestBuilder, url: &str) -> Result<Response> {
        let response = request.send().await?;
        ensure_success(response, url)
    }
}

fn ensure_success(response: Response, url: &str) -> Result<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(Error::Tracker {
            status: response.status().as_u16(),
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl TicketGateway for YouTrackClient {
    async fn exists(&self, id: &TicketId) -> Result<Existence> {
        let response = self.get(&self.url(id.as_str())).await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            info!(ticket = %id, "Issue {} not found in your YouTrack instance", id);
            Ok(Existence::NotFound)
        } else if !status.is_success() {
            warn!(ticket = %id, "Unknown error connecting to YouTrack {}", status.as_u16());
            Ok(Existence::Unknown(status.as_u16()))
        } else {
            Ok(Existence::Found)
        }
    }

    async fn fields(&self, id: &TicketId) -> Result<TicketSnapshot> {
        let url = self.url(&format!("{}/fields?{}", id, FIELDS_QUERY));
        let response = ensure_success(self.get(&url).await?, &url)?;
        let fields: Vec<CustomField> = response.json().await?;
        debug!(ticket = %id, count = fields.len(), "Fetched custom fields");
        Ok(TicketSnapshot::new(fields))
    }

    async fn comment(&self, id: &TicketId, text: &str) -> Result<()> {
        let url = self.url(&format!("{}/comments", id));
        if self.dry_run {
            info!(ticket = %id, "Dry run - would comment YT: {}", text);
            return Ok(());
        }

        let body = json!({ "text": text, "usesMarkdown": true });
        let response = self.send(self.client.post(&url).json(&body), &url).await?;
        let status = response.status().as_u16();
        info!(ticket = %id, "Commented YT for issue {}. (Status: {})", id, status);
        Ok(())
    }

    async fn transition(&self, id: &TicketId, field_id: &str, target: &str) -> Result<()> {
        let url = self.url(&format!("{}/fields/{}?{}", id, field_id, FIELDS_QUERY));
        if self.dry_run {
            info!(ticket = %id, "Dry run - would change {} to {}", id, target);
            return Ok(());
        }

        let body = json!({ "value": { "name": target } });
        let response = self.send(self.client.post(&url).json(&body), &url).await?;
        let status = response.status().as_u16();
        info!(ticket = %id, "Changed {} to {}. (Status: {})", id, target, status);
        Ok(())
    }

    fn issue_link(&self, id: &TicketId) -> String {
        crate::template::issue_link(&self.base_url, id)
    }
}
