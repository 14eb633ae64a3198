use std::path::PathBuf;

use clap::Parser;

/// Every input can also be passed the way GitHub Actions passes `with:` inputs (`INPUT_<NAME>`).
#[derive(Parser, Debug, Default, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// YAML configuration file; flags and env override its values
    #[clap(short, long, env = "YT_LINK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log intended changes without touching YouTrack or the pull request
    #[clap(short, long, env = "INPUT_DRY-RUN", default_value_t = false)]
    pub dry_run: bool,

    #[clap(long, env = "INPUT_GITHUB-TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    #[clap(long, env = "GITHUB_API_URL")]
    pub github_api_url: Option<String>,

    #[clap(long, env = "INPUT_YT-URL")]
    pub yt_url: Option<String>,

    #[clap(long, env = "INPUT_YT-TOKEN", hide_env_values = true)]
    pub yt_token: Option<String>,

    /// Project prefix of ticket IDs (e.g., "PROJ" for PROJ-123)
    #[clap(long, env = "INPUT_YT-PROJECT-ID")]
    pub yt_project_id: Option<String>,

    /// Custom field holding the board column / workflow state
    #[clap(long, env = "INPUT_YT-COLUMN-FIELD")]
    pub yt_column_field: Option<String>,

    /// Comma-separated states that allow moving the issue
    #[clap(long, env = "INPUT_YT-COLUMN-TRIGGERS")]
    pub yt_column_triggers: Option<String>,

    /// State the issue is moved to
    #[clap(long, env = "INPUT_YT-COLUMN-TARGET")]
    pub yt_column_target: Option<String>,

    /// Comma-separated custom fields turned into PR labels
    #[clap(long, env = "INPUT_YT-LABEL-FIELDS")]
    pub yt_label_fields: Option<String>,

    #[clap(long, env = "INPUT_YT-LABEL-PREFIX")]
    pub yt_label_prefix: Option<String>,

    #[clap(long)]
    pub request_timeout_secs: Option<u64>,

    #[clap(long)]
    pub run_timeout_secs: Option<u64>,

    #[clap(long)]
    pub max_retries: Option<u32>,

    /// Delay before the first retry, doubled on each further attempt
    #[clap(long)]
    pub retry_backoff_ms: Option<u64>,

    /// Repository as owner/name, defaults to GITHUB_REPOSITORY
    #[clap(long, env = "GITHUB_REPOSITORY")]
    pub repository: Option<String>,

    /// Pull request number, defaults to the one in GITHUB_EVENT_PATH
    #[clap(long)]
    pub pr_number: Option<u64>,

    #[clap(long, env = "GITHUB_ACTOR")]
    pub actor: Option<String>,

    #[clap(long, env = "GITHUB_SERVER_URL")]
    pub server_url: Option<String>,

    #[clap(long, env = "GITHUB_EVENT_PATH")]
    pub event_path: Option<PathBuf>,
}
