//! # youtrack-link
//!
//! A CI step that links a pull request to the YouTrack issues its description
//! mentions: issues in a trigger state are commented on and moved, mentions
//! become links, and issue fields become PR labels.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod github;
pub mod policy;
pub mod pr;
pub mod template;
pub mod ticket;
pub mod youtrack;

// Re-export commonly used types
pub use app::{Orchestrator, RunResult};
pub use config::Config;
pub use error::{Error, Result};
pub use pr::PullRequest;
pub use ticket::TicketId;
