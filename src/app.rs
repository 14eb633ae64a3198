use std::time::Duration;

use colored::Colorize;
use tracing::{info, warn};

use crate::cli::Args;
use crate::config::Config;
use crate::error::{Error, Result, Stage, StepFailure};
use crate::github::{GitHubClient, PullRequestHost};
use crate::policy::{self, Policy};
use crate::pr::PullRequest;
use crate::template::{self, SummaryEntry};
use crate::ticket::{Extractor, TicketId};
use crate::youtrack::{Existence, TicketGateway, YouTrackClient};

/// Main application entry point
pub async fn run(args: Args) -> Result<RunResult> {
    let config = Config::resolve(&args)?;
    let pr = PullRequest::from_args(&args)?;

    if config.dry_run {
        info!("Dry run - YouTrack and the pull request will not be modified");
    }

    let tracker = YouTrackClient::new(&config.youtrack, &config.http, config.dry_run)?;
    let host = GitHubClient::new(&config.github, &config.http, pr.clone(), config.dry_run)?;

    let result = Orchestrator::new(&config, &tracker, &host, &pr)
        .run_within(config.http.run_timeout())
        .await?;

    print_report(&result);
    result.into_result()
}

/// How one ticket ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketStatus {
    /// Commented and moved to the target state
    Moved { from_state: String },
    NotFound,
    /// YouTrack answered with neither success nor 404
    UnknownStatus(u16),
    /// Missing state field, or a state outside the triggers
    NotTriggered,
    /// A tracker call failed; details are in `RunResult::failures`
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketReport {
    pub ticket: TicketId,
    pub status: TicketStatus,
    pub labels: Vec<String>,
}

impl TicketReport {
    fn new(ticket: &TicketId, status: TicketStatus) -> Self {
        Self {
            ticket: ticket.clone(),
            status,
            labels: Vec::new(),
        }
    }

    pub fn is_moved(&self) -> bool {
        matches!(self.status, TicketStatus::Moved { .. })
    }
}

/// Everything one invocation did
#[derive(Debug, Clone, Default)]
pub struct RunResult {
    /// IDs found in the description, in order of first mention
    pub tickets: Vec<TicketId>,
    pub reports: Vec<TicketReport>,
    /// Union of labels from all moved tickets, first-seen order
    pub labels: Vec<String>,
    /// Body of the PR comment, when one was due
    pub summary: Option<String>,
    /// Whether the PR description was rewritten
    pub relinked: bool,
    pub failures: Vec<StepFailure>,
}

impl RunResult {
    pub fn moved(&self) -> impl Iterator<Item = &TicketReport> {
        self.reports.iter().filter(|r| r.is_moved())
    }

    /// Turn collected failures into an error, once everything else was attempted
    pub fn into_result(self) -> Result<Self> {
        if self.failures.is_empty() {
            Ok(self)
        } else {
            Err(Error::Steps(self.failures))
        }
    }

    fn add_labels(&mut self, labels: &[String]) {
        for label in labels {
            if !self.labels.contains(label) {
                self.labels.push(label.clone());
            }
        }
    }
}

/// Drives one run: tickets one after another, then the PR-side effects once
pub struct Orchestrator<'a, T, H> {
    config: &'a Config,
    tracker: &'a T,
    host: &'a H,
    pr: &'a PullRequest,
    policy: Policy,
}

impl<'a, T, H> Orchestrator<'a, T, H>
where
    T: TicketGateway,
    H: PullRequestHost,
{
    pub fn new(config: &'a Config, tracker: &'a T, host: &'a H, pr: &'a PullRequest) -> Self {
        Self {
            config,
            tracker,
            host,
            pr,
            policy: Policy::from_config(&config.youtrack),
        }
    }

    /// [`Orchestrator::run`] bounded by a deadline
    pub async fn run_within(&self, deadline: Duration) -> Result<RunResult> {
        tokio::time::timeout(deadline, self.run())
            .await
            .map_err(|_| Error::DeadlineExceeded(deadline))?
    }

    pub async fn run(&self) -> Result<RunResult> {
        let extractor = Extractor::new(&self.config.youtrack.project_id)?;
        info!("Checking {} against the PR description", extractor.pattern());

        let Some(description) = self.host.description().await? else {
            info!("PR has no description.");
            return Ok(RunResult::default());
        };

        let tickets = extractor.extract(&description);
        if tickets.is_empty() {
            info!("PR description does not contain any issue ID.");
            return Ok(RunResult::default());
        }

        info!("Found issues: {}.", join_ids(&tickets));

        let mut result = RunResult {
            tickets: tickets.clone(),
            ..RunResult::default()
        };

        for ticket in &tickets {
            let report = self.process_ticket(ticket, &mut result.failures).await;
            result.add_labels(&report.labels);
            result.reports.push(report);
        }

        self.relink(&mut result).await;
        self.publish(&mut result).await;

        Ok(result)
    }

    async fn process_ticket(
        &self,
        ticket: &TicketId,
        failures: &mut Vec<StepFailure>,
    ) -> TicketReport {
        match self.tracker.exists(ticket).await {
            Ok(Existence::Found) => {}
            Ok(Existence::NotFound) => {
                info!(ticket = %ticket, "(Skipping) {} does not exist", ticket);
                return TicketReport::new(ticket, TicketStatus::NotFound);
            }
            Ok(Existence::Unknown(status)) => {
                info!(ticket = %ticket, status, "(Skipping) {} could not be looked up", ticket);
                return TicketReport::new(ticket, TicketStatus::UnknownStatus(status));
            }
            Err(err) => {
                warn!(ticket = %ticket, error = %err, "Lookup failed");
                failures.push(StepFailure::ticket(ticket, Stage::Lookup, &err));
                return TicketReport::new(ticket, TicketStatus::Failed);
            }
        }

        let snapshot = match self.tracker.fields(ticket).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(ticket = %ticket, error = %err, "Fetching fields failed");
                failures.push(StepFailure::ticket(ticket, Stage::Fields, &err));
                return TicketReport::new(ticket, TicketStatus::Failed);
            }
        };

        let decision = policy::decide(&snapshot, &self.policy);
        let state = match &decision.state_field {
            Some(state) if decision.should_transition => state,
            _ => {
                info!(ticket = %ticket, "(Skipping) {} not found in column triggers", ticket);
                return TicketReport::new(ticket, TicketStatus::NotTriggered);
            }
        };
        let from_state = decision.current_state().unwrap_or_default().to_string();

        let notice = template::ticket_notice(self.pr);
        if let Err(err) = self.tracker.comment(ticket, &notice).await {
            warn!(ticket = %ticket, error = %err, "Commenting YouTrack issue failed");
            failures.push(StepFailure::ticket(ticket, Stage::Comment, &err));
        }

        let target = &self.config.youtrack.column_target;
        if let Err(err) = self.tracker.transition(ticket, &state.id, target).await {
            warn!(ticket = %ticket, error = %err, "Moving issue to {} failed", target);
            failures.push(StepFailure::ticket(ticket, Stage::Transition, &err));
            return TicketReport::new(ticket, TicketStatus::Failed);
        }

        for label in &decision.labels {
            info!(ticket = %ticket, "Label PR with \"{}\" from ticket {}", label, ticket);
        }

        TicketReport {
            ticket: ticket.clone(),
            status: TicketStatus::Moved { from_state },
            labels: decision.labels,
        }
    }

    /// One fetch-modify-write of the description covering every moved ticket
    async fn relink(&self, result: &mut RunResult) {
        let moved: Vec<TicketId> = result.moved().map(|r| r.ticket.clone()).collect();
        if moved.is_empty() {
            return;
        }

        match self.relink_description(&moved).await {
            Ok(changed) => result.relinked = changed,
            Err(err) => {
                warn!(error = %err, "Updating PR description failed");
                result
                    .failures
                    .push(StepFailure::pull_request(self.pr.number, Stage::Relink, &err));
            }
        }
    }

    async fn relink_description(&self, tickets: &[TicketId]) -> Result<bool> {
        let current = self.host.description().await?.unwrap_or_default();
        let updated = template::relink_all(&current, tickets, |id| self.tracker.issue_link(id));

        if updated == current {
            info!("PR description already links every issue");
            return Ok(false);
        }

        self.host.update_description(&updated).await?;
        info!("Updated PR for issues {}", join_ids(tickets));
        Ok(true)
    }

    async fn publish(&self, result: &mut RunResult) {
        let entries: Vec<SummaryEntry> = result
            .reports
            .iter()
            .filter_map(|report| match &report.status {
                TicketStatus::Moved { from_state } => Some(SummaryEntry {
                    ticket: report.ticket.clone(),
                    link: self.tracker.issue_link(&report.ticket),
                    from_state: from_state.clone(),
                }),
                _ => None,
            })
            .collect();

        if let Some(summary) = template::pr_summary(&entries, &self.config.youtrack.column_target) {
            if let Err(err) = self.host.comment(&summary).await {
                warn!(error = %err, "Commenting PR failed");
                result
                    .failures
                    .push(StepFailure::pull_request(self.pr.number, Stage::Summary, &err));
            }
            result.summary = Some(summary);
        }

        if !result.labels.is_empty() {
            if let Err(err) = self.host.add_labels(&result.labels).await {
                warn!(error = %err, "Labelling PR failed");
                result
                    .failures
                    .push(StepFailure::pull_request(self.pr.number, Stage::Labels, &err));
            }
        }
    }
}

fn join_ids(tickets: &[TicketId]) -> String {
    tickets
        .iter()
        .map(TicketId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Per-ticket summary for the CI log
fn print_report(result: &RunResult) {
    for report in &result.reports {
        let ticket = report.ticket.as_str().bright_cyan();
        match &report.status {
            TicketStatus::Moved { from_state } => {
                println!("{} {} moved from {}", "+".bright_green(), ticket, from_state)
            }
            TicketStatus::NotFound => println!("{} {} not found", "-".yellow(), ticket),
            TicketStatus::UnknownStatus(status) => {
                println!("{} {} lookup returned {}", "-".yellow(), ticket, status)
            }
            TicketStatus::NotTriggered => {
                println!("{} {} not in a trigger state", "-".yellow(), ticket)
            }
            TicketStatus::Failed => println!("{} {} failed", "x".red(), ticket),
        }
    }

    if !result.labels.is_empty() {
        println!("{} Labels: {}", ">".bright_green(), result.labels.join(", ").bright_cyan());
    }
}
