//! Comment and PR body text
//!
//! This module builds the comment posted on each YouTrack issue, the
//! aggregate comment posted on the pull request, and rewrites the PR body so
//! issue mentions become links.

use std::ops::Range;

use lazy_static::lazy_static;
use regex::Regex;

use crate::pr::PullRequest;
use crate::ticket::TicketId;

lazy_static! {
    /// Spans of a PR body whose text must not be rewritten: fenced and inline
    /// code, inline links `[text](target)`, autolinks `<target>` and bare URLs
    static ref LINKED: Regex = Regex::new(concat!(
        r"(?s)```.*?```",
        r"|`[^`]*`",
        r"|\[[^\]]*\]\([^)]*\)",
        r"|<[^>\s]+>",
        r"|https?://[^\s<>()\[\]]+",
    ))
    .unwrap();
}

/// One moved issue in the PR summary comment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryEntry {
    pub ticket: TicketId,
    pub link: String,
    /// State the issue was in before the move
    pub from_state: String,
}

impl SummaryEntry {
    fn markdown(&self) -> String {
        format!("[{}]({}) from *{}*", self.ticket, self.link, self.from_state)
    }
}

/// Browser link to an issue, `base_url` being the YouTrack root
pub fn issue_link(base_url: &str, ticket: &TicketId) -> String {
    format!("{}/issue/{}", base_url.trim_end_matches('/'), ticket)
}

/// Comment posted on the YouTrack issue
pub fn ticket_notice(pr: &PullRequest) -> String {
    format!(
        "New PR [#{}]({}) opened at [{}]({}) by {}.",
        pr.number,
        pr.url(),
        pr.full_name(),
        pr.repo_url(),
        pr.actor
    )
}

/// Aggregate comment posted on the pull request
///
/// Returns `None` when no issue was moved; nothing should be posted then.
pub fn pr_summary(entries: &[SummaryEntry], target_state: &str) -> Option<String> {
    match entries {
        [] => None,
        [single] => Some(format!(
            "Moved YouTrack issue {} to *{}*",
            single.markdown(),
            target_state
        )),
        many => {
            let mut lines = vec![format!("Moved YouTrack issues to *{}*", target_state)];
            lines.extend(many.iter().map(|e| format!("- {}", e.markdown())));
            Some(lines.join("\n"))
        }
    }
}

/// Turn every bare mention of `ticket` in `description` into a markdown link
///
/// Mentions already inside a markdown link, an autolink, a bare URL or a code
/// span are left alone, as are matches that continue with another digit
/// (`PROJ-1` inside `PROJ-12`), so applying this again to its own output
/// changes nothing.
pub fn relink_description<F>(description: &str, ticket: &TicketId, link_for: F) -> String
where
    F: Fn(&TicketId) -> String,
{
    let needle = ticket.as_str();
    if needle.is_empty() {
        return description.to_string();
    }

    let linked: Vec<Range<usize>> = LINKED.find_iter(description).map(|m| m.range()).collect();
    let link = link_for(ticket);

    let mut body = String::with_capacity(description.len());
    let mut last = 0;

    for (start, _) in description.match_indices(needle) {
        let end = start + needle.len();
        if inside(&linked, start) || continues_number(description, end) {
            continue;
        }

        body.push_str(&description[last..start]);
        body.push_str(&format!("[{}]({})", needle, link));
        last = end;
    }

    body.push_str(&description[last..]);
    body
}

/// Relink several tickets in one pass over the same body
pub fn relink_all<F>(description: &str, tickets: &[TicketId], link_for: F) -> String
where
    F: Fn(&TicketId) -> String,
{
    tickets.iter().fold(description.to_string(), |body, ticket| {
        relink_description(&body, ticket, &link_for)
    })
}

fn inside(ranges: &[Range<usize>], index: usize) -> bool {
    ranges.iter().any(|r| r.contains(&index))
}

fn continues_number(text: &str, end: usize) -> bool {
    text[end..].starts_with(|c: char| c.is_ascii_digit())
}
