//! Ticket identifiers and their extraction from free text

use std::collections::HashSet;
use std::fmt;

use regex::Regex;

/// A project-scoped YouTrack issue ID (e.g., "PROJ-123")
///
/// Equality is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TicketId(String);

impl TicketId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TicketId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Finds ticket IDs for one project prefix
#[derive(Debug, Clone)]
pub struct Extractor {
    pattern: Regex,
}

impl Extractor {
    /// Build the `<prefix>-[0-9]+` pattern for a project
    pub fn new(project_prefix: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!("{}-[0-9]+", regex::escape(project_prefix)))?;
        Ok(Self { pattern })
    }

    /// The pattern as text, for logging
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Unique ticket IDs in order of first appearance
    pub fn extract(&self, text: &str) -> Vec<TicketId> {
        let mut seen = HashSet::new();

        self.pattern
            .find_iter(text)
            .map(|m| m.as_str())
            .filter(|id| seen.insert(*id))
            .map(TicketId::new)
            .collect()
    }
}

/// Extract unique ticket IDs for `project_prefix` from `text`
pub fn extract(text: &str, project_prefix: &str) -> Result<Vec<TicketId>, regex::Error> {
    Ok(Extractor::new(project_prefix)?.extract(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<TicketId> {
        list.iter().map(|s| TicketId::new(*s)).collect()
    }

    #[test]
    fn test_extract_dedupes_in_first_seen_order() {
        let found = extract("Fixes PROJ-1 and also PROJ-1 again, see PROJ-2", "PROJ").unwrap();
        assert_eq!(found, ids(&["PROJ-1", "PROJ-2"]));
    }

    #[test]
    fn test_extract_empty_text() {
        assert!(extract("", "PROJ").unwrap().is_empty());
        assert!(extract("nothing to see", "PROJ").unwrap().is_empty());
    }

    #[test]
    fn test_extract_is_case_sensitive() {
        let found = extract("proj-1 Proj-2 PROJ-3", "PROJ").unwrap();
        assert_eq!(found, ids(&["PROJ-3"]));
    }

    #[test]
    fn test_extract_adjacent_matches() {
        let found = extract("PROJ-12PROJ-3", "PROJ").unwrap();
        assert_eq!(found, ids(&["PROJ-12", "PROJ-3"]));
    }

    #[test]
    fn test_extract_ignores_other_projects() {
        let found = extract("OTHER-5 and PROJ-5", "PROJ").unwrap();
        assert_eq!(found, ids(&["PROJ-5"]));
    }

    #[test]
    fn test_extract_is_idempotent() {
        let extractor = Extractor::new("PROJ").unwrap();
        let text = "PROJ-7, PROJ-3 and [PROJ-7](https://yt.example.com/issue/PROJ-7)";
        assert_eq!(extractor.extract(text), extractor.extract(text));
        assert_eq!(extractor.extract(text), ids(&["PROJ-7", "PROJ-3"]));
    }

    #[test]
    fn test_prefix_is_taken_literally() {
        let extractor = Extractor::new("A.B").unwrap();
        assert_eq!(extractor.extract("AxB-1 A.B-2"), ids(&["A.B-2"]));
        assert_eq!(extractor.pattern(), r"A\.B-[0-9]+");
    }
}
