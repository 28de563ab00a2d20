//! Per-session duplicate suppression keyed on the record description.
//!
//! Listing pages repeat themselves: the featured slider shows the same story
//! as the list below it, and page 2 often overlaps page 1. Within one crawl
//! session a record is admitted only if its trimmed, lowercased description
//! hasn't been seen yet. The match is exact; a one-character difference
//! makes two descriptions distinct.

use crate::models::Record;
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct SessionDeduplicator {
    seen: HashSet<String>,
}

impl SessionDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit `record` if its description key is new and non-empty.
    ///
    /// Admission records the key, so a second call with the same record
    /// returns false.
    pub fn admit(&mut self, record: &Record) -> bool {
        let key = record.description_key();
        if key.is_empty() {
            return false;
        }
        self.seen.insert(key)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(title: &str, description: &str) -> Record {
        Record::new(title, "", "", description)
    }

    #[test]
    fn test_first_occurrence_wins() {
        let mut dedup = SessionDeduplicator::new();
        assert!(dedup.admit(&rec("A", "Join our workshop")));
        assert!(!dedup.admit(&rec("B", "Join our workshop")));
        assert_eq!(dedup.len(), 1);
    }

    #[test]
    fn test_case_and_surrounding_whitespace_are_ignored() {
        let mut dedup = SessionDeduplicator::new();
        assert!(dedup.admit(&rec("A", "Join our workshop")));
        assert!(!dedup.admit(&rec("A", "  JOIN OUR WORKSHOP \n")));
    }

    #[test]
    fn test_single_character_difference_is_distinct() {
        let mut dedup = SessionDeduplicator::new();
        assert!(dedup.admit(&rec("A", "Join our workshop")));
        assert!(dedup.admit(&rec("A", "Join our workshops")));
        assert_eq!(dedup.len(), 2);
    }

    #[test]
    fn test_empty_description_never_admitted() {
        let mut dedup = SessionDeduplicator::new();
        assert!(!dedup.admit(&rec("A", "")));
        assert!(!dedup.admit(&rec("A", "   ")));
        assert!(dedup.is_empty());
    }
}
