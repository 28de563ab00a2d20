//! Keyword relevance filter.
//!
//! A record is relevant when its lowercased title and description contain
//! at least one configured keyword as a substring. With keywords disabled
//! every record passes, except that a record without a description never
//! does: an empty teaser can't be deduplicated or judged.

use crate::models::Record;
use once_cell::sync::Lazy;

/// Keywords used when the run file doesn't list its own.
pub static DEFAULT_KEYWORDS: Lazy<Vec<String>> = Lazy::new(|| {
    [
        "student",
        "workshop",
        "scholarship",
        "research",
        "award",
        "event",
        "program",
        "faculty",
        "grant",
        "internship",
        "career",
        "community",
        "celebrat",
        "graduat",
        "opportunit",
        "fellowship",
        "lecture",
        "conference",
    ]
    .into_iter()
    .map(String::from)
    .collect()
});

/// Stateless relevance predicate.
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    use_keywords: bool,
    keywords: Vec<String>,
}

impl RelevanceFilter {
    /// Keywords are lowercased once here; blank ones are ignored.
    pub fn new(use_keywords: bool, keywords: &[String]) -> Self {
        let keywords = keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self {
            use_keywords,
            keywords,
        }
    }

    /// A filter that only rejects records with an empty description.
    #[cfg(test)]
    pub fn disabled() -> Self {
        Self::new(false, &[])
    }

    #[cfg(test)]
    pub fn use_keywords(&self) -> bool {
        self.use_keywords
    }

    pub fn accepts(&self, record: &Record) -> bool {
        if record.description.trim().is_empty() {
            return false;
        }
        if !self.use_keywords {
            return true;
        }
        let haystack = format!("{} {}", record.title, record.description).to_lowercase();
        self.keywords.iter().any(|k| haystack.contains(k.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(title: &str, description: &str) -> Record {
        Record::new(title, "https://x.edu/a", "", description)
    }

    #[test]
    fn test_keyword_gating() {
        let filter = RelevanceFilter::new(true, &["workshop".to_string()]);
        assert!(filter.accepts(&rec("", "Join our workshop")));
        assert!(!filter.accepts(&rec("", "Gala dinner")));
    }

    #[test]
    fn test_keyword_match_is_case_insensitive_and_checks_title() {
        let filter = RelevanceFilter::new(true, &["  WorkShop ".to_string()]);
        assert!(filter.accepts(&rec("Spring WORKSHOP series", "Details inside")));
    }

    #[test]
    fn test_empty_description_always_rejected() {
        let on = RelevanceFilter::new(true, &["workshop".to_string()]);
        let off = RelevanceFilter::disabled();
        assert!(!on.accepts(&rec("Workshop today", "")));
        assert!(!off.accepts(&rec("Workshop today", "")));
        assert!(!off.accepts(&rec("Workshop today", "   ")));
    }

    #[test]
    fn test_disabled_accepts_any_described_record() {
        let filter = RelevanceFilter::disabled();
        assert!(!filter.use_keywords());
        assert!(filter.accepts(&rec("", "Gala dinner")));
    }

    #[test]
    fn test_enabled_with_no_keywords_rejects_everything() {
        let filter = RelevanceFilter::new(true, &[]);
        assert!(!filter.accepts(&rec("Anything", "Anything")));
    }

    #[test]
    fn test_default_keywords_are_lowercase() {
        assert!(DEFAULT_KEYWORDS.iter().all(|k| k == &k.to_lowercase()));
        let filter = RelevanceFilter::new(true, &DEFAULT_KEYWORDS);
        assert!(filter.accepts(&rec("Scholarship deadline", "Apply now")));
    }
}
