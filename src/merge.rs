//! Combining a fresh crawl session with a source's persisted collection.
//!
//! The decision order is fixed:
//!
//! 0. An existing collection longer than `max_retained` (written by an
//!    older run or under a larger cap) is first cut to its newest
//!    `max_retained` records.
//! 1. Empty session: keep the existing collection untouched. A source that
//!    failed to render or extract never loses history.
//! 2. Session longer than the existing collection: the session replaces it.
//!    A redesigned or richer listing is treated as authoritative. No title
//!    check is applied on this path, so an item the prepend path would have
//!    kept can disappear here.
//! 3. Otherwise: prepend the session records whose trimmed, lowercased
//!    title is not already in the collection, then cut to `max_retained`.
//!    If nothing is new the collection is left as is.
//!
//! The result never holds more than `max_retained` records.

use crate::models::Record;
use std::collections::HashSet;

/// What a merge did to a source's collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Unchanged,
    /// Only the cap was applied to an oversized collection.
    Trimmed { len: usize },
    Replaced { len: usize },
    Prepended { fresh: usize, len: usize },
}

/// Merge `session` into `existing` and report what happened.
///
/// `existing` is consumed and handed back when nothing new arrived.
pub fn merge(
    mut existing: Vec<Record>,
    session: Vec<Record>,
    max_retained: usize,
) -> (Vec<Record>, MergeOutcome) {
    let oversized = existing.len() > max_retained;
    existing.truncate(max_retained);

    if session.is_empty() {
        return keep(existing, oversized);
    }

    if session.len() > existing.len() {
        let mut replaced = session;
        replaced.truncate(max_retained);
        let len = replaced.len();
        return (replaced, MergeOutcome::Replaced { len });
    }

    let existing_titles: HashSet<String> = existing.iter().map(Record::title_key).collect();
    let fresh: Vec<Record> = session
        .into_iter()
        .filter(|r| !existing_titles.contains(&r.title_key()))
        .collect();

    if fresh.is_empty() {
        return keep(existing, oversized);
    }

    let fresh_count = fresh.len();
    let mut merged = fresh;
    merged.extend(existing);
    merged.truncate(max_retained);
    let len = merged.len();
    (
        merged,
        MergeOutcome::Prepended {
            fresh: fresh_count,
            len,
        },
    )
}

fn keep(existing: Vec<Record>, trimmed: bool) -> (Vec<Record>, MergeOutcome) {
    let outcome = if trimmed {
        MergeOutcome::Trimmed {
            len: existing.len(),
        }
    } else {
        MergeOutcome::Unchanged
    };
    (existing, outcome)
}
