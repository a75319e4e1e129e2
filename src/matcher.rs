use std::collections::HashSet;
use std::path::PathBuf;

use log::{debug, info};

use crate::report::Reporter;
use crate::store::Fingerprint;

/// One side of a matching pair is kept, the other removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionDecision {
    pub kept_path: PathBuf,
    pub removed_path: PathBuf,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct MatchOutcome {
    pub decisions: Vec<DeletionDecision>,
    pub comparisons: u64,
}

impl MatchOutcome {
    /// Paths to remove, in the order they were first marked, each listed once.
    pub fn deletion_set(&self) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        self.decisions
            .iter()
            .filter(|d| seen.insert(&d.removed_path))
            .map(|d| d.removed_path.clone())
            .collect()
    }
}

/// Largest union size the left file tolerates: `floor(raw chunk count * multiplier)`.
///
/// Uses the raw chunk count, repeated chunks included.
pub fn left_max(left_chunk_count: usize, multiplier: f64) -> usize {
    (left_chunk_count as f64 * multiplier).floor() as usize
}

fn union_size(left: &HashSet<&str>, right: &HashSet<&str>) -> usize {
    let (small, large) = if left.len() <= right.len() {
        (left, right)
    } else {
        (right, left)
    };
    let shared = small.iter().filter(|d| large.contains(*d)).count();
    left.len() + right.len() - shared
}

fn digest_set(fingerprint: &Fingerprint) -> HashSet<&str> {
    fingerprint.chunk_hashes.iter().map(String::as_str).collect()
}

/// Applies the overlap heuristic to an ordered pair.
///
/// Asymmetric: the threshold comes from `left` only.
pub fn is_match(left: &Fingerprint, right: &Fingerprint, multiplier: f64) -> bool {
    union_size(&digest_set(left), &digest_set(right))
        <= left_max(left.chunk_hashes.len(), multiplier)
}

/// Compares every unordered pair `(i, j)`, `i < j`, of `records`.
///
/// A match keeps `records[i]` and marks `records[j]` for removal. No grouping is
/// done: every pair is judged on its own, so a file can be marked more than once.
/// The result depends only on the records and their order.
pub fn find_matches(records: &[Fingerprint], multiplier: f64, reporter: &dyn Reporter) -> MatchOutcome {
    info!("Comparing {} fingerprints", records.len());

    let sets: Vec<HashSet<&str>> = records.iter().map(digest_set).collect();
    let mut outcome = MatchOutcome::default();

    for (i, left) in records.iter().enumerate() {
        let threshold = left_max(left.chunk_hashes.len(), multiplier);
        for j in (i + 1)..records.len() {
            outcome.comparisons += 1;
            if union_size(&sets[i], &sets[j]) > threshold {
                continue;
            }
            let decision = DeletionDecision {
                kept_path: left.source_path.clone(),
                removed_path: records[j].source_path.clone(),
            };
            reporter.on_match(&decision);
            outcome.decisions.push(decision);
        }
    }

    debug!(
        "{} comparisons, {} match(es)",
        outcome.comparisons,
        outcome.decisions.len()
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{RecordingReporter, SilentReporter};

    fn fp(path: &str, digests: &[&str]) -> Fingerprint {
        Fingerprint::new(path, digests.iter().map(|d| d.to_string()).collect())
    }

    fn numbered(path: &str, range: std::ops::Range<usize>) -> Fingerprint {
        Fingerprint::new(path, range.map(|i| format!("d{i}")).collect())
    }

    #[test]
    fn test_identical_fingerprints_match() {
        let a = fp("/a", &["1", "2", "3"]);
        let b = fp("/b", &["1", "2", "3"]);
        let outcome = find_matches(&[a, b], 1.2, &SilentReporter);
        assert_eq!(
            outcome.decisions,
            vec![DeletionDecision {
                kept_path: PathBuf::from("/a"),
                removed_path: PathBuf::from("/b"),
            }]
        );
    }

    #[test]
    fn test_empty_fingerprints_match() {
        assert!(is_match(&fp("/a", &[]), &fp("/b", &[]), 1.2));
    }

    #[test]
    fn test_threshold_boundary() {
        // s = 10 -> left_max = 12
        let left = numbered("/left", 0..10);
        assert_eq!(left_max(10, 1.2), 12);

        let at_limit = numbered("/right", 0..12);
        assert!(is_match(&left, &at_limit, 1.2));

        let over_limit = numbered("/right", 0..13);
        assert!(!is_match(&left, &over_limit, 1.2));
    }

    #[test]
    fn test_threshold_uses_raw_left_count() {
        // Five raw chunks but one distinct digest: left_max = 6, union = 6.
        let left = fp("/left", &["x", "x", "x", "x", "x"]);
        let right = fp("/right", &["x", "a", "b", "c", "d", "e"]);
        assert!(is_match(&left, &right, 1.2));
        // Reversed, left_max = floor(6 * 1.2) = 7 still covers the union of 6.
        assert!(is_match(&right, &left, 1.2));

        let short_left = fp("/left", &["x"]);
        assert!(!is_match(&short_left, &right, 1.2));
        assert!(is_match(&right, &short_left, 1.2));
    }

    #[test]
    fn test_no_transitive_grouping() {
        // a~b and b~c, but a and c are judged directly.
        let a = numbered("/a", 0..10);
        let b = numbered("/b", 2..12);
        let c = numbered("/c", 4..14);
        let outcome = find_matches(&[a, b, c], 1.2, &SilentReporter);
        let removed: Vec<_> = outcome.decisions.iter().map(|d| d.removed_path.clone()).collect();
        assert_eq!(removed, vec![PathBuf::from("/b"), PathBuf::from("/c")]);
        assert_eq!(outcome.decisions[1].kept_path, PathBuf::from("/b"));
    }

    #[test]
    fn test_file_marked_twice_listed_once() {
        let records = vec![fp("/a", &["1"]), fp("/b", &["1"]), fp("/c", &["1"])];
        let outcome = find_matches(&records, 1.2, &SilentReporter);
        assert_eq!(outcome.decisions.len(), 3);
        assert_eq!(outcome.deletion_set(), vec![PathBuf::from("/b"), PathBuf::from("/c")]);
    }

    #[test]
    fn test_all_pairs_counted_without_matches() {
        let records: Vec<_> = (0..7)
            .map(|i| numbered(&format!("/f{i}"), i * 10..i * 10 + 5))
            .collect();
        let outcome = find_matches(&records, 1.2, &SilentReporter);
        assert_eq!(outcome.comparisons, 7 * 6 / 2);
        assert!(outcome.deletion_set().is_empty());
    }

    #[test]
    fn test_deterministic_for_same_input() {
        let records = vec![
            numbered("/a", 0..10),
            numbered("/b", 1..11),
            numbered("/c", 0..10),
            numbered("/d", 50..60),
        ];
        let first = find_matches(&records, 1.2, &SilentReporter);
        let second = find_matches(&records, 1.2, &SilentReporter);
        assert_eq!(first, second);
    }

    #[test]
    fn test_decisions_are_reported() {
        let reporter = RecordingReporter::default();
        find_matches(&[fp("/a", &["1"]), fp("/b", &["1"])], 1.2, &reporter);
        assert_eq!(reporter.events(), vec!["match keep=/a remove=/b".to_string()]);
    }
}
