//! Run-wide counters shared by all workers

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct Totals {
    cases: AtomicUsize,
    files: AtomicUsize,
    failed: AtomicUsize,
    ignored: AtomicUsize,
}

/// Plain copy of [`Totals`] taken after the workers have joined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Test cases generated
    pub cases: usize,
    /// Chunks attempted
    pub files: usize,
    /// Chunks that failed at any stage
    pub failed: usize,
    /// Subtrees skipped through `ignored`
    pub ignored: usize,
}

impl Totals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_cases(&self, count: usize) {
        self.cases.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_file(&self) {
        self.files.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_ignored(&self, count: usize) {
        self.ignored.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Summary {
        Summary {
            cases: self.cases.load(Ordering::Relaxed),
            files: self.files.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
        }
    }
}

impl Summary {
    /// True when no chunk failed
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn test_concurrent_updates() {
        let totals = Totals::new();
        (0..1000).into_par_iter().for_each(|i| {
            totals.add_file();
            totals.add_cases(2);
            if i % 10 == 0 {
                totals.add_failure();
            }
        });
        totals.add_ignored(3);

        let summary = totals.snapshot();
        assert_eq!(
            summary,
            Summary {
                cases: 2000,
                files: 1000,
                failed: 100,
                ignored: 3,
            }
        );
        assert!(!summary.success());
    }

    #[test]
    fn test_empty_run_succeeds() {
        assert!(Totals::new().snapshot().success());
    }

    #[test]
    fn test_summary_json() {
        let summary = Summary {
            cases: 4,
            files: 2,
            failed: 1,
            ignored: 0,
        };
        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json["failed"], 1);
        assert_eq!(json["cases"], 4);
    }
}
