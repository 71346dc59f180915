//! Progress and cancellation handle threaded through a parse invocation.
//!
//! The core only reports through this trait; what the variables and URL
//! trail are shown on is the driver's business.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

pub trait Job {
    fn set_variable(&self, key: &str, value: &str);
    fn add_url(&self, url: &str);
    fn is_cancelled(&self) -> bool;
    fn finish(&self);
}

/// Basic in-memory job for drivers and tests.
#[derive(Debug, Default)]
pub struct SimpleJob {
    cancelled: AtomicBool,
    finished: AtomicBool,
    variables: Mutex<BTreeMap<String, String>>,
    urls: Mutex<Vec<String>>,
}

impl SimpleJob {
    #[must_use]
    pub fn new() -> Self {
        SimpleJob::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn variable(&self, key: &str) -> Option<String> {
        self.variables.lock().unwrap().get(key).cloned()
    }

    #[must_use]
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }
}

impl Job for SimpleJob {
    fn set_variable(&self, key: &str, value: &str) {
        self.variables
            .lock()
            .unwrap()
            .insert(key.to_owned(), value.to_owned());
    }

    fn add_url(&self, url: &str) {
        self.urls.lock().unwrap().push(url.to_owned());
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    fn finish(&self) {
        self.finished.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_everything() {
        let job = SimpleJob::new();
        assert!(!job.is_cancelled());
        assert!(!job.is_finished());
        assert_eq!(job.variable("script_status"), None);

        job.set_variable("script_status", "fetching");
        job.set_variable("script_status", "done");
        job.add_url("https://example.com/a");
        job.add_url("https://example.com/b");
        job.cancel();
        job.finish();

        assert_eq!(job.variable("script_status").as_deref(), Some("done"));
        assert_eq!(
            job.urls(),
            vec!["https://example.com/a", "https://example.com/b"]
        );
        assert!(job.is_cancelled());
        assert!(job.is_finished());
    }
}
