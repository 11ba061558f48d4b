//! Outstanding Searches
//!
//! Tracks the tokens of searches we sent and when they were sent, so results
//! that arrive after the search has gone stale can be dropped. Expiry is
//! driven by the timer's Second channel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use dcshare_core::SearchResult;
use tracing::{debug, trace};

use crate::timer::{ListenerId, TimerService};

/// Shared table of outstanding search tokens
///
/// Cloning yields another handle to the same table.
#[derive(Debug, Clone)]
pub struct PendingSearches {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug)]
struct Inner {
    timeout_ms: u64,
    started: HashMap<String, u64>,
}

impl PendingSearches {
    /// Create a table whose searches expire after `timeout`
    pub fn new(timeout: Duration) -> Self {
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                timeout_ms,
                started: HashMap::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a search sent at `tick`; restarting a token resets its age
    pub fn start(&self, token: impl Into<String>, tick: u64) {
        let token = token.into();
        debug!("Search {} started at tick {}", token, tick);
        self.lock().started.insert(token, tick);
    }

    /// Whether `result` answers a search that is still outstanding at `tick`
    pub fn accept(&self, result: &SearchResult, tick: u64) -> bool {
        let inner = self.lock();
        let accepted = inner
            .started
            .get(result.token())
            .is_some_and(|started| tick.saturating_sub(*started) <= inner.timeout_ms);
        if !accepted {
            trace!("Dropping result for unknown or stale token {:?}", result.token());
        }
        accepted
    }

    /// Remove searches older than the timeout, returning their tokens
    pub fn expire(&self, tick: u64) -> Vec<String> {
        let mut inner = self.lock();
        let timeout_ms = inner.timeout_ms;
        let mut expired: Vec<String> = inner
            .started
            .iter()
            .filter(|(_, started)| tick.saturating_sub(**started) > timeout_ms)
            .map(|(token, _)| token.clone())
            .collect();
        for token in &expired {
            inner.started.remove(token);
        }
        drop(inner);

        expired.sort();
        if !expired.is_empty() {
            debug!("Expired {} searches at tick {}", expired.len(), tick);
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.lock().started.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().started.is_empty()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.lock().started.contains_key(token)
    }

    /// Expire searches on every Second event of `timer`
    pub fn attach(&self, timer: &TimerService) -> ListenerId {
        let searches = self.clone();
        timer.subscribe_second(move |tick| {
            searches.expire(tick);
        })
    }

    /// Undo `attach`
    pub fn detach(&self, timer: &TimerService, id: ListenerId) -> bool {
        timer.unsubscribe_second(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcshare_core::{HintedUser, ResultKind, TigerHash};

    fn result_for(token: &str) -> SearchResult {
        SearchResult::builder(HintedUser::default(), ResultKind::File, "a.txt", TigerHash::default())
            .token(token)
            .build()
    }

    #[test]
    fn test_accepts_outstanding_search() {
        let searches = PendingSearches::new(Duration::from_secs(60));
        searches.start("abc", 1_000);
        assert!(searches.accept(&result_for("abc"), 1_000));
        assert!(searches.accept(&result_for("abc"), 61_000));
        assert!(!searches.accept(&result_for("abc"), 61_001));
    }

    #[test]
    fn test_rejects_unknown_token() {
        let searches = PendingSearches::new(Duration::from_secs(60));
        searches.start("abc", 0);
        assert!(!searches.accept(&result_for("other"), 10));
        assert!(!searches.accept(&result_for(""), 10));
    }

    #[test]
    fn test_expire_removes_only_stale() {
        let searches = PendingSearches::new(Duration::from_secs(5));
        searches.start("old-b", 0);
        searches.start("old-a", 1_000);
        searches.start("fresh", 4_000);

        assert!(searches.expire(5_000).is_empty());
        assert_eq!(searches.expire(6_500), vec!["old-a", "old-b"]);
        assert_eq!(searches.len(), 1);
        assert!(searches.contains("fresh"));
        assert!(!searches.accept(&result_for("old-a"), 6_500));
    }

    #[test]
    fn test_restart_resets_age() {
        let searches = PendingSearches::new(Duration::from_secs(1));
        searches.start("t", 0);
        searches.start("t", 5_000);
        assert!(searches.expire(5_500).is_empty());
        assert!(!searches.is_empty());
    }
}
