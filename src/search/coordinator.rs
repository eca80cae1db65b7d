//! Debounced search coordination for one search domain.
//!
//! Each domain (doctor picker, patient picker) owns one `SearchCoordinator`:
//! its own timer, its own result buffer, its own `is_searching` flag. The
//! contract per domain:
//! - a lookup fires only after the input has been quiet for the debounce delay,
//!   and only for the latest term
//! - the dispatch gate is evaluated when the timer fires, not per keystroke
//! - a response is applied only if its term still equals the live input;
//!   anything else is stale and dropped without a notice
//! - a failed lookup empties the buffer and emits one error notice
//! - `is_searching` is released on every exit path (see `SearchingGuard`)

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::BoxFuture;

use super::debounce::DebounceTimer;
use crate::api::ApiError;
use crate::notify::Notifier;

/// Future returned by a domain's lookup function.
pub type SearchFuture<T> = BoxFuture<'static, Result<Vec<T>, ApiError>>;

/// Dispatch gate, evaluated on the live term when the timer fires.
pub type QueryGate = fn(&str) -> bool;

/// Which picker a coordinator serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDomain {
    Doctor,
    Patient,
}

impl SearchDomain {
    /// Toast text for a failed lookup.
    pub fn failure_message(&self) -> &'static str {
        match self {
            Self::Doctor => "Failed to search doctors",
            Self::Patient => "Failed to search patients",
        }
    }
}

impl fmt::Display for SearchDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Doctor => write!(f, "doctor"),
            Self::Patient => write!(f, "patient"),
        }
    }
}

struct DomainState<T> {
    live_term: String,
    results: Vec<T>,
    /// A lookup for `live_term` has completed and `results` reflect it.
    settled: bool,
    in_flight: usize,
}

type SharedState<T> = Arc<Mutex<DomainState<T>>>;

fn lock<T>(state: &Mutex<DomainState<T>>) -> MutexGuard<'_, DomainState<T>> {
    // State is plain data updated in single assignments; poisoning cannot
    // leave it half-written.
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// ═══════════════════════════════════════════════════════════
// SearchingGuard: RAII in-flight marker
// ═══════════════════════════════════════════════════════════

/// Marks one lookup as in flight. Dropping it, whether the lookup succeeded,
/// failed, or its task panicked, releases the mark.
struct SearchingGuard<T> {
    state: SharedState<T>,
}

impl<T> SearchingGuard<T> {
    fn enter(state: SharedState<T>) -> Self {
        lock(&state).in_flight += 1;
        Self { state }
    }
}

impl<T> Drop for SearchingGuard<T> {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        state.in_flight = state.in_flight.saturating_sub(1);
    }
}

// ═══════════════════════════════════════════════════════════
// SearchCoordinator
// ═══════════════════════════════════════════════════════════

pub struct SearchCoordinator<T> {
    domain: SearchDomain,
    timer: DebounceTimer,
    state: SharedState<T>,
    notifier: Arc<dyn Notifier>,
}

impl<T> SearchCoordinator<T>
where
    T: Clone + Send + 'static,
{
    pub fn new(domain: SearchDomain, delay: Duration, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            domain,
            timer: DebounceTimer::new(delay),
            state: Arc::new(Mutex::new(DomainState {
                live_term: String::new(),
                results: Vec::new(),
                settled: false,
                in_flight: 0,
            })),
            notifier,
        }
    }

    pub fn domain(&self) -> SearchDomain {
        self.domain
    }

    /// Record a keystroke and (re)arm the lookup for `term`.
    ///
    /// A blank term cancels the pending lookup and empties the buffer. A
    /// changed term empties the buffer too: results always belong to the live
    /// term or to nothing.
    pub fn schedule<F>(&self, term: &str, gate: QueryGate, on_search: F)
    where
        F: FnOnce(String) -> SearchFuture<T> + Send + 'static,
    {
        {
            let mut state = lock(&self.state);
            if state.live_term != term {
                state.results.clear();
                state.settled = false;
            }
            state.live_term = term.to_string();
        }

        if term.trim().is_empty() {
            self.timer.cancel();
            return;
        }

        let captured = term.to_string();
        let state = self.state.clone();
        let notifier = self.notifier.clone();
        let domain = self.domain;

        self.timer.arm(move || {
            let live = lock(&state).live_term.clone();
            if live != captured {
                return;
            }
            if !gate(&live) {
                tracing::debug!(%domain, term = %live, "Query below dispatch threshold");
                return;
            }

            let guard = SearchingGuard::enter(state.clone());
            tracing::debug!(%domain, term = %captured, "Dispatching lookup");
            tokio::spawn(async move {
                let _guard = guard;
                let outcome = on_search(captured.trim().to_string()).await;
                apply_outcome(&state, notifier.as_ref(), domain, &captured, outcome);
            });
        });
    }

    /// Drop the query entirely: cancel the timer, forget the term, empty the
    /// buffer. In-flight responses will find the term changed and be dropped.
    pub fn clear(&self) {
        self.timer.cancel();
        let mut state = lock(&self.state);
        state.live_term.clear();
        state.results.clear();
        state.settled = false;
    }

    pub fn results(&self) -> Vec<T> {
        lock(&self.state).results.clone()
    }

    pub fn live_term(&self) -> String {
        lock(&self.state).live_term.clone()
    }

    /// True while at least one lookup for this domain is in flight.
    pub fn is_searching(&self) -> bool {
        lock(&self.state).in_flight > 0
    }

    /// True once a lookup for the live term has completed (successfully or
    /// not). False while the term is still debouncing or in flight.
    pub fn is_settled(&self) -> bool {
        lock(&self.state).settled
    }

    /// True while a keystroke is waiting out the debounce delay.
    pub fn is_pending(&self) -> bool {
        self.timer.is_armed()
    }
}

fn apply_outcome<T>(
    state: &Mutex<DomainState<T>>,
    notifier: &dyn Notifier,
    domain: SearchDomain,
    term: &str,
    outcome: Result<Vec<T>, ApiError>,
) {
    let mut state = lock(state);
    if state.live_term != term {
        tracing::debug!(%domain, term, live = %state.live_term, "Discarding stale response");
        return;
    }
    state.settled = true;
    match outcome {
        Ok(results) => {
            tracing::debug!(%domain, term, count = results.len(), "Lookup complete");
            state.results = results;
        }
        Err(e) => {
            tracing::warn!(%domain, term, "Lookup failed: {e}");
            state.results.clear();
            drop(state);
            notifier.error(domain.failure_message());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingNotifier;
    use crate::search::classify::is_patient_dispatchable;
    use futures_util::FutureExt;

    const DELAY: Duration = Duration::from_millis(300);

    type Log = Arc<Mutex<Vec<String>>>;

    fn coordinator(notifier: Arc<RecordingNotifier>) -> SearchCoordinator<String> {
        SearchCoordinator::new(SearchDomain::Patient, DELAY, notifier)
    }

    fn always(_: &str) -> bool {
        true
    }

    /// Lookup that records its term and answers `[term]` after `latency`.
    fn echo(log: &Log, latency: Duration) -> impl FnOnce(String) -> SearchFuture<String> {
        let log = log.clone();
        move |term| {
            log.lock().unwrap().push(term.clone());
            async move {
                tokio::time::sleep(latency).await;
                Ok::<_, ApiError>(vec![term])
            }
            .boxed()
        }
    }

    fn failing(log: &Log) -> impl FnOnce(String) -> SearchFuture<String> {
        let log = log.clone();
        move |term| {
            log.lock().unwrap().push(term);
            async { Err::<Vec<String>, _>(ApiError::from_status(500, "")) }.boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_typing_fires_one_request_for_last_term() {
        let notifier = Arc::new(RecordingNotifier::new());
        let coord = coordinator(notifier);
        let log: Log = Arc::default();

        for term in ["a", "ab", "abc"] {
            coord.schedule(term, always, echo(&log, Duration::ZERO));
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(log.lock().unwrap().is_empty());
        assert!(coord.is_pending());

        tokio::time::sleep(Duration::from_millis(260)).await;
        assert_eq!(*log.lock().unwrap(), vec!["abc"]);
        assert_eq!(coord.results(), vec!["abc"]);
        assert!(!coord.is_searching());
    }

    #[tokio::test(start_paused = true)]
    async fn request_waits_full_delay_after_last_keystroke() {
        let coord = coordinator(Arc::new(RecordingNotifier::new()));
        let log: Log = Arc::default();

        coord.schedule("ab", always, echo(&log, Duration::ZERO));
        tokio::time::sleep(Duration::from_millis(299)).await;
        assert!(log.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_response_is_discarded() {
        let notifier = Arc::new(RecordingNotifier::new());
        let coord = coordinator(notifier.clone());
        let log: Log = Arc::default();

        // "abc" fires at 300ms and resolves at 800ms
        coord.schedule("abc", always, echo(&log, Duration::from_millis(500)));
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert!(coord.is_searching());

        // "xyz" fires at 650ms and resolves at 1150ms
        coord.schedule("xyz", always, echo(&log, Duration::from_millis(500)));

        tokio::time::sleep(Duration::from_millis(550)).await; // t = 900ms
        assert!(coord.results().is_empty(), "abc must not be rendered");
        assert!(coord.is_searching(), "xyz still in flight");

        tokio::time::sleep(Duration::from_millis(300)).await; // t = 1200ms
        assert_eq!(coord.results(), vec!["xyz"]);
        assert!(!coord.is_searching());
        assert_eq!(*log.lock().unwrap(), vec!["abc", "xyz"]);
        assert!(notifier.notices().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failure_clears_results_and_notifies_once() {
        let notifier = Arc::new(RecordingNotifier::new());
        let coord = coordinator(notifier.clone());
        let log: Log = Arc::default();

        coord.schedule("jo", always, echo(&log, Duration::ZERO));
        tokio::time::sleep(Duration::from_millis(310)).await;
        assert_eq!(coord.results(), vec!["jo"]);

        coord.schedule("john", always, failing(&log));
        tokio::time::sleep(Duration::from_millis(310)).await;

        assert!(coord.results().is_empty());
        assert!(!coord.is_searching());
        assert_eq!(notifier.errors(), vec!["Failed to search patients"]);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_failure_is_silent() {
        let notifier = Arc::new(RecordingNotifier::new());
        let coord = coordinator(notifier.clone());
        let log: Log = Arc::default();

        let slow_failure = {
            let log = log.clone();
            move |term: String| -> SearchFuture<String> {
                log.lock().unwrap().push(term);
                async {
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    Err::<Vec<String>, _>(ApiError::Timeout(30))
                }
                .boxed()
            }
        };
        coord.schedule("abc", always, slow_failure);
        tokio::time::sleep(Duration::from_millis(350)).await;
        coord.schedule("abcd", always, echo(&log, Duration::ZERO));

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(coord.results(), vec!["abcd"]);
        assert!(notifier.notices().is_empty());
        assert!(!coord.is_searching());
    }

    #[tokio::test(start_paused = true)]
    async fn gate_checked_at_fire_time() {
        let coord = coordinator(Arc::new(RecordingNotifier::new()));
        let log: Log = Arc::default();

        coord.schedule("123456", is_patient_dispatchable, echo(&log, Duration::ZERO));
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(log.lock().unwrap().is_empty(), "6-digit phone must not dispatch");
        assert!(!coord.is_searching());

        coord.schedule("1234567", is_patient_dispatchable, echo(&log, Duration::ZERO));
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(*log.lock().unwrap(), vec!["1234567"]);
    }

    #[tokio::test(start_paused = true)]
    async fn blank_term_cancels_and_clears() {
        let coord = coordinator(Arc::new(RecordingNotifier::new()));
        let log: Log = Arc::default();

        coord.schedule("ab", always, echo(&log, Duration::ZERO));
        tokio::time::sleep(Duration::from_millis(310)).await;
        assert_eq!(coord.results().len(), 1);

        coord.schedule("abc", always, echo(&log, Duration::ZERO));
        coord.schedule("", always, echo(&log, Duration::ZERO));
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert!(coord.results().is_empty());
        assert!(!coord.is_pending());
        assert_eq!(*log.lock().unwrap(), vec!["ab"]);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_drops_in_flight_response() {
        let coord = coordinator(Arc::new(RecordingNotifier::new()));
        let log: Log = Arc::default();

        coord.schedule("abc", always, echo(&log, Duration::from_millis(200)));
        tokio::time::sleep(Duration::from_millis(350)).await;
        coord.clear();
        assert_eq!(coord.live_term(), "");

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(coord.results().is_empty());
        assert!(!coord.is_searching());
    }

    #[tokio::test(start_paused = true)]
    async fn lookup_receives_trimmed_term() {
        let coord = coordinator(Arc::new(RecordingNotifier::new()));
        let log: Log = Arc::default();

        coord.schedule("  john ", always, echo(&log, Duration::ZERO));
        tokio::time::sleep(Duration::from_millis(310)).await;
        assert_eq!(*log.lock().unwrap(), vec!["john"]);
        assert_eq!(coord.results(), vec!["john"]);
    }

    #[tokio::test(start_paused = true)]
    async fn domains_do_not_share_state() {
        let notifier = Arc::new(RecordingNotifier::new());
        let patients = coordinator(notifier.clone());
        let doctors: SearchCoordinator<String> =
            SearchCoordinator::new(SearchDomain::Doctor, DELAY, notifier.clone());
        let log: Log = Arc::default();

        patients.schedule("abc", always, echo(&log, Duration::from_millis(500)));
        doctors.schedule("sa", always, failing(&log));
        tokio::time::sleep(Duration::from_millis(350)).await;

        assert!(patients.is_searching());
        assert!(!doctors.is_searching());
        assert_eq!(notifier.errors(), vec!["Failed to search doctors"]);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(patients.results(), vec!["abc"]);
        assert_eq!(doctors.domain(), SearchDomain::Doctor);
    }

    #[tokio::test(start_paused = true)]
    async fn settles_only_for_live_term() {
        let coord = coordinator(Arc::new(RecordingNotifier::new()));
        let log: Log = Arc::default();

        coord.schedule("ab", always, echo(&log, Duration::ZERO));
        assert!(!coord.is_settled());
        tokio::time::sleep(Duration::from_millis(310)).await;
        assert!(coord.is_settled());

        coord.schedule("abc", always, echo(&log, Duration::ZERO));
        assert!(!coord.is_settled(), "new term resets the flag");
        tokio::time::sleep(Duration::from_millis(310)).await;
        assert!(coord.is_settled());

        coord.clear();
        assert!(!coord.is_settled());
    }
}
