//! Reference data for the filter dropdowns: doctors, appointment types,
//! appointment statuses.
//!
//! Each slice is an independent failure domain with its own state machine:
//!
//! ```text
//! Idle ──begin──▶ Loading ──ok──▶ Ready
//!                    │
//!                    └──err──▶ Failed
//! ```
//!
//! `Ready` and `Failed` are terminal for automatic loading. A failed slice is
//! only fetched again on an explicit reload; a ready slice never is.

use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Notify;

use crate::api::{ApiError, ClinicApi};
use crate::config::ClientConfig;
use crate::models::{Doctor, LookupItem};
use crate::notify::Notifier;

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SliceState {
    Idle,
    Loading,
    Ready,
    Failed,
}

/// Which dropdown a slice feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceSource {
    Doctors,
    AppointmentTypes,
    AppointmentStatuses,
}

impl ReferenceSource {
    /// Toast text when the slice ends up `Failed`.
    pub fn failure_message(&self) -> &'static str {
        match self {
            Self::Doctors => "Failed to load doctors",
            Self::AppointmentTypes => "Failed to load appointment types",
            Self::AppointmentStatuses => "Failed to load appointment statuses",
        }
    }
}

impl fmt::Display for ReferenceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Doctors => write!(f, "doctors"),
            Self::AppointmentTypes => write!(f, "appointment types"),
            Self::AppointmentStatuses => write!(f, "appointment statuses"),
        }
    }
}

/// One lookup collection and its loading state.
#[derive(Debug, Clone)]
pub struct ReferenceSlice<T> {
    state: SliceState,
    items: Vec<T>,
}

impl<T> Default for ReferenceSlice<T> {
    fn default() -> Self {
        Self {
            state: SliceState::Idle,
            items: Vec::new(),
        }
    }
}

impl<T: Clone> ReferenceSlice<T> {
    pub fn state(&self) -> SliceState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == SliceState::Loading
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Move to `Loading` when a fetch is due. `Wait` means another caller's
    /// fetch is in flight; `Skip` means the slice is already ready.
    fn begin(&mut self) -> Begin {
        match self.state {
            SliceState::Idle | SliceState::Failed => {
                self.state = SliceState::Loading;
                Begin::Fetch
            }
            SliceState::Loading => Begin::Wait,
            SliceState::Ready => Begin::Skip,
        }
    }

    fn finish(&mut self, result: Result<Vec<T>, ApiError>) {
        match result {
            Ok(items) => {
                self.items = items;
                self.state = SliceState::Ready;
            }
            Err(_) => {
                self.items.clear();
                self.state = SliceState::Failed;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Begin {
    Fetch,
    Wait,
    Skip,
}

/// A slice plus the signal its in-flight fetch raises when it settles.
#[derive(Debug)]
struct SliceCell<T> {
    slice: Mutex<ReferenceSlice<T>>,
    settled: Notify,
}

impl<T> Default for SliceCell<T> {
    fn default() -> Self {
        Self {
            slice: Mutex::new(ReferenceSlice::default()),
            settled: Notify::new(),
        }
    }
}

/// The three static slices, each behind its own lock.
#[derive(Debug, Default)]
pub struct ReferenceData {
    doctors: SliceCell<Doctor>,
    appointment_types: SliceCell<LookupItem>,
    appointment_statuses: SliceCell<LookupItem>,
}

impl ReferenceData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn doctors(&self) -> ReferenceSlice<Doctor> {
        lock(&self.doctors.slice).clone()
    }

    pub fn appointment_types(&self) -> ReferenceSlice<LookupItem> {
        lock(&self.appointment_types.slice).clone()
    }

    pub fn appointment_statuses(&self) -> ReferenceSlice<LookupItem> {
        lock(&self.appointment_statuses.slice).clone()
    }

    /// True while any slice is still loading.
    pub fn any_loading(&self) -> bool {
        lock(&self.doctors.slice).is_loading()
            || lock(&self.appointment_types.slice).is_loading()
            || lock(&self.appointment_statuses.slice).is_loading()
    }
}

fn lock<T>(slice: &Mutex<ReferenceSlice<T>>) -> MutexGuard<'_, ReferenceSlice<T>> {
    slice.lock().unwrap_or_else(PoisonError::into_inner)
}

// ═══════════════════════════════════════════════════════════
// Retry
// ═══════════════════════════════════════════════════════════

/// Fixed-delay retry for reference-data fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            attempts: config.retry_attempts.max(1),
            delay: config.retry_delay,
        }
    }
}

/// Run `fetch` up to `policy.attempts` times, sleeping `policy.delay`
/// between attempts. Returns the last error if every attempt fails.
pub async fn fetch_with_retry<T, F, Fut>(
    policy: RetryPolicy,
    source: ReferenceSource,
    mut fetch: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match fetch().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                tracing::warn!(%source, attempt, attempts, "Fetch failed, retrying: {e}");
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::warn!(%source, attempts, "Fetch failed, giving up: {e}");
                return Err(e);
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Loading
// ═══════════════════════════════════════════════════════════

/// Fetch every slice that is `Idle` or `Failed`, concurrently, and return
/// once none of them is loading.
///
/// Each slice leaves `Loading` as soon as its own fetch settles; a failure
/// in one neither delays nor affects the others and produces exactly one
/// notice. A slice already being fetched by another caller is not fetched
/// twice: this call waits for that fetch to settle instead.
pub async fn load_all(
    api: &dyn ClinicApi,
    data: &ReferenceData,
    policy: RetryPolicy,
    notifier: &dyn Notifier,
) {
    let doctors = load_slice(&data.doctors, ReferenceSource::Doctors, policy, notifier, || {
        api.fetch_doctors()
    });
    let types = load_slice(
        &data.appointment_types,
        ReferenceSource::AppointmentTypes,
        policy,
        notifier,
        || api.fetch_appointment_types(),
    );
    let statuses = load_slice(
        &data.appointment_statuses,
        ReferenceSource::AppointmentStatuses,
        policy,
        notifier,
        || api.fetch_appointment_statuses(),
    );
    tokio::join!(doctors, types, statuses);
}

async fn load_slice<T, F, Fut>(
    cell: &SliceCell<T>,
    source: ReferenceSource,
    policy: RetryPolicy,
    notifier: &dyn Notifier,
    fetch: F,
) where
    T: Clone,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<T>, ApiError>>,
{
    // Register before reading the state so a fetch settling in between is
    // not missed.
    let settled = cell.settled.notified();
    tokio::pin!(settled);
    settled.as_mut().enable();

    let begin = lock(&cell.slice).begin();
    match begin {
        Begin::Fetch => {}
        Begin::Wait => {
            tracing::debug!(%source, "Waiting for in-flight fetch");
            settled.await;
            return;
        }
        Begin::Skip => return,
    }

    let result = fetch_with_retry(policy, source, fetch).await;
    let failed = result.is_err();
    if let Ok(items) = &result {
        tracing::info!(%source, count = items.len(), "Reference data ready");
    }
    lock(&cell.slice).finish(result);
    cell.settled.notify_waiters();

    if failed {
        notifier.error(source.failure_message());
    }
}
