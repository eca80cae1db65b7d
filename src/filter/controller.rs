//! Appointment filter controller.
//!
//! Owns the filter state for one appointment list view and mediates every
//! interaction with it:
//! - criteria changes are immutable merges and never search by themselves
//! - the explicit search action validates first and only then calls the
//!   injected `on_search` callback
//! - clearing filters resets to today's defaults and searches immediately
//! - reference data loads concurrently, one failure domain per dropdown
//! - the doctor and patient pickers each run their own debounced lookup

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::task::JoinHandle;

use super::reference_data::{self, ReferenceData, RetryPolicy};
use super::validation::{validate, ValidationError};
use crate::api::{ApiError, ClinicApi};
use crate::config::ClientConfig;
use crate::models::{CriteriaUpdate, Doctor, Patient, PatientSearchRequest, SearchCriteria};
use crate::notify::Notifier;
use crate::search::classify::{is_patient_dispatchable, meets_min_length, QueryClassifier};
use crate::search::coordinator::{SearchCoordinator, SearchDomain};

/// Runs the appointment list query for the composed criteria. The controller
/// never lists appointments itself.
pub type SearchCallback =
    Arc<dyn Fn(SearchCriteria) -> BoxFuture<'static, Result<(), ApiError>> + Send + Sync>;

/// Observes every criteria change (URL sync, analytics, ...).
pub type ParamChangeCallback = Box<dyn Fn(&SearchCriteria) + Send + Sync>;

/// Toast text when the appointment list query fails.
pub const SEARCH_FAILED_MESSAGE: &str = "Failed to search appointments";

/// Why the explicit search action did not complete. The user has already
/// been notified when this is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Appointment search failed: {0}")]
    Api(#[from] ApiError),
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// True if any optional field is set or the date range is not today-only.
pub fn has_active_filters(criteria: &SearchCriteria, today: NaiveDate) -> bool {
    active_filter_count(criteria, today) > 0
}

/// Number of active filters, for the badge. A time window counts once, and
/// so does a non-default date range.
pub fn active_filter_count(criteria: &SearchCriteria, today: NaiveDate) -> usize {
    [
        criteria.doctor_id.is_some(),
        criteria.patient_id.is_some(),
        criteria.appointment_type_id.is_some(),
        criteria.status_id.is_some(),
        criteria.start_time.is_some() || criteria.end_time.is_some(),
        criteria.start_date != today || criteria.end_date != today,
    ]
    .into_iter()
    .filter(|active| *active)
    .count()
}

// ═══════════════════════════════════════════════════════════
// FilterController
// ═══════════════════════════════════════════════════════════

pub struct FilterController {
    api: Arc<dyn ClinicApi>,
    notifier: Arc<dyn Notifier>,
    classifier: QueryClassifier,
    retry: RetryPolicy,
    today: fn() -> NaiveDate,
    criteria: SearchCriteria,
    reference: Arc<ReferenceData>,
    doctor_search: SearchCoordinator<Doctor>,
    patient_search: SearchCoordinator<Patient>,
    patient_label: Option<String>,
    on_search: SearchCallback,
    on_param_change: Option<ParamChangeCallback>,
}

impl FilterController {
    /// Create a controller with default criteria (today, no filters).
    /// Reference data is not fetched until `load_reference_data` or
    /// `start_reference_load` is called.
    pub fn new(
        config: &ClientConfig,
        api: Arc<dyn ClinicApi>,
        notifier: Arc<dyn Notifier>,
        on_search: SearchCallback,
    ) -> Self {
        Self {
            api,
            classifier: QueryClassifier::new([config.country_code.clone()]),
            retry: RetryPolicy::from_config(config),
            today: local_today,
            criteria: SearchCriteria::for_day(local_today()),
            reference: Arc::new(ReferenceData::new()),
            doctor_search: SearchCoordinator::new(
                SearchDomain::Doctor,
                config.debounce,
                notifier.clone(),
            ),
            patient_search: SearchCoordinator::new(
                SearchDomain::Patient,
                config.debounce,
                notifier.clone(),
            ),
            notifier,
            patient_label: None,
            on_search,
            on_param_change: None,
        }
    }

    /// Replace the clock. Resets criteria to the new "today".
    pub fn with_today(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self.criteria = SearchCriteria::for_day(today());
        self
    }

    pub fn with_param_change(mut self, callback: ParamChangeCallback) -> Self {
        self.on_param_change = Some(callback);
        self
    }

    // ── Criteria ────────────────────────────────────────────

    pub fn criteria(&self) -> &SearchCriteria {
        &self.criteria
    }

    pub fn today(&self) -> NaiveDate {
        (self.today)()
    }

    /// Merge a partial update into the criteria. Never searches.
    pub fn update_criteria(&mut self, update: CriteriaUpdate) -> SearchCriteria {
        if update.is_empty() {
            return self.criteria.clone();
        }
        self.criteria = self.criteria.merged(&update);
        if let Some(callback) = &self.on_param_change {
            callback(&self.criteria);
        }
        self.criteria.clone()
    }

    pub fn has_active_filters(&self) -> bool {
        has_active_filters(&self.criteria, self.today())
    }

    pub fn active_filter_count(&self) -> usize {
        active_filter_count(&self.criteria, self.today())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate(&self.criteria)
    }

    // ── Search actions ──────────────────────────────────────

    /// Explicit "Search" action: validate, then hand the criteria to the
    /// search callback. Validation failures never reach the network.
    pub async fn search(&self) -> Result<(), SearchError> {
        if let Err(e) = self.validate() {
            tracing::debug!("Search blocked by validation: {e}");
            self.notifier.error(&e.to_string());
            return Err(e.into());
        }

        tracing::debug!(criteria = ?self.criteria, "Running appointment search");
        (self.on_search)(self.criteria.clone()).await.map_err(|e| {
            tracing::warn!("Appointment search failed: {e}");
            self.notifier.error(SEARCH_FAILED_MESSAGE);
            SearchError::Api(e)
        })
    }

    /// Reset every field to its default and search with the defaults.
    pub async fn clear_filters(&mut self) -> SearchCriteria {
        self.criteria = SearchCriteria::for_day(self.today());
        self.patient_search.clear();
        self.doctor_search.clear();
        self.patient_label = None;
        if let Some(callback) = &self.on_param_change {
            callback(&self.criteria);
        }

        if let Err(e) = self.search().await {
            tracing::debug!("Search after clearing filters did not complete: {e}");
        }
        self.criteria.clone()
    }

    // ── Reference data ──────────────────────────────────────

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    /// Load every dropdown that is not ready yet and wait for all of them,
    /// including any fetch a background load already has in flight.
    pub async fn load_reference_data(&self) {
        reference_data::load_all(
            self.api.as_ref(),
            &self.reference,
            self.retry,
            self.notifier.as_ref(),
        )
        .await;
    }

    /// Explicit retry for dropdowns that failed. Ready ones are not refetched.
    pub async fn reload_reference_data(&self) {
        self.load_reference_data().await;
    }

    /// Same as `load_reference_data`, on a background task so the caller can
    /// keep handling input while the dropdowns fill in.
    pub fn start_reference_load(&self) -> JoinHandle<()> {
        let api = self.api.clone();
        let reference = self.reference.clone();
        let notifier = self.notifier.clone();
        let retry = self.retry;
        tokio::spawn(async move {
            reference_data::load_all(api.as_ref(), &reference, retry, notifier.as_ref()).await;
        })
    }

    // ── Doctor picker ───────────────────────────────────────

    /// Doctor picker keystroke. Filters the loaded doctor list locally, as
    /// it stands when the debounce delay runs out.
    pub fn filter_doctors(&self, term: &str) {
        let reference = self.reference.clone();
        self.doctor_search.schedule(term, meets_min_length, move |term| {
            let doctors = reference.doctors().items().to_vec();
            async move {
                Ok::<_, ApiError>(
                    doctors
                        .into_iter()
                        .filter(|d| d.matches(&term))
                        .collect::<Vec<_>>(),
                )
            }
            .boxed()
        });
    }

    /// Doctors to show in the picker: the filtered list once the filter for
    /// the live term has run, the full list otherwise (short term, or still
    /// debouncing).
    pub fn visible_doctors(&self) -> Vec<Doctor> {
        if meets_min_length(&self.doctor_search.live_term()) && self.doctor_search.is_settled() {
            self.doctor_search.results()
        } else {
            self.reference.doctors().items().to_vec()
        }
    }

    pub fn is_filtering_doctors(&self) -> bool {
        self.doctor_search.is_searching()
    }

    pub fn select_doctor(&mut self, doctor: Option<&Doctor>) -> SearchCriteria {
        self.update_criteria(CriteriaUpdate::default().doctor(doctor.map(|d| d.employee_number)))
    }

    // ── Patient picker ──────────────────────────────────────

    /// Patient picker keystroke. Classifies the term at dispatch time and
    /// queries the backend.
    ///
    /// A blank term clears the results and any selected patient.
    pub fn search_patients(&mut self, term: &str) {
        if term.trim().is_empty() {
            self.patient_search.clear();
            if self.criteria.patient_id.is_some() || self.patient_label.is_some() {
                self.patient_label = None;
                self.update_criteria(CriteriaUpdate::default().patient(None));
            }
            return;
        }

        let api = self.api.clone();
        let classifier = self.classifier.clone();
        self.patient_search
            .schedule(term, is_patient_dispatchable, move |term| {
                async move {
                    let request = PatientSearchRequest::from(&classifier.classify(&term));
                    api.search_patients(request).await
                }
                .boxed()
            });
    }

    pub fn patient_results(&self) -> Vec<Patient> {
        self.patient_search.results()
    }

    pub fn is_searching_patients(&self) -> bool {
        self.patient_search.is_searching()
    }

    /// Pick a patient from the results (or clear the pick).
    pub fn select_patient(&mut self, patient: Option<&Patient>) -> SearchCriteria {
        self.patient_label = patient.map(Patient::display_label);
        self.update_criteria(CriteriaUpdate::default().patient(patient.map(|p| p.pat_number)))
    }

    pub fn selected_patient_label(&self) -> Option<&str> {
        self.patient_label.as_deref()
    }
}
