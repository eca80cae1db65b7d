use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use super::client::{ClinicApi, Endpoint};
use super::error::ApiError;
use crate::models::{Doctor, LookupItem, Patient, PatientSearchRequest};

/// In-memory `ClinicApi` for tests.
///
/// Each endpoint can be given a fixed failure, a number of failures before it
/// starts succeeding, and a simulated latency. Patient search filters the
/// configured patients the way the backend does (substring on the populated
/// field).
#[derive(Default)]
pub struct MockClinicApi {
    doctors: Vec<Doctor>,
    appointment_types: Vec<LookupItem>,
    appointment_statuses: Vec<LookupItem>,
    patients: Vec<Patient>,
    failures: HashMap<Endpoint, ApiError>,
    flaky: Mutex<HashMap<Endpoint, u32>>,
    latency: HashMap<Endpoint, Duration>,
    calls: Mutex<HashMap<Endpoint, usize>>,
    patient_requests: Mutex<Vec<PatientSearchRequest>>,
}

impl MockClinicApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_doctors(mut self, doctors: Vec<Doctor>) -> Self {
        self.doctors = doctors;
        self
    }

    pub fn with_appointment_types(mut self, types: Vec<LookupItem>) -> Self {
        self.appointment_types = types;
        self
    }

    pub fn with_appointment_statuses(mut self, statuses: Vec<LookupItem>) -> Self {
        self.appointment_statuses = statuses;
        self
    }

    pub fn with_patients(mut self, patients: Vec<Patient>) -> Self {
        self.patients = patients;
        self
    }

    /// Every call to `endpoint` fails with `error`.
    pub fn failing(mut self, endpoint: Endpoint, error: ApiError) -> Self {
        self.failures.insert(endpoint, error);
        self
    }

    /// The first `failures` calls to `endpoint` fail with a 503.
    pub fn flaky(self, endpoint: Endpoint, failures: u32) -> Self {
        if let Ok(mut flaky) = self.flaky.lock() {
            flaky.insert(endpoint, failures);
        }
        self
    }

    pub fn with_latency(mut self, endpoint: Endpoint, latency: Duration) -> Self {
        self.latency.insert(endpoint, latency);
        self
    }

    /// Number of calls made to `endpoint`.
    pub fn calls(&self, endpoint: Endpoint) -> usize {
        self.calls
            .lock()
            .map(|c| c.get(&endpoint).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Patient search bodies received, oldest first.
    pub fn patient_requests(&self) -> Vec<PatientSearchRequest> {
        self.patient_requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn respond<T: Clone + Send + 'static>(
        &self,
        endpoint: Endpoint,
        value: T,
    ) -> BoxFuture<'static, Result<T, ApiError>> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls.entry(endpoint).or_insert(0) += 1;
        }

        let outcome = if let Some(err) = self.failures.get(&endpoint) {
            Err(err.clone())
        } else if self.take_flaky_failure(endpoint) {
            Err(ApiError::from_status(503, r#"{"message": "Service unavailable"}"#))
        } else {
            Ok(value)
        };

        let latency = self.latency.get(&endpoint).copied();
        async move {
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            outcome
        }
        .boxed()
    }

    fn take_flaky_failure(&self, endpoint: Endpoint) -> bool {
        let Ok(mut flaky) = self.flaky.lock() else {
            return false;
        };
        match flaky.get_mut(&endpoint) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }

    fn matching_patients(&self, request: &PatientSearchRequest) -> Vec<Patient> {
        let latin = request.pat_name.to_lowercase();
        self.patients
            .iter()
            .filter(|p| {
                if !latin.is_empty() {
                    return p.pat_name.to_lowercase().contains(&latin);
                }
                if !request.patar_name.is_empty() {
                    return p
                        .patar_name
                        .as_deref()
                        .is_some_and(|n| n.contains(&request.patar_name));
                }
                if request.pat_mobile != 0 {
                    let local = request.pat_mobile.to_string();
                    return p.pat_mobile.as_deref().is_some_and(|m| m.contains(&local));
                }
                false
            })
            .cloned()
            .collect()
    }
}

impl ClinicApi for MockClinicApi {
    fn fetch_doctors(&self) -> BoxFuture<'_, Result<Vec<Doctor>, ApiError>> {
        self.respond(Endpoint::Doctors, self.doctors.clone())
    }

    fn fetch_appointment_types(&self) -> BoxFuture<'_, Result<Vec<LookupItem>, ApiError>> {
        self.respond(Endpoint::AppointmentTypes, self.appointment_types.clone())
    }

    fn fetch_appointment_statuses(&self) -> BoxFuture<'_, Result<Vec<LookupItem>, ApiError>> {
        self.respond(Endpoint::AppointmentStatuses, self.appointment_statuses.clone())
    }

    fn search_patients(
        &self,
        request: PatientSearchRequest,
    ) -> BoxFuture<'_, Result<Vec<Patient>, ApiError>> {
        let matches = self.matching_patients(&request);
        if let Ok(mut requests) = self.patient_requests.lock() {
            requests.push(request);
        }
        self.respond(Endpoint::PatientSearch, matches)
    }
}
