//! HTTP client for the clinical-records API.
//!
//! The controller only sees the `ClinicApi` trait; `HttpClinicApi` is the
//! production implementation over `reqwest`, `MockClinicApi` (see `mock.rs`)
//! backs the tests.

use std::fmt;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, EXPIRES, PRAGMA};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::ApiError;
use crate::config::ClientConfig;
use crate::models::{Doctor, LookupItem, Patient, PatientSearchRequest, PatientSearchResponse};

/// Remote endpoints the controller consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Doctors,
    AppointmentTypes,
    AppointmentStatuses,
    PatientSearch,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Doctors => "/api/doctor/all",
            Self::AppointmentTypes => "/api/lookup/appointment-types",
            Self::AppointmentStatuses => "/api/lookup/appointment-statuses",
            Self::PatientSearch => "/api/patients/search",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Clinical-records API as seen by the filter controller.
pub trait ClinicApi: Send + Sync {
    fn fetch_doctors(&self) -> BoxFuture<'_, Result<Vec<Doctor>, ApiError>>;

    fn fetch_appointment_types(&self) -> BoxFuture<'_, Result<Vec<LookupItem>, ApiError>>;

    fn fetch_appointment_statuses(&self) -> BoxFuture<'_, Result<Vec<LookupItem>, ApiError>>;

    fn search_patients(
        &self,
        request: PatientSearchRequest,
    ) -> BoxFuture<'_, Result<Vec<Patient>, ApiError>>;
}

// ═══════════════════════════════════════════════════════════
// HttpClinicApi
// ═══════════════════════════════════════════════════════════

/// `reqwest`-backed client. Session cookies are kept between requests and
/// every request carries no-cache headers.
pub struct HttpClinicApi {
    base_url: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpClinicApi {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let base_url = config.api_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::InvalidUrl(base_url));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache, no-store"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(EXPIRES, HeaderValue::from_static("0"));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .cookie_store(true)
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            base_url,
            client,
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: Endpoint) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, endpoint.path());
        tracing::debug!(%endpoint, "GET");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.decode(endpoint, response).await
    }

    async fn post_json<B, T>(&self, endpoint: Endpoint, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, endpoint.path());
        tracing::debug!(%endpoint, "POST");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.decode(endpoint, response).await
    }

    async fn decode<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = ApiError::from_status(status.as_u16(), &body);
            tracing::warn!(%endpoint, status = status.as_u16(), "API request failed: {err}");
            return Err(err);
        }
        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(self.timeout_secs)
            } else {
                ApiError::Decode(e.to_string())
            }
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::Timeout(self.timeout_secs)
        } else if e.is_connect() {
            ApiError::Unreachable(self.base_url.clone())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

impl ClinicApi for HttpClinicApi {
    fn fetch_doctors(&self) -> BoxFuture<'_, Result<Vec<Doctor>, ApiError>> {
        self.get_json(Endpoint::Doctors).boxed()
    }

    fn fetch_appointment_types(&self) -> BoxFuture<'_, Result<Vec<LookupItem>, ApiError>> {
        self.get_json(Endpoint::AppointmentTypes).boxed()
    }

    fn fetch_appointment_statuses(&self) -> BoxFuture<'_, Result<Vec<LookupItem>, ApiError>> {
        self.get_json(Endpoint::AppointmentStatuses).boxed()
    }

    fn search_patients(
        &self,
        request: PatientSearchRequest,
    ) -> BoxFuture<'_, Result<Vec<Patient>, ApiError>> {
        async move {
            let response: PatientSearchResponse =
                self.post_json(Endpoint::PatientSearch, &request).await?;
            Ok(response.patient_list)
        }
        .boxed()
    }
}
