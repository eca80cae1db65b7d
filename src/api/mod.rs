//! Clinical-records API access: trait seam, HTTP implementation, test double.

pub mod client;
pub mod error;
pub mod mock;

pub use client::{ClinicApi, Endpoint, HttpClinicApi};
pub use error::ApiError;
pub use mock::MockClinicApi;
