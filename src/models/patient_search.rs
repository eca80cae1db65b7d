use serde::{Deserialize, Serialize};

use super::reference::Patient;
use crate::search::classify::Classification;

/// Body of `POST /api/patients/search`.
///
/// Exactly one of the name/mobile families is populated; the rest are sent as
/// empty strings or zero, which the backend treats as "not filtered".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientSearchRequest {
    pub pat_name: String,
    pub patar_name: String,
    pub pat_mobile: u128,
    pub mobile_country_code: u32,
    pub pat_number: i64,
}

impl From<&Classification> for PatientSearchRequest {
    fn from(classification: &Classification) -> Self {
        match classification {
            Classification::ScriptName(name) => Self {
                patar_name: name.clone(),
                ..Self::default()
            },
            Classification::LatinName(name) => Self {
                pat_name: name.clone(),
                ..Self::default()
            },
            Classification::PhoneNumber(phone) => Self {
                pat_mobile: phone.local_number,
                mobile_country_code: phone.country_code,
                ..Self::default()
            },
        }
    }
}

/// Response of `POST /api/patients/search`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientSearchResponse {
    #[serde(default)]
    pub patient_list: Vec<Patient>,
}
