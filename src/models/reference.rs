use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a lookup row. The lookup endpoints return numeric IDs for
/// most tables and short codes for a few, so both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LookupId {
    Number(i64),
    Text(String),
}

impl fmt::Display for LookupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Doctor record from `GET /api/doctor/all`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub employee_number: i64,
    pub full_name_english: String,
    #[serde(default)]
    pub specialization_name: Option<String>,
}

impl Doctor {
    /// Case-insensitive match on name or specialization.
    pub fn matches(&self, term: &str) -> bool {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.full_name_english.to_lowercase().contains(&needle)
            || self
                .specialization_name
                .as_deref()
                .is_some_and(|s| s.to_lowercase().contains(&needle))
    }
}

/// Row of `/api/lookup/appointment-types` or `/api/lookup/appointment-statuses`.
///
/// Older lookup tables serialize PascalCase keys, so both spellings are read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupItem {
    #[serde(alias = "ID")]
    pub id: LookupId,
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(alias = "Description", default)]
    pub description: Option<String>,
}

/// Patient row from `POST /api/patients/search`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub pat_number: i64,
    #[serde(default)]
    pub pat_name: String,
    #[serde(default)]
    pub patar_name: Option<String>,
    #[serde(default)]
    pub pat_mobile: Option<String>,
    #[serde(default)]
    pub mobile_country_code: Option<u32>,
}

impl Patient {
    /// Label shown in the patient picker: Latin name, falling back to the
    /// Arabic name, followed by the file number.
    pub fn display_label(&self) -> String {
        let name = if self.pat_name.trim().is_empty() {
            self.patar_name.as_deref().unwrap_or_default().trim()
        } else {
            self.pat_name.trim()
        };
        format!("{name} (#{})", self.pat_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_item_accepts_pascal_case() {
        let item: LookupItem =
            serde_json::from_str(r#"{"ID": 4, "Name": "Follow-up", "Description": "Return visit"}"#)
                .unwrap();
        assert_eq!(item.id, LookupId::Number(4));
        assert_eq!(item.name, "Follow-up");
        assert_eq!(item.description.as_deref(), Some("Return visit"));
    }

    #[test]
    fn lookup_item_accepts_camel_case_without_description() {
        let item: LookupItem = serde_json::from_str(r#"{"id": "CNF", "name": "Confirmed"}"#).unwrap();
        assert_eq!(item.id, LookupId::Text("CNF".into()));
        assert!(item.description.is_none());
        assert_eq!(item.id.to_string(), "CNF");
    }

    #[test]
    fn doctor_parses_from_api_shape() {
        let doctor: Doctor = serde_json::from_str(
            r#"{"employeeNumber": 12, "fullNameEnglish": "Sara Haddad", "specializationName": "Pediatrics"}"#,
        )
        .unwrap();
        assert_eq!(doctor.employee_number, 12);
        assert!(doctor.matches("sara"));
        assert!(doctor.matches("PEDI"));
        assert!(!doctor.matches("cardio"));
    }

    #[test]
    fn doctor_blank_term_matches_everything() {
        let doctor = Doctor {
            employee_number: 1,
            full_name_english: "Omar Khalil".into(),
            specialization_name: None,
        };
        assert!(doctor.matches("  "));
    }

    #[test]
    fn patient_label_falls_back_to_arabic_name() {
        let patient = Patient {
            pat_number: 1042,
            pat_name: String::new(),
            patar_name: Some("محمد علي".into()),
            pat_mobile: None,
            mobile_country_code: None,
        };
        assert_eq!(patient.display_label(), "محمد علي (#1042)");
    }
}
