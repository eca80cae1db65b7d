use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::reference::LookupId;

/// Full filter state for an appointment query.
///
/// Only the date range is mandatory; it defaults to a single day (today).
/// Instances are never mutated in place: every change goes through
/// [`SearchCriteria::merged`], which returns a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCriteria {
    pub doctor_id: Option<i64>,
    pub patient_id: Option<i64>,
    pub start_date: NaiveDate, // YYYY-MM-DD
    pub end_date: NaiveDate,   // YYYY-MM-DD
    #[serde(with = "hhmm", default)]
    pub start_time: Option<NaiveTime>,
    #[serde(with = "hhmm", default)]
    pub end_time: Option<NaiveTime>,
    pub appointment_type_id: Option<LookupId>,
    pub status_id: Option<LookupId>,
}

impl SearchCriteria {
    /// Default criteria: both dates set to `today`, every optional field empty.
    pub fn for_day(today: NaiveDate) -> Self {
        Self {
            doctor_id: None,
            patient_id: None,
            start_date: today,
            end_date: today,
            start_time: None,
            end_time: None,
            appointment_type_id: None,
            status_id: None,
        }
    }

    /// Return a copy of `self` with every field present in `update` replaced.
    pub fn merged(&self, update: &CriteriaUpdate) -> Self {
        let mut next = self.clone();
        if let Some(v) = update.doctor_id {
            next.doctor_id = v;
        }
        if let Some(v) = update.patient_id {
            next.patient_id = v;
        }
        if let Some(v) = update.start_date {
            next.start_date = v;
        }
        if let Some(v) = update.end_date {
            next.end_date = v;
        }
        if let Some(v) = update.start_time {
            next.start_time = v;
        }
        if let Some(v) = update.end_time {
            next.end_time = v;
        }
        if let Some(ref v) = update.appointment_type_id {
            next.appointment_type_id = v.clone();
        }
        if let Some(ref v) = update.status_id {
            next.status_id = v.clone();
        }
        next
    }
}

/// Partial update for [`SearchCriteria`].
///
/// Outer `None` leaves a field untouched; `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CriteriaUpdate {
    pub doctor_id: Option<Option<i64>>,
    pub patient_id: Option<Option<i64>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub start_time: Option<Option<NaiveTime>>,
    pub end_time: Option<Option<NaiveTime>>,
    pub appointment_type_id: Option<Option<LookupId>>,
    pub status_id: Option<Option<LookupId>>,
}

impl CriteriaUpdate {
    pub fn doctor(mut self, id: Option<i64>) -> Self {
        self.doctor_id = Some(id);
        self
    }

    pub fn patient(mut self, id: Option<i64>) -> Self {
        self.patient_id = Some(id);
        self
    }

    pub fn start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn end_date(mut self, date: NaiveDate) -> Self {
        self.end_date = Some(date);
        self
    }

    pub fn start_time(mut self, time: Option<NaiveTime>) -> Self {
        self.start_time = Some(time);
        self
    }

    pub fn end_time(mut self, time: Option<NaiveTime>) -> Self {
        self.end_time = Some(time);
        self
    }

    pub fn appointment_type(mut self, id: Option<LookupId>) -> Self {
        self.appointment_type_id = Some(id);
        self
    }

    pub fn status(mut self, id: Option<LookupId>) -> Self {
        self.status_id = Some(id);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// `HH:MM` serde for optional times (the backend rejects seconds).
pub(crate) mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S>(value: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(t) => serializer.serialize_str(&t.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => NaiveTime::parse_from_str(s, FORMAT)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}
