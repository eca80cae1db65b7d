use chrono::{NaiveDate, NaiveTime};

use crate::models::SearchCriteria;

/// Reasons a criteria set cannot be searched. The `Display` text is the toast.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Start date ({start}) must be on or before end date ({end})")]
    DateRangeInverted { start: NaiveDate, end: NaiveDate },

    #[error("Start time ({start}) must be on or before end time ({end})")]
    TimeRangeInverted { start: String, end: String },

    #[error("Invalid date '{0}'. Use YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid time '{0}'. Use HH:MM")]
    InvalidTime(String),
}

/// Check the range invariants. Runs before every explicit search.
pub fn validate(criteria: &SearchCriteria) -> Result<(), ValidationError> {
    if criteria.start_date > criteria.end_date {
        return Err(ValidationError::DateRangeInverted {
            start: criteria.start_date,
            end: criteria.end_date,
        });
    }
    if let (Some(start), Some(end)) = (criteria.start_time, criteria.end_time) {
        if start > end {
            return Err(ValidationError::TimeRangeInverted {
                start: start.format("%H:%M").to_string(),
                end: end.format("%H:%M").to_string(),
            });
        }
    }
    Ok(())
}

/// Parse a date picker value (YYYY-MM-DD).
pub fn parse_date_input(raw: &str) -> Result<NaiveDate, ValidationError> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(trimmed.to_string()))
}

/// Parse a time picker value (HH:MM). Blank means "no time bound".
pub fn parse_time_input(raw: &str) -> Result<Option<NaiveTime>, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .map(Some)
        .map_err(|_| ValidationError::InvalidTime(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CriteriaUpdate;

    fn range(start: &str, end: &str) -> SearchCriteria {
        let start = parse_date_input(start).unwrap();
        let end = parse_date_input(end).unwrap();
        SearchCriteria::for_day(start).merged(&CriteriaUpdate::default().end_date(end))
    }

    #[test]
    fn inverted_date_range_rejected() {
        let err = validate(&range("2024-06-10", "2024-06-01")).unwrap_err();
        assert!(matches!(err, ValidationError::DateRangeInverted { .. }));
        assert_eq!(
            err.to_string(),
            "Start date (2024-06-10) must be on or before end date (2024-06-01)"
        );
    }

    #[test]
    fn ordered_date_range_accepted() {
        assert!(validate(&range("2024-06-01", "2024-06-10")).is_ok());
    }

    #[test]
    fn single_day_range_accepted() {
        assert!(validate(&range("2024-06-01", "2024-06-01")).is_ok());
    }

    #[test]
    fn inverted_time_range_rejected() {
        let criteria = range("2024-06-01", "2024-06-01").merged(
            &CriteriaUpdate::default()
                .start_time(parse_time_input("17:00").unwrap())
                .end_time(parse_time_input("09:00").unwrap()),
        );
        assert_eq!(
            validate(&criteria),
            Err(ValidationError::TimeRangeInverted {
                start: "17:00".into(),
                end: "09:00".into()
            })
        );
    }

    #[test]
    fn single_time_bound_not_checked() {
        let criteria = range("2024-06-01", "2024-06-01")
            .merged(&CriteriaUpdate::default().start_time(parse_time_input("17:00").unwrap()));
        assert!(validate(&criteria).is_ok());
    }

    #[test]
    fn date_input_parsing() {
        assert!(parse_date_input(" 2024-02-29 ").is_ok());
        assert_eq!(
            parse_date_input("2023-02-29"),
            Err(ValidationError::InvalidDate("2023-02-29".into()))
        );
        assert!(parse_date_input("10/06/2024").is_err());
    }

    #[test]
    fn time_input_parsing() {
        assert_eq!(parse_time_input(""), Ok(None));
        assert_eq!(parse_time_input("08:15"), Ok(NaiveTime::from_hms_opt(8, 15, 0)));
        assert!(parse_time_input("25:00").is_err());
        assert!(parse_time_input("8am").is_err());
    }
}
