use crate::core::{Classification, ServiceStatus, UPCOMING_WINDOW_DAYS};
use crate::utils::error::Result;
use crate::utils::validation::parse_date;
use chrono::{Days, NaiveDate};

/// Classifies an already-parsed retest date against `today`.
///
/// Expired before today, upcoming from today through today + 30 days
/// (both ends inclusive), valid after that.
pub fn classify_date(retest_date: NaiveDate, today: NaiveDate) -> Classification {
    let window_end = today
        .checked_add_days(Days::new(UPCOMING_WINDOW_DAYS))
        .unwrap_or(NaiveDate::MAX);

    let status = if retest_date < today {
        ServiceStatus::Expired
    } else if retest_date <= window_end {
        ServiceStatus::Upcoming
    } else {
        ServiceStatus::Valid
    };

    Classification {
        status,
        color: status.color(),
    }
}

/// Classifies a stored retest date string. Malformed dates are an error,
/// never a default status.
pub fn classify(retest_date: &str, today: NaiveDate) -> Result<Classification> {
    let parsed = parse_date(retest_date)?;
    Ok(classify_date(parsed, today))
}
