use crate::core::RETEST_INTERVAL_DAYS;
use crate::utils::error::{ComplianceError, Result};
use crate::utils::validation::parse_date;
use chrono::{Days, NaiveDate};

pub fn retest_date_for(test_date: NaiveDate) -> Result<NaiveDate> {
    test_date
        .checked_add_days(Days::new(RETEST_INTERVAL_DAYS))
        .ok_or_else(|| ComplianceError::InvalidDate {
            value: test_date.to_string(),
            reason: "retest date is out of range".to_string(),
        })
}

/// `test_date + 364 days`, calendar accurate.
pub fn compute_retest_date(test_date: &str) -> Result<NaiveDate> {
    retest_date_for(parse_date(test_date)?)
}
