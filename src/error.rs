use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised by the compatibility, eligibility and interval checks.
///
/// Malformed input is rejected rather than coerced so that a broken form
/// field surfaces as an error instead of a silent "ineligible".
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BloodSyncError {
    #[error("Invalid blood type: {0:?}")]
    InvalidBloodType(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Last donation date {date} is after {today}")]
    FutureDonationDate { date: NaiveDate, today: NaiveDate },

    #[error("Only {days_since} days since the last donation, {required} required")]
    DonationTooSoon { days_since: i64, required: i64 },

    #[error("Request {0} is cancelled")]
    RequestCancelled(String),
}

pub type Result<T> = std::result::Result<T, BloodSyncError>;
