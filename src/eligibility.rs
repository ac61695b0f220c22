use chrono::NaiveDate;
use tracing::warn;

use crate::error::{BloodSyncError, Result};
use crate::types::{Donor, EligibilityInput};

pub const MIN_DONOR_AGE: i64 = 18;
pub const MAX_DONOR_AGE: i64 = 65;
pub const MIN_DONOR_WEIGHT_KG: f64 = 50.0;

/// Minimum number of days between two whole-blood donations.
pub const MIN_DONATION_INTERVAL_DAYS: i64 = 56;

/// Age/weight eligibility: 18 to 65 years inclusive and at least 50 kg.
pub fn is_eligible(age: i64, weight_kg: f64) -> Result<bool> {
    if age < 0 {
        return Err(BloodSyncError::InvalidInput(format!(
            "age must not be negative, got {}",
            age
        )));
    }
    if !weight_kg.is_finite() || weight_kg <= 0.0 {
        return Err(BloodSyncError::InvalidInput(format!(
            "weight must be a positive number of kilograms, got {}",
            weight_kg
        )));
    }

    Ok((MIN_DONOR_AGE..=MAX_DONOR_AGE).contains(&age) && weight_kg >= MIN_DONOR_WEIGHT_KG)
}

impl EligibilityInput {
    /// Parse raw form field text. Missing, blank or non-numeric values are
    /// rejected so the caller can render "unknown" rather than "ineligible".
    pub fn from_fields(age: Option<&str>, weight_kg: Option<&str>) -> Result<Self> {
        let age = required_field("age", age)?;
        let weight = required_field("weight", weight_kg)?;

        let age: i64 = age
            .parse()
            .map_err(|_| BloodSyncError::InvalidInput(format!("age is not a whole number: {:?}", age)))?;
        let weight_kg: f64 = weight
            .parse()
            .map_err(|_| BloodSyncError::InvalidInput(format!("weight is not a number: {:?}", weight)))?;

        Ok(Self { age, weight_kg })
    }

    pub fn is_eligible(&self) -> Result<bool> {
        is_eligible(self.age, self.weight_kg)
    }
}

fn required_field<'a>(name: &str, value: Option<&'a str>) -> Result<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(BloodSyncError::InvalidInput(format!("{} is required", name))),
    }
}

/// Whole calendar days between the last donation and `today`. Both ends
/// are dates, so a donation made 55 days ago stays at 55 all day long. The
/// difference is absolute, so a future-dated record yields a positive count;
/// reject those at entry with [`validate_donation_date`].
pub fn days_since_donation(last_donation: Option<NaiveDate>, today: NaiveDate) -> Option<i64> {
    let last = last_donation?;

    let elapsed = today.signed_duration_since(last).num_days();
    if elapsed < 0 {
        warn!("Last donation date {} is in the future relative to {}", last, today);
    }

    Some(elapsed.abs())
}

/// True when no donation is on record or at least 56 days have passed.
pub fn can_donate(last_donation: Option<NaiveDate>, today: NaiveDate) -> bool {
    match days_since_donation(last_donation, today) {
        None => true,
        Some(days) => days >= MIN_DONATION_INTERVAL_DAYS,
    }
}

/// Reject a last-donation date that lies after `today`.
pub fn validate_donation_date(date: NaiveDate, today: NaiveDate) -> Result<NaiveDate> {
    if date > today {
        return Err(BloodSyncError::FutureDonationDate { date, today });
    }
    Ok(date)
}

/// Relative suitability of a donor for a match, in the range 0..=150.
pub fn eligibility_score(donor: &Donor, today: NaiveDate) -> u32 {
    let mut score: i64 = 100;

    // Unknown age counts as 0 and is penalised like an out-of-range age
    let age = i64::from(donor.age.unwrap_or(0));
    if (25..=45).contains(&age) {
        score += 10;
    } else if !(MIN_DONOR_AGE..=MAX_DONOR_AGE).contains(&age) {
        score -= 50;
    }

    if !donor.available {
        score -= 100;
    }

    match days_since_donation(donor.last_donation_date, today) {
        Some(days) if days > 90 => score += 5,
        Some(_) => {}
        None => score += 10,
    }

    score += i64::from(donor.total_donations.saturating_mul(2).min(20));

    score.clamp(0, 150) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BloodType;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_eligibility_bounds() {
        assert!(!is_eligible(17, 60.0).unwrap());
        assert!(is_eligible(18, 50.0).unwrap());
        assert!(!is_eligible(65, 49.9).unwrap());
        assert!(is_eligible(65, 50.0).unwrap());
        assert!(!is_eligible(66, 70.0).unwrap());
    }

    #[test]
    fn test_eligibility_rejects_malformed_numbers() {
        assert!(matches!(
            is_eligible(30, f64::NAN),
            Err(BloodSyncError::InvalidInput(_))
        ));
        assert!(is_eligible(30, f64::INFINITY).is_err());
        assert!(is_eligible(30, 0.0).is_err());
        assert!(is_eligible(-1, 70.0).is_err());
    }

    #[test]
    fn test_eligibility_from_fields() {
        let input = EligibilityInput::from_fields(Some(" 30 "), Some("72.5")).unwrap();
        assert_eq!(input.age, 30);
        assert_eq!(input.weight_kg, 72.5);
        assert!(input.is_eligible().unwrap());

        assert!(EligibilityInput::from_fields(None, Some("70")).is_err());
        assert!(EligibilityInput::from_fields(Some(""), Some("70")).is_err());
        assert!(EligibilityInput::from_fields(Some("thirty"), Some("70")).is_err());
        assert!(EligibilityInput::from_fields(Some("30"), Some("heavy")).is_err());
        assert!(EligibilityInput::from_fields(Some("30.5"), Some("70")).is_err());
    }

    #[test]
    fn test_days_since_donation() {
        let today = date(2026, 3, 1);
        assert_eq!(days_since_donation(None, today), None);
        assert_eq!(days_since_donation(Some(date(2026, 3, 1)), today), Some(0));
        assert_eq!(days_since_donation(Some(date(2026, 2, 28)), today), Some(1));
        assert_eq!(days_since_donation(Some(date(2026, 2, 1)), today), Some(28));

        // Future records are folded into a positive count
        assert_eq!(days_since_donation(Some(date(2026, 3, 11)), today), Some(10));
    }

    #[test]
    fn test_can_donate_interval() {
        let today = date(2026, 10, 18);

        assert!(can_donate(None, today));
        assert!(can_donate(Some(today - chrono::Duration::days(56)), today));
        assert!(!can_donate(Some(today - chrono::Duration::days(55)), today));
        assert!(can_donate(Some(today - chrono::Duration::days(365)), today));
    }

    #[test]
    fn test_interval_ignores_time_of_day() {
        // Late in the evening, a donation 55 calendar days back is still too recent
        let evening = date(2026, 10, 18).and_hms_opt(23, 59, 59).unwrap();
        let last = evening.date() - chrono::Duration::days(55);

        assert_eq!(days_since_donation(Some(last), evening.date()), Some(55));
        assert!(!can_donate(Some(last), evening.date()));
    }

    #[test]
    fn test_validate_donation_date() {
        let today = date(2026, 10, 18);
        assert_eq!(validate_donation_date(today, today), Ok(today));
        assert_eq!(
            validate_donation_date(date(2026, 10, 19), today),
            Err(BloodSyncError::FutureDonationDate {
                date: date(2026, 10, 19),
                today
            })
        );
    }

    #[test]
    fn test_eligibility_score() {
        let today = date(2026, 10, 18);

        // 100 + 10 (age) + 10 (new donor)
        let fresh = Donor::new(BloodType::OPositive, true).with_age(30);
        assert_eq!(eligibility_score(&fresh, today), 120);

        // 100 - 50 (unknown age) + 10 (new donor)
        let unknown_age = Donor::new(BloodType::OPositive, true);
        assert_eq!(eligibility_score(&unknown_age, today), 60);

        // 100 + 5 (> 90 days) + 20 (capped history)
        let veteran = Donor::new(BloodType::ANegative, true)
            .with_age(55)
            .with_last_donation(date(2026, 1, 1))
            .with_total_donations(40);
        assert_eq!(eligibility_score(&veteran, today), 125);

        // 100 - 50 - 100 + 0 -> clamped at 0
        let unavailable = Donor::new(BloodType::BPositive, false)
            .with_age(70)
            .with_last_donation(date(2026, 10, 1));
        assert_eq!(eligibility_score(&unavailable, today), 0);
    }

    #[test]
    fn test_recency_bonus_needs_more_than_90_days() {
        let today = date(2026, 10, 18);
        let donor = |days: i64| {
            Donor::new(BloodType::OPositive, true)
                .with_age(50)
                .with_last_donation(today - chrono::Duration::days(days))
        };

        assert_eq!(eligibility_score(&donor(90), today), 100);
        assert_eq!(eligibility_score(&donor(91), today), 105);
    }
}
