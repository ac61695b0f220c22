//! State transitions on registry records: taking a donation from a donor
//! and serving units against a blood request. Both keep the inventory in
//! step with the record they change.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::eligibility::{days_since_donation, validate_donation_date, MIN_DONATION_INTERVAL_DAYS};
use crate::error::{BloodSyncError, Result};
use crate::statistics::BloodInventory;
use crate::types::{BloodRequest, BloodType, Donor, RequestStatus};

/// A completed donation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Donation {
    pub donor_id: String,
    pub blood_type: BloodType,
    pub units: u32,
    pub donation_date: NaiveDate,
}

fn require_units(units: u32) -> Result<u32> {
    if units == 0 {
        return Err(BloodSyncError::InvalidInput(
            "units must be at least 1".to_string(),
        ));
    }
    Ok(units)
}

/// Take `units` from `donor` on `today`.
///
/// Refuses while the 56-day interval is still running. On success the
/// donor's last donation moves to `today`, their donation count goes up by
/// one and the units are added to `inventory`.
pub fn record_donation(
    donor: &mut Donor,
    units: u32,
    today: NaiveDate,
    inventory: &mut BloodInventory,
) -> Result<Donation> {
    let units = require_units(units)?;

    if let Some(last) = donor.last_donation_date {
        validate_donation_date(last, today)?;
    }
    if let Some(days) = days_since_donation(donor.last_donation_date, today) {
        if days < MIN_DONATION_INTERVAL_DAYS {
            return Err(BloodSyncError::DonationTooSoon {
                days_since: days,
                required: MIN_DONATION_INTERVAL_DAYS,
            });
        }
    }

    donor.last_donation_date = Some(today);
    donor.total_donations = donor.total_donations.saturating_add(1);
    inventory.add(donor.blood_type, units);

    info!(
        "Recorded {} units of {} from donor {}",
        units, donor.blood_type, donor.id
    );

    Ok(Donation {
        donor_id: donor.id.clone(),
        blood_type: donor.blood_type,
        units,
        donation_date: today,
    })
}

impl BloodRequest {
    /// Units still outstanding
    pub fn remaining_units(&self) -> u32 {
        self.units_needed.saturating_sub(self.fulfilled_units)
    }

    /// Serve `units` against this request, drawing them from `inventory`.
    ///
    /// The request becomes `Fulfilled` once the delivered total reaches the
    /// units needed, `Partial` before that. Cancelled requests are refused.
    pub fn fulfill(&mut self, units: u32, inventory: &mut BloodInventory) -> Result<RequestStatus> {
        let units = require_units(units)?;
        if self.status == RequestStatus::Cancelled {
            return Err(BloodSyncError::RequestCancelled(self.id.clone()));
        }

        self.fulfilled_units = self.fulfilled_units.saturating_add(units);
        self.status = if self.fulfilled_units >= self.units_needed {
            RequestStatus::Fulfilled
        } else {
            RequestStatus::Partial
        };
        inventory.remove(self.blood_type, units);

        info!(
            "Request {} served {} units of {}, {} still needed",
            self.id,
            units,
            self.blood_type,
            self.remaining_units()
        );
        Ok(self.status)
    }
}
