use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use tracing::{debug, info};

use crate::eligibility::{can_donate, eligibility_score};
use crate::statistics::BloodInventory;
use crate::types::{BloodRequest, BloodType, Donor, Urgency};

pub const DEFAULT_MATCH_LIMIT: usize = 10;

/// Available donors whose blood type can be given to `requested`, in input
/// order. An unrecognised requested type matches nobody.
pub fn match_donors<'a>(donors: &'a [Donor], requested: &str) -> Vec<&'a Donor> {
    let requested: BloodType = match requested.parse() {
        Ok(blood_type) => blood_type,
        Err(e) => {
            debug!("No donors matched: {}", e);
            return Vec::new();
        }
    };

    let compatible = &requested.compatibility().can_receive_from;
    donors
        .iter()
        .filter(|donor| donor.available && compatible.contains(&donor.blood_type))
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchOptions {
    /// Case-insensitive substring matched against donor city or state
    pub location: Option<String>,
    pub limit: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            location: None,
            limit: DEFAULT_MATCH_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredDonor {
    #[serde(flatten)]
    pub donor: Donor,
    pub match_score: u32,
    pub can_donate_now: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReport {
    pub requested: BloodType,
    pub units_needed: u32,
    #[serde(default)]
    pub urgency: Urgency,
    pub exact_match_inventory: u32,
    pub matches: Vec<ScoredDonor>,
    pub total_compatible: usize,
    pub fulfillable: bool,
}

/// Ranks compatible donors for a blood request
pub struct DonorMatcher {
    options: MatchOptions,
}

impl DonorMatcher {
    pub fn new(options: MatchOptions) -> Self {
        Self { options }
    }

    pub fn match_request(
        &self,
        request: &BloodRequest,
        donors: &[Donor],
        inventory: Option<&BloodInventory>,
        today: NaiveDate,
    ) -> MatchReport {
        let location = request
            .location
            .as_deref()
            .or(self.options.location.as_deref());
        let report = self.rank(
            request.blood_type,
            request.remaining_units(),
            location,
            donors,
            inventory,
            today,
        );
        MatchReport {
            urgency: request.urgency,
            ..report
        }
    }

    pub fn rank(
        &self,
        requested: BloodType,
        units_needed: u32,
        location: Option<&str>,
        donors: &[Donor],
        inventory: Option<&BloodInventory>,
        today: NaiveDate,
    ) -> MatchReport {
        let location = location
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty());

        // Deactivated registrations are kept on file but never contacted
        let mut candidates: Vec<&Donor> = match_donors(donors, requested.label())
            .into_iter()
            .filter(|donor| donor.is_active())
            .filter(|donor| match &location {
                Some(location) => in_location(donor, location),
                None => true,
            })
            .collect();

        // Most recent donors first, then stably by score
        candidates.sort_by_key(|donor| Reverse(donor.last_donation_date));

        let mut scored: Vec<ScoredDonor> = candidates
            .par_iter()
            .map(|donor| ScoredDonor {
                donor: (*donor).clone(),
                match_score: eligibility_score(donor, today),
                can_donate_now: can_donate(donor.last_donation_date, today),
            })
            .collect();
        scored.sort_by_key(|s| Reverse(s.match_score));

        let total_compatible = scored.len();
        scored.truncate(self.options.limit);

        let exact_match_inventory = inventory.map(|inv| inv.units(requested)).unwrap_or(0);
        let fulfillable = exact_match_inventory >= units_needed || total_compatible > 0;

        info!(
            "Matched {} compatible donors for {} ({} units in stock)",
            total_compatible, requested, exact_match_inventory
        );

        MatchReport {
            requested,
            units_needed,
            urgency: Urgency::default(),
            exact_match_inventory,
            matches: scored,
            total_compatible,
            fulfillable,
        }
    }
}

fn in_location(donor: &Donor, location: &str) -> bool {
    donor.city.to_lowercase().contains(location) || donor.state.to_lowercase().contains(location)
}
