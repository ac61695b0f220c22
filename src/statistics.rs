use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::types::{BloodRequest, BloodType, Donor, RequestStatus};

/// Groups holding fewer units than this are reported as critical.
pub const DEFAULT_CRITICAL_THRESHOLD: u32 = 20;

/// Dashboard statistics are refreshed on this period.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Units in stock for each blood group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BloodInventory {
    units: BTreeMap<BloodType, u32>,
}

/// A stock entry is either a bare unit count or the site's
/// `{"units": 50, "donors": [...]}` record.
#[derive(Deserialize)]
#[serde(untagged)]
enum StockEntry {
    Units(u32),
    Record { units: u32 },
}

impl<'de> Deserialize<'de> for BloodInventory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = BTreeMap::<BloodType, StockEntry>::deserialize(deserializer)?;
        let units = entries
            .into_iter()
            .map(|(blood_type, entry)| match entry {
                StockEntry::Units(units) | StockEntry::Record { units } => (blood_type, units),
            })
            .collect();
        Ok(Self { units })
    }
}

impl BloodInventory {
    /// An inventory with every group present at zero units.
    pub fn new() -> Self {
        Self {
            units: BloodType::ALL.iter().map(|bt| (*bt, 0)).collect(),
        }
    }

    pub fn units(&self, blood_type: BloodType) -> u32 {
        self.units.get(&blood_type).copied().unwrap_or(0)
    }

    pub fn add(&mut self, blood_type: BloodType, units: u32) {
        let entry = self.units.entry(blood_type).or_insert(0);
        *entry = entry.saturating_add(units);
    }

    /// Remove units, never going below zero.
    pub fn remove(&mut self, blood_type: BloodType, units: u32) {
        let entry = self.units.entry(blood_type).or_insert(0);
        *entry = entry.saturating_sub(units);
    }

    pub fn total_units(&self) -> u64 {
        self.units.values().map(|u| u64::from(*u)).sum()
    }

    pub fn critical_groups(&self, threshold: u32) -> Vec<BloodType> {
        BloodType::ALL
            .iter()
            .copied()
            .filter(|bt| self.units(*bt) < threshold)
            .collect()
    }
}

/// Statistics payload served to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_donors: usize,
    pub total_requestors: usize,
    pub total_requests: usize,
    pub active_requests: usize,
    pub fulfilled_requests: usize,
    pub total_units: u64,
    pub critical_groups: Vec<BloodType>,
    pub inventory: BloodInventory,
}

impl Statistics {
    pub fn collect(
        donors: &[Donor],
        total_requestors: usize,
        requests: &[BloodRequest],
        inventory: &BloodInventory,
        critical_threshold: u32,
    ) -> Self {
        let count = |f: fn(&RequestStatus) -> bool| requests.iter().filter(|r| f(&r.status)).count();

        Self {
            total_donors: donors.len(),
            total_requestors,
            total_requests: requests.len(),
            active_requests: count(RequestStatus::is_open),
            fulfilled_requests: count(|s| *s == RequestStatus::Fulfilled),
            total_units: inventory.total_units(),
            critical_groups: inventory.critical_groups(critical_threshold),
            inventory: inventory.clone(),
        }
    }
}

/// Everything needed to compute [`Statistics`], as exported by the web
/// application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    #[serde(default)]
    pub donors: Vec<Donor>,
    #[serde(default)]
    pub total_requestors: usize,
    #[serde(default)]
    pub requests: Vec<BloodRequest>,
    #[serde(default)]
    pub inventory: BloodInventory,
}

impl RegistrySnapshot {
    pub fn statistics(&self, critical_threshold: u32) -> Statistics {
        Statistics::collect(
            &self.donors,
            self.total_requestors,
            &self.requests,
            &self.inventory,
            critical_threshold,
        )
    }
}

/// Fixed-period refresh timer for statistics polling
#[derive(Debug, Clone, Copy)]
pub struct RefreshSchedule {
    interval: Duration,
}

impl Default for RefreshSchedule {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_INTERVAL)
    }
}

impl RefreshSchedule {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// A refresh that has never run is always due.
    pub fn is_due(&self, last_refresh: Option<Instant>, now: Instant) -> bool {
        match last_refresh {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        }
    }

    pub fn next_due(&self, last_refresh: Instant) -> Instant {
        last_refresh + self.interval
    }
}
