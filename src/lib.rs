//! # BloodSync
//!
//! Blood-donation coordination toolkit: the rules a registration site needs
//! behind its forms and dashboards.
//!
//! ## Features
//!
//! - ABO/Rh compatibility table (donate-to / receive-from sets)
//! - Donor age/weight eligibility and the 56-day donation interval
//! - Donor matching for blood requests, with eligibility scoring
//! - Blood inventory and dashboard statistics
//! - Recording donations and fulfilling requests against the inventory
//! - CSV/TSV/JSON donor roster ingestion
//! - Match reports as HTML, CSV, TSV or JSON

pub mod compatibility;
pub mod config;
pub mod discovery;
pub mod eligibility;
pub mod error;
pub mod matching;
pub mod output;
pub mod parsers;
pub mod registry;
pub mod statistics;
pub mod types;

// Re-export key types
pub use compatibility::compatibility_of;
pub use config::Config;
pub use discovery::RosterDiscovery;
pub use eligibility::{
    can_donate, days_since_donation, eligibility_score, is_eligible, validate_donation_date,
    MIN_DONATION_INTERVAL_DAYS,
};
pub use error::BloodSyncError;
pub use matching::{match_donors, DonorMatcher, MatchOptions, MatchReport, ScoredDonor};
pub use output::{ReportFormat, ReportGenerator};
pub use parsers::{FileParser, ParsedRoster};
pub use registry::{record_donation, Donation};
pub use statistics::{BloodInventory, RefreshSchedule, RegistrySnapshot, Statistics};
pub use types::*;
