//! Donor roster ingestion.
//!
//! Rosters exported by the registration site come either as delimited text
//! (CSV/TSV with a header row) or as JSON. Every parser validates what it
//! reads: unknown blood types and future-dated donations are rejected with
//! the offending line or record attached.

mod delimited;
mod json;

pub use delimited::DelimitedRosterParser;
pub use json::JsonRosterParser;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::eligibility::validate_donation_date;
use crate::types::Donor;

lazy_static! {
    static ref NON_DIGIT: Regex = Regex::new(r"\D").expect("valid regex");
}

const MAX_PHONE_DIGITS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RosterFormat {
    Csv,
    Tsv,
    Json,
}

impl RosterFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "csv" => Some(RosterFormat::Csv),
            "tsv" | "tab" => Some(RosterFormat::Tsv),
            "json" => Some(RosterFormat::Json),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// Donors read from a single roster file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedRoster {
    pub source: String,
    pub format: RosterFormat,
    pub donors: Vec<Donor>,
}

pub trait RosterParser: Send + Sync {
    fn parse(&self, path: &Path) -> Result<ParsedRoster>;
}

/// Picks a parser from the file extension
pub struct FileParser {
    today: NaiveDate,
}

impl FileParser {
    /// `today` bounds the last-donation dates accepted from rosters.
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn parse(&self, path: &Path) -> Result<ParsedRoster> {
        let format = RosterFormat::from_path(path)
            .ok_or_else(|| anyhow!("Unsupported roster format: {}", path.display()))?;

        let parser: Box<dyn RosterParser> = match format {
            RosterFormat::Csv => Box::new(DelimitedRosterParser::new(b',', self.today)),
            RosterFormat::Tsv => Box::new(DelimitedRosterParser::new(b'\t', self.today)),
            RosterFormat::Json => Box::new(JsonRosterParser::new(self.today)),
        };
        let roster = parser
            .parse(path)
            .with_context(|| format!("Failed to parse roster {}", path.display()))?;

        tracing::debug!(
            "Parsed {} donors from {}",
            roster.donors.len(),
            path.display()
        );
        Ok(roster)
    }
}

/// Keep only digits, truncated to a 10-digit national number.
pub fn normalize_phone(raw: &str) -> String {
    let mut digits = NON_DIGIT.replace_all(raw, "").into_owned();
    digits.truncate(MAX_PHONE_DIGITS);
    digits
}

/// Shared post-read checks for a donor record.
fn finalize_donor(mut donor: Donor, today: NaiveDate) -> Result<Donor> {
    if let Some(date) = donor.last_donation_date {
        validate_donation_date(date, today)?;
    }
    donor.phone = normalize_phone(&donor.phone);
    Ok(donor)
}

fn source_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BloodType;

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("+91 (98765) 43-210"), "9198765432");
        assert_eq!(normalize_phone("98765-43210"), "9876543210");
        assert_eq!(normalize_phone("n/a"), "");
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(RosterFormat::from_extension("CSV"), Some(RosterFormat::Csv));
        assert_eq!(RosterFormat::from_extension("tsv"), Some(RosterFormat::Tsv));
        assert_eq!(RosterFormat::from_extension("json"), Some(RosterFormat::Json));
        assert_eq!(RosterFormat::from_extension("vcf"), None);
    }

    #[test]
    fn test_finalize_rejects_future_donation() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let donor = Donor::new(BloodType::APositive, true)
            .with_last_donation(NaiveDate::from_ymd_opt(2026, 12, 1).unwrap());
        assert!(finalize_donor(donor, today).is_err());
    }

    #[test]
    fn test_unsupported_extension() {
        let parser = FileParser::new(NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
        assert!(parser.parse(Path::new("donors.xlsx")).is_err());
    }
}
