use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::parsers::{finalize_donor, source_name, ParsedRoster, RosterFormat, RosterParser};
use crate::statistics::RegistrySnapshot;
use crate::types::Donor;

/// Accepts a bare donor array (`/api/donors`) or a full registry snapshot
#[derive(Deserialize)]
#[serde(untagged)]
enum RosterDocument {
    Donors(Vec<Donor>),
    Snapshot(RegistrySnapshot),
}

pub struct JsonRosterParser {
    today: NaiveDate,
}

impl JsonRosterParser {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn parse(&self, path: &Path) -> Result<ParsedRoster> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open roster: {}", path.display()))?;
        let document: RosterDocument = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Invalid JSON roster: {}", path.display()))?;

        let donors = match document {
            RosterDocument::Donors(donors) => donors,
            RosterDocument::Snapshot(snapshot) => snapshot.donors,
        };

        let donors = donors
            .into_iter()
            .enumerate()
            .map(|(i, donor)| {
                finalize_donor(donor, self.today).with_context(|| format!("record {}", i))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ParsedRoster {
            source: source_name(path),
            format: RosterFormat::Json,
            donors,
        })
    }
}

impl RosterParser for JsonRosterParser {
    fn parse(&self, path: &Path) -> Result<ParsedRoster> {
        self.parse(path)
    }
}
