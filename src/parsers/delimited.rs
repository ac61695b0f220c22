use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use crate::parsers::{finalize_donor, source_name, ParsedRoster, RosterFormat, RosterParser};
use crate::types::{BloodType, Donor};

/// CSV/TSV roster parser with header aliasing
pub struct DelimitedRosterParser {
    delimiter: u8,
    today: NaiveDate,
}

impl DelimitedRosterParser {
    pub fn new(delimiter: u8, today: NaiveDate) -> Self {
        Self { delimiter, today }
    }

    pub fn parse(&self, path: &Path) -> Result<ParsedRoster> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open roster: {}", path.display()))?;
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(file);

        let headers = reader.headers()?.clone();
        let columns = self.map_columns(&headers)?;

        let mut donors = Vec::new();
        for record in reader.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            if record.iter().all(str::is_empty) {
                continue;
            }

            let donor = self
                .parse_record(&record, &columns)
                .and_then(|donor| finalize_donor(donor, self.today))
                .with_context(|| format!("line {}", line))?;
            donors.push(donor);
        }

        let format = if self.delimiter == b'\t' {
            RosterFormat::Tsv
        } else {
            RosterFormat::Csv
        };

        Ok(ParsedRoster {
            source: source_name(path),
            format,
            donors,
        })
    }

    fn map_columns(&self, headers: &StringRecord) -> Result<HashMap<&'static str, usize>> {
        let mut mapping = HashMap::new();

        for (i, header) in headers.iter().enumerate() {
            let column = match header.trim().to_lowercase().as_str() {
                "id" | "donor_id" => "id",
                "name" | "full_name" => "name",
                "blood_type" | "blood_group" | "bloodtype" | "blood" => "blood_type",
                "available" | "availability" => "available",
                "last_donation" | "last_donation_date" => "last_donation",
                "age" => "age",
                "total_donations" | "donations" => "total_donations",
                "city" => "city",
                "state" => "state",
                "phone" | "mobile" => "phone",
                "status" => "status",
                _ => continue,
            };
            mapping.entry(column).or_insert(i);
        }

        if !mapping.contains_key("blood_type") {
            return Err(anyhow!("Required column (blood_type) not found"));
        }

        Ok(mapping)
    }

    fn parse_record(
        &self,
        record: &StringRecord,
        columns: &HashMap<&'static str, usize>,
    ) -> Result<Donor> {
        let get = |name: &str| field(record, columns, name);

        let blood_type: BloodType = get("blood_type").parse()?;

        let available = parse_flag(get("available"))?;

        let last_donation_date = match get("last_donation") {
            "" => None,
            s => Some(
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .with_context(|| format!("Invalid last donation date: {}", s))?,
            ),
        };

        let age = match get("age") {
            "" => None,
            s => Some(s.parse().with_context(|| format!("Invalid age: {}", s))?),
        };

        let status = get("status").parse()?;

        let total_donations = match get("total_donations") {
            "" => 0,
            s => s
                .parse()
                .with_context(|| format!("Invalid donation count: {}", s))?,
        };

        Ok(Donor {
            id: get("id").to_string(),
            name: get("name").to_string(),
            blood_type,
            available,
            last_donation_date,
            age,
            total_donations,
            city: get("city").to_string(),
            state: get("state").to_string(),
            phone: get("phone").to_string(),
            status,
        })
    }
}

fn field<'r>(record: &'r StringRecord, columns: &HashMap<&'static str, usize>, name: &str) -> &'r str {
    columns
        .get(name)
        .and_then(|&idx| record.get(idx))
        .unwrap_or("")
}

/// Blank availability means the donor never opted out.
fn parse_flag(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "" | "true" | "yes" | "y" | "1" => Ok(true),
        "false" | "no" | "n" | "0" => Ok(false),
        other => Err(anyhow!("Invalid availability flag: {}", other)),
    }
}

impl RosterParser for DelimitedRosterParser {
    fn parse(&self, path: &Path) -> Result<ParsedRoster> {
        self.parse(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DonorStatus;
    use std::io::Write;
    use tempfile::TempDir;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    #[test]
    fn test_parse_csv_roster() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("donors.csv");
        let mut file = File::create(&path)?;
        writeln!(file, "donor_id,Name,Blood_Group,Available,Last_Donation,Age,City,Phone")?;
        writeln!(file, "DON-1,\"Iyer, Asha\",O-,yes,2026-05-01,34,Chennai,+91 98400 12345")?;
        writeln!(file, "DON-2,Vikram,ab+,no,,52,Delhi,")?;
        writeln!(file, ",,,,,,,")?;
        writeln!(file, "DON-3,Meera,B-,,,,Pune,")?;

        let roster = DelimitedRosterParser::new(b',', today()).parse(&path)?;
        assert_eq!(roster.source, "donors");
        assert_eq!(roster.format, RosterFormat::Csv);
        assert_eq!(roster.donors.len(), 3);

        let asha = &roster.donors[0];
        assert_eq!(asha.name, "Iyer, Asha");
        assert_eq!(asha.blood_type, BloodType::ONegative);
        assert_eq!(asha.last_donation_date, NaiveDate::from_ymd_opt(2026, 5, 1));
        assert_eq!(asha.age, Some(34));
        assert_eq!(asha.phone, "9198400123");

        assert!(!roster.donors[1].available);
        assert_eq!(roster.donors[1].blood_type, BloodType::ABPositive);
        assert!(roster.donors[2].available);
        assert_eq!(roster.donors[2].age, None);
        Ok(())
    }

    #[test]
    fn test_parse_tsv_roster() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("donors.tsv");
        let mut file = File::create(&path)?;
        writeln!(file, "blood_type\tavailable\tcity")?;
        writeln!(file, "A+\ttrue\tMumbai")?;

        let roster = DelimitedRosterParser::new(b'\t', today()).parse(&path)?;
        assert_eq!(roster.format, RosterFormat::Tsv);
        assert_eq!(roster.donors[0].city, "Mumbai");
        Ok(())
    }

    #[test]
    fn test_rejects_bad_rows() -> Result<()> {
        let dir = TempDir::new()?;

        let missing = dir.path().join("missing.csv");
        std::fs::write(&missing, "name,city\nAsha,Pune\n")?;
        assert!(DelimitedRosterParser::new(b',', today()).parse(&missing).is_err());

        let bad_type = dir.path().join("bad_type.csv");
        std::fs::write(&bad_type, "blood_type\nA+\nC+\n")?;
        let err = DelimitedRosterParser::new(b',', today())
            .parse(&bad_type)
            .unwrap_err();
        assert!(format!("{:#}", err).contains("line 3"));

        let future = dir.path().join("future.csv");
        std::fs::write(&future, "blood_type,last_donation\nO+,2027-01-01\n")?;
        assert!(DelimitedRosterParser::new(b',', today()).parse(&future).is_err());

        let flag = dir.path().join("flag.csv");
        std::fs::write(&flag, "blood_type,available\nO+,maybe\n")?;
        assert!(DelimitedRosterParser::new(b',', today()).parse(&flag).is_err());
        Ok(())
    }

    #[test]
    fn test_status_column() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("status.csv");
        std::fs::write(&path, "blood_group,status
A+,active
O-,Inactive
B+,
")?;

        let roster = DelimitedRosterParser::new(b',', today()).parse(&path)?;
        let statuses: Vec<DonorStatus> = roster.donors.iter().map(|d| d.status).collect();
        assert_eq!(
            statuses,
            vec![DonorStatus::Active, DonorStatus::Inactive, DonorStatus::Active]
        );

        let bad = dir.path().join("bad_status.csv");
        std::fs::write(&bad, "blood_group,status
A+,on leave
")?;
        let err = DelimitedRosterParser::new(b',', today()).parse(&bad).unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
        Ok(())
    }
}
