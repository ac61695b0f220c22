use anyhow::{Context, Result};
use chrono::Local;
use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use serde_json::to_string_pretty;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::matching::MatchReport;
use crate::statistics::Statistics;
use crate::types::BloodType;

/// Supported report formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Html,
    Csv,
    Json,
    Tsv,
    All,
}

/// Writes match and statistics reports into an output directory
pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl ReportGenerator {
    pub fn new(output_dir: &Path) -> Result<Self> {
        if !output_dir.exists() {
            fs::create_dir_all(output_dir).with_context(|| {
                format!("Failed to create output directory {}", output_dir.display())
            })?;
        }

        Ok(Self {
            output_dir: output_dir.to_path_buf(),
        })
    }

    /// Write a match report in the requested format(s), returning the files written
    pub fn generate(&self, report: &MatchReport, format: ReportFormat) -> Result<Vec<PathBuf>> {
        let stem = format!(
            "matches_{}_{}",
            file_tag(report.requested),
            Local::now().format("%Y-%m-%d_%H-%M-%S")
        );

        let written = match format {
            ReportFormat::Html => vec![self.write_html(report, &stem)?],
            ReportFormat::Csv => vec![self.write_delimited(report, &stem, b',', "csv")?],
            ReportFormat::Json => vec![self.write_json(report, &stem)?],
            ReportFormat::Tsv => vec![self.write_delimited(report, &stem, b'\t', "tsv")?],
            ReportFormat::All => vec![
                self.write_html(report, &stem)?,
                self.write_delimited(report, &stem, b',', "csv")?,
                self.write_json(report, &stem)?,
                self.write_delimited(report, &stem, b'\t', "tsv")?,
            ],
        };

        for path in &written {
            info!("Wrote report {}", path.display());
        }
        Ok(written)
    }

    pub fn generate_statistics(&self, stats: &Statistics) -> Result<PathBuf> {
        let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
        let path = self.output_dir.join(format!("statistics_{}.json", timestamp));

        fs::write(&path, to_string_pretty(stats)?)
            .with_context(|| format!("Failed to write statistics to {}", path.display()))?;
        Ok(path)
    }

    fn write_json(&self, report: &MatchReport, stem: &str) -> Result<PathBuf> {
        let path = self.output_dir.join(format!("{}.json", stem));
        fs::write(&path, to_string_pretty(report)?)
            .with_context(|| format!("Failed to write JSON report to {}", path.display()))?;
        Ok(path)
    }

    fn write_delimited(
        &self,
        report: &MatchReport,
        stem: &str,
        delimiter: u8,
        extension: &str,
    ) -> Result<PathBuf> {
        let path = self.output_dir.join(format!("{}.{}", stem, extension));

        let mut wtr = WriterBuilder::new()
            .delimiter(delimiter)
            .from_path(&path)
            .with_context(|| format!("Failed to create writer for {}", path.display()))?;

        wtr.write_record([
            "donor_id",
            "name",
            "blood_type",
            "city",
            "state",
            "last_donation",
            "match_score",
            "can_donate_now",
        ])?;

        for m in &report.matches {
            let last_donation = m
                .donor
                .last_donation_date
                .map(|d| d.to_string())
                .unwrap_or_default();
            let score = m.match_score.to_string();
            let can_donate_now = m.can_donate_now.to_string();
            wtr.write_record([
                m.donor.id.as_str(),
                m.donor.name.as_str(),
                m.donor.blood_type.label(),
                m.donor.city.as_str(),
                m.donor.state.as_str(),
                last_donation.as_str(),
                score.as_str(),
                can_donate_now.as_str(),
            ])?;
        }

        wtr.flush()?;
        Ok(path)
    }

    fn write_html(&self, report: &MatchReport, stem: &str) -> Result<PathBuf> {
        let path = self.output_dir.join(format!("{}.html", stem));
        fs::write(&path, create_html_content(report))
            .with_context(|| format!("Failed to write HTML report to {}", path.display()))?;
        Ok(path)
    }
}

fn file_tag(blood_type: BloodType) -> String {
    blood_type.label().replace('+', "_pos").replace('-', "_neg")
}

fn create_html_content(report: &MatchReport) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");

    let mut rows = String::new();
    for m in &report.matches {
        let status_class = if m.can_donate_now { "ready" } else { "waiting" };
        rows.push_str(&format!(
            "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            status_class,
            escape_html(&m.donor.id),
            escape_html(&m.donor.name),
            m.donor.blood_type,
            escape_html(&m.donor.city),
            m.match_score,
            if m.can_donate_now { "Yes" } else { "No" }
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Donor Match Report</title>
    <style>
        body {{ font-family: Arial, sans-serif; margin: 40px; }}
        table {{ width: 100%; border-collapse: collapse; }}
        th, td {{ border: 1px solid #ddd; padding: 8px; text-align: left; }}
        th {{ background-color: #c0392b; color: white; }}
        .ready {{ background-color: #d4edda; }}
        .waiting {{ background-color: #fff3cd; }}
    </style>
</head>
<body>
    <h1>Donor Match Report: {}</h1>
    <p>Generated on: {}</p>
    <p>Urgency: {:?}</p>
    <p>{} compatible donors, {} units needed, {} units in stock, fulfillable: {}</p>
    <table>
        <tr><th>Donor</th><th>Name</th><th>Blood Type</th><th>City</th><th>Score</th><th>Can Donate Now</th></tr>
{}    </table>
</body>
</html>"#,
        report.requested,
        timestamp,
        report.urgency,
        report.total_compatible,
        report.units_needed,
        report.exact_match_inventory,
        if report.fulfillable { "yes" } else { "no" },
        rows
    )
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::ScoredDonor;
    use crate::types::{Donor, Urgency};
    use tempfile::TempDir;

    fn sample_report() -> MatchReport {
        let donor = Donor {
            name: "Rao, \"Ravi\"".to_string(),
            ..Donor::new(BloodType::ONegative, true).with_id("DON-1")
        };
        MatchReport {
            requested: BloodType::ABPositive,
            units_needed: 2,
            urgency: Urgency::Urgent,
            exact_match_inventory: 1,
            matches: vec![ScoredDonor {
                donor,
                match_score: 110,
                can_donate_now: true,
            }],
            total_compatible: 1,
            fulfillable: true,
        }
    }

    #[test]
    fn test_csv_quotes_fields() -> Result<()> {
        let dir = TempDir::new()?;
        let generator = ReportGenerator::new(dir.path())?;

        let written = generator.generate(&sample_report(), ReportFormat::Csv)?;
        assert_eq!(written.len(), 1);
        assert!(written[0]
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("matches_AB_pos_"));

        let content = fs::read_to_string(&written[0])?;
        let mut lines = content.lines();
        assert!(lines.next().unwrap().starts_with("donor_id,name,blood_type"));
        assert_eq!(
            lines.next().unwrap(),
            "DON-1,\"Rao, \"\"Ravi\"\"\",O-,,,,110,true"
        );
        Ok(())
    }

    #[test]
    fn test_all_formats() -> Result<()> {
        let dir = TempDir::new()?;
        let generator = ReportGenerator::new(&dir.path().join("nested"))?;

        let written = generator.generate(&sample_report(), ReportFormat::All)?;
        assert_eq!(written.len(), 4);
        for path in &written {
            assert!(path.exists());
        }

        let html = fs::read_to_string(&written[0])?;
        assert!(html.contains("Rao, &quot;Ravi&quot;"));
        assert!(html.contains("Urgency: Urgent"));

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&written[2])?)?;
        assert_eq!(json["requested"], "AB+");
        assert_eq!(json["matches"][0]["blood_type"], "O-");
        Ok(())
    }
}
