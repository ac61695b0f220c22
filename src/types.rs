use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::BloodSyncError;

/// ABO/Rh blood group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BloodType {
    APositive,
    ANegative,
    BPositive,
    BNegative,
    ABPositive,
    ABNegative,
    OPositive,
    ONegative,
}

impl BloodType {
    pub const ALL: [BloodType; 8] = [
        BloodType::APositive,
        BloodType::ANegative,
        BloodType::BPositive,
        BloodType::BNegative,
        BloodType::ABPositive,
        BloodType::ABNegative,
        BloodType::OPositive,
        BloodType::ONegative,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            BloodType::APositive => "A+",
            BloodType::ANegative => "A-",
            BloodType::BPositive => "B+",
            BloodType::BNegative => "B-",
            BloodType::ABPositive => "AB+",
            BloodType::ABNegative => "AB-",
            BloodType::OPositive => "O+",
            BloodType::ONegative => "O-",
        }
    }
}

impl fmt::Display for BloodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BloodType {
    type Err = BloodSyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A+" => Ok(BloodType::APositive),
            "A-" => Ok(BloodType::ANegative),
            "B+" => Ok(BloodType::BPositive),
            "B-" => Ok(BloodType::BNegative),
            "AB+" => Ok(BloodType::ABPositive),
            "AB-" => Ok(BloodType::ABNegative),
            "O+" => Ok(BloodType::OPositive),
            "O-" => Ok(BloodType::ONegative),
            _ => Err(BloodSyncError::InvalidBloodType(s.to_string())),
        }
    }
}

impl TryFrom<String> for BloodType {
    type Error = BloodSyncError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BloodType> for String {
    fn from(blood_type: BloodType) -> String {
        blood_type.label().to_string()
    }
}

/// Donate-to / receive-from sets for a single blood type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityRule {
    pub blood_type: BloodType,
    pub can_donate_to: BTreeSet<BloodType>,
    pub can_receive_from: BTreeSet<BloodType>,
}

/// A registered donor as seen by the matching logic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Donor {
    #[serde(default, alias = "donor_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(alias = "blood_group")]
    pub blood_type: BloodType,
    #[serde(default = "default_available")]
    pub available: bool,
    #[serde(default, alias = "last_donation")]
    pub last_donation_date: Option<NaiveDate>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub total_donations: u32,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub status: DonorStatus,
}

fn default_available() -> bool {
    true
}

/// Registration state; deactivated donors stay on file but are never matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DonorStatus {
    #[default]
    Active,
    Inactive,
}

impl FromStr for DonorStatus {
    type Err = BloodSyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "active" => Ok(DonorStatus::Active),
            "inactive" => Ok(DonorStatus::Inactive),
            other => Err(BloodSyncError::InvalidInput(format!(
                "unknown donor status: {:?}",
                other
            ))),
        }
    }
}

impl Donor {
    pub fn new(blood_type: BloodType, available: bool) -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            blood_type,
            available,
            last_donation_date: None,
            age: None,
            total_donations: 0,
            city: String::new(),
            state: String::new(),
            phone: String::new(),
            status: DonorStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == DonorStatus::Active
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_last_donation(mut self, date: NaiveDate) -> Self {
        self.last_donation_date = Some(date);
        self
    }

    pub fn with_age(mut self, age: u32) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_location(mut self, city: impl Into<String>, state: impl Into<String>) -> Self {
        self.city = city.into();
        self.state = state.into();
        self
    }

    pub fn with_total_donations(mut self, total: u32) -> Self {
        self.total_donations = total;
        self
    }

    pub fn with_status(mut self, status: DonorStatus) -> Self {
        self.status = status;
        self
    }
}

/// Age/weight pair entered by a prospective donor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EligibilityInput {
    pub age: i64,
    pub weight_kg: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Pending,
    /// Some units delivered, more still needed
    Partial,
    Fulfilled,
    Cancelled,
}

impl RequestStatus {
    /// Pending and partially served requests still need units.
    pub fn is_open(&self) -> bool {
        matches!(self, RequestStatus::Pending | RequestStatus::Partial)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    #[default]
    Normal,
    High,
    Urgent,
    Critical,
}

/// A hospital or patient request for units of blood
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloodRequest {
    #[serde(default, alias = "request_id")]
    pub id: String,
    #[serde(default)]
    pub requestor_id: String,
    #[serde(alias = "blood_group")]
    pub blood_type: BloodType,
    pub units_needed: u32,
    #[serde(default)]
    pub fulfilled_units: u32,
    #[serde(default)]
    pub status: RequestStatus,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub required_date: Option<NaiveDate>,
}
