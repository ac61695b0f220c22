use lazy_static::lazy_static;
use std::collections::{BTreeSet, HashMap};

use crate::error::Result;
use crate::types::{BloodType, CompatibilityRule};

use BloodType::*;

/// Recipient type -> donor types it may safely receive red cells from
const RECEIVE_FROM: [(BloodType, &[BloodType]); 8] = [
    (APositive, &[APositive, ANegative, OPositive, ONegative]),
    (ANegative, &[ANegative, ONegative]),
    (BPositive, &[BPositive, BNegative, OPositive, ONegative]),
    (BNegative, &[BNegative, ONegative]),
    (
        ABPositive,
        &[
            APositive, ANegative, BPositive, BNegative, ABPositive, ABNegative, OPositive,
            ONegative,
        ],
    ),
    (ABNegative, &[ANegative, BNegative, ABNegative, ONegative]),
    (OPositive, &[OPositive, ONegative]),
    (ONegative, &[ONegative]),
];

lazy_static! {
    static ref COMPATIBILITY: HashMap<BloodType, CompatibilityRule> = build_table();
}

fn build_table() -> HashMap<BloodType, CompatibilityRule> {
    RECEIVE_FROM
        .iter()
        .map(|(blood_type, donors)| {
            let can_receive_from: BTreeSet<BloodType> = donors.iter().copied().collect();

            // Donate-to is the inverse relation of receive-from
            let can_donate_to: BTreeSet<BloodType> = RECEIVE_FROM
                .iter()
                .filter(|(_, donors)| donors.contains(blood_type))
                .map(|(recipient, _)| *recipient)
                .collect();

            (
                *blood_type,
                CompatibilityRule {
                    blood_type: *blood_type,
                    can_donate_to,
                    can_receive_from,
                },
            )
        })
        .collect()
}

/// Look up the compatibility rule for a blood type given as text.
pub fn compatibility_of(blood_type: &str) -> Result<&'static CompatibilityRule> {
    let blood_type: BloodType = blood_type.parse()?;
    Ok(blood_type.compatibility())
}

impl BloodType {
    pub fn compatibility(self) -> &'static CompatibilityRule {
        &COMPATIBILITY[&self]
    }

    /// Whether a donor of this type may give to `recipient`
    pub fn can_donate_to(self, recipient: BloodType) -> bool {
        self.compatibility().can_donate_to.contains(&recipient)
    }

    pub fn can_receive_from(self, donor: BloodType) -> bool {
        self.compatibility().can_receive_from.contains(&donor)
    }
}

impl CompatibilityRule {
    /// Two-line summary shown next to the blood group selector.
    pub fn summary(&self) -> String {
        format!(
            "Can donate to: {}\nCan receive from: {}",
            render_set(&self.can_donate_to, true),
            render_set(&self.can_receive_from, false)
        )
    }
}

fn render_set(types: &BTreeSet<BloodType>, collapse_all: bool) -> String {
    if collapse_all && types.len() == BloodType::ALL.len() {
        return "All Blood Types".to_string();
    }

    types
        .iter()
        .map(BloodType::label)
        .collect::<Vec<_>>()
        .join(", ")
}
