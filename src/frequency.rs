use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    /// Cadence in days. Months are a flat 30 days, not calendar months.
    pub fn interval_days(self) -> i64 {
        match self {
            Frequency::Daily => 1,
            Frequency::Weekly => 7,
            Frequency::Monthly => 30,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            other => Err(format!("unknown frequency '{other}'")),
        }
    }
}

/// Whether a habit anchored at `last_modified` owes a log on `target`.
///
/// Daily habits are due on the anchor day itself and every day after it.
/// Weekly and monthly habits are due only on whole multiples of their
/// interval strictly after the anchor; the anchor day is covered by the log
/// written when the habit was created.
pub fn is_due(frequency: Frequency, last_modified: NaiveDate, target: NaiveDate) -> bool {
    let gap = (target - last_modified).num_days();
    match frequency {
        Frequency::Daily => gap >= 0,
        Frequency::Weekly | Frequency::Monthly => {
            gap > 0 && gap % frequency.interval_days() == 0
        }
    }
}
