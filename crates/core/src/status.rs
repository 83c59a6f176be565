//! Save status reported to the UI

use std::fmt;
use std::str::FromStr;

/// Status of the single pending-save slot owned by a controller
///
/// Cycles `Neutral -> Changed -> Saving -> Success | Failure -> Neutral`.
/// There is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SaveStatus {
    /// Nothing to report
    #[default]
    Neutral,
    /// An edit arrived and a save is scheduled
    Changed,
    /// The save operation is running
    Saving,
    /// The last save resolved
    Success,
    /// The last save rejected
    Failure,
}

impl SaveStatus {
    /// Lowercase name, as shown to users
    pub const fn as_str(&self) -> &'static str {
        match self {
            SaveStatus::Neutral => "neutral",
            SaveStatus::Changed => "changed",
            SaveStatus::Saving => "saving",
            SaveStatus::Success => "success",
            SaveStatus::Failure => "failure",
        }
    }

    /// Whether this status is followed by an automatic reset to `Neutral`
    pub const fn is_settled(&self) -> bool {
        matches!(self, SaveStatus::Success | SaveStatus::Failure)
    }
}

impl fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SaveStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "neutral" => Ok(SaveStatus::Neutral),
            "changed" => Ok(SaveStatus::Changed),
            "saving" => Ok(SaveStatus::Saving),
            "success" => Ok(SaveStatus::Success),
            "failure" => Ok(SaveStatus::Failure),
            other => Err(format!("Unknown save status: {}", other)),
        }
    }
}
