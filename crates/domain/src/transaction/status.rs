//! Transaction lifecycle.

use serde::{Deserialize, Serialize};

/// The status of a transaction in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──┬──► Approved
///           ├──► Declined
///           └──► Aborted
/// ```
/// Pending is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Status {
    /// Awaiting a biller outcome.
    #[default]
    Pending,

    /// The biller accepted the charge (terminal state).
    Approved,

    /// The biller refused the charge (terminal state).
    Declined,

    /// The biller was never reached or failed before answering (terminal state).
    Aborted,
}

impl Status {
    pub fn is_pending(&self) -> bool {
        matches!(self, Status::Pending)
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Status::Approved)
    }

    pub fn is_declined(&self) -> bool {
        matches!(self, Status::Declined)
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Status::Aborted)
    }

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }

    /// Returns true if a declined-response classification applies to this state.
    pub fn needs_classification(&self) -> bool {
        matches!(self, Status::Declined | Status::Aborted)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::Approved => "Approved",
            Status::Declined => "Declined",
            Status::Aborted => "Aborted",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
