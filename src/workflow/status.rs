// Closed vocabularies for record lifecycle states and workflow actions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::WorkflowError;

/// Lifecycle state of a reviewable report record.
///
/// Soft deletion is not a status: it is a separate marker on the record and a
/// deleted record keeps whatever status it had.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Draft,
    WaitingKasi,
    WaitingCdk,
    Final,
    Rejected,
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 5] = [
        ReportStatus::Draft,
        ReportStatus::WaitingKasi,
        ReportStatus::WaitingCdk,
        ReportStatus::Final,
        ReportStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Draft => "draft",
            ReportStatus::WaitingKasi => "waiting_kasi",
            ReportStatus::WaitingCdk => "waiting_cdk",
            ReportStatus::Final => "final",
            ReportStatus::Rejected => "rejected",
        }
    }

    /// Position along the review pipeline. `draft` and `rejected` share the
    /// entry stage since both re-enter at `waiting_kasi`.
    pub fn stage(&self) -> u8 {
        match self {
            ReportStatus::Draft | ReportStatus::Rejected => 0,
            ReportStatus::WaitingKasi => 1,
            ReportStatus::WaitingCdk => 2,
            ReportStatus::Final => 3,
        }
    }

    pub fn is_pending_review(&self) -> bool {
        matches!(self, ReportStatus::WaitingKasi | ReportStatus::WaitingCdk)
    }

    pub fn is_resubmittable(&self) -> bool {
        matches!(self, ReportStatus::Draft | ReportStatus::Rejected)
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| WorkflowError::UnknownStatus(s.to_string()))
    }
}

/// Workflow actions a caller may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewAction {
    Submit,
    Approve,
    Reject,
    Delete,
}

impl ReviewAction {
    pub const ALL: [ReviewAction; 4] = [
        ReviewAction::Submit,
        ReviewAction::Approve,
        ReviewAction::Reject,
        ReviewAction::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewAction::Submit => "SUBMIT",
            ReviewAction::Approve => "APPROVE",
            ReviewAction::Reject => "REJECT",
            ReviewAction::Delete => "DELETE",
        }
    }
}

impl fmt::Display for ReviewAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewAction {
    type Err = WorkflowError;

    /// Case-insensitive; anything outside the vocabulary is a hard input error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReviewAction::ALL
            .into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| WorkflowError::UnknownAction(s.to_string()))
    }
}
