// Workflow domain models - record status, the record contract and errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Approval lifecycle state. The only transition is pending -> approved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Pending,
    Approved,
}

impl RecordStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Approved => "approved",
        }
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happens to the status of an already-submitted record when its
/// content is edited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EditPolicy {
    /// Edits leave the status alone
    #[default]
    KeepStatus,
    /// Edits by standard users send the record back to the queue
    RequireReview,
}

impl std::str::FromStr for EditPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keep" | "keep_status" => Ok(EditPolicy::KeepStatus),
            "review" | "require_review" => Ok(EditPolicy::RequireReview),
            other => Err(format!("unknown edit policy '{}'", other)),
        }
    }
}

/// Actions that need a permission check before anything is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowAction {
    Approve,
    Reject,
    Edit,
    Delete,
}

impl std::fmt::Display for WorkflowAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowAction::Approve => write!(f, "approve"),
            WorkflowAction::Reject => write!(f, "reject"),
            WorkflowAction::Edit => write!(f, "edit"),
            WorkflowAction::Delete => write!(f, "delete"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("Not allowed to {action} record {record_id}")]
    NotAuthorized {
        action: WorkflowAction,
        record_id: String,
    },
}

/// Outcome of a reject or delete decision: the record must be removed.
///
/// There is no retained "rejected" state, so rejecting is a deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub record_id: String,
}

/// Anything that goes through moderation and approval.
///
/// Projects and community posts both implement this; the workflow only ever
/// talks to records through it.
pub trait ContentRecord {
    fn id(&self) -> &str;
    fn author(&self) -> &str;
    fn status(&self) -> RecordStatus;
    fn set_status(&mut self, status: RecordStatus);
    fn is_flagged(&self) -> bool;
    fn set_flagged(&mut self, flagged: bool);
    /// Free-text fields checked for banned words and embedded links, in order
    fn text_fields(&self) -> Vec<&str>;
    /// Link fields checked against the allow-listed domains, in order
    fn url_fields(&self) -> Vec<&str>;
}
