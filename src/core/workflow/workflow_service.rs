// Submission workflow - status and flag stamping, permissions, visibility.
//
// All decisions here are synchronous and side-effect free apart from mutating
// the record handed in. Persisting the result is the caller's job.

use super::workflow_models::{
    ContentRecord, EditPolicy, RecordStatus, Removal, WorkflowAction, WorkflowError,
};
use crate::core::identity::{Role, Viewer};
use crate::core::moderation::{ContentFilter, ModerationVerdict};
use std::sync::Arc;

/// Initial status for a new submission: administrators publish directly.
pub fn decide_initial_status(author_role: Role) -> RecordStatus {
    match author_role {
        Role::Administrator => RecordStatus::Approved,
        Role::Standard => RecordStatus::Pending,
    }
}

/// Approved records are public. Pending ones are shown to their author and
/// to administrators only.
pub fn is_visible<R: ContentRecord + ?Sized>(record: &R, viewer: &Viewer) -> bool {
    record.status() == RecordStatus::Approved
        || viewer.is_admin()
        || record.author() == viewer.user_id
}

/// Owners and administrators may edit or delete a record.
pub fn can_modify<R: ContentRecord + ?Sized>(record: &R, actor: &Viewer) -> bool {
    actor.is_admin() || record.author() == actor.user_id
}

pub struct SubmissionWorkflow {
    filter: Arc<ContentFilter>,
    edit_policy: EditPolicy,
}

impl SubmissionWorkflow {
    pub fn new(filter: Arc<ContentFilter>, edit_policy: EditPolicy) -> Self {
        Self {
            filter,
            edit_policy,
        }
    }

    pub fn filter(&self) -> &ContentFilter {
        &self.filter
    }

    pub fn edit_policy(&self) -> EditPolicy {
        self.edit_policy
    }

    /// Run the content filter over the record's current fields.
    pub fn review<R: ContentRecord + ?Sized>(&self, record: &R) -> ModerationVerdict {
        self.filter.inspect(record.text_fields(), record.url_fields())
    }

    /// The filter verdict, as stored in `isFlagged`.
    pub fn decide_flag<R: ContentRecord + ?Sized>(&self, record: &R) -> bool {
        self.review(record).flagged
    }

    /// Stamp status and flag onto a brand new record.
    pub fn stamp_new<R: ContentRecord + ?Sized>(
        &self,
        record: &mut R,
        author_role: Role,
    ) -> ModerationVerdict {
        let verdict = self.review(record);
        record.set_flagged(verdict.flagged);
        record.set_status(decide_initial_status(author_role));
        verdict
    }

    /// Stamp an edited record. The flag is always recomputed; the status
    /// follows the edit policy.
    pub fn stamp_edit<R: ContentRecord + ?Sized>(
        &self,
        record: &mut R,
        previous_status: RecordStatus,
        editor: &Viewer,
    ) -> ModerationVerdict {
        let verdict = self.review(record);
        record.set_flagged(verdict.flagged);

        let status = match self.edit_policy {
            EditPolicy::KeepStatus => previous_status,
            EditPolicy::RequireReview if editor.is_admin() => previous_status,
            EditPolicy::RequireReview => RecordStatus::Pending,
        };
        record.set_status(status);
        verdict
    }

    pub fn authorize_edit<R: ContentRecord + ?Sized>(
        &self,
        record: &R,
        actor: &Viewer,
    ) -> Result<(), WorkflowError> {
        if can_modify(record, actor) {
            Ok(())
        } else {
            Err(not_authorized(WorkflowAction::Edit, record))
        }
    }

    /// Mark the record approved. Administrators only.
    ///
    /// The flag is left untouched so an override stays visible afterwards.
    pub fn approve<R: ContentRecord + ?Sized>(
        &self,
        record: &mut R,
        actor: &Viewer,
    ) -> Result<(), WorkflowError> {
        if !actor.is_admin() {
            return Err(not_authorized(WorkflowAction::Approve, record));
        }
        record.set_status(RecordStatus::Approved);
        Ok(())
    }

    /// Reject a record. Administrators only; rejecting means deleting.
    pub fn reject<R: ContentRecord + ?Sized>(
        &self,
        record: &R,
        actor: &Viewer,
    ) -> Result<Removal, WorkflowError> {
        if !actor.is_admin() {
            return Err(not_authorized(WorkflowAction::Reject, record));
        }
        Ok(removal(record))
    }

    /// Delete a record in any state. Owners and administrators only.
    pub fn authorize_delete<R: ContentRecord + ?Sized>(
        &self,
        record: &R,
        actor: &Viewer,
    ) -> Result<Removal, WorkflowError> {
        if !can_modify(record, actor) {
            return Err(not_authorized(WorkflowAction::Delete, record));
        }
        Ok(removal(record))
    }
}

fn removal<R: ContentRecord + ?Sized>(record: &R) -> Removal {
    Removal {
        record_id: record.id().to_string(),
    }
}

fn not_authorized<R: ContentRecord + ?Sized>(action: WorkflowAction, record: &R) -> WorkflowError {
    WorkflowError::NotAuthorized {
        action,
        record_id: record.id().to_string(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
