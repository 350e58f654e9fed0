// The persistence boundary. The workspace store and the HTTP handlers only
// ever talk to storage through `PersistenceGateway`; every call may fail.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::db::drafts::{
    MilestoneDraft, NewAttachment, ProjectDraft, RfiDraft, SubmittalDraft, TaskDraft,
};
use crate::db::models::{Attachment, Milestone, Project, Rfi, Submittal, Task, TaskStatus};

pub use memory::MemoryGateway;
pub use sqlite::SqliteGateway;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// The write would break a data invariant (e.g. lowering a revision).
    #[error("rejected: {0}")]
    Rejected(String),

    /// A stored row could not be turned back into a domain value.
    #[error("corrupt {entity} row {id}: {reason}")]
    Corrupt {
        entity: &'static str,
        id: String,
        reason: String,
    },

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl GatewayError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Remote CRUD surface for one tenant's projects and their child records.
///
/// List operations return records in display order (tasks by due date, RFIs
/// and submittals by number, milestones by due date). Inserts assign ids,
/// sequence numbers and timestamps.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn list_projects(&self) -> GatewayResult<Vec<Project>>;
    async fn get_project(&self, id: &str) -> GatewayResult<Option<Project>>;
    async fn insert_project(&self, draft: ProjectDraft) -> GatewayResult<Project>;
    async fn update_project(&self, id: &str, draft: ProjectDraft) -> GatewayResult<Project>;
    async fn delete_project(&self, id: &str) -> GatewayResult<()>;

    async fn list_tasks(&self, project_id: &str) -> GatewayResult<Vec<Task>>;
    async fn insert_task(&self, project_id: &str, draft: TaskDraft) -> GatewayResult<Task>;
    async fn update_task(&self, id: &str, draft: TaskDraft) -> GatewayResult<Task>;
    async fn update_task_status(&self, id: &str, status: TaskStatus) -> GatewayResult<Task>;
    async fn delete_task(&self, id: &str) -> GatewayResult<()>;

    async fn list_rfis(&self, project_id: &str) -> GatewayResult<Vec<Rfi>>;
    async fn insert_rfi(&self, project_id: &str, draft: RfiDraft) -> GatewayResult<Rfi>;
    async fn update_rfi(&self, id: &str, draft: RfiDraft) -> GatewayResult<Rfi>;
    async fn delete_rfi(&self, id: &str) -> GatewayResult<()>;
    async fn add_rfi_attachment(
        &self,
        rfi_id: &str,
        attachment: NewAttachment,
    ) -> GatewayResult<Attachment>;
    async fn delete_rfi_attachment(&self, id: &str) -> GatewayResult<Attachment>;

    async fn list_submittals(&self, project_id: &str) -> GatewayResult<Vec<Submittal>>;
    async fn insert_submittal(
        &self,
        project_id: &str,
        draft: SubmittalDraft,
    ) -> GatewayResult<Submittal>;
    /// Full edit. Fails with [`GatewayError::Rejected`] if the draft would
    /// lower the revision number.
    async fn update_submittal(&self, id: &str, draft: SubmittalDraft) -> GatewayResult<Submittal>;
    /// Opens the next revision: revision + 1, status back to `Submitted`.
    async fn revise_submittal(&self, id: &str) -> GatewayResult<Submittal>;
    async fn delete_submittal(&self, id: &str) -> GatewayResult<()>;

    async fn list_milestones(&self, project_id: &str) -> GatewayResult<Vec<Milestone>>;
    async fn insert_milestone(
        &self,
        project_id: &str,
        draft: MilestoneDraft,
    ) -> GatewayResult<Milestone>;
    async fn update_milestone(&self, id: &str, draft: MilestoneDraft) -> GatewayResult<Milestone>;
    async fn delete_milestone(&self, id: &str) -> GatewayResult<()>;
}

/// Resolves the revision a full submittal edit should store.
pub(crate) fn next_revision(current: u32, requested: Option<u32>) -> GatewayResult<u32> {
    match requested {
        None => Ok(current),
        Some(rev) if rev >= current => Ok(rev),
        Some(rev) => Err(GatewayError::Rejected(format!(
            "revision cannot go from {current} back to {rev}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn revision_never_decreases() {
        assert_eq!(next_revision(2, None).unwrap(), 2);
        assert_eq!(next_revision(2, Some(2)).unwrap(), 2);
        assert_eq!(next_revision(2, Some(3)).unwrap(), 3);
        assert_matches!(next_revision(2, Some(1)), Err(GatewayError::Rejected(_)));
    }
}
