use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{next_revision, GatewayError, GatewayResult, PersistenceGateway};
use crate::db::drafts::{
    MilestoneDraft, NewAttachment, ProjectDraft, RfiDraft, SubmittalDraft, TaskDraft,
};
use crate::db::models::{
    Attachment, Contact, ContactColumns, Milestone, MilestoneStatus, Priority, Project,
    ProjectStatus, Rfi, RfiStatus, Submittal, SubmittalStatus, Task, TaskStatus,
};

const PROJECT_COLUMNS: &str = "id, number, name, status, client_name, dealer_name, factory, \
     contract_value_cents, start_date, target_completion_date, description, created_at, updated_at";

const TASK_COLUMNS: &str = "id, project_id, title, description, status, priority, \
     assignee_is_external, assignee_user_id, assignee_name, assignee_email, due_date, \
     created_at, updated_at";

const RFI_COLUMNS: &str = "id, project_id, number, subject, question, answer, status, priority, \
     recipient_is_external, recipient_user_id, recipient_name, recipient_email, due_date, \
     created_at, updated_at";

const SUBMITTAL_COLUMNS: &str = "id, project_id, number, title, submittal_type, status, revision, \
     spec_section, manufacturer, reviewer_is_external, reviewer_user_id, reviewer_name, \
     reviewer_email, due_date, created_at, updated_at";

const MILESTONE_COLUMNS: &str = "id, project_id, name, status, due_date, created_at, updated_at";

const ATTACHMENT_COLUMNS: &str =
    "id, rfi_id, file_name, storage_path, content_type, size_bytes, uploaded_at";

fn corrupt(entity: &'static str, id: &str, reason: impl ToString) -> GatewayError {
    GatewayError::Corrupt {
        entity,
        id: id.to_string(),
        reason: reason.to_string(),
    }
}

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: String,
    number: String,
    name: String,
    status: String,
    client_name: Option<String>,
    dealer_name: Option<String>,
    factory: Option<String>,
    contract_value_cents: Option<i64>,
    start_date: Option<NaiveDate>,
    target_completion_date: Option<NaiveDate>,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProjectRow> for Project {
    type Error = GatewayError;

    fn try_from(row: ProjectRow) -> GatewayResult<Self> {
        let status = row
            .status
            .parse::<ProjectStatus>()
            .map_err(|e| corrupt("project", &row.id, e))?;
        Ok(Project {
            id: row.id,
            number: row.number,
            name: row.name,
            status,
            client_name: row.client_name,
            dealer_name: row.dealer_name,
            factory: row.factory,
            contract_value_cents: row.contract_value_cents,
            start_date: row.start_date,
            target_completion_date: row.target_completion_date,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: String,
    project_id: String,
    title: String,
    description: Option<String>,
    status: String,
    priority: String,
    assignee_is_external: bool,
    assignee_user_id: Option<String>,
    assignee_name: Option<String>,
    assignee_email: Option<String>,
    due_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = GatewayError;

    fn try_from(row: TaskRow) -> GatewayResult<Self> {
        let status = row
            .status
            .parse::<TaskStatus>()
            .map_err(|e| corrupt("task", &row.id, e))?;
        let priority = row
            .priority
            .parse::<Priority>()
            .map_err(|e| corrupt("task", &row.id, e))?;
        let assignee = Contact::from_columns(ContactColumns {
            is_external: row.assignee_is_external,
            user_id: row.assignee_user_id,
            name: row.assignee_name,
            email: row.assignee_email,
        })
        .map_err(|e| corrupt("task", &row.id, e))?;
        Ok(Task {
            id: row.id,
            project_id: row.project_id,
            title: row.title,
            description: row.description,
            status,
            priority,
            assignee,
            due_date: row.due_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RfiRow {
    id: String,
    project_id: String,
    number: i64,
    subject: String,
    question: String,
    answer: Option<String>,
    status: String,
    priority: String,
    recipient_is_external: bool,
    recipient_user_id: Option<String>,
    recipient_name: Option<String>,
    recipient_email: Option<String>,
    due_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RfiRow {
    fn into_rfi(self, attachments: Vec<Attachment>) -> GatewayResult<Rfi> {
        let status = self
            .status
            .parse::<RfiStatus>()
            .map_err(|e| corrupt("rfi", &self.id, e))?;
        let priority = self
            .priority
            .parse::<Priority>()
            .map_err(|e| corrupt("rfi", &self.id, e))?;
        let recipient = Contact::from_columns(ContactColumns {
            is_external: self.recipient_is_external,
            user_id: self.recipient_user_id,
            name: self.recipient_name,
            email: self.recipient_email,
        })
        .map_err(|e| corrupt("rfi", &self.id, e))?;
        Ok(Rfi {
            id: self.id,
            project_id: self.project_id,
            number: self.number,
            subject: self.subject,
            question: self.question,
            answer: self.answer,
            status,
            priority,
            recipient,
            due_date: self.due_date,
            attachments,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AttachmentRow {
    id: String,
    rfi_id: String,
    file_name: String,
    storage_path: String,
    content_type: Option<String>,
    size_bytes: i64,
    uploaded_at: DateTime<Utc>,
}

impl From<AttachmentRow> for Attachment {
    fn from(row: AttachmentRow) -> Self {
        Attachment {
            id: row.id,
            rfi_id: row.rfi_id,
            file_name: row.file_name,
            storage_path: row.storage_path,
            content_type: row.content_type,
            size_bytes: row.size_bytes,
            uploaded_at: row.uploaded_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SubmittalRow {
    id: String,
    project_id: String,
    number: i64,
    title: String,
    submittal_type: String,
    status: String,
    revision: i64,
    spec_section: Option<String>,
    manufacturer: Option<String>,
    reviewer_is_external: bool,
    reviewer_user_id: Option<String>,
    reviewer_name: Option<String>,
    reviewer_email: Option<String>,
    due_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubmittalRow> for Submittal {
    type Error = GatewayError;

    fn try_from(row: SubmittalRow) -> GatewayResult<Self> {
        let status = row
            .status
            .parse::<SubmittalStatus>()
            .map_err(|e| corrupt("submittal", &row.id, e))?;
        let revision =
            u32::try_from(row.revision).map_err(|e| corrupt("submittal", &row.id, e))?;
        let reviewer = Contact::from_columns(ContactColumns {
            is_external: row.reviewer_is_external,
            user_id: row.reviewer_user_id,
            name: row.reviewer_name,
            email: row.reviewer_email,
        })
        .map_err(|e| corrupt("submittal", &row.id, e))?;
        Ok(Submittal {
            id: row.id,
            project_id: row.project_id,
            number: row.number,
            title: row.title,
            submittal_type: row.submittal_type,
            status,
            revision,
            spec_section: row.spec_section,
            manufacturer: row.manufacturer,
            reviewer,
            due_date: row.due_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MilestoneRow {
    id: String,
    project_id: String,
    name: String,
    status: String,
    due_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MilestoneRow> for Milestone {
    type Error = GatewayError;

    fn try_from(row: MilestoneRow) -> GatewayResult<Self> {
        let status = row
            .status
            .parse::<MilestoneStatus>()
            .map_err(|e| corrupt("milestone", &row.id, e))?;
        Ok(Milestone {
            id: row.id,
            project_id: row.project_id,
            name: row.name,
            status,
            due_date: row.due_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// [`PersistenceGateway`] over the application's SQLite database.
#[derive(Clone)]
pub struct SqliteGateway {
    pool: SqlitePool,
}

impl SqliteGateway {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn require_project(&self, project_id: &str) -> GatewayResult<()> {
        let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM projects WHERE id = ?")
            .bind(project_id)
            .fetch_one(&self.pool)
            .await?;

        if exists == 0 {
            return Err(GatewayError::not_found("project", project_id));
        }
        Ok(())
    }

    async fn fetch_task(&self, id: &str) -> GatewayResult<Task> {
        sqlx::query_as::<_, TaskRow>(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| GatewayError::not_found("task", id))?
            .try_into()
    }

    async fn fetch_rfi(&self, id: &str) -> GatewayResult<Rfi> {
        let row =
            sqlx::query_as::<_, RfiRow>(&format!("SELECT {RFI_COLUMNS} FROM rfis WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| GatewayError::not_found("rfi", id))?;

        let attachments = sqlx::query_as::<_, AttachmentRow>(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM rfi_attachments \
             WHERE rfi_id = ? ORDER BY uploaded_at ASC"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Attachment::from)
        .collect();

        row.into_rfi(attachments)
    }

    async fn fetch_submittal(&self, id: &str) -> GatewayResult<Submittal> {
        sqlx::query_as::<_, SubmittalRow>(&format!(
            "SELECT {SUBMITTAL_COLUMNS} FROM submittals WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| GatewayError::not_found("submittal", id))?
        .try_into()
    }

    async fn fetch_milestone(&self, id: &str) -> GatewayResult<Milestone> {
        sqlx::query_as::<_, MilestoneRow>(&format!(
            "SELECT {MILESTONE_COLUMNS} FROM milestones WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| GatewayError::not_found("milestone", id))?
        .try_into()
    }

    async fn delete_by_id(&self, table: &str, entity: &'static str, id: &str) -> GatewayResult<()> {
        let result = sqlx::query(&format!("DELETE FROM {table} WHERE id = ?"))
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(GatewayError::not_found(entity, id));
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceGateway for SqliteGateway {
    async fn list_projects(&self) -> GatewayResult<Vec<Project>> {
        sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY updated_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Project::try_from)
        .collect()
    }

    async fn get_project(&self, id: &str) -> GatewayResult<Option<Project>> {
        sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Project::try_from)
        .transpose()
    }

    async fn insert_project(&self, draft: ProjectDraft) -> GatewayResult<Project> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO projects (id, number, name, status, client_name, dealer_name, factory,
                contract_value_cents, start_date, target_completion_date, description,
                created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&draft.number)
        .bind(&draft.name)
        .bind(draft.status.as_str())
        .bind(&draft.client_name)
        .bind(&draft.dealer_name)
        .bind(&draft.factory)
        .bind(draft.contract_value_cents)
        .bind(draft.start_date)
        .bind(draft.target_completion_date)
        .bind(&draft.description)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_project(&id)
            .await?
            .ok_or_else(|| GatewayError::not_found("project", id))
    }

    async fn update_project(&self, id: &str, draft: ProjectDraft) -> GatewayResult<Project> {
        let result = sqlx::query(
            r#"
            UPDATE projects SET number = ?, name = ?, status = ?, client_name = ?,
                dealer_name = ?, factory = ?, contract_value_cents = ?, start_date = ?,
                target_completion_date = ?, description = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&draft.number)
        .bind(&draft.name)
        .bind(draft.status.as_str())
        .bind(&draft.client_name)
        .bind(&draft.dealer_name)
        .bind(&draft.factory)
        .bind(draft.contract_value_cents)
        .bind(draft.start_date)
        .bind(draft.target_completion_date)
        .bind(&draft.description)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(GatewayError::not_found("project", id));
        }

        self.get_project(id)
            .await?
            .ok_or_else(|| GatewayError::not_found("project", id))
    }

    async fn delete_project(&self, id: &str) -> GatewayResult<()> {
        // Children go with it (ON DELETE CASCADE)
        self.delete_by_id("projects", "project", id).await
    }

    async fn list_tasks(&self, project_id: &str) -> GatewayResult<Vec<Task>> {
        sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = ? \
             ORDER BY due_date IS NULL, due_date ASC, created_at ASC"
        ))
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Task::try_from)
        .collect()
    }

    async fn insert_task(&self, project_id: &str, draft: TaskDraft) -> GatewayResult<Task> {
        self.require_project(project_id).await?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let assignee = Contact::to_columns(draft.assignee.as_ref());

        sqlx::query(
            r#"
            INSERT INTO tasks (id, project_id, title, description, status, priority,
                assignee_is_external, assignee_user_id, assignee_name, assignee_email,
                due_date, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(project_id)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.status.as_str())
        .bind(draft.priority.as_str())
        .bind(assignee.is_external)
        .bind(&assignee.user_id)
        .bind(&assignee.name)
        .bind(&assignee.email)
        .bind(draft.due_date)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.fetch_task(&id).await
    }

    async fn update_task(&self, id: &str, draft: TaskDraft) -> GatewayResult<Task> {
        let assignee = Contact::to_columns(draft.assignee.as_ref());

        let result = sqlx::query(
            r#"
            UPDATE tasks SET title = ?, description = ?, status = ?, priority = ?,
                assignee_is_external = ?, assignee_user_id = ?, assignee_name = ?,
                assignee_email = ?, due_date = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.status.as_str())
        .bind(draft.priority.as_str())
        .bind(assignee.is_external)
        .bind(&assignee.user_id)
        .bind(&assignee.name)
        .bind(&assignee.email)
        .bind(draft.due_date)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(GatewayError::not_found("task", id));
        }
        self.fetch_task(id).await
    }

    async fn update_task_status(&self, id: &str, status: TaskStatus) -> GatewayResult<Task> {
        let result = sqlx::query("UPDATE tasks SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(GatewayError::not_found("task", id));
        }
        self.fetch_task(id).await
    }

    async fn delete_task(&self, id: &str) -> GatewayResult<()> {
        self.delete_by_id("tasks", "task", id).await
    }

    async fn list_rfis(&self, project_id: &str) -> GatewayResult<Vec<Rfi>> {
        let rows = sqlx::query_as::<_, RfiRow>(&format!(
            "SELECT {RFI_COLUMNS} FROM rfis WHERE project_id = ? ORDER BY number ASC"
        ))
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        let attachment_rows = sqlx::query_as::<_, AttachmentRow>(
            r#"
            SELECT a.id, a.rfi_id, a.file_name, a.storage_path, a.content_type, a.size_bytes,
                a.uploaded_at
            FROM rfi_attachments a
            JOIN rfis r ON a.rfi_id = r.id
            WHERE r.project_id = ?
            ORDER BY a.uploaded_at ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        let mut attachments: HashMap<String, Vec<Attachment>> = HashMap::new();
        for row in attachment_rows {
            attachments
                .entry(row.rfi_id.clone())
                .or_default()
                .push(row.into());
        }

        rows.into_iter()
            .map(|row| {
                let files = attachments.remove(&row.id).unwrap_or_default();
                row.into_rfi(files)
            })
            .collect()
    }

    async fn insert_rfi(&self, project_id: &str, draft: RfiDraft) -> GatewayResult<Rfi> {
        self.require_project(project_id).await?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let recipient = Contact::to_columns(draft.recipient.as_ref());

        // One statement, so the number is assigned under the write lock and
        // concurrent creates queue on busy_timeout instead of failing.
        sqlx::query(
            r#"
            INSERT INTO rfis (id, project_id, number, subject, question, answer, status, priority,
                recipient_is_external, recipient_user_id, recipient_name, recipient_email,
                due_date, created_at, updated_at)
            SELECT ?, ?, COALESCE(MAX(number), 0) + 1, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?
            FROM rfis WHERE project_id = ?
            "#,
        )
        .bind(&id)
        .bind(project_id)
        .bind(&draft.subject)
        .bind(&draft.question)
        .bind(&draft.answer)
        .bind(draft.status.as_str())
        .bind(draft.priority.as_str())
        .bind(recipient.is_external)
        .bind(&recipient.user_id)
        .bind(&recipient.name)
        .bind(&recipient.email)
        .bind(draft.due_date)
        .bind(now)
        .bind(now)
        .bind(project_id)
        .execute(&self.pool)
        .await?;

        self.fetch_rfi(&id).await
    }

    async fn update_rfi(&self, id: &str, draft: RfiDraft) -> GatewayResult<Rfi> {
        let recipient = Contact::to_columns(draft.recipient.as_ref());

        let result = sqlx::query(
            r#"
            UPDATE rfis SET subject = ?, question = ?, answer = ?, status = ?, priority = ?,
                recipient_is_external = ?, recipient_user_id = ?, recipient_name = ?,
                recipient_email = ?, due_date = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&draft.subject)
        .bind(&draft.question)
        .bind(&draft.answer)
        .bind(draft.status.as_str())
        .bind(draft.priority.as_str())
        .bind(recipient.is_external)
        .bind(&recipient.user_id)
        .bind(&recipient.name)
        .bind(&recipient.email)
        .bind(draft.due_date)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(GatewayError::not_found("rfi", id));
        }
        self.fetch_rfi(id).await
    }

    async fn delete_rfi(&self, id: &str) -> GatewayResult<()> {
        self.delete_by_id("rfis", "rfi", id).await
    }

    async fn add_rfi_attachment(
        &self,
        rfi_id: &str,
        attachment: NewAttachment,
    ) -> GatewayResult<Attachment> {
        let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM rfis WHERE id = ?")
            .bind(rfi_id)
            .fetch_one(&self.pool)
            .await?;

        if exists == 0 {
            return Err(GatewayError::not_found("rfi", rfi_id));
        }

        sqlx::query(
            r#"
            INSERT INTO rfi_attachments (id, rfi_id, file_name, storage_path, content_type,
                size_bytes, uploaded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&attachment.id)
        .bind(rfi_id)
        .bind(&attachment.file_name)
        .bind(&attachment.storage_path)
        .bind(&attachment.content_type)
        .bind(attachment.size_bytes)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        sqlx::query_as::<_, AttachmentRow>(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM rfi_attachments WHERE id = ?"
        ))
        .bind(&attachment.id)
        .fetch_one(&self.pool)
        .await
        .map(Attachment::from)
        .map_err(GatewayError::from)
    }

    async fn delete_rfi_attachment(&self, id: &str) -> GatewayResult<Attachment> {
        let attachment = sqlx::query_as::<_, AttachmentRow>(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM rfi_attachments WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| GatewayError::not_found("attachment", id))?;

        self.delete_by_id("rfi_attachments", "attachment", id).await?;
        Ok(attachment.into())
    }

    async fn list_submittals(&self, project_id: &str) -> GatewayResult<Vec<Submittal>> {
        sqlx::query_as::<_, SubmittalRow>(&format!(
            "SELECT {SUBMITTAL_COLUMNS} FROM submittals WHERE project_id = ? ORDER BY number ASC"
        ))
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Submittal::try_from)
        .collect()
    }

    async fn insert_submittal(
        &self,
        project_id: &str,
        draft: SubmittalDraft,
    ) -> GatewayResult<Submittal> {
        self.require_project(project_id).await?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let reviewer = Contact::to_columns(draft.reviewer.as_ref());

        sqlx::query(
            r#"
            INSERT INTO submittals (id, project_id, number, title, submittal_type, status,
                revision, spec_section, manufacturer, reviewer_is_external, reviewer_user_id,
                reviewer_name, reviewer_email, due_date, created_at, updated_at)
            SELECT ?, ?, COALESCE(MAX(number), 0) + 1, ?, ?, ?, 0, ?, ?, ?, ?, ?, ?, ?, ?, ?
            FROM submittals WHERE project_id = ?
            "#,
        )
        .bind(&id)
        .bind(project_id)
        .bind(&draft.title)
        .bind(&draft.submittal_type)
        .bind(draft.status.as_str())
        .bind(&draft.spec_section)
        .bind(&draft.manufacturer)
        .bind(reviewer.is_external)
        .bind(&reviewer.user_id)
        .bind(&reviewer.name)
        .bind(&reviewer.email)
        .bind(draft.due_date)
        .bind(now)
        .bind(now)
        .bind(project_id)
        .execute(&self.pool)
        .await?;

        self.fetch_submittal(&id).await
    }

    async fn update_submittal(&self, id: &str, draft: SubmittalDraft) -> GatewayResult<Submittal> {
        let current = self.fetch_submittal(id).await?;
        let revision = next_revision(current.revision, draft.revision)?;
        let reviewer = Contact::to_columns(draft.reviewer.as_ref());

        let result = sqlx::query(
            r#"
            UPDATE submittals SET title = ?, submittal_type = ?, status = ?, revision = ?,
                spec_section = ?, manufacturer = ?, reviewer_is_external = ?,
                reviewer_user_id = ?, reviewer_name = ?, reviewer_email = ?, due_date = ?,
                updated_at = ?
            WHERE id = ? AND revision <= ?
            "#,
        )
        .bind(&draft.title)
        .bind(&draft.submittal_type)
        .bind(draft.status.as_str())
        .bind(i64::from(revision))
        .bind(&draft.spec_section)
        .bind(&draft.manufacturer)
        .bind(reviewer.is_external)
        .bind(&reviewer.user_id)
        .bind(&reviewer.name)
        .bind(&reviewer.email)
        .bind(draft.due_date)
        .bind(Utc::now())
        .bind(id)
        .bind(i64::from(revision))
        .execute(&self.pool)
        .await?;

        // Another writer raised the revision past ours in the meantime
        if result.rows_affected() == 0 {
            return Err(GatewayError::Rejected(format!(
                "submittal {id} moved past revision {revision}"
            )));
        }
        self.fetch_submittal(id).await
    }

    async fn revise_submittal(&self, id: &str) -> GatewayResult<Submittal> {
        let result = sqlx::query(
            "UPDATE submittals SET revision = revision + 1, status = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(SubmittalStatus::Submitted.as_str())
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(GatewayError::not_found("submittal", id));
        }
        self.fetch_submittal(id).await
    }

    async fn delete_submittal(&self, id: &str) -> GatewayResult<()> {
        self.delete_by_id("submittals", "submittal", id).await
    }

    async fn list_milestones(&self, project_id: &str) -> GatewayResult<Vec<Milestone>> {
        sqlx::query_as::<_, MilestoneRow>(&format!(
            "SELECT {MILESTONE_COLUMNS} FROM milestones WHERE project_id = ? \
             ORDER BY due_date IS NULL, due_date ASC, created_at ASC"
        ))
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Milestone::try_from)
        .collect()
    }

    async fn insert_milestone(
        &self,
        project_id: &str,
        draft: MilestoneDraft,
    ) -> GatewayResult<Milestone> {
        self.require_project(project_id).await?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO milestones \
             (id, project_id, name, status, due_date, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(project_id)
        .bind(&draft.name)
        .bind(draft.status.as_str())
        .bind(draft.due_date)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.fetch_milestone(&id).await
    }

    async fn update_milestone(&self, id: &str, draft: MilestoneDraft) -> GatewayResult<Milestone> {
        let result = sqlx::query(
            "UPDATE milestones SET name = ?, status = ?, due_date = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&draft.name)
        .bind(draft.status.as_str())
        .bind(draft.due_date)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(GatewayError::not_found("milestone", id));
        }
        self.fetch_milestone(id).await
    }

    async fn delete_milestone(&self, id: &str) -> GatewayResult<()> {
        self.delete_by_id("milestones", "milestone", id).await
    }
}
