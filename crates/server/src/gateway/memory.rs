use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, Notify};
use uuid::Uuid;

use super::{next_revision, GatewayError, GatewayResult, PersistenceGateway};
use crate::db::drafts::{
    MilestoneDraft, NewAttachment, ProjectDraft, RfiDraft, SubmittalDraft, TaskDraft,
};
use crate::db::models::{
    Attachment, Milestone, Project, Rfi, Submittal, SubmittalStatus, Task, TaskStatus,
};

#[derive(Default)]
struct Tables {
    projects: Vec<Project>,
    tasks: Vec<Task>,
    rfis: Vec<Rfi>,
    submittals: Vec<Submittal>,
    milestones: Vec<Milestone>,
}

/// In-process [`PersistenceGateway`] with failure injection and hold points,
/// for exercising the workspace store without a database.
///
/// Operations are addressed by their trait method name, e.g.
/// `"list_tasks"` or `"update_task_status"`.
#[derive(Default)]
pub struct MemoryGateway {
    tables: Mutex<Tables>,
    failing: Mutex<HashSet<&'static str>>,
    holds: Mutex<HashMap<&'static str, Arc<Notify>>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call to `operation` fail with `Unavailable` until
    /// [`MemoryGateway::recover`] is called.
    pub async fn fail(&self, operation: &'static str) {
        self.failing.lock().await.insert(operation);
    }

    pub async fn recover(&self, operation: &'static str) {
        self.failing.lock().await.remove(operation);
    }

    /// Parks the next call to `operation` until the returned handle is
    /// notified. Reads park before touching the tables; `update_task_status`
    /// parks after the write has landed but before it reports back, and
    /// fails if [`MemoryGateway::fail`] was called in the meantime.
    pub async fn hold(&self, operation: &'static str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.holds.lock().await.insert(operation, Arc::clone(&notify));
        notify
    }

    /// Changes a task's status behind the store's back, as another client
    /// would.
    pub async fn force_task_status(&self, id: &str, status: TaskStatus) -> GatewayResult<()> {
        let mut tables = self.tables.lock().await;
        let task = tables
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| GatewayError::not_found("task", id))?;
        task.status = status;
        task.updated_at = Utc::now();
        Ok(())
    }

    async fn check(&self, operation: &'static str) -> GatewayResult<()> {
        if self.failing.lock().await.contains(operation) {
            return Err(GatewayError::Unavailable(format!("{operation} failed")));
        }
        Ok(())
    }

    async fn wait_if_held(&self, operation: &'static str) {
        let hold = self.holds.lock().await.remove(operation);
        if let Some(notify) = hold {
            notify.notified().await;
        }
    }

    async fn enter(&self, operation: &'static str) -> GatewayResult<()> {
        self.wait_if_held(operation).await;
        self.check(operation).await
    }
}

fn require_project(tables: &Tables, project_id: &str) -> GatewayResult<()> {
    if tables.projects.iter().any(|p| p.id == project_id) {
        Ok(())
    } else {
        Err(GatewayError::not_found("project", project_id))
    }
}

fn find_mut<'a, T>(
    items: &'a mut [T],
    entity: &'static str,
    id: &str,
    key: impl Fn(&T) -> &str,
) -> GatewayResult<&'a mut T> {
    items
        .iter_mut()
        .find(|item| key(item) == id)
        .ok_or_else(|| GatewayError::not_found(entity, id))
}

fn remove<T>(
    items: &mut Vec<T>,
    entity: &'static str,
    id: &str,
    key: impl Fn(&T) -> &str,
) -> GatewayResult<T> {
    let index = items
        .iter()
        .position(|item| key(item) == id)
        .ok_or_else(|| GatewayError::not_found(entity, id))?;
    Ok(items.remove(index))
}

#[async_trait]
impl PersistenceGateway for MemoryGateway {
    async fn list_projects(&self) -> GatewayResult<Vec<Project>> {
        self.enter("list_projects").await?;
        let mut projects = self.tables.lock().await.projects.clone();
        projects.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(projects)
    }

    async fn get_project(&self, id: &str) -> GatewayResult<Option<Project>> {
        self.enter("get_project").await?;
        let tables = self.tables.lock().await;
        Ok(tables.projects.iter().find(|p| p.id == id).cloned())
    }

    async fn insert_project(&self, draft: ProjectDraft) -> GatewayResult<Project> {
        self.enter("insert_project").await?;
        let mut tables = self.tables.lock().await;
        if tables.projects.iter().any(|p| p.number == draft.number) {
            return Err(GatewayError::Rejected(format!(
                "project number {} already exists",
                draft.number
            )));
        }
        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4().to_string(),
            number: draft.number,
            name: draft.name,
            status: draft.status,
            client_name: draft.client_name,
            dealer_name: draft.dealer_name,
            factory: draft.factory,
            contract_value_cents: draft.contract_value_cents,
            start_date: draft.start_date,
            target_completion_date: draft.target_completion_date,
            description: draft.description,
            created_at: now,
            updated_at: now,
        };
        tables.projects.push(project.clone());
        Ok(project)
    }

    async fn update_project(&self, id: &str, draft: ProjectDraft) -> GatewayResult<Project> {
        self.enter("update_project").await?;
        let mut tables = self.tables.lock().await;
        let project = find_mut(&mut tables.projects, "project", id, |p| p.id.as_str())?;
        project.number = draft.number;
        project.name = draft.name;
        project.status = draft.status;
        project.client_name = draft.client_name;
        project.dealer_name = draft.dealer_name;
        project.factory = draft.factory;
        project.contract_value_cents = draft.contract_value_cents;
        project.start_date = draft.start_date;
        project.target_completion_date = draft.target_completion_date;
        project.description = draft.description;
        project.updated_at = Utc::now();
        Ok(project.clone())
    }

    async fn delete_project(&self, id: &str) -> GatewayResult<()> {
        self.enter("delete_project").await?;
        let mut tables = self.tables.lock().await;
        remove(&mut tables.projects, "project", id, |p| p.id.as_str())?;
        tables.tasks.retain(|t| t.project_id != id);
        tables.rfis.retain(|r| r.project_id != id);
        tables.submittals.retain(|s| s.project_id != id);
        tables.milestones.retain(|m| m.project_id != id);
        Ok(())
    }

    async fn list_tasks(&self, project_id: &str) -> GatewayResult<Vec<Task>> {
        self.enter("list_tasks").await?;
        let tables = self.tables.lock().await;
        let mut tasks: Vec<Task> = tables
            .tasks
            .iter()
            .filter(|t| t.project_id == project_id)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| (t.due_date.is_none(), t.due_date, t.created_at));
        Ok(tasks)
    }

    async fn insert_task(&self, project_id: &str, draft: TaskDraft) -> GatewayResult<Task> {
        self.enter("insert_task").await?;
        let mut tables = self.tables.lock().await;
        require_project(&tables, project_id)?;
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            title: draft.title,
            description: draft.description,
            status: draft.status,
            priority: draft.priority,
            assignee: draft.assignee,
            due_date: draft.due_date,
            created_at: now,
            updated_at: now,
        };
        tables.tasks.push(task.clone());
        Ok(task)
    }

    async fn update_task(&self, id: &str, draft: TaskDraft) -> GatewayResult<Task> {
        self.enter("update_task").await?;
        let mut tables = self.tables.lock().await;
        let task = find_mut(&mut tables.tasks, "task", id, |t| t.id.as_str())?;
        task.title = draft.title;
        task.description = draft.description;
        task.status = draft.status;
        task.priority = draft.priority;
        task.assignee = draft.assignee;
        task.due_date = draft.due_date;
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn update_task_status(&self, id: &str, status: TaskStatus) -> GatewayResult<Task> {
        self.check("update_task_status").await?;
        let (updated, prior) = {
            let mut tables = self.tables.lock().await;
            let task = find_mut(&mut tables.tasks, "task", id, |t| t.id.as_str())?;
            let prior = std::mem::replace(&mut task.status, status);
            task.updated_at = Utc::now();
            (task.clone(), prior)
        };
        self.wait_if_held("update_task_status").await;

        // Failing while held undoes the write unless someone else has
        // changed the row since.
        if let Err(err) = self.check("update_task_status").await {
            let mut tables = self.tables.lock().await;
            if let Some(task) = tables.tasks.iter_mut().find(|t| t.id == id) {
                if task.status == status {
                    task.status = prior;
                }
            }
            return Err(err);
        }
        Ok(updated)
    }

    async fn delete_task(&self, id: &str) -> GatewayResult<()> {
        self.enter("delete_task").await?;
        let mut tables = self.tables.lock().await;
        remove(&mut tables.tasks, "task", id, |t| t.id.as_str()).map(|_| ())
    }

    async fn list_rfis(&self, project_id: &str) -> GatewayResult<Vec<Rfi>> {
        self.enter("list_rfis").await?;
        let tables = self.tables.lock().await;
        let mut rfis: Vec<Rfi> = tables
            .rfis
            .iter()
            .filter(|r| r.project_id == project_id)
            .cloned()
            .collect();
        rfis.sort_by_key(|r| r.number);
        Ok(rfis)
    }

    async fn insert_rfi(&self, project_id: &str, draft: RfiDraft) -> GatewayResult<Rfi> {
        self.enter("insert_rfi").await?;
        let mut tables = self.tables.lock().await;
        require_project(&tables, project_id)?;
        let number = tables
            .rfis
            .iter()
            .filter(|r| r.project_id == project_id)
            .map(|r| r.number)
            .max()
            .unwrap_or(0)
            + 1;
        let now = Utc::now();
        let rfi = Rfi {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            number,
            subject: draft.subject,
            question: draft.question,
            answer: draft.answer,
            status: draft.status,
            priority: draft.priority,
            recipient: draft.recipient,
            due_date: draft.due_date,
            attachments: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        tables.rfis.push(rfi.clone());
        Ok(rfi)
    }

    async fn update_rfi(&self, id: &str, draft: RfiDraft) -> GatewayResult<Rfi> {
        self.enter("update_rfi").await?;
        let mut tables = self.tables.lock().await;
        let rfi = find_mut(&mut tables.rfis, "rfi", id, |r| r.id.as_str())?;
        rfi.subject = draft.subject;
        rfi.question = draft.question;
        rfi.answer = draft.answer;
        rfi.status = draft.status;
        rfi.priority = draft.priority;
        rfi.recipient = draft.recipient;
        rfi.due_date = draft.due_date;
        rfi.updated_at = Utc::now();
        Ok(rfi.clone())
    }

    async fn delete_rfi(&self, id: &str) -> GatewayResult<()> {
        self.enter("delete_rfi").await?;
        let mut tables = self.tables.lock().await;
        remove(&mut tables.rfis, "rfi", id, |r| r.id.as_str()).map(|_| ())
    }

    async fn add_rfi_attachment(
        &self,
        rfi_id: &str,
        attachment: NewAttachment,
    ) -> GatewayResult<Attachment> {
        self.enter("add_rfi_attachment").await?;
        let mut tables = self.tables.lock().await;
        let rfi = find_mut(&mut tables.rfis, "rfi", rfi_id, |r| r.id.as_str())?;
        let record = Attachment {
            id: attachment.id,
            rfi_id: rfi_id.to_string(),
            file_name: attachment.file_name,
            storage_path: attachment.storage_path,
            content_type: attachment.content_type,
            size_bytes: attachment.size_bytes,
            uploaded_at: Utc::now(),
        };
        rfi.attachments.push(record.clone());
        Ok(record)
    }

    async fn delete_rfi_attachment(&self, id: &str) -> GatewayResult<Attachment> {
        self.enter("delete_rfi_attachment").await?;
        let mut tables = self.tables.lock().await;
        for rfi in &mut tables.rfis {
            if let Some(index) = rfi.attachments.iter().position(|a| a.id == id) {
                return Ok(rfi.attachments.remove(index));
            }
        }
        Err(GatewayError::not_found("attachment", id))
    }

    async fn list_submittals(&self, project_id: &str) -> GatewayResult<Vec<Submittal>> {
        self.enter("list_submittals").await?;
        let tables = self.tables.lock().await;
        let mut submittals: Vec<Submittal> = tables
            .submittals
            .iter()
            .filter(|s| s.project_id == project_id)
            .cloned()
            .collect();
        submittals.sort_by_key(|s| s.number);
        Ok(submittals)
    }

    async fn insert_submittal(
        &self,
        project_id: &str,
        draft: SubmittalDraft,
    ) -> GatewayResult<Submittal> {
        self.enter("insert_submittal").await?;
        let mut tables = self.tables.lock().await;
        require_project(&tables, project_id)?;
        let number = tables
            .submittals
            .iter()
            .filter(|s| s.project_id == project_id)
            .map(|s| s.number)
            .max()
            .unwrap_or(0)
            + 1;
        let now = Utc::now();
        let submittal = Submittal {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            number,
            title: draft.title,
            submittal_type: draft.submittal_type,
            status: draft.status,
            revision: 0,
            spec_section: draft.spec_section,
            manufacturer: draft.manufacturer,
            reviewer: draft.reviewer,
            due_date: draft.due_date,
            created_at: now,
            updated_at: now,
        };
        tables.submittals.push(submittal.clone());
        Ok(submittal)
    }

    async fn update_submittal(&self, id: &str, draft: SubmittalDraft) -> GatewayResult<Submittal> {
        self.enter("update_submittal").await?;
        let mut tables = self.tables.lock().await;
        let submittal = find_mut(&mut tables.submittals, "submittal", id, |s| s.id.as_str())?;
        submittal.revision = next_revision(submittal.revision, draft.revision)?;
        submittal.title = draft.title;
        submittal.submittal_type = draft.submittal_type;
        submittal.status = draft.status;
        submittal.spec_section = draft.spec_section;
        submittal.manufacturer = draft.manufacturer;
        submittal.reviewer = draft.reviewer;
        submittal.due_date = draft.due_date;
        submittal.updated_at = Utc::now();
        Ok(submittal.clone())
    }

    async fn revise_submittal(&self, id: &str) -> GatewayResult<Submittal> {
        self.enter("revise_submittal").await?;
        let mut tables = self.tables.lock().await;
        let submittal = find_mut(&mut tables.submittals, "submittal", id, |s| s.id.as_str())?;
        submittal.revision += 1;
        submittal.status = SubmittalStatus::Submitted;
        submittal.updated_at = Utc::now();
        Ok(submittal.clone())
    }

    async fn delete_submittal(&self, id: &str) -> GatewayResult<()> {
        self.enter("delete_submittal").await?;
        let mut tables = self.tables.lock().await;
        remove(&mut tables.submittals, "submittal", id, |s| s.id.as_str()).map(|_| ())
    }

    async fn list_milestones(&self, project_id: &str) -> GatewayResult<Vec<Milestone>> {
        self.enter("list_milestones").await?;
        let tables = self.tables.lock().await;
        let mut milestones: Vec<Milestone> = tables
            .milestones
            .iter()
            .filter(|m| m.project_id == project_id)
            .cloned()
            .collect();
        milestones.sort_by_key(|m| (m.due_date.is_none(), m.due_date, m.created_at));
        Ok(milestones)
    }

    async fn insert_milestone(
        &self,
        project_id: &str,
        draft: MilestoneDraft,
    ) -> GatewayResult<Milestone> {
        self.enter("insert_milestone").await?;
        let mut tables = self.tables.lock().await;
        require_project(&tables, project_id)?;
        let now = Utc::now();
        let milestone = Milestone {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            name: draft.name,
            status: draft.status,
            due_date: draft.due_date,
            created_at: now,
            updated_at: now,
        };
        tables.milestones.push(milestone.clone());
        Ok(milestone)
    }

    async fn update_milestone(&self, id: &str, draft: MilestoneDraft) -> GatewayResult<Milestone> {
        self.enter("update_milestone").await?;
        let mut tables = self.tables.lock().await;
        let milestone = find_mut(&mut tables.milestones, "milestone", id, |m| m.id.as_str())?;
        milestone.name = draft.name;
        milestone.status = draft.status;
        milestone.due_date = draft.due_date;
        milestone.updated_at = Utc::now();
        Ok(milestone.clone())
    }

    async fn delete_milestone(&self, id: &str) -> GatewayResult<()> {
        self.enter("delete_milestone").await?;
        let mut tables = self.tables.lock().await;
        remove(&mut tables.milestones, "milestone", id, |m| m.id.as_str()).map(|_| ())
    }
}
