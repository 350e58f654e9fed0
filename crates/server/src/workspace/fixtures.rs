// Hand-built snapshots for unit tests of the pure derived views.

use chrono::{NaiveDate, TimeZone, Utc};

use super::WorkspaceSnapshot;
use crate::db::models::{
    Milestone, MilestoneStatus, Priority, Project, ProjectStatus, Rfi, RfiStatus, Submittal,
    SubmittalStatus, Task, TaskStatus,
};

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn project() -> Project {
    let created = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
    Project {
        id: "p-1".into(),
        number: "SNB-0001".into(),
        name: "Showroom".into(),
        status: ProjectStatus::InProgress,
        client_name: Some("Northwind".into()),
        dealer_name: None,
        factory: None,
        contract_value_cents: Some(12_500_000),
        start_date: Some(day(2026, 1, 12)),
        target_completion_date: Some(day(2026, 9, 30)),
        description: None,
        created_at: created,
        updated_at: created,
    }
}

pub fn task(id: &str, status: TaskStatus, priority: Priority, due: Option<NaiveDate>) -> Task {
    let created = Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap();
    Task {
        id: id.into(),
        project_id: "p-1".into(),
        title: format!("Task {id}"),
        description: None,
        status,
        priority,
        assignee: None,
        due_date: due,
        created_at: created,
        updated_at: created,
    }
}

pub fn rfi(
    id: &str,
    number: i64,
    status: RfiStatus,
    created: NaiveDate,
    due: Option<NaiveDate>,
) -> Rfi {
    let created = Utc.from_utc_datetime(&created.and_hms_opt(10, 0, 0).unwrap());
    Rfi {
        id: id.into(),
        project_id: "p-1".into(),
        number,
        subject: format!("RFI {number}"),
        question: "Which detail governs?".into(),
        answer: None,
        status,
        priority: Priority::Medium,
        recipient: None,
        due_date: due,
        attachments: Vec::new(),
        created_at: created,
        updated_at: created,
    }
}

pub fn submittal(
    id: &str,
    number: i64,
    status: SubmittalStatus,
    due: Option<NaiveDate>,
) -> Submittal {
    let created = Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap();
    Submittal {
        id: id.into(),
        project_id: "p-1".into(),
        number,
        title: format!("Submittal {number}"),
        submittal_type: "Shop Drawing".into(),
        status,
        revision: 0,
        spec_section: Some("08 71 00".into()),
        manufacturer: None,
        reviewer: None,
        due_date: due,
        created_at: created,
        updated_at: created,
    }
}

pub fn milestone(id: &str, status: MilestoneStatus, due: Option<NaiveDate>) -> Milestone {
    let created = Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap();
    Milestone {
        id: id.into(),
        project_id: "p-1".into(),
        name: format!("Milestone {id}"),
        status,
        due_date: due,
        created_at: created,
        updated_at: created,
    }
}

pub fn snapshot() -> WorkspaceSnapshot {
    WorkspaceSnapshot {
        version: 1,
        project: project(),
        tasks: Vec::new(),
        rfis: Vec::new(),
        submittals: Vec::new(),
        milestones: Vec::new(),
        loaded_at: Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap(),
    }
}
