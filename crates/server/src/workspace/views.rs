// Read-only projections of a snapshot: the task board, the schedule
// calendar and RFI aging.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::Serialize;

use super::status::{EntityKind, Tracked};
use super::WorkspaceSnapshot;
use crate::db::models::{Priority, TaskStatus};

#[derive(Debug, Clone, Serialize)]
pub struct KanbanCard {
    pub task_id: String,
    pub title: String,
    pub priority: Priority,
    pub assignee: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub overdue: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct KanbanColumn {
    pub status: TaskStatus,
    pub cards: Vec<KanbanCard>,
}

// Undated sorts after every dated item.
fn by_due_date(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// One column per task status, in workflow order. Empty columns are kept so
/// the board always has the same shape.
pub fn kanban_board(snapshot: &WorkspaceSnapshot, today: NaiveDate) -> Vec<KanbanColumn> {
    TaskStatus::ALL
        .iter()
        .map(|&status| {
            let mut tasks: Vec<_> = snapshot.tasks.iter().filter(|t| t.status == status).collect();
            tasks.sort_by(|a, b| {
                a.priority
                    .rank()
                    .cmp(&b.priority.rank())
                    .then_with(|| by_due_date(a.due_date, b.due_date))
                    .then_with(|| a.title.cmp(&b.title))
            });
            let cards = tasks
                .into_iter()
                .map(|task| KanbanCard {
                    task_id: task.id.clone(),
                    title: task.title.clone(),
                    priority: task.priority,
                    assignee: task.assignee.as_ref().map(|c| c.display_name().to_string()),
                    due_date: task.due_date,
                    overdue: task.is_overdue(today),
                })
                .collect();
            KanbanColumn { status, cards }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarEntry {
    pub kind: EntityKind,
    pub id: String,
    pub title: String,
    pub status: &'static str,
    pub date: NaiveDate,
    pub overdue: bool,
}

fn push_entries<T: Tracked>(
    out: &mut Vec<CalendarEntry>,
    items: &[T],
    from: NaiveDate,
    to: NaiveDate,
    today: NaiveDate,
) {
    for item in items {
        let Some(date) = item.due_date() else { continue };
        if date < from || date > to {
            continue;
        }
        out.push(CalendarEntry {
            kind: T::KIND,
            id: item.id().to_string(),
            title: item.title().to_string(),
            status: item.status_label(),
            date,
            overdue: item.is_overdue(today),
        });
    }
}

/// Dated items due within `[from, to]`, ordered by date and then kind.
pub fn calendar(
    snapshot: &WorkspaceSnapshot,
    from: NaiveDate,
    to: NaiveDate,
    today: NaiveDate,
) -> Vec<CalendarEntry> {
    let mut entries = Vec::new();
    push_entries(&mut entries, &snapshot.tasks, from, to, today);
    push_entries(&mut entries, &snapshot.rfis, from, to, today);
    push_entries(&mut entries, &snapshot.submittals, from, to, today);
    push_entries(&mut entries, &snapshot.milestones, from, to, today);
    entries.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.kind.cmp(&b.kind))
            .then_with(|| a.title.cmp(&b.title))
    });
    entries
}

#[derive(Debug, Clone, Serialize)]
pub struct RfiAging {
    pub rfi_id: String,
    pub number: i64,
    pub subject: String,
    pub status: &'static str,
    pub days_open: i64,
    pub overdue: bool,
}

/// Days each RFI has been open. Open RFIs age against `today`; answered or
/// closed ones stop at their last update. Oldest first.
pub fn rfi_aging(snapshot: &WorkspaceSnapshot, today: NaiveDate) -> Vec<RfiAging> {
    let mut rows: Vec<_> = snapshot
        .rfis
        .iter()
        .map(|rfi| {
            let opened = rfi.created_at.date_naive();
            let until = if rfi.is_terminal() {
                rfi.updated_at.date_naive()
            } else {
                today
            };
            RfiAging {
                rfi_id: rfi.id.clone(),
                number: rfi.number,
                subject: rfi.subject.clone(),
                status: rfi.status_label(),
                days_open: (until - opened).num_days().max(0),
                overdue: rfi.is_overdue(today),
            }
        })
        .collect();
    rows.sort_by(|a, b| b.days_open.cmp(&a.days_open).then(a.number.cmp(&b.number)));
    rows
}
