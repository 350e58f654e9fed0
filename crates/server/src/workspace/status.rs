// Terminal statuses and the derived "overdue" predicate.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::models::{
    Milestone, MilestoneStatus, Rfi, RfiStatus, Submittal, SubmittalStatus, Task, TaskStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Task,
    Rfi,
    Submittal,
    Milestone,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Task => "task",
            EntityKind::Rfi => "rfi",
            EntityKind::Submittal => "submittal",
            EntityKind::Milestone => "milestone",
        }
    }
}

const TASK_TERMINAL: &[&str] = &[TaskStatus::Completed.as_str(), TaskStatus::Cancelled.as_str()];

const RFI_TERMINAL: &[&str] = &[RfiStatus::Answered.as_str(), RfiStatus::Closed.as_str()];

const SUBMITTAL_TERMINAL: &[&str] = &[
    SubmittalStatus::Approved.as_str(),
    SubmittalStatus::ApprovedAsNoted.as_str(),
    SubmittalStatus::Rejected.as_str(),
];

const MILESTONE_TERMINAL: &[&str] = &[MilestoneStatus::Completed.as_str()];

/// Statuses after which an entity of `kind` no longer counts as overdue.
pub fn terminal_statuses(kind: EntityKind) -> &'static [&'static str] {
    match kind {
        EntityKind::Task => TASK_TERMINAL,
        EntityKind::Rfi => RFI_TERMINAL,
        EntityKind::Submittal => SUBMITTAL_TERMINAL,
        EntityKind::Milestone => MILESTONE_TERMINAL,
    }
}

pub fn is_terminal(kind: EntityKind, status: &str) -> bool {
    terminal_statuses(kind).contains(&status)
}

/// `due < today` and the status is not terminal for `kind`. Undated items are
/// never overdue.
pub fn is_overdue(
    kind: EntityKind,
    status: &str,
    due: Option<NaiveDate>,
    today: NaiveDate,
) -> bool {
    match due {
        Some(due) => due < today && !is_terminal(kind, status),
        None => false,
    }
}

/// A dated, status-carrying workspace record.
pub trait Tracked {
    const KIND: EntityKind;

    fn id(&self) -> &str;
    fn title(&self) -> &str;
    fn status_label(&self) -> &'static str;
    fn due_date(&self) -> Option<NaiveDate>;

    fn is_terminal(&self) -> bool {
        is_terminal(Self::KIND, self.status_label())
    }

    fn is_overdue(&self, today: NaiveDate) -> bool {
        is_overdue(Self::KIND, self.status_label(), self.due_date(), today)
    }
}

impl Tracked for Task {
    const KIND: EntityKind = EntityKind::Task;

    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn status_label(&self) -> &'static str {
        self.status.as_str()
    }

    fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }
}

impl Tracked for Rfi {
    const KIND: EntityKind = EntityKind::Rfi;

    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.subject
    }

    fn status_label(&self) -> &'static str {
        self.status.as_str()
    }

    fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }
}

impl Tracked for Submittal {
    const KIND: EntityKind = EntityKind::Submittal;

    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn status_label(&self) -> &'static str {
        self.status.as_str()
    }

    fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }
}

impl Tracked for Milestone {
    const KIND: EntityKind = EntityKind::Milestone;

    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.name
    }

    fn status_label(&self) -> &'static str {
        self.status.as_str()
    }

    fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn terminal_labels_are_real_statuses() {
        for label in TASK_TERMINAL {
            assert!(label.parse::<TaskStatus>().is_ok(), "{label}");
        }
        for label in RFI_TERMINAL {
            assert!(label.parse::<RfiStatus>().is_ok(), "{label}");
        }
        for label in SUBMITTAL_TERMINAL {
            assert!(label.parse::<SubmittalStatus>().is_ok(), "{label}");
        }
        for label in MILESTONE_TERMINAL {
            assert!(label.parse::<MilestoneStatus>().is_ok(), "{label}");
        }
    }

    #[test]
    fn terminal_status_is_never_overdue() {
        let today = day(2026, 3, 10);
        let long_ago = Some(day(2020, 1, 1));
        for kind in [
            EntityKind::Task,
            EntityKind::Rfi,
            EntityKind::Submittal,
            EntityKind::Milestone,
        ] {
            for status in terminal_statuses(kind) {
                assert!(!is_overdue(kind, status, long_ago, today), "{kind:?} {status}");
            }
        }
    }

    #[test]
    fn open_items_past_due_are_overdue() {
        let today = day(2026, 3, 10);
        assert!(is_overdue(EntityKind::Task, "In Progress", Some(day(2026, 3, 9)), today));
        assert!(is_overdue(EntityKind::Rfi, "Open", Some(day(2026, 3, 9)), today));
        assert!(is_overdue(
            EntityKind::Submittal,
            "Revise and Resubmit",
            Some(day(2026, 3, 9)),
            today
        ));
    }

    #[test]
    fn due_today_or_undated_is_not_overdue() {
        let today = day(2026, 3, 10);
        assert!(!is_overdue(EntityKind::Task, "In Progress", Some(today), today));
        assert!(!is_overdue(EntityKind::Milestone, "Pending", None, today));
    }

    #[test]
    fn terminal_sets_differ_by_kind() {
        // "Completed" closes a task but is not a submittal status at all
        assert!(is_terminal(EntityKind::Task, "Completed"));
        assert!(!is_terminal(EntityKind::Submittal, "Completed"));
        // "Answered" closes an RFI
        assert!(is_terminal(EntityKind::Rfi, "Answered"));
        assert!(!is_terminal(EntityKind::Rfi, "Pending"));
    }
}
