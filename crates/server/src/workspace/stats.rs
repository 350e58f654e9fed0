use chrono::NaiveDate;
use serde::Serialize;

use super::status::Tracked;
use super::WorkspaceSnapshot;
use crate::db::models::{MilestoneStatus, RfiStatus, SubmittalStatus, TaskStatus};

/// Counters behind the overview stat cards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkspaceStats {
    pub task_completed: usize,
    pub task_total: usize,
    pub task_overdue: usize,
    pub rfi_open: usize,
    pub rfi_total: usize,
    pub rfi_overdue: usize,
    pub submittal_approved: usize,
    pub submittal_total: usize,
    pub submittal_overdue: usize,
    pub milestone_completed: usize,
    pub milestone_total: usize,
    pub milestone_overdue: usize,
}

fn count_overdue<'a, T: Tracked + 'a>(
    items: impl IntoIterator<Item = &'a T>,
    today: NaiveDate,
) -> usize {
    items.into_iter().filter(|item| item.is_overdue(today)).count()
}

impl WorkspaceStats {
    pub fn compute(snapshot: &WorkspaceSnapshot, today: NaiveDate) -> Self {
        Self {
            task_completed: snapshot
                .tasks
                .iter()
                .filter(|t| t.status == TaskStatus::Completed)
                .count(),
            task_total: snapshot.tasks.len(),
            task_overdue: count_overdue(&snapshot.tasks, today),
            rfi_open: snapshot
                .rfis
                .iter()
                .filter(|r| matches!(r.status, RfiStatus::Open | RfiStatus::Pending))
                .count(),
            rfi_total: snapshot.rfis.len(),
            rfi_overdue: count_overdue(&snapshot.rfis, today),
            submittal_approved: snapshot
                .submittals
                .iter()
                .filter(|s| {
                    matches!(
                        s.status,
                        SubmittalStatus::Approved | SubmittalStatus::ApprovedAsNoted
                    )
                })
                .count(),
            submittal_total: snapshot.submittals.len(),
            submittal_overdue: count_overdue(&snapshot.submittals, today),
            milestone_completed: snapshot
                .milestones
                .iter()
                .filter(|m| m.status == MilestoneStatus::Completed)
                .count(),
            milestone_total: snapshot.milestones.len(),
            milestone_overdue: count_overdue(&snapshot.milestones, today),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Priority;
    use crate::workspace::fixtures::{day, milestone, rfi, snapshot, submittal, task};

    #[test]
    fn empty_workspace_counts_nothing() {
        let stats = WorkspaceStats::compute(&snapshot(), day(2026, 3, 10));
        assert_eq!(stats, WorkspaceStats::default());
    }

    #[test]
    fn completed_task_past_due_is_counted_complete_not_overdue() {
        let today = day(2026, 3, 10);
        let yesterday = day(2026, 3, 9);
        let mut snap = snapshot();
        snap.tasks = vec![
            task("t1", TaskStatus::Completed, Priority::Medium, Some(yesterday)),
            task("t2", TaskStatus::InProgress, Priority::Medium, None),
            task("t3", TaskStatus::InProgress, Priority::High, Some(yesterday)),
        ];

        let stats = WorkspaceStats::compute(&snap, today);
        assert_eq!(stats.task_completed, 1);
        assert_eq!(stats.task_total, 3);
        assert_eq!(stats.task_overdue, 1);
    }

    #[test]
    fn rfi_and_submittal_counters_follow_their_own_status_sets() {
        let today = day(2026, 3, 10);
        let past = Some(day(2026, 3, 1));
        let mut snap = snapshot();
        snap.rfis = vec![
            rfi("r1", 1, RfiStatus::Draft, day(2026, 2, 1), past),
            rfi("r2", 2, RfiStatus::Open, day(2026, 2, 1), past),
            rfi("r3", 3, RfiStatus::Pending, day(2026, 2, 1), None),
            rfi("r4", 4, RfiStatus::Answered, day(2026, 2, 1), past),
        ];
        snap.submittals = vec![
            submittal("s1", 1, SubmittalStatus::Approved, past),
            submittal("s2", 2, SubmittalStatus::ApprovedAsNoted, None),
            submittal("s3", 3, SubmittalStatus::UnderReview, past),
            submittal("s4", 4, SubmittalStatus::Rejected, past),
        ];
        snap.milestones = vec![
            milestone("m1", MilestoneStatus::Completed, past),
            milestone("m2", MilestoneStatus::Pending, past),
        ];

        let stats = WorkspaceStats::compute(&snap, today);
        assert_eq!((stats.rfi_open, stats.rfi_total), (2, 4));
        // Draft and Open are past due; Answered is terminal
        assert_eq!(stats.rfi_overdue, 2);
        assert_eq!((stats.submittal_approved, stats.submittal_total), (2, 4));
        assert_eq!(stats.submittal_overdue, 1);
        assert_eq!(
            (stats.milestone_completed, stats.milestone_total, stats.milestone_overdue),
            (1, 2, 1)
        );
    }

    #[test]
    fn compute_is_idempotent() {
        let mut snap = snapshot();
        snap.tasks = vec![task("t1", TaskStatus::NotStarted, Priority::Low, Some(day(2026, 1, 1)))];
        let today = day(2026, 3, 10);
        assert_eq!(
            WorkspaceStats::compute(&snap, today),
            WorkspaceStats::compute(&snap, today)
        );
    }
}
