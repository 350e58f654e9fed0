// Create/edit payloads. A draft carries every user-editable field of an
// entity; inserts and full edits both take one.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::models::{
    Contact, MilestoneStatus, Priority, ProjectStatus, RfiStatus, SubmittalStatus, TaskStatus,
};

fn require(value: &str, message: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(message.to_string());
    }
    Ok(())
}

fn validate_contact(contact: Option<&Contact>) -> Result<(), String> {
    contact.map_or(Ok(()), Contact::validate)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectDraft {
    pub number: String,
    pub name: String,
    #[serde(default)]
    pub status: ProjectStatus,
    pub client_name: Option<String>,
    pub dealer_name: Option<String>,
    pub factory: Option<String>,
    pub contract_value_cents: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub target_completion_date: Option<NaiveDate>,
    pub description: Option<String>,
}

impl ProjectDraft {
    pub fn validate(&self) -> Result<(), String> {
        require(&self.number, "Project number is required")?;
        require(&self.name, "Project name is required")?;
        if self.contract_value_cents.is_some_and(|cents| cents < 0) {
            return Err("Contract value cannot be negative".to_string());
        }
        if let (Some(start), Some(end)) = (self.start_date, self.target_completion_date) {
            if end < start {
                return Err("Target completion precedes the start date".to_string());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    pub assignee: Option<Contact>,
    pub due_date: Option<NaiveDate>,
}

impl TaskDraft {
    pub fn validate(&self) -> Result<(), String> {
        require(&self.title, "Task title is required")?;
        validate_contact(self.assignee.as_ref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RfiDraft {
    pub subject: String,
    #[serde(default)]
    pub question: String,
    pub answer: Option<String>,
    #[serde(default)]
    pub status: RfiStatus,
    #[serde(default)]
    pub priority: Priority,
    pub recipient: Option<Contact>,
    pub due_date: Option<NaiveDate>,
}

impl RfiDraft {
    pub fn validate(&self) -> Result<(), String> {
        require(&self.subject, "RFI subject is required")?;
        if self.status != RfiStatus::Draft {
            require(&self.question, "An RFI must state its question once issued")?;
        }
        validate_contact(self.recipient.as_ref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmittalDraft {
    pub title: String,
    #[serde(default)]
    pub submittal_type: String,
    #[serde(default)]
    pub status: SubmittalStatus,
    /// Ignored on insert (new submittals start at revision 0). On edit, `None`
    /// keeps the stored revision.
    pub revision: Option<u32>,
    pub spec_section: Option<String>,
    pub manufacturer: Option<String>,
    pub reviewer: Option<Contact>,
    pub due_date: Option<NaiveDate>,
}

impl SubmittalDraft {
    pub fn validate(&self) -> Result<(), String> {
        require(&self.title, "Submittal title is required")?;
        validate_contact(self.reviewer.as_ref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MilestoneDraft {
    pub name: String,
    #[serde(default)]
    pub status: MilestoneStatus,
    pub due_date: Option<NaiveDate>,
}

impl MilestoneDraft {
    pub fn validate(&self) -> Result<(), String> {
        require(&self.name, "Milestone name is required")
    }
}

/// An uploaded file already written to storage, ready to be recorded.
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub id: String,
    pub file_name: String,
    pub storage_path: String,
    pub content_type: Option<String>,
    pub size_bytes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_titles_are_rejected() {
        let draft = TaskDraft {
            title: "   ".into(),
            ..TaskDraft::default()
        };
        assert_eq!(draft.validate().unwrap_err(), "Task title is required");
    }

    #[test]
    fn issued_rfi_needs_a_question() {
        let mut draft = RfiDraft {
            subject: "Footing depth".into(),
            ..RfiDraft::default()
        };
        assert!(draft.validate().is_ok());

        draft.status = RfiStatus::Open;
        assert!(draft.validate().is_err());

        draft.question = "Confirm footing depth at grid C4".into();
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn external_assignee_needs_an_email() {
        let draft = TaskDraft {
            title: "Order trusses".into(),
            assignee: Some(Contact::External {
                name: "Truss Co".into(),
                email: "not-an-email".into(),
            }),
            ..TaskDraft::default()
        };
        assert!(draft.validate().is_err());
    }

    #[test]
    fn project_schedule_must_run_forward() {
        let draft = ProjectDraft {
            number: "SNB-0002".into(),
            name: "Warehouse".into(),
            start_date: NaiveDate::from_ymd_opt(2026, 5, 1),
            target_completion_date: NaiveDate::from_ymd_opt(2026, 4, 1),
            ..ProjectDraft::default()
        };
        assert!(draft.validate().is_err());
    }

    #[test]
    fn draft_defaults_apply_when_fields_are_omitted() {
        let draft: SubmittalDraft =
            serde_json::from_value(serde_json::json!({ "title": "Door hardware" })).unwrap();
        assert_eq!(draft.status, SubmittalStatus::Pending);
        assert_eq!(draft.revision, None);
    }
}
