use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A status or priority string that is not part of the canonical label set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct UnknownLabel {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a closed set of display labels shared by the database, the JSON
/// API and the CSV export.
macro_rules! labeled_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub const fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownLabel;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok($name::$variant),)+
                    other => Err(UnknownLabel {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

labeled_enum!(ProjectStatus {
    #[default]
    Planning => "Planning",
    PrePm => "Pre-PM",
    PmHandoff => "PM Handoff",
    InProgress => "In Progress",
    OnHold => "On Hold",
    Completed => "Completed",
    Cancelled => "Cancelled",
    Warranty => "Warranty",
});

labeled_enum!(
    /// Canonical task workflow. Legacy `On Hold` rows are migrated to
    /// `Awaiting Response`.
    TaskStatus {
        #[default]
        NotStarted => "Not Started",
        InProgress => "In Progress",
        AwaitingResponse => "Awaiting Response",
        Completed => "Completed",
        Cancelled => "Cancelled",
    }
);

labeled_enum!(Priority {
    Low => "Low",
    #[default]
    Medium => "Medium",
    High => "High",
    Critical => "Critical",
});

labeled_enum!(RfiStatus {
    #[default]
    Draft => "Draft",
    Open => "Open",
    Pending => "Pending",
    Answered => "Answered",
    Closed => "Closed",
});

labeled_enum!(SubmittalStatus {
    #[default]
    Pending => "Pending",
    Submitted => "Submitted",
    UnderReview => "Under Review",
    Approved => "Approved",
    ApprovedAsNoted => "Approved as Noted",
    ReviseAndResubmit => "Revise and Resubmit",
    Rejected => "Rejected",
});

labeled_enum!(MilestoneStatus {
    #[default]
    Pending => "Pending",
    InProgress => "In Progress",
    Completed => "Completed",
});

impl Priority {
    /// Sort weight, highest urgency first.
    pub fn rank(self) -> u8 {
        match self {
            Priority::Critical => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }
}

/// Who a task is assigned to, or who an RFI or submittal is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Contact {
    /// A member of the project team.
    Internal { user_id: String },
    /// Someone outside the organisation, reached by email.
    External { name: String, email: String },
}

/// Flattened column form of an optional [`Contact`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactColumns {
    pub is_external: bool,
    pub user_id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl Contact {
    pub fn to_columns(contact: Option<&Contact>) -> ContactColumns {
        match contact {
            None => ContactColumns::default(),
            Some(Contact::Internal { user_id }) => ContactColumns {
                is_external: false,
                user_id: Some(user_id.clone()),
                ..ContactColumns::default()
            },
            Some(Contact::External { name, email }) => ContactColumns {
                is_external: true,
                user_id: None,
                name: Some(name.clone()),
                email: Some(email.clone()),
            },
        }
    }

    /// Rebuilds the sum type from stored columns. The flag decides which half
    /// is meaningful; the other half is ignored.
    pub fn from_columns(columns: ContactColumns) -> Result<Option<Contact>, String> {
        if columns.is_external {
            match (columns.name, columns.email) {
                (Some(name), Some(email)) if !name.is_empty() && !email.is_empty() => {
                    Ok(Some(Contact::External { name, email }))
                }
                _ => Err("external contact is missing a name or email".to_string()),
            }
        } else {
            Ok(columns
                .user_id
                .filter(|id| !id.is_empty())
                .map(|user_id| Contact::Internal { user_id }))
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            Contact::Internal { user_id } => {
                if user_id.trim().is_empty() {
                    return Err("Internal contact requires a user id".to_string());
                }
            }
            Contact::External { name, email } => {
                if name.trim().is_empty() {
                    return Err("External contact requires a name".to_string());
                }
                if !email.contains('@') {
                    return Err("External contact requires a valid email".to_string());
                }
            }
        }
        Ok(())
    }

    pub fn display_name(&self) -> &str {
        match self {
            Contact::Internal { user_id } => user_id,
            Contact::External { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub number: String,
    pub name: String,
    pub status: ProjectStatus,
    pub client_name: Option<String>,
    pub dealer_name: Option<String>,
    pub factory: Option<String>,
    pub contract_value_cents: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub target_completion_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub assignee: Option<Contact>,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub rfi_id: String,
    pub file_name: String,
    pub storage_path: String,
    pub content_type: Option<String>,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rfi {
    pub id: String,
    pub project_id: String,
    pub number: i64,
    pub subject: String,
    pub question: String,
    pub answer: Option<String>,
    pub status: RfiStatus,
    pub priority: Priority,
    pub recipient: Option<Contact>,
    pub due_date: Option<NaiveDate>,
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submittal {
    pub id: String,
    pub project_id: String,
    pub number: i64,
    pub title: String,
    pub submittal_type: String,
    pub status: SubmittalStatus,
    pub revision: u32,
    pub spec_section: Option<String>,
    pub manufacturer: Option<String>,
    pub reviewer: Option<Contact>,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub status: MilestoneStatus,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
