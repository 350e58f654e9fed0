// CSV export of workspace lists (RFC 4180, CRLF line endings)

use chrono::NaiveDate;

use crate::db::models::{Contact, Rfi, Submittal, Task};

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn push_record<I, S>(out: &mut String, fields: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let line = fields
        .into_iter()
        .map(|f| escape(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(&line);
    out.push_str("\r\n");
}

fn date(value: Option<NaiveDate>) -> String {
    value.map(|d| d.to_string()).unwrap_or_default()
}

fn contact(value: Option<&Contact>) -> String {
    match value {
        None => String::new(),
        Some(Contact::Internal { user_id }) => user_id.clone(),
        Some(Contact::External { name, email }) => format!("{name} <{email}>"),
    }
}

pub fn tasks_csv(tasks: &[Task]) -> String {
    let mut out = String::new();
    push_record(&mut out, ["Title", "Status", "Priority", "Assignee", "Due Date", "Description"]);
    for task in tasks {
        push_record(
            &mut out,
            [
                task.title.clone(),
                task.status.to_string(),
                task.priority.to_string(),
                contact(task.assignee.as_ref()),
                date(task.due_date),
                task.description.clone().unwrap_or_default(),
            ],
        );
    }
    out
}

pub fn rfis_csv(rfis: &[Rfi]) -> String {
    let mut out = String::new();
    push_record(
        &mut out,
        ["Number", "Subject", "Status", "Priority", "Recipient", "Due Date", "Question", "Answer"],
    );
    for rfi in rfis {
        push_record(
            &mut out,
            [
                format!("RFI-{:03}", rfi.number),
                rfi.subject.clone(),
                rfi.status.to_string(),
                rfi.priority.to_string(),
                contact(rfi.recipient.as_ref()),
                date(rfi.due_date),
                rfi.question.clone(),
                rfi.answer.clone().unwrap_or_default(),
            ],
        );
    }
    out
}

pub fn submittals_csv(submittals: &[Submittal]) -> String {
    let mut out = String::new();
    push_record(
        &mut out,
        [
            "Number",
            "Title",
            "Type",
            "Status",
            "Revision",
            "Spec Section",
            "Manufacturer",
            "Reviewer",
            "Due Date",
        ],
    );
    for s in submittals {
        push_record(
            &mut out,
            [
                format!("SUB-{:03}", s.number),
                s.title.clone(),
                s.submittal_type.clone(),
                s.status.to_string(),
                s.revision.to_string(),
                s.spec_section.clone().unwrap_or_default(),
                s.manufacturer.clone().unwrap_or_default(),
                contact(s.reviewer.as_ref()),
                date(s.due_date),
            ],
        );
    }
    out
}
