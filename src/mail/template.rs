//! Notification formatting.
//!
//! Both bodies come from the same list of [`FieldRow`]s so that the rules for
//! optional fields and escaping live in one place.

use chrono::{DateTime, Utc};

use crate::mail::NotificationMessage;
use crate::models::Submission;

const HEADING: &str = "Nuova richiesta rivenditore Sobrio30";
const PLACEHOLDER: &str = "-";

/// One labelled value in the notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRow<'a> {
    pub label: &'static str,
    pub value: Option<&'a str>,
}

impl<'a> FieldRow<'a> {
    fn required(label: &'static str, value: &'a str) -> Self {
        Self {
            label,
            value: Some(value),
        }
    }

    fn optional(label: &'static str, value: Option<&'a str>) -> Self {
        Self { label, value }
    }
}

/// Operator-side routing for the notification
#[derive(Debug, Clone, Copy)]
pub struct Routing<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub subject_prefix: &'a str,
}

fn field_rows<'a>(submission: &'a Submission, received_at: &'a str) -> Vec<FieldRow<'a>> {
    vec![
        FieldRow::required("Tipo utente", submission.dealer_type.label()),
        FieldRow::required("Nome", &submission.name),
        FieldRow::required("Email", submission.email.as_str()),
        FieldRow::required("Telefono", &submission.phone),
        FieldRow::required("Indirizzo", &submission.address),
        FieldRow::optional("Nome attività", submission.activity_name.as_deref()),
        FieldRow::optional("Tipo attività", submission.activity_type.as_deref()),
        FieldRow::optional("Messaggio", submission.message.as_deref()),
        FieldRow::required("Data", received_at),
    ]
}

/// Plain text body. Absent values are shown as a dash.
pub fn render_text(rows: &[FieldRow<'_>]) -> String {
    let mut text = format!("{HEADING}\n\n");
    for row in rows {
        text.push_str(row.label);
        text.push_str(": ");
        text.push_str(row.value.unwrap_or(PLACEHOLDER));
        text.push('\n');
    }
    text
}

/// HTML body. Absent values produce no row at all.
pub fn render_html(rows: &[FieldRow<'_>]) -> String {
    let mut html = format!(
        "<h2>{HEADING}</h2>\n<table cellpadding=\"6\" style=\"border-collapse:collapse\">\n"
    );
    for row in rows {
        let Some(value) = row.value else {
            continue;
        };
        html.push_str(&format!(
            "<tr><th align=\"left\">{}</th><td>{}</td></tr>\n",
            escape_html(row.label),
            escape_html(value).replace('\n', "<br>")
        ));
    }
    html.push_str("</table>\n");
    html
}

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Build the operator notification for a validated submission
pub fn render_notification(
    submission: &Submission,
    routing: Routing<'_>,
    received_at: DateTime<Utc>,
) -> NotificationMessage {
    let timestamp = received_at.format("%d/%m/%Y %H:%M:%S UTC").to_string();
    let rows = field_rows(submission, &timestamp);

    NotificationMessage {
        from: routing.from.to_string(),
        to: routing.to.to_string(),
        reply_to: submission.email.to_string(),
        // header injection guard
        subject: format!("{} - {}", routing.subject_prefix, submission.name)
            .replace(['\r', '\n'], " "),
        text: render_text(&rows),
        html: render_html(&rows),
    }
}
