//! Reminder rendering, the only place instants get human formatting.

use chrono::{DateTime, Utc};

/// Subject plus both body variants for one reminder email.
#[derive(Debug, Clone)]
pub struct RenderedReminder {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Render the reminder for a block from its description and interval.
pub fn render(
    description: &str,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
) -> RenderedReminder {
    let start = format_instant(starts_at);
    let end = format_instant(ends_at);
    let duration_minutes = (ends_at - starts_at).num_minutes();

    let subject = format!("Quiet Hours: \"{description}\" starts at {start}");

    let text = format!(
        "QUIET HOURS REMINDER\n\
         \n\
         Your study session is starting soon!\n\
         \n\
         Session:  {description}\n\
         Start:    {start}\n\
         End:      {end}\n\
         Duration: {duration_minutes} minutes\n\
         \n\
         Time to wrap up and prepare for your focused study session.\n\
         \n\
         --\n\
         Sent by Quiet Hours Scheduler"
    );

    let esc = escape_html(description);
    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
  <div style="text-align: center; margin-bottom: 30px;">
    <h1 style="color: #1e40af; font-size: 24px; margin: 0;">Quiet Hours Reminder</h1>
    <p style="color: #64748b; margin: 8px 0 0 0;">Your study session is starting soon!</p>
  </div>
  <div style="background-color: #f1f5f9; padding: 20px; border-radius: 6px; margin: 20px 0;">
    <p style="margin: 4px 0;"><strong>Session:</strong> {esc}</p>
    <p style="margin: 4px 0;"><strong>Start:</strong> {start}</p>
    <p style="margin: 4px 0;"><strong>End:</strong> {end}</p>
    <p style="margin: 4px 0;"><strong>Duration:</strong> {duration_minutes} minutes</p>
  </div>
  <div style="text-align: center; margin-top: 30px; color: #64748b; font-size: 14px;">
    <p>Sent by <strong>Quiet Hours Scheduler</strong></p>
  </div>
</div>"#
    );

    RenderedReminder {
        subject,
        html,
        text,
    }
}

/// Fixed display format, always UTC. Example: `Tue, Jan 16 at 09:55 UTC`.
fn format_instant(dt: DateTime<Utc>) -> String {
    dt.format("%a, %b %e at %H:%M UTC").to_string()
}

/// Minimal HTML escaping for user-supplied description text.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn subject_carries_description_and_start() {
        let r = render(
            "deep work",
            t("2024-01-16T09:55:00Z"),
            t("2024-01-16T11:25:00Z"),
        );
        assert_eq!(
            r.subject,
            "Quiet Hours: \"deep work\" starts at Tue, Jan 16 at 09:55 UTC"
        );
    }

    #[test]
    fn text_body_includes_duration() {
        let r = render(
            "deep work",
            t("2024-01-16T09:55:00Z"),
            t("2024-01-16T11:25:00Z"),
        );
        assert!(r.text.contains("Duration: 90 minutes"));
        assert!(r.text.contains("Session:  deep work"));
    }

    #[test]
    fn html_escapes_description() {
        let r = render(
            "<script>alert(1)</script>",
            t("2024-01-16T09:55:00Z"),
            t("2024-01-16T10:55:00Z"),
        );
        assert!(!r.html.contains("<script>"));
        assert!(r.html.contains("&lt;script&gt;"));
    }
}
