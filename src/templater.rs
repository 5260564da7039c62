//! Message template rendering
//!
//! Pure string substitution, no I/O. Supported placeholders:
//! - `{first_name}` / `{last_name}` — replaced with the recipient's name
//!   fields, or the empty string when absent (never an error)
//! - `{datetime}` — the current local time at render time, so every
//!   recipient in a long-running campaign gets its own send timestamp
//!
//! Any other placeholder is left verbatim.

use crate::types::Recipient;

/// Format used for the `{datetime}` placeholder
const DATETIME_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Render a message template for one recipient.
pub fn render(template: &str, first_name: Option<&str>, last_name: Option<&str>) -> String {
    template
        .replace("{first_name}", first_name.unwrap_or(""))
        .replace("{last_name}", last_name.unwrap_or(""))
        .replace(
            "{datetime}",
            &chrono::Local::now().format(DATETIME_FORMAT).to_string(),
        )
}

/// Render a message template for a [`Recipient`].
pub fn render_for(template: &str, recipient: &Recipient) -> String {
    render(
        template,
        recipient.first_name.as_deref(),
        recipient.last_name.as_deref(),
    )
}
