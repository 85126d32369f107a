//! Response text rendering
//!
//! Templates come from the catalog entry named by the reply. The template is
//! picked with `message_count mod N`, so a conversation replayed from the
//! same inputs always reads the same.

use super::dispatch::NotificationFailure;
use crate::extract::Field;
use crate::intent::{tags, IntentCatalog};
use crate::session::Session;
use crate::state_machine::Reply;

const NAME_PLACEHOLDER: &str = "{name}";
const FALLBACK_RESPONSE: &str = "Sorry, I didn't understand. Could you rephrase?";

/// Appended when only the alert of the turn failed
pub const ALERT_ADVISORY: &str =
    "⚠️ Note: our alert system is slow to respond right now. Your request is saved and our team will confirm shortly.";

/// Appended when the record of the turn could not be confirmed as saved
pub const RECORD_ADVISORY: &str =
    "⚠️ Note: our records system did not respond just now, so our team may ask you to confirm these details again.";

/// Render the reply for a session that has already been updated for this turn
pub fn render(catalog: &IntentCatalog, reply: &Reply, session: &Session) -> String {
    let template = pick_template(catalog, reply.template_tag(), session.message_count);
    let first_name = first_name(session);

    let mut text = if template.contains(NAME_PLACEHOLDER) {
        template.replace(NAME_PLACEHOLDER, first_name.unwrap_or("there"))
    } else if let Some(name) = first_name {
        format!("Hi {name}! {template}")
    } else {
        template.to_string()
    };

    if let Reply::SymptomAdvice {
        category: Some(category),
    } = reply
    {
        text.push_str(&format!(
            "\n\n⚠️ Your message mentions signs of a possible {} emergency. If it is severe, call your local emergency number right away.",
            category.replace('_', " ")
        ));
    }

    if reply.confirms_details() {
        if let Some(summary) = details_summary(session) {
            text.push_str("\n\n");
            text.push_str(&summary);
        }
    }

    text
}

/// Suffix describing failed side effects, if any.
///
/// A failed or timed-out append means the record may be missing, so the
/// saved-request wording is only used when every append went through.
pub fn advisory(failures: &[NotificationFailure]) -> Option<&'static str> {
    if failures.iter().any(|f| f.effect == "append") {
        Some(RECORD_ADVISORY)
    } else if failures.is_empty() {
        None
    } else {
        Some(ALERT_ADVISORY)
    }
}

/// Text for an empty message; no session is involved
pub fn empty_message(catalog: &IntentCatalog) -> String {
    pick_template(catalog, tags::EMPTY_MESSAGE, 0).to_string()
}

fn pick_template<'a>(catalog: &'a IntentCatalog, tag: &str, message_count: u64) -> &'a str {
    let templates = [tag, tags::UNKNOWN]
        .iter()
        .filter_map(|t| catalog.get(t))
        .map(|d| d.responses.as_slice())
        .find(|r| !r.is_empty());

    match templates {
        Some(templates) => {
            let index = usize::try_from(message_count).unwrap_or(usize::MAX) % templates.len();
            &templates[index]
        }
        None => FALLBACK_RESPONSE,
    }
}

fn first_name(session: &Session) -> Option<&str> {
    session
        .collected
        .get(&Field::Name)
        .and_then(|name| name.split_whitespace().next())
}

/// Bulleted list of the known contact fields, if any
fn details_summary(session: &Session) -> Option<String> {
    let lines: Vec<String> = [Field::Name, Field::Phone, Field::Location]
        .into_iter()
        .filter_map(|field| {
            session
                .collected
                .get(&field)
                .map(|value| format!("• {}: {value}", field.label()))
        })
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(format!("Details we have:\n{}", lines.join("\n")))
    }
}
