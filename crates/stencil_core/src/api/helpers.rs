//! Small presentation helpers shared by view handlers.

use serde_json::{json, Value};

/// Turns a slug into a title for display: `in_progress` -> `In Progress`.
///
/// Every letter that follows a non-letter starts a new word.
pub fn display_name_for_slug(slug: &str) -> String {
    let mut display = String::with_capacity(slug.len());
    let mut word_start = true;
    for ch in slug.replace('_', " ").chars() {
        if ch.is_alphabetic() {
            if word_start {
                display.extend(ch.to_uppercase());
            } else {
                display.extend(ch.to_lowercase());
            }
            word_start = false;
        } else {
            display.push(ch);
            word_start = true;
        }
    }
    display
}

/// `["active"]` -> `[{"id": "active", "identity": "Active"}]`.
pub fn choices_for_meta(choices: &[&str]) -> Value {
    Value::Array(
        choices
            .iter()
            .map(|choice| json!({ "id": choice, "identity": display_name_for_slug(choice) }))
            .collect(),
    )
}

/// First value that is present and non-empty.
pub fn get_first_of<'a, I>(values: I) -> Option<&'a str>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    values
        .into_iter()
        .flatten()
        .find(|value| !value.is_empty())
}
