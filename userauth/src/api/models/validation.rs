//! Field validation shared by the request models.
//!
//! Validators push messages into a [`FieldErrors`] instead of returning early, so a request
//! reports every problem at once.

use crate::errors::FieldErrors;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const REQUIRED: &str = "This field is required.";
pub const NULL: &str = "This field may not be null.";
pub const NOT_A_STRING: &str = "Not a valid string.";
pub const BLANK: &str = "This field may not be blank.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const EMAIL_TAKEN: &str = "user with this email already exists.";

pub const MAX_EMAIL_LENGTH: usize = 255;
pub const MAX_NAME_LENGTH: usize = 255;

/// A text field as it arrived in the request body.
///
/// Deserialising never fails, so a value of the wrong JSON type is reported against its own field
/// instead of rejecting the whole body. Structs holding these need `#[serde(default)]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TextInput {
    #[default]
    Missing,
    Null,
    Text(String),
    /// Any JSON value other than a string or null
    Invalid,
}

impl<'de> Deserialize<'de> for TextInput {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Null => TextInput::Null,
            serde_json::Value::String(text) => TextInput::Text(text),
            _ => TextInput::Invalid,
        })
    }
}

impl Serialize for TextInput {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            TextInput::Text(text) => serializer.serialize_str(text),
            _ => serializer.serialize_none(),
        }
    }
}

impl From<&str> for TextInput {
    fn from(text: &str) -> Self {
        TextInput::Text(text.to_string())
    }
}

impl From<Option<&str>> for TextInput {
    fn from(text: Option<&str>) -> Self {
        text.map_or(TextInput::Missing, TextInput::from)
    }
}

pub fn max_length_message(max: usize) -> String {
    format!("Ensure this field has no more than {max} characters.")
}

pub fn min_length_message(min: usize) -> String {
    format!("Ensure this field has at least {min} characters.")
}

/// Presence, type and blankness of a text field.
///
/// Returns the (optionally trimmed) value when it passes. An absent optional field yields `None`
/// with no error; an explicit `null` is always an error.
pub fn text_field(errors: &mut FieldErrors, field: &str, value: &TextInput, required: bool, trim: bool) -> Option<String> {
    let value = match value {
        TextInput::Text(text) => text.as_str(),
        TextInput::Missing => {
            if required {
                errors.add(field, REQUIRED);
            }
            return None;
        }
        TextInput::Null => {
            errors.add(field, NULL);
            return None;
        }
        TextInput::Invalid => {
            errors.add(field, NOT_A_STRING);
            return None;
        }
    };

    let value = if trim { value.trim() } else { value };
    if value.is_empty() {
        errors.add(field, BLANK);
        return None;
    }
    Some(value.to_string())
}

/// Length bounds, counted in characters. Returns whether the value is within them.
pub fn check_length(errors: &mut FieldErrors, field: &str, value: &str, min: Option<usize>, max: usize) -> bool {
    let length = value.chars().count();
    let mut ok = true;
    if let Some(min) = min
        && length < min
    {
        errors.add(field, min_length_message(min));
        ok = false;
    }
    if length > max {
        errors.add(field, max_length_message(max));
        ok = false;
    }
    ok
}

/// Lowercase the domain part; the local part is left alone.
pub fn normalize_email(email: &str) -> String {
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// Syntax check for `local@domain`.
///
/// The local part must be a dot-atom. The domain is either `localhost` or dot-separated labels
/// of letters, digits and inner hyphens, ending in a top-level label of at least two characters.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    is_dot_atom(local) && is_valid_domain(domain)
}

fn is_dot_atom(local: &str) -> bool {
    const SPECIALS: &str = "!#$%&'*+/=?^_`{|}~-";
    !local.is_empty()
        && local
            .split('.')
            .all(|atom| !atom.is_empty() && atom.chars().all(|c| c.is_ascii_alphanumeric() || SPECIALS.contains(c)))
}

fn is_valid_domain(domain: &str) -> bool {
    if domain.eq_ignore_ascii_case("localhost") {
        return true;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    let Some((tld, rest)) = labels.split_last() else {
        return false;
    };
    if rest.is_empty() {
        return false;
    }

    let valid_label = |label: &str| {
        (1..=63).contains(&label.len())
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    };
    rest.iter().all(|label| valid_label(label)) && tld.len() >= 2 && valid_label(tld)
}

/// Validate an email field: presence, syntax and length. Returns the normalised address.
pub fn email_field(errors: &mut FieldErrors, field: &str, value: &TextInput, required: bool) -> Option<String> {
    let email = text_field(errors, field, value, required, true)?;

    let mut valid = true;
    if !is_valid_email(&email) {
        errors.add(field, INVALID_EMAIL);
        valid = false;
    }
    if email.chars().count() > MAX_EMAIL_LENGTH {
        errors.add(field, max_length_message(MAX_EMAIL_LENGTH));
        valid = false;
    }
    valid.then(|| normalize_email(&email))
}
