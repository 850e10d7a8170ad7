//! API request/response models for users.

use super::validation::{self, MAX_NAME_LENGTH, TextInput};
use crate::config::PasswordConfig;
use crate::db::models::users::UserDBResponse;
use crate::errors::FieldErrors;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of `POST /api/user/create` and `PUT|PATCH /api/user/me`.
///
/// Every field accepts any JSON value at the deserialisation level, so missing or mistyped
/// fields are reported as field errors rather than a rejected body. Registration and `PUT`
/// require all three.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct UserRequest {
    #[schema(value_type = Option<String>, example = "alice@example.com")]
    pub email: TextInput,
    /// Write-only; never returned
    #[schema(value_type = Option<String>, write_only, example = "secret123")]
    pub password: TextInput,
    #[schema(value_type = Option<String>, example = "Alice")]
    pub name: TextInput,
}

/// Validated fields of a [`UserRequest`].
///
/// When validated with `partial = false` and no errors were reported, all three are `Some`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFields {
    /// Normalised: domain part lowercased
    pub email: Option<String>,
    pub name: Option<String>,
    /// Plain text, to be hashed by the caller
    pub password: Option<String>,
}

impl UserRequest {
    /// Check every supplied field, collecting messages into `errors`.
    ///
    /// With `partial`, absent fields are skipped instead of reported as required.
    pub fn validate(&self, rules: &PasswordConfig, partial: bool, errors: &mut FieldErrors) -> UserFields {
        let required = !partial;

        let email = validation::email_field(errors, "email", &self.email, required);

        let name = validation::text_field(errors, "name", &self.name, required, true)
            .filter(|name| validation::check_length(errors, "name", name, None, MAX_NAME_LENGTH));

        // Passwords are taken verbatim: surrounding whitespace is part of the secret
        let password = validation::text_field(errors, "password", &self.password, required, false)
            .filter(|password| validation::check_length(errors, "password", password, Some(rules.min_length), rules.max_length));

        UserFields { email, name, password }
    }
}

/// Public representation of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[schema(example = "Alice")]
    pub name: String,
}

impl From<UserDBResponse> for UserResponse {
    fn from(db: UserDBResponse) -> Self {
        Self {
            email: db.email,
            name: db.name,
        }
    }
}
