//! API request/response models for token issuance.

use super::validation::{self, TextInput};
use crate::errors::FieldErrors;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of `POST /api/user/token`
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct TokenRequest {
    #[schema(value_type = Option<String>, example = "alice@example.com")]
    pub email: TextInput,
    #[schema(value_type = Option<String>, write_only, example = "secret123")]
    pub password: TextInput,
}

impl TokenRequest {
    /// Presence checks only. Returns the normalised email and the verbatim password.
    pub fn validate(&self, errors: &mut FieldErrors) -> Option<(String, String)> {
        let email = validation::text_field(errors, "email", &self.email, true, true);
        let password = validation::text_field(errors, "password", &self.password, true, false);

        Some((validation::normalize_email(&email?), password?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    /// Send as `Authorization: Token <token>`
    #[schema(example = "9944b09199c62bcf9418ad846dd0e4bbdfc6ee4b")]
    pub token: String,
}
