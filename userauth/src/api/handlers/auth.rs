//! HTTP handler for token issuance.

use axum::{Json, extract::State};

use crate::{
    AppState,
    api::{
        extract::JsonBody,
        models::auth::{TokenRequest, TokenResponse},
    },
    auth::issuance::TokenIssuer,
    errors::{Error, FieldErrors},
};

/// Exchange an email and password for an API token.
///
/// Every successful call replaces the user's previous token, which stops authenticating.
#[utoipa::path(
    post,
    path = "/api/user/token",
    request_body = TokenRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Missing fields, or credentials rejected (`non_field_errors`)", body = FieldErrors),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn obtain_token(State(state): State<AppState>, JsonBody(request): JsonBody<TokenRequest>) -> Result<Json<TokenResponse>, Error> {
    let mut errors = FieldErrors::new();
    let credentials = request.validate(&mut errors);
    errors.into_result()?;
    let Some((email, password)) = credentials else {
        return Err(Error::Internal {
            operation: "read validated login fields".to_string(),
        });
    };

    let session = TokenIssuer::from_state(&state).obtain(&email, &password).await?;
    Ok(Json(TokenResponse { token: session.token }))
}
