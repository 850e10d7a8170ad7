//! HTTP handlers for registration and the authenticated user's profile.

use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    api::{
        extract::JsonBody,
        models::{
            users::{UserFields, UserRequest, UserResponse},
            validation::EMAIL_TAKEN,
        },
    },
    auth::{
        current_user::CurrentUser,
        password::{self, Argon2Params},
    },
    db::{
        errors::DbError,
        models::users::{UserCreateDBRequest, UserUpdateDBRequest},
    },
    errors::{Error, FieldErrors},
    types::abbrev_uuid,
};

/// A unique violation on `users` can only be the email, so report it against that field.
fn email_conflict(err: DbError) -> Error {
    if err.is_unique_violation_on("users") {
        Error::Validation {
            errors: FieldErrors::single("email", EMAIL_TAKEN),
        }
    } else {
        err.into()
    }
}

/// Add the email-taken error if `email` belongs to a user other than `except`.
async fn check_email_available(
    state: &AppState,
    email: Option<&str>,
    except: Option<crate::types::UserId>,
    errors: &mut FieldErrors,
) -> Result<(), Error> {
    if let Some(email) = email
        && let Some(existing) = state.users.get_user_by_email(email).await?
        && Some(existing.id) != except
    {
        errors.add("email", EMAIL_TAKEN);
    }
    Ok(())
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/user/create",
    request_body = UserRequest,
    tag = "users",
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid input, keyed by field", body = FieldErrors),
        (status = 403, description = "Registration is disabled"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_user(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<UserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), Error> {
    if !state.config.auth.allow_registration {
        return Err(Error::PermissionDenied {
            message: "Registration is disabled.".to_string(),
            challenge: None,
        });
    }

    let rules = &state.config.auth.password;
    let mut errors = FieldErrors::new();
    let fields = request.validate(rules, false, &mut errors);
    check_email_available(&state, fields.email.as_deref(), None, &mut errors).await?;
    errors.into_result()?;

    let UserFields {
        email: Some(email),
        name: Some(name),
        password: Some(password),
    } = fields
    else {
        return Err(Error::Internal {
            operation: "read validated registration fields".to_string(),
        });
    };

    let password_hash = password::hash_password(password, Argon2Params::from(rules)).await?;
    let user = state
        .users
        .create_user(&UserCreateDBRequest::new(email, name, password_hash))
        .await
        .map_err(email_conflict)?;

    tracing::info!(user_id = %abbrev_uuid(&user.id), "Registered user");
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Get the authenticated user
#[utoipa::path(
    get,
    path = "/api/user/me",
    tag = "users",
    responses(
        (status = 200, description = "The authenticated user", body = UserResponse),
        (status = 401, description = "Missing or invalid credentials"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %abbrev_uuid(&current.user.id)))]
pub async fn get_me(current: CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from(current.user))
}

/// Replace the authenticated user's email, name and password
#[utoipa::path(
    put,
    path = "/api/user/me",
    request_body = UserRequest,
    tag = "users",
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 400, description = "Invalid input, keyed by field", body = FieldErrors),
        (status = 401, description = "Missing or invalid credentials"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %abbrev_uuid(&current.user.id)))]
pub async fn put_me(
    State(state): State<AppState>,
    current: CurrentUser,
    JsonBody(request): JsonBody<UserRequest>,
) -> Result<Json<UserResponse>, Error> {
    update_current_user(&state, &current, &request, false).await
}

/// Update some of the authenticated user's fields
#[utoipa::path(
    patch,
    path = "/api/user/me",
    request_body = UserRequest,
    tag = "users",
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 400, description = "Invalid input, keyed by field", body = FieldErrors),
        (status = 401, description = "Missing or invalid credentials"),
    ),
    security(("TokenAuth" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %abbrev_uuid(&current.user.id)))]
pub async fn patch_me(
    State(state): State<AppState>,
    current: CurrentUser,
    JsonBody(request): JsonBody<UserRequest>,
) -> Result<Json<UserResponse>, Error> {
    update_current_user(&state, &current, &request, true).await
}

async fn update_current_user(
    state: &AppState,
    current: &CurrentUser,
    request: &UserRequest,
    partial: bool,
) -> Result<Json<UserResponse>, Error> {
    let rules = &state.config.auth.password;
    let mut errors = FieldErrors::new();
    let fields = request.validate(rules, partial, &mut errors);
    check_email_available(state, fields.email.as_deref(), Some(current.user.id), &mut errors).await?;
    errors.into_result()?;

    let password_hash = match fields.password {
        Some(password) => Some(password::hash_password(password, Argon2Params::from(rules)).await?),
        None => None,
    };

    let update = UserUpdateDBRequest {
        email: fields.email,
        name: fields.name,
        password_hash,
    };
    if update.is_empty() {
        return Ok(Json(UserResponse::from(current.user.clone())));
    }

    let user = state
        .users
        .update_user(current.user.id, &update)
        .await
        .map_err(email_conflict)?;

    Ok(Json(UserResponse::from(user)))
}
