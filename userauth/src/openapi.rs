//! OpenAPI documentation for the user API.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

use crate::{api, errors::FieldErrors};

/// Declares the `Authorization: Token <token>` scheme referenced by the profile endpoints.
struct TokenSecurityAddon;

impl Modify for TokenSecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "TokenAuth".to_string(),
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    "Authorization",
                    "Token authentication. Obtain a token from `POST /api/user/token` and send it as:\n\n\
                    ```\nAuthorization: Token YOUR_TOKEN\n```\n\n\
                    Obtaining a new token invalidates the previous one.",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "userauth", description = "User registration, token issuance and profile API"),
    modifiers(&TokenSecurityAddon),
    paths(
        api::handlers::users::create_user,
        api::handlers::users::get_me,
        api::handlers::users::put_me,
        api::handlers::users::patch_me,
        api::handlers::auth::obtain_token,
    ),
    components(schemas(
        api::models::users::UserRequest,
        api::models::users::UserResponse,
        api::models::auth::TokenRequest,
        api::models::auth::TokenResponse,
        FieldErrors,
    )),
    tags(
        (name = "users", description = "Registration and the authenticated user's profile"),
        (name = "authentication", description = "Token issuance"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document() {
        let doc = ApiDoc::openapi();

        for path in ["/api/user/create", "/api/user/token", "/api/user/me"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("TokenAuth"));
        assert!(components.schemas.contains_key("TokenResponse"));
    }
}
