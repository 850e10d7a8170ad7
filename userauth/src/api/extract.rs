//! Request body extraction with the API's error envelopes.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};

use crate::errors::Error;

/// JSON request body.
///
/// Same as [`axum::Json`], except that a rejected body is answered with an [`Error`], so clients
/// see the usual `{"detail": …}` or field-error bodies instead of axum's plain-text rejections.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(JsonBody(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::validation::TextInput;
    use axum::{
        body::Body,
        http::{self, StatusCode, header::CONTENT_TYPE},
    };
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Payload {
        name: TextInput,
    }

    fn request(content_type: Option<&str>, body: &'static str) -> Request {
        let mut builder = http::Request::builder().method("POST").uri("/");
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[tokio::test]
    async fn test_extracts_object() {
        let JsonBody(payload) = JsonBody::<Payload>::from_request(request(Some("application/json"), r#"{"name": "Alice"}"#), &())
            .await
            .unwrap();
        assert_eq!(payload.name, TextInput::Text("Alice".to_string()));
    }

    #[tokio::test]
    async fn test_rejections_map_to_api_errors() {
        let err = JsonBody::<Payload>::from_request(request(Some("application/json"), r#"{"name": "#), &())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.user_message().starts_with("JSON parse error"));

        let err = JsonBody::<Payload>::from_request(request(Some("application/json"), r#""Alice""#), &())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));

        let err = JsonBody::<Payload>::from_request(request(None, r#"{"name": "Alice"}"#), &())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }
}
