//! Static bearer-token gate for the HTTP transport.

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::sync::Arc;

/// Client id attached to every accepted call
pub const CLIENT_ID: &str = "guest-user";

/// Scopes granted to every accepted call
pub const GRANTED_SCOPES: &[&str] = &["read:data"];

/// Scopes a call needs before it may reach a tool
const REQUIRED_SCOPES: &[&str] = &["read:data"];

/// Identity of an accepted caller, stored in the request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub client_id: &'static str,
    pub scopes: &'static [&'static str],
}

impl Grant {
    fn guest() -> Self {
        Self {
            client_id: CLIENT_ID,
            scopes: GRANTED_SCOPES,
        }
    }

    pub fn has_scopes(&self, required: &[&str]) -> bool {
        required.iter().all(|r| self.scopes.contains(r))
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid bearer token")]
    InvalidToken,

    #[error("token lacks required scope")]
    InsufficientScope,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match self {
            AuthError::MissingToken | AuthError::InvalidToken => {
                (StatusCode::UNAUTHORIZED, "invalid_token")
            }
            AuthError::InsufficientScope => (StatusCode::FORBIDDEN, "insufficient_scope"),
        };
        let mut response = (
            status,
            Json(json!({ "error": code, "error_description": self.to_string() })),
        )
            .into_response();
        response.headers_mut().insert(
            header::WWW_AUTHENTICATE,
            HeaderValue::from_static("Bearer"),
        );
        response
    }
}

/// Accepts every caller when no token is configured, otherwise exactly
/// the configured token
#[derive(Clone, Default)]
pub struct AuthGate {
    token: Option<Arc<str>>,
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl AuthGate {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.map(Arc::from),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.token.is_some()
    }

    /// Check an `Authorization` header value
    pub fn verify(&self, authorization: Option<&str>) -> Result<Grant, AuthError> {
        let Some(expected) = self.token.as_deref() else {
            return Ok(Grant::guest());
        };

        let presented = authorization
            .and_then(|value| {
                let (scheme, token) = value.trim().split_once(' ')?;
                scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
            })
            .ok_or(AuthError::MissingToken)?;

        if !constant_time_eq(presented.as_bytes(), expected.as_bytes()) {
            return Err(AuthError::InvalidToken);
        }

        let grant = Grant::guest();
        if !grant.has_scopes(REQUIRED_SCOPES) {
            return Err(AuthError::InsufficientScope);
        }
        Ok(grant)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// axum middleware rejecting calls that fail [`AuthGate::verify`]
pub async fn require_bearer(
    State(gate): State<AuthGate>,
    mut request: Request,
    next: Next,
) -> Response {
    let verdict = gate.verify(
        request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok()),
    );

    match verdict {
        Ok(grant) => {
            request.extensions_mut().insert(grant);
            next.run(request).await
        }
        Err(err) => {
            tracing::warn!(path = %request.uri().path(), "rejected request: {err}");
            err.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RemoteClient;
    use crate::client::mock::MockClient;
    use axum::{Router, body::Body, middleware, routing::post};
    use tower::ServiceExt;

    #[test]
    fn test_verify_without_token_accepts_everyone() {
        let gate = AuthGate::new(None);
        assert!(!gate.is_enabled());
        assert_eq!(gate.verify(None).unwrap().client_id, CLIENT_ID);
        assert!(gate.verify(Some("Bearer whatever")).is_ok());
    }

    #[test]
    fn test_verify_with_token() {
        let gate = AuthGate::new(Some("s3cret".into()));
        assert_eq!(gate.verify(None), Err(AuthError::MissingToken));
        assert_eq!(gate.verify(Some("Basic s3cret")), Err(AuthError::MissingToken));
        assert_eq!(gate.verify(Some("Bearer s3cre")), Err(AuthError::InvalidToken));
        assert_eq!(gate.verify(Some("Bearer S3CRET")), Err(AuthError::InvalidToken));

        let grant = gate.verify(Some("bearer s3cret")).unwrap();
        assert_eq!(grant.client_id, "guest-user");
        assert_eq!(grant.scopes, &["read:data"]);
        assert!(grant.has_scopes(&["read:data"]));
        assert!(!grant.has_scopes(&["write:data"]));
    }

    #[test]
    fn test_debug_hides_token() {
        let gate = AuthGate::new(Some("s3cret".into()));
        assert!(!format!("{gate:?}").contains("s3cret"));
    }

    /// Router whose only handler calls the mock client, standing in for a tool
    fn gated_app(gate: AuthGate, mock: Arc<MockClient>) -> Router {
        Router::new()
            .route(
                "/mcp",
                post(move || {
                    let mock = Arc::clone(&mock);
                    async move {
                        let _ = mock.notes().list_notes().await;
                        StatusCode::OK
                    }
                }),
            )
            .layer(middleware::from_fn_with_state(gate, require_bearer))
    }

    fn call(token: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().method("POST").uri("/mcp");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_rejected_calls_never_reach_the_client() {
        let mock = Arc::new(MockClient::new());
        let app = gated_app(AuthGate::new(Some("s3cret".into())), Arc::clone(&mock));

        let response = app.clone().oneshot(call(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");

        let response = app.clone().oneshot(call(Some("wrong"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(mock.calls().is_empty());

        let response = app.oneshot(call(Some("s3cret"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_no_token_configured_means_no_challenge() {
        let mock = Arc::new(MockClient::new());
        let app = gated_app(AuthGate::new(None), Arc::clone(&mock));

        let response = app.clone().oneshot(call(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let response = app.oneshot(call(Some("anything"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(mock.calls().len(), 2);
    }
}
