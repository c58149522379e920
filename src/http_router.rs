use crate::auth::{self, AuthGate};
use crate::capabilities::CapabilityRegistry;
use crate::mcp::NextcloudMcpService;
use axum::{
    Json, Router,
    extract::State,
    middleware,
    response::IntoResponse,
    routing::get,
};
use rmcp::model::Tool;
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use serde_json::json;
use std::sync::Arc;

/// Tool list with input schemas, for humans browsing the server
async fn tools_handler(State(tools): State<Arc<Vec<Tool>>>) -> impl IntoResponse {
    Json(json!({ "tools": tools.as_slice() }))
}

/// Build the HTTP surface: the MCP endpoint at `/mcp` behind the bearer
/// gate, and the ungated `/tools` listing
pub fn build_router(registry: Arc<CapabilityRegistry>, gate: AuthGate) -> Router {
    let session_registry = Arc::clone(&registry);
    let mcp = StreamableHttpService::new(
        move || Ok(NextcloudMcpService::new(Arc::clone(&session_registry))),
        Arc::new(LocalSessionManager::default()),
        Default::default(),
    );

    let tools = NextcloudMcpService::new(registry).tool_definitions();

    let gated = Router::new()
        .nest_service("/mcp", mcp)
        .layer(middleware::from_fn_with_state(gate, auth::require_bearer));

    Router::new()
        .route("/tools", get(tools_handler))
        .with_state(Arc::new(tools))
        .merge(gated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockClient;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::Value;
    use tower::ServiceExt;

    fn app(mock: Arc<MockClient>, token: Option<&str>) -> Router {
        let registry = Arc::new(CapabilityRegistry::new(mock));
        build_router(registry, AuthGate::new(token.map(String::from)))
    }

    fn initialize(token: Option<&str>) -> Request<Body> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {"name": "test", "version": "0.0.0"}
            }
        });
        let mut builder = Request::builder()
            .method("POST")
            .uri("/mcp")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json, text/event-stream");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_tools_listing_is_public() {
        let app = app(Arc::new(MockClient::new()), Some("s3cret"));
        let request = Request::builder().uri("/tools").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        let tools = body["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 31);
        assert!(
            tools
                .iter()
                .all(|t| t["name"].as_str().unwrap().starts_with("nc_"))
        );
    }

    #[tokio::test]
    async fn test_mcp_requires_token() {
        let mock = Arc::new(MockClient::new());
        let app = app(Arc::clone(&mock), Some("s3cret"));

        let response = app.clone().oneshot(initialize(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app.clone().oneshot(initialize(Some("nope"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app.oneshot(initialize(Some("s3cret"))).await.unwrap();
        assert_ne!(response.status(), StatusCode::UNAUTHORIZED);

        assert!(mock.calls().is_empty());
    }
}
