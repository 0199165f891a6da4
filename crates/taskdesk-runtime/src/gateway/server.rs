use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use taskdesk_core::{DeskConfig, DeskError, Store};

use super::auth::{auth_middleware, AuthConfig, AuthMiddleware, TokenIssuer};
use super::response::{RpcError, RpcResponse};
use super::rpc::{rpc_function_handler, rpc_handler, RpcHandler};
use super::session::{login_handler, session_handler, SessionState};
use super::tracing::tracing_middleware;
use crate::function::FunctionRegistry;

/// Gateway server configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for a whole HTTP request.
    pub request_timeout_secs: u64,
    /// Allowed CORS origins. Empty or `*` allows any origin.
    pub cors_origins: Vec<String>,
    /// Upper bound for a single function call.
    pub function_timeout_secs: u64,
    pub auth: AuthConfig,
}

impl GatewayConfig {
    /// Fails when no JWT secret is configured.
    pub fn from_config(config: &DeskConfig) -> taskdesk_core::Result<Self> {
        let jwt_secret = config.jwt_secret()?;
        Ok(Self {
            host: config.gateway.host.clone(),
            port: config.gateway.port,
            request_timeout_secs: config.gateway.request_timeout_secs,
            cors_origins: config.gateway.cors_origins.clone(),
            function_timeout_secs: config.function.timeout_secs,
            auth: AuthConfig::new(jwt_secret, config.security.auth.session_ttl_secs),
        })
    }

    pub fn addr(&self) -> taskdesk_core::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| DeskError::Config(format!("Invalid gateway address: {}", e)))
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Gateway HTTP server.
pub struct GatewayServer {
    config: GatewayConfig,
    registry: Arc<FunctionRegistry>,
    store: Arc<dyn Store>,
}

impl GatewayServer {
    pub fn new(config: GatewayConfig, registry: FunctionRegistry, store: Arc<dyn Store>) -> Self {
        Self {
            config,
            registry: Arc::new(registry),
            store,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Build the Axum router.
    pub fn router(&self) -> Router {
        let rpc_state = Arc::new(RpcHandler::new(
            self.registry.clone(),
            self.store.clone(),
            Duration::from_secs(self.config.function_timeout_secs),
        ));
        let session_state = SessionState {
            store: self.store.clone(),
            issuer: Arc::new(TokenIssuer::new(&self.config.auth)),
        };
        let auth_state = Arc::new(AuthMiddleware::new(&self.config.auth));
        let request_timeout = Duration::from_secs(self.config.request_timeout_secs);

        let rpc = Router::new()
            .route("/rpc", post(rpc_handler))
            .route("/rpc/{function}", post(rpc_function_handler))
            .with_state(rpc_state);

        let session = Router::new()
            .route("/auth/login", post(login_handler))
            .route("/auth/session", get(session_handler))
            .with_state(session_state);

        Router::new()
            .route("/health", get(health_handler))
            .merge(rpc)
            .merge(session)
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(self.cors_layer())
                    .layer(middleware::from_fn(tracing_middleware))
                    .layer(middleware::from_fn_with_state(auth_state, auth_middleware))
                    .layer(middleware::from_fn_with_state(
                        request_timeout,
                        timeout_middleware,
                    )),
            )
    }

    fn cors_layer(&self) -> CorsLayer {
        let origins = &self.config.cors_origins;
        let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            layer.allow_origin(Any)
        } else {
            let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            layer.allow_origin(origins)
        }
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn run_until<F>(self, shutdown: F) -> taskdesk_core::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.addr()?;
        let router = self.router();

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(%addr, functions = self.registry.len(), "Gateway listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Gateway stopped");
        Ok(())
    }
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn timeout_middleware(State(limit): State<Duration>, req: Request, next: Next) -> Response {
    match tokio::time::timeout(limit, next.run(req)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(timeout_secs = limit.as_secs(), "Request timed out");
            RpcResponse::error(RpcError::timeout(format!(
                "Request timed out after {}s",
                limit.as_secs()
            )))
            .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use taskdesk_core::model::Role;
    use taskdesk_core::testing::seed_user;
    use taskdesk_core::MemoryStore;
    use tower::ServiceExt;

    use crate::function::register_all;
    use crate::gateway::tracing::TRACE_ID_HEADER;

    const SECRET: &str = "gateway-test-secret";

    fn config() -> GatewayConfig {
        GatewayConfig {
            host: "127.0.0.1".into(),
            port: 0,
            request_timeout_secs: 5,
            cors_origins: Vec::new(),
            function_timeout_secs: 5,
            auth: AuthConfig::new(SECRET, 3600),
        }
    }

    fn app(store: Arc<MemoryStore>) -> Router {
        let mut registry = FunctionRegistry::new();
        register_all(&mut registry);
        GatewayServer::new(config(), registry, store).router()
    }

    fn post_json(uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn login(app: &Router, email: &str, password: &str) -> String {
        let (status, body) = send(
            app,
            post_json("/auth/login", json!({"email": email, "password": password}), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["data"]["token"].as_str().unwrap().to_string()
    }

    fn registration(email: &str) -> Value {
        json!({
            "email": email,
            "password": "long-enough-password",
            "firstName": "Ada",
            "lastName": "Lovelace",
        })
    }

    #[test]
    fn test_from_config_requires_secret() {
        let mut desk = DeskConfig::default_with_database_url("postgres://localhost/taskdesk");
        desk.security.auth.jwt_secret = None;
        assert!(GatewayConfig::from_config(&desk).is_err());

        desk.security.auth.jwt_secret = Some("s3cret".into());
        desk.gateway.port = 9100;
        let config = GatewayConfig::from_config(&desk).unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.auth.jwt_secret, "s3cret");
    }

    #[tokio::test]
    async fn test_health_echoes_trace_id() {
        let app = app(Arc::new(MemoryStore::new()));
        let response = app
            .oneshot(
                Request::get("/health")
                    .header(TRACE_ID_HEADER, "trace-abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[TRACE_ID_HEADER], "trace-abc");
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_register_login_and_call() {
        let app = app(Arc::new(MemoryStore::new()));

        let (status, body) = send(
            &app,
            post_json("/rpc/register", registration("ada@example.com"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["success"], true);

        let token = login(&app, "ada@example.com", "long-enough-password").await;

        let (status, body) = send(
            &app,
            post_json(
                "/rpc",
                json!({"function": "list_tickets", "args": {}}),
                Some(&token),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["success"], true);

        let response = app
            .clone()
            .oneshot(
                Request::get("/auth/session")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let session: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(session["data"]["email"], "ada@example.com");
        assert_eq!(session["data"]["roles"], json!(["USER"]));
    }

    #[tokio::test]
    async fn test_duplicate_registration_is_conflict() {
        let app = app(Arc::new(MemoryStore::new()));
        send(&app, post_json("/rpc/register", registration("dup@example.com"), None)).await;

        let (status, body) = send(
            &app,
            post_json("/rpc/register", registration("dup@example.com"), None),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_protected_call_without_token() {
        let app = app(Arc::new(MemoryStore::new()));
        let (status, body) = send(&app, post_json("/rpc/list_projects", json!({}), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_admin_function_forbidden_for_user() {
        let store = Arc::new(MemoryStore::new());
        let app = app(store.clone());
        send(&app, post_json("/rpc/register", registration("member@example.com"), None)).await;
        let token = login(&app, "member@example.com", "long-enough-password").await;

        let (status, body) = send(
            &app,
            post_json(
                "/rpc/create_project",
                json!({"title": "Apollo", "description": "Moonshot"}),
                Some(&token),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "FORBIDDEN");
        assert!(store.list_projects().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_anonymous_admin_call_never_touches_the_store() {
        let store = Arc::new(MemoryStore::new());
        let app = app(store.clone());
        let accesses = store.access_count();

        let (status, _) = send(
            &app,
            post_json("/rpc/delete_user", json!({"id": uuid::Uuid::new_v4()}), None),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(store.access_count(), accesses);
    }

    #[tokio::test]
    async fn test_bad_login_is_unauthorized() {
        let store = Arc::new(MemoryStore::new());
        seed_user(store.as_ref(), "Grace", Role::User).await.unwrap();
        let app = app(store);

        let (status, body) = send(
            &app,
            post_json(
                "/auth/login",
                json!({"email": "nobody@example.com", "password": "whatever"}),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["message"], "Invalid email or password");
    }

    #[tokio::test]
    async fn test_malformed_body_is_validation_error() {
        let app = app(Arc::new(MemoryStore::new()));
        let req = Request::post("/rpc/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }
}
