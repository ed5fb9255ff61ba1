use crate::api::handlers::{chat, health};
use crate::types::{ChatRequest, UiMessage, UiPart};
use crate::utils::toml_config::ServerConfig;
use crate::AppState;
use axum::{
    http::HeaderValue,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;

/// OpenAPI document for the public endpoints
#[derive(OpenApi)]
#[openapi(
    info(title = "Deep Research Server", description = "Streaming chat and deep research API"),
    paths(chat::chat, health::health),
    components(schemas(ChatRequest, UiMessage, UiPart, health::HealthResponse)),
    tags(
        (name = "chat", description = "Chat and research streaming"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

/// Routes without state or middleware.
///
/// `/api/chat` is canonical; `/chat` and `/health` are kept at the root for
/// clients that do not use the `/api` prefix.
pub fn create_router() -> Router<AppState> {
    let api_routes = Router::new()
        .route("/chat", post(chat::chat))
        .route("/health", get(health::health))
        .route("/openapi.json", get(openapi_json));

    Router::new()
        .nest("/api", api_routes)
        .route("/chat", post(chat::chat))
        .route("/health", get(health::health))
}

/// Full application: routes, middleware and shared state
pub fn build_app(state: AppState) -> Router {
    let server = &state.config.server;
    let router = create_router();

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
        .layer(RequestBodyLimitLayer::new(server.body_limit_bytes))
        .layer(cors_layer(server))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
