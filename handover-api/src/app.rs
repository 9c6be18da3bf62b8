//! Application state and router builder
//!
//! The router is generic over the handover backend, so the same routes run
//! on PostgreSQL in production and on the in-memory store in tests.
//!
//! # Example
//!
//! ```no_run
//! use handover_api::{app::{build_router, AppState}, config::Config};
//! use handover_shared::{db::pool::create_pool, store::postgres::PgHandoverDatabase};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let pool = create_pool(config.pool_config()).await?;
//! let state = AppState::new(PgHandoverDatabase::new(pool), config.api.clone());
//!
//! let app = build_router(state);
//! let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

use crate::{config::ApiConfig, routes};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use handover_shared::{
    service::{HandoverQueryService, HandoverService},
    store::HandoverDatabase,
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned per request by Axum's `State` extractor; every field is cheap to
/// clone.
#[derive(Clone)]
pub struct AppState<D> {
    /// Handover backend, used directly for health checks
    pub db: D,

    /// Create, update and delete
    pub handovers: HandoverService<D>,

    /// List and detail views
    pub queries: HandoverQueryService<D>,

    /// Listener and CORS settings
    pub config: Arc<ApiConfig>,
}

impl<D: HandoverDatabase> AppState<D> {
    pub fn new(db: D, config: ApiConfig) -> Self {
        Self {
            handovers: HandoverService::new(db.clone()),
            queries: HandoverQueryService::new(db.clone()),
            db,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET /health
/// └── /v1/
///     ├── POST   /handovers
///     ├── GET    /handovers/:id
///     ├── PUT    /handovers/:id
///     ├── DELETE /handovers/:id
///     ├── GET    /users/:user_id/handovers/sent?page&size
///     └── GET    /users/:user_id/handovers/received?page&size
/// ```
pub fn build_router<D: HandoverDatabase>(state: AppState<D>) -> Router {
    let v1_routes = Router::new()
        .route("/handovers", post(routes::handovers::create_handover::<D>))
        .route(
            "/handovers/:id",
            get(routes::handovers::get_handover::<D>)
                .put(routes::handovers::update_handover::<D>)
                .delete(routes::handovers::delete_handover::<D>),
        )
        .route(
            "/users/:user_id/handovers/sent",
            get(routes::handovers::list_sent::<D>),
        )
        .route(
            "/users/:user_id/handovers/received",
            get(routes::handovers::list_received::<D>),
        );

    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(routes::health::health_check::<D>))
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &ApiConfig) -> CorsLayer {
    if config.allows_any_origin() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}
