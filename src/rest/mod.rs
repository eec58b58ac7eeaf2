//! HTTP adapter for the wizard.
//!
//! Step routes live under one prefix per locale (`/en`, `/fr`) and answer
//! with JSON step views, `303 See Other` redirects, or an [`error::ApiError`].
//! Catalog and reference endpoints live under `/api/v1`.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Extension, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::locale::Locale;

mod context;
pub mod dto;
pub mod error;
pub mod openapi;
pub mod routes;
pub mod session;
pub mod state;

pub use openapi::ApiDoc;
pub use state::{ApiState, Clock};

/// Wizard routes for one locale.
///
/// The third segment is either a flow-level step or a variant slug; route
/// parameters at one position share a name.
fn wizard_routes(state: &ApiState, locale: Locale) -> Router<ApiState> {
    Router::new()
        .route("/:kind/start", get(routes::steps::start))
        .route(
            "/:kind/:id/:segment",
            get(routes::steps::show_flow_step).post(routes::steps::submit_flow_step),
        )
        .route(
            "/:kind/:id/:segment/:step",
            get(routes::steps::show_step).post(routes::steps::submit_step),
        )
        // Child endpoints
        .route(
            "/:kind/:id/:segment/children/add",
            post(routes::children::add),
        )
        .route(
            "/:kind/:id/:segment/children/:child_id/remove",
            post(routes::children::remove),
        )
        .route(
            "/:kind/:id/:segment/children/:child_id/:step",
            get(routes::children::show_step).post(routes::children::submit_step),
        )
        .layer(Extension(locale))
        .layer(from_fn_with_state(state.clone(), session::session_layer))
}

/// Build the API router with all routes
pub fn build_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        // Health endpoints
        .route("/api/v1/health", get(routes::health::health))
        .route("/api/v1/status", get(routes::health::status))
        // Catalog endpoints
        .route("/api/v1/flows", get(routes::flows::list))
        .route(
            "/api/v1/flows/:kind/:variant",
            get(routes::flows::get_variant),
        )
        // Reference endpoints
        .route(
            "/api/v1/reference/countries",
            get(routes::reference::countries),
        )
        .route(
            "/api/v1/reference/countries/:country/provinces",
            get(routes::reference::provinces),
        )
        .route(
            "/api/v1/reference/programs/federal",
            get(routes::reference::federal_programs),
        )
        .route(
            "/api/v1/reference/programs/provincial/:province",
            get(routes::reference::provincial_programs),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    for locale in Locale::all() {
        router = router.nest(
            &format!("/{}", locale.slug()),
            wizard_routes(&state, *locale),
        );
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn serve(state: ApiState, addr: &str) -> Result<()> {
    let addr: SocketAddr = addr
        .parse()
        .with_context(|| format!("Invalid bind address '{}'", addr))?;
    let app = build_router(state);

    tracing::info!("Benefits flow listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
