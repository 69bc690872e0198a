use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::core::error::LookupError;
use crate::types::{ErrorResponse, FlightQuery, FlightRecord};
use crate::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/track-flight/", get(welcome))
        .route("/track-flight/flight", get(track_flight_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "flight-scout",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn welcome() -> &'static str {
    "hello welcome to flight scraping"
}

async fn track_flight_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<FlightQuery>, QueryRejection>,
) -> Result<Json<FlightRecord>, (StatusCode, Json<ErrorResponse>)> {
    let Query(query) = query.map_err(|rejection| {
        error_response(LookupError::BadInput(rejection.body_text()))
    })?;
    info!(
        "Tracking flight {}{} on {}",
        query.airline_code, query.flight_number, query.departure_date
    );

    state
        .tracker
        .lookup(
            &query.airline_code,
            &query.flight_number,
            &query.departure_date,
        )
        .await
        .map(Json)
        .map_err(error_response)
}

fn error_response(e: LookupError) -> (StatusCode, Json<ErrorResponse>) {
    match &e {
        LookupError::BadInput(_) | LookupError::NotFound(_) => warn!("Lookup failed: {}", e),
        _ => error!("Lookup failed: {}", e),
    }
    (
        e.status_code(),
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}
