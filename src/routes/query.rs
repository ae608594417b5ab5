use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::Method,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::{
    config::MAX_MESSAGE_LEN,
    error::AppError,
    models::AnalysisResponse,
    services::analysis,
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/api/query", post(run_query))
        .route("/api/debug", get(debug_status))
        .layer(cors)
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    message: String,
}

#[derive(Debug, Serialize)]
struct DebugResponse {
    status: &'static str,
    api_key_configured: bool,
    api_key_preview: String,
    sample_data_rows: usize,
    test_llm: &'static str,
}

fn validate_message(message: &str) -> Result<(), AppError> {
    if message.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "message: this field may not be blank".to_string(),
        ));
    }
    if message.chars().count() > MAX_MESSAGE_LEN {
        return Err(AppError::InvalidInput(format!(
            "message: ensure this field has no more than {} characters",
            MAX_MESSAGE_LEN
        )));
    }
    Ok(())
}

#[axum::debug_handler]
async fn run_query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<AnalysisResponse>, AppError> {
    let start = std::time::Instant::now();

    // A body that fails extraction (missing field, wrong type, bad JSON) is
    // a validation error, not a 422.
    let Json(request) = payload.map_err(|rejection| AppError::InvalidInput(rejection.body_text()))?;
    validate_message(&request.message)?;

    let result = analysis::analyze_query(&state.dataset, &state.summarizer, &request.message).await;
    tracing::info!("Query analyzed in {:?}", start.elapsed());

    Ok(Json(result))
}

/// Reports remote-credential configuration and a sample row count, for
/// checking the deployment without sending a real query.
#[axum::debug_handler]
async fn debug_status(State(state): State<Arc<AppState>>) -> Json<DebugResponse> {
    let configured = state.summarizer.is_configured();

    Json(DebugResponse {
        status: "OK",
        api_key_configured: configured,
        api_key_preview: state.summarizer.key_preview(),
        sample_data_rows: state.dataset.rows_for_area("Akurdi").len(),
        test_llm: if configured { "Available" } else { "Not Available" },
    })
}
