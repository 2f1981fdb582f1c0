use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderValue, Request, StatusCode},
    middleware::{Next, from_fn},
    response::Json,
    routing::{get, post},
};
use medprofile_core::{
    DrugProfile, Enricher, InsightEngine, InsightError, Normalizer, StoreError,
};
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info, warn};
use uuid::Uuid;

use crate::data::{Stores, stores_from_env};
use crate::llm::summarize_insights;
use crate::models::{InsightRequest, InsightResponse};

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;
type ApiError = (StatusCode, Json<Value>);

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn not_found_error(message: &str, input: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": message,
            "input": input
        })),
    )
}

fn internal_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": message,
            "details": details
        })),
    )
}

fn service_unavailable_error(message: &str) -> ApiError {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "error": message })),
    )
}

fn map_insight_error(err: InsightError) -> ApiError {
    match &err {
        InsightError::EmptyQuery | InsightError::TooManyDrugs { .. } => {
            bad_request_error(&err.to_string())
        }
        InsightError::ServiceUnavailable { .. } => service_unavailable_error(&err.to_string()),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub engine: InsightEngine,
    pub normalizer: Normalizer,
    pub enricher: Enricher,
}

impl AppState {
    pub fn from_stores(stores: Stores) -> Self {
        let normalizer = Normalizer::new(stores.names);
        let enricher = Enricher::new(stores.classifications, stores.labels);
        let engine = InsightEngine::new(
            normalizer.clone(),
            enricher.clone(),
            stores.interactions,
            stores.alternatives,
        );

        Self {
            engine,
            normalizer,
            enricher,
        }
    }
}

pub async fn create_app() -> anyhow::Result<Router> {
    let stores = stores_from_env().await?;
    Ok(build_router(AppState::from_stores(stores)))
}

/// Middleware to add correlation ID to all requests
async fn correlation_id_middleware(
    mut request: Request<axum::body::Body>,
    next: Next,
) -> axum::response::Response {
    let correlation_id = Uuid::new_v4().to_string();

    if let Ok(header_value) = HeaderValue::from_str(&correlation_id) {
        request.headers_mut().insert("x-correlation-id", header_value);
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    next.run(request).instrument(span).await
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/drugs/{name}", get(get_drug_profile))
        .route("/insights", post(get_insights))
        .layer(from_fn(correlation_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "MedProfile Insight Service",
        "version": "0.3.0",
        "description": "Medication profile aggregation with alternatives and interaction insights",
        "endpoints": {
            "GET /drugs/{name}": "Aggregated profile for a single drug name",
            "POST /insights": "Profiles plus alternatives (one drug) or pairwise interactions (several)",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn get_drug_profile(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<DrugProfile> {
    info!(input = %name, "profile request");

    let drug = match state.normalizer.normalize(&name).await {
        Ok(Some(drug)) => drug,
        Ok(None) => return Err(not_found_error("Drug not recognized", &name)),
        Err(StoreError::Unavailable { reason }) => {
            error!(input = %name, %reason, "name store unavailable");
            return Err(service_unavailable_error("Name lookup store unavailable"));
        }
        Err(err) => {
            error!(input = %name, error = %err, "name lookup failed");
            return Err(internal_error("Name lookup failed", &err.to_string()));
        }
    };

    Ok(Json(state.enricher.enrich(drug).await))
}

async fn get_insights(
    State(state): State<AppState>,
    Json(request): Json<InsightRequest>,
) -> ApiResult<InsightResponse> {
    info!(inputs = request.drugs.len(), summarize = request.summarize, "insight request");

    let result = state
        .engine
        .get_insights(&request.drugs)
        .await
        .map_err(map_insight_error)?;

    let summary = if request.summarize {
        match summarize_insights(&result).await {
            Ok(summary) => Some(summary),
            Err(err) => {
                // Summarization is best-effort; the structured result stands alone.
                warn!(error = %err, "insight summarization failed");
                None
            }
        }
    } else {
        None
    };

    Ok(Json(InsightResponse { result, summary }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{demo_formulary, demo_interactions, demo_labels};
    use medprofile_core::InsightMode;

    fn demo_state() -> AppState {
        let formulary = demo_formulary();
        AppState::from_stores(Stores {
            names: formulary.clone(),
            classifications: formulary.clone(),
            labels: demo_labels(),
            interactions: demo_interactions(),
            alternatives: formulary,
        })
    }

    #[test]
    fn insight_errors_map_to_the_right_status_codes() {
        let (status, _) = map_insight_error(InsightError::EmptyQuery);
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = map_insight_error(InsightError::TooManyDrugs { count: 9, limit: 8 });
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = map_insight_error(InsightError::ServiceUnavailable {
            store: "name lookup",
            reason: "connection refused".to_string(),
        });
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn demo_state_serves_the_interaction_walkthrough() {
        let state = demo_state();

        let result = state
            .engine
            .get_insights(&["Aspirin".to_string(), "Coumadin".to_string()])
            .await
            .unwrap();

        assert_eq!(result.mode, InsightMode::Interactions);
        let checks = result.interactions.unwrap();
        assert_eq!(checks.len(), 1);
        assert!(checks[0].interaction.is_found());
    }

    #[tokio::test]
    async fn router_builds_against_the_demo_state() {
        let _router = build_router(demo_state());
    }
}
