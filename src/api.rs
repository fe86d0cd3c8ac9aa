// src/api.rs
//! Thin HTTP surface over the pipeline: batch ingest, ranked retrieval,
//! on-demand fetch.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::classify::Classifier;
use crate::error::{StoreError, ValidationError};
use crate::ingest::scheduler::{Fetcher, SourceReport};
use crate::model::{validate_batch, FullItem, IngestPayload, PublicItem};
use crate::store::DynStore;

/// Service objects built once at startup and shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: DynStore,
    pub classifier: Arc<Classifier>,
    pub fetcher: Arc<Fetcher>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/ingest", post(ingest))
        .route("/retrieve", get(retrieve))
        .route("/articles", get(articles_full))
        .route("/fetch", post(trigger_fetch))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

pub enum ApiError {
    Validation(ValidationError),
    Store(StoreError),
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::Validation(e)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Store(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            ApiError::Validation(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
            ApiError::Store(e) => {
                error!(target: "api", error = %e, "store failure");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };
        (status, Json(ErrorBody { error: msg })).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct IngestAck {
    pub status: &'static str,
    pub received: usize,
}

async fn ingest(
    State(state): State<AppState>,
    Json(batch): Json<Vec<IngestPayload>>,
) -> Result<Json<IngestAck>, ApiError> {
    let items = validate_batch(batch, Utc::now())?;
    let received = items.len();
    info!(target: "api", received, "ingest batch received");

    if !items.is_empty() {
        let mut session = state.store.session().await?;
        for item in items {
            state
                .classifier
                .classify_and_save(item, session.as_mut())
                .await?;
        }
    }

    Ok(Json(IngestAck {
        status: "ok",
        received,
    }))
}

async fn retrieve(State(state): State<AppState>) -> Result<Json<Vec<PublicItem>>, ApiError> {
    let rows = state.store.query_filtered_sorted().await?;
    info!(target: "api", count = rows.len(), "retrieve");
    Ok(Json(rows.into_iter().map(PublicItem::from).collect()))
}

async fn articles_full(State(state): State<AppState>) -> Result<Json<Vec<FullItem>>, ApiError> {
    let rows = state.store.query_filtered_sorted().await?;
    info!(target: "api", count = rows.len(), "articles (full view)");
    Ok(Json(rows))
}

#[derive(Debug, Serialize)]
struct FetchResp {
    status: &'static str,
    sources: Vec<SourceReport>,
}

async fn trigger_fetch(State(state): State<AppState>) -> Json<FetchResp> {
    let report = state.fetcher.run_cycle().await;
    Json(FetchResp {
        status: "ok",
        sources: report.sources,
    })
}
