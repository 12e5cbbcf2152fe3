use std::future::Future;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde_json::json;
use slugmap_service::{HealthStatus, MappingService, ServiceError, ServiceResult};
use slugmap_types::MappingRecord;

use crate::api::{GetIdRequest, GetIdResponse, HealthResponse};
use crate::error::ApiError;

/// Shared state handed to every handler.
#[derive(Clone, Debug)]
pub struct AppState {
    pub service: MappingService,
    /// Wall-clock budget for the service call behind one request.
    pub request_timeout: Duration,
}

impl AppState {
    /// Run `fut` within the request budget. Expiry drops the in-flight
    /// store call and reports the store as unavailable.
    async fn bounded<T>(&self, fut: impl Future<Output = ServiceResult<T>>) -> ServiceResult<T> {
        match tokio::time::timeout(self.request_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                let millis = self.request_timeout.as_millis() as u64;
                tracing::warn!(millis, "request timed out");
                Err(ServiceError::StoreUnavailable(format!(
                    "request timed out after {millis}ms"
                )))
            }
        }
    }
}

/// `POST /api/get-id`: return the identifier for `{slug, type}`, creating
/// it on first use.
pub async fn get_id_handler(
    State(state): State<AppState>,
    body: Result<Json<GetIdRequest>, JsonRejection>,
) -> Result<Json<GetIdResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ServiceError::InvalidRequest(e.body_text()))?;
    let slug = request.slug.unwrap_or_default();
    let kind = request.kind.unwrap_or_default();
    let uuid = state
        .bounded(state.service.get_or_create_identifier(&slug, &kind))
        .await?;
    Ok(Json(GetIdResponse { uuid }))
}

/// `GET /api/get-slug/:identifier`: return the record for an identifier.
pub async fn get_slug_handler(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> Result<Json<MappingRecord>, ApiError> {
    let record = state
        .bounded(state.service.resolve_identifier(&identifier))
        .await?;
    Ok(Json(record))
}

/// `GET /api/health`: report whether the store answers.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let status = state
        .bounded(async { Ok(state.service.health_check().await) })
        .await;
    match status {
        Ok(HealthStatus::Connected) => (StatusCode::OK, Json(HealthResponse::connected())),
        Ok(HealthStatus::Disconnected { reason }) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(HealthResponse::error(reason)),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(HealthResponse::error(e.message())),
        ),
    }
}

/// Info handler.
pub async fn info_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "name": "slugmap-server",
        "version": env!("CARGO_PKG_VERSION"),
        "store": state.service.connection().target(),
    }))
}
