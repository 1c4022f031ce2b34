use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{db, AppState};

/// Structured JSON error body with a stable machine-readable kind.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

/// HTTP-facing wrapper around the data-layer error.
#[derive(Debug)]
pub struct ApiError(db::Error);

impl From<db::Error> for ApiError {
    fn from(err: db::Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self.0 {
            db::Error::EmptyDataset => (StatusCode::NOT_FOUND, "empty_dataset"),
            db::Error::EmptyResultSet => (StatusCode::NOT_FOUND, "empty_result_set"),
            db::Error::InvalidRange { .. } => (StatusCode::BAD_REQUEST, "invalid_range"),
            db::Error::InvalidDateFormat(_) => (StatusCode::BAD_REQUEST, "invalid_date_format"),
            db::Error::Query(e) => {
                error!("dataset query failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "query_failed")
            }
            db::Error::DateParse(e) => {
                error!("stored date failed to parse: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "date_handling")
            }
            db::Error::DateFormat(e) => {
                error!("date failed to format: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "date_handling")
            }
        };

        let body = ErrorBody {
            error: kind,
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[utoipa::path(
    get,
    path = "/api/v1.0/precipitation",
    responses(
        (status = OK, description = "Precipitation by date for the last recorded year", body = BTreeMap<String, Option<f64>>),
        (status = NOT_FOUND, description = "Dataset contains no measurements", body = ErrorBody),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to query the dataset", body = ErrorBody)
    ))]
pub async fn precipitation(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BTreeMap<String, Option<f64>>>, ApiError> {
    let series = state.service.precipitation().await?;
    Ok(Json(series))
}

#[utoipa::path(
    get,
    path = "/api/v1.0/stations",
    responses(
        (status = OK, description = "Station ids referenced by the measurement table", body = Vec<String>),
        (status = NOT_FOUND, description = "Dataset contains no measurements", body = ErrorBody),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to query the dataset", body = ErrorBody)
    ))]
pub async fn stations(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>, ApiError> {
    let ids = state.service.stations().await?;
    Ok(Json(ids))
}

#[utoipa::path(
    get,
    path = "/api/v1.0/tobs",
    responses(
        (status = OK, description = "Last-year temperature observations from the most active station", body = Vec<f64>),
        (status = NOT_FOUND, description = "Dataset contains no measurements", body = ErrorBody),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to query the dataset", body = ErrorBody)
    ))]
pub async fn tobs(State(state): State<Arc<AppState>>) -> Result<Json<Vec<f64>>, ApiError> {
    let observations = state.service.temperature_observations().await?;
    Ok(Json(observations))
}

#[utoipa::path(
    get,
    path = "/api/v1.0/{start}",
    params(
        ("start" = String, Path, description = "Start date (YYYY-MM-DD), inclusive"),
    ),
    responses(
        (status = OK, description = "[min, avg, max] temperature from the start date onward", body = Vec<f64>),
        (status = BAD_REQUEST, description = "Malformed start date", body = ErrorBody),
        (status = NOT_FOUND, description = "No measurements match the filter", body = ErrorBody),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to query the dataset", body = ErrorBody)
    ))]
pub async fn temperature_stats_from(
    State(state): State<Arc<AppState>>,
    Path(start): Path<String>,
) -> Result<Json<[f64; 3]>, ApiError> {
    let stats = state.service.temperature_stats_from(&start).await?;
    Ok(Json(stats.as_triple()))
}

#[utoipa::path(
    get,
    path = "/api/v1.0/{start}/{end}",
    params(
        ("start" = String, Path, description = "Start date (YYYY-MM-DD), inclusive"),
        ("end" = String, Path, description = "End date (YYYY-MM-DD), inclusive"),
    ),
    responses(
        (status = OK, description = "[min, avg, max] temperature over the closed date range", body = Vec<f64>),
        (status = BAD_REQUEST, description = "Malformed date or inverted range", body = ErrorBody),
        (status = NOT_FOUND, description = "No measurements match the filter", body = ErrorBody),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to query the dataset", body = ErrorBody)
    ))]
pub async fn temperature_stats_range(
    State(state): State<Arc<AppState>>,
    Path((start, end)): Path<(String, String)>,
) -> Result<Json<[f64; 3]>, ApiError> {
    let stats = state.service.temperature_stats_range(&start, &end).await?;
    Ok(Json(stats.as_triple()))
}
