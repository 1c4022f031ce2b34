use crate::{
    db::{ClimateAccess, Database},
    index_handler, precipitation, routes, stations, temperature_stats_from,
    temperature_stats_range, tobs, ClimateQueryService,
};
use anyhow::anyhow;
use axum::{
    body::Body,
    extract::Request,
    middleware::{self, Next},
    response::IntoResponse,
    routing::get,
    Router,
};
use hyper::{header::ACCEPT, Method};
use log::info;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

#[derive(Clone)]
pub struct AppState {
    pub remote_url: String,
    pub service: ClimateQueryService,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::climate::api_routes::precipitation,
        routes::climate::api_routes::stations,
        routes::climate::api_routes::tobs,
        routes::climate::api_routes::temperature_stats_from,
        routes::climate::api_routes::temperature_stats_range,
    ),
    components(
        schemas(
                routes::climate::api_routes::ErrorBody,
                crate::db::TemperatureStats
            )
    ),
    tags(
        (name = "climate query api", description = "a read-only RESTful api over a two-table climate observation dataset")
    )
)]
struct ApiDoc;

pub async fn build_app_state(remote_url: String, database: String) -> Result<AppState, anyhow::Error> {
    let db = Database::new(&database)
        .await
        .map_err(|e| anyhow!("error opening climate dataset: {}", e))?;
    let climate_db = Arc::new(ClimateAccess::new(db.pool().clone()));

    Ok(AppState {
        remote_url,
        service: ClimateQueryService::new(climate_db),
    })
}

pub fn app(app_state: AppState) -> Router {
    let api_docs = ApiDoc::openapi();
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([ACCEPT])
        .allow_origin(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/api/v1.0/precipitation", get(precipitation))
        .route("/api/v1.0/stations", get(stations))
        .route("/api/v1.0/tobs", get(tobs))
        .route("/api/v1.0/{start}", get(temperature_stats_from))
        .route("/api/v1.0/{start}/{end}", get(temperature_stats_range))
        .with_state(Arc::new(app_state))
        .layer(middleware::from_fn(log_request))
        .merge(Scalar::with_url("/docs", api_docs))
        .layer(cors)
}

async fn log_request(request: Request<Body>, next: Next) -> impl IntoResponse {
    let now = time::OffsetDateTime::now_utc();
    let path = request
        .uri()
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or_default();
    info!(target: "http_request","new request, {} {}", request.method().as_str(), path);

    let response = next.run(request).await;
    let response_time = time::OffsetDateTime::now_utc() - now;
    info!(target: "http_response", "response, code: {}, time: {}", response.status().as_str(), response_time);

    response
}
