use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::multipart::Multipart;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use serde_json::json;

use khoroolol::appointments::AppointmentRequest;
use khoroolol::error::AppError;
use khoroolol::identity::{CallerIdentity, IdentityEvent};
use khoroolol::listings::{ListingFilter, PageRequest, SearchParams};

use crate::infra::{draft_from_fields, patch_from_fields, read_listing_form, AppState, Services};

pub(crate) fn api_router(services: Arc<Services>) -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/search", get(search_endpoint))
        .route("/api/v1/property/list", get(property_list_endpoint))
        .route("/api/v1/property", post(property_create_endpoint))
        .route(
            "/api/v1/property/:id",
            get(property_get_endpoint)
                .put(property_update_endpoint)
                .delete(property_delete_endpoint),
        )
        .route("/api/v1/agent/list", get(agent_list_endpoint))
        .route("/api/v1/agent/:id", get(agent_profile_endpoint))
        .route("/api/v1/user/sellers", get(sellers_endpoint))
        .route("/api/v1/appointments", post(appointment_create_endpoint))
        .route("/api/v1/appointments/mine", get(appointments_mine_endpoint))
        .route(
            "/api/v1/appointments/:id/cancel",
            put(appointment_cancel_endpoint),
        )
        .route("/webhooks/identity", post(identity_webhook_endpoint))
        .with_state(services)
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

fn page_request(query: &HashMap<String, String>) -> PageRequest {
    let parse = |key: &str| query.get(key).and_then(|raw| raw.trim().parse::<u32>().ok());
    PageRequest::new(parse("page"), parse("limit"))
}

pub(crate) async fn search_endpoint(
    State(services): State<Arc<Services>>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let filter = ListingFilter::from_params(&SearchParams::from_query(&query));
    let page = services.catalog.search(&filter, page_request(&query)).await?;

    Ok(Json(json!({
        "success": true,
        "properties": page.properties,
        "total": page.total,
        "page": page.page,
        "limit": page.limit,
        "totalPages": page.total_pages,
    })))
}

pub(crate) async fn property_list_endpoint(
    State(services): State<Arc<Services>>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let page = services
        .catalog
        .search(&ListingFilter::default(), page_request(&query))
        .await?;

    Ok(Json(json!({
        "success": true,
        "properties": page.properties,
        "total": page.total,
        "page": page.page,
        "limit": page.limit,
        "totalPages": page.total_pages,
    })))
}

pub(crate) async fn property_get_endpoint(
    State(services): State<Arc<Services>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let property = services.catalog.get(&id).await?;
    Ok(Json(json!({ "success": true, "property": property })))
}

pub(crate) async fn property_create_endpoint(
    State(services): State<Arc<Services>>,
    caller: CallerIdentity,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_listing_form(multipart).await?;
    let draft = draft_from_fields(&form.fields)?;
    let property = services.mutations.create(&caller, draft, form.files).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "property": property })),
    ))
}

pub(crate) async fn property_update_endpoint(
    State(services): State<Arc<Services>>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<serde_json::Value>, AppError> {
    let form = read_listing_form(multipart).await?;
    let patch = patch_from_fields(&form.fields)?;
    let property = services
        .mutations
        .update(&caller, &id, patch, form.files)
        .await?;

    Ok(Json(json!({ "success": true, "property": property })))
}

pub(crate) async fn property_delete_endpoint(
    State(services): State<Arc<Services>>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    services.mutations.delete(&caller, &id).await?;
    Ok(Json(json!({ "success": true, "message": "property deleted" })))
}

pub(crate) async fn agent_list_endpoint(
    State(services): State<Arc<Services>>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let page = services.agents.agent_directory(page_request(&query)).await?;
    Ok(Json(json!({
        "success": true,
        "agents": page.agents,
        "total": page.total,
        "page": page.page,
        "totalPages": page.total_pages,
    })))
}

pub(crate) async fn agent_profile_endpoint(
    State(services): State<Arc<Services>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let profile = services.agents.agent_profile(&id).await?;
    Ok(Json(json!({
        "success": true,
        "agent": profile.agent,
        "properties": profile.properties,
    })))
}

pub(crate) async fn sellers_endpoint(
    State(services): State<Arc<Services>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let sellers = services.agents.seller_directory().await?;
    Ok(Json(json!({ "success": true, "sellers": sellers })))
}

pub(crate) async fn appointment_create_endpoint(
    State(services): State<Arc<Services>>,
    caller: CallerIdentity,
    Json(request): Json<AppointmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let appointment = services.appointments.schedule(&caller, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "appointment": appointment })),
    ))
}

pub(crate) async fn appointment_cancel_endpoint(
    State(services): State<Arc<Services>>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let appointment = services.appointments.cancel(&caller, &id).await?;
    Ok(Json(json!({ "success": true, "appointment": appointment })))
}

pub(crate) async fn appointments_mine_endpoint(
    State(services): State<Arc<Services>>,
    caller: CallerIdentity,
) -> Result<Json<serde_json::Value>, AppError> {
    let appointments = services.appointments.for_seller(&caller).await?;
    Ok(Json(json!({ "success": true, "appointments": appointments })))
}

pub(crate) async fn identity_webhook_endpoint(
    State(services): State<Arc<Services>>,
    Json(event): Json<IdentityEvent>,
) -> Result<Json<serde_json::Value>, AppError> {
    services.agents.apply_event(event).await?;
    Ok(Json(json!({ "success": true })))
}
