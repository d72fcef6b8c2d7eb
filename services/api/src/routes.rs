use crate::infra::AppState;
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use compliance_tracker::accounts::{account_router, AccountService, AuthProvider, UserRepository};
use compliance_tracker::notifications::NotificationDispatcher;
use compliance_tracker::requirements::{
    requirement_router, BlobStore, RequirementService, RequirementStore,
};
use serde_json::json;
use std::sync::Arc;

/// Merges the account and requirement APIs with the operational endpoints.
pub(crate) fn app_routes<S, B, D, A, U>(
    requirements: Arc<RequirementService<S, B, D>>,
    accounts: Arc<AccountService<A, U>>,
) -> Router
where
    S: RequirementStore + 'static,
    B: BlobStore + 'static,
    D: NotificationDispatcher + 'static,
    A: AuthProvider + 'static,
    U: UserRepository + 'static,
{
    requirement_router(requirements)
        .merge(account_router(accounts))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/files/:name", get(file_endpoint))
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

/// Serves evidence held by the in-memory blob store.
pub(crate) async fn file_endpoint(
    Extension(state): Extension<AppState>,
    Path(name): Path<String>,
) -> Response {
    match state.blobs.get(&name) {
        Some(file) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, file.content_type)],
            file.bytes,
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("no uploaded file named {name}") })),
        )
            .into_response(),
    }
}
