use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{Local, NaiveDate, NaiveTime};
use serde::Deserialize;
use serde_json::json;

use super::domain::RequirementDraft;
use super::evidence::{BlobStore, EvidenceFile, UploadError};
use super::report::REPORT_FILE_NAME;
use super::repository::RequirementStore;
use super::service::{RequirementService, RequirementServiceError};
use crate::notice::Notice;
use crate::notifications::NotificationDispatcher;
use crate::reference::DocumentReference;
use crate::store::StoreError;

pub const FILE_NAME_HEADER: &str = "x-file-name";

type SharedService<S, B, D> = Arc<RequirementService<S, B, D>>;

#[derive(Debug, Deserialize)]
pub(crate) struct ReferenceRequest {
    pub(crate) department: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ScanQuery {
    #[serde(default)]
    pub(crate) today: Option<NaiveDate>,
}

/// Router exposing requirement management, evidence upload, scanning, and export.
pub fn requirement_router<S, B, D>(service: SharedService<S, B, D>) -> Router
where
    S: RequirementStore + 'static,
    B: BlobStore + 'static,
    D: NotificationDispatcher + 'static,
{
    Router::new()
        .route(
            "/api/v1/requirements",
            get(list_handler::<S, B, D>).post(submit_handler::<S, B, D>),
        )
        .route(
            "/api/v1/requirements/references",
            post(reference_handler::<S, B, D>),
        )
        .route(
            "/api/v1/requirements/evidence/:reference",
            put(evidence_handler::<S, B, D>),
        )
        .route("/api/v1/requirements/scan", post(scan_handler::<S, B, D>))
        .route(
            "/api/v1/requirements/report.csv",
            get(report_handler::<S, B, D>),
        )
        .with_state(service)
}

pub(crate) async fn list_handler<S, B, D>(
    State(service): State<SharedService<S, B, D>>,
) -> Response
where
    S: RequirementStore + 'static,
    B: BlobStore + 'static,
    D: NotificationDispatcher + 'static,
{
    match service.refresh() {
        Ok(_) => {
            let requirements = service.list();
            (StatusCode::OK, Json(json!({ "requirements": requirements }))).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn submit_handler<S, B, D>(
    State(service): State<SharedService<S, B, D>>,
    Json(draft): Json<RequirementDraft>,
) -> Response
where
    S: RequirementStore + 'static,
    B: BlobStore + 'static,
    D: NotificationDispatcher + 'static,
{
    match service.submit(draft) {
        Ok(requirement) => {
            let payload = json!({
                "requirement": requirement,
                "notice": Notice::success("Requirement saved."),
            });
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn reference_handler<S, B, D>(
    State(service): State<SharedService<S, B, D>>,
    Json(request): Json<ReferenceRequest>,
) -> Response
where
    S: RequirementStore + 'static,
    B: BlobStore + 'static,
    D: NotificationDispatcher + 'static,
{
    match service.issue_reference(&request.department) {
        Ok(reference) => (
            StatusCode::OK,
            Json(json!({ "documentReference": reference })),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn evidence_handler<S, B, D>(
    State(service): State<SharedService<S, B, D>>,
    Path(reference): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    S: RequirementStore + 'static,
    B: BlobStore + 'static,
    D: NotificationDispatcher + 'static,
{
    let Some(file_name) = headers
        .get(FILE_NAME_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
    else {
        let payload = json!({
            "notice": Notice::error("Please select at least one file to upload."),
        });
        return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
    };

    let file = EvidenceFile {
        file_name: file_name.to_string(),
        bytes: body.to_vec(),
    };
    match service.upload_evidence(&DocumentReference(reference), file) {
        Ok(url) => {
            let payload = json!({
                "url": url,
                "notice": Notice::success("Files uploaded successfully!"),
            });
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn scan_handler<S, B, D>(
    State(service): State<SharedService<S, B, D>>,
    Query(query): Query<ScanQuery>,
) -> Response
where
    S: RequirementStore + 'static,
    B: BlobStore + 'static,
    D: NotificationDispatcher + 'static,
{
    let now = match query.today {
        Some(today) => today.and_time(NaiveTime::MIN),
        None => Local::now().naive_local(),
    };

    // Dispatch may block on outbound HTTP for every qualifying record.
    let scan = tokio::task::spawn_blocking(move || service.refresh_and_scan(now)).await;
    match scan {
        Ok(Ok(report)) => (StatusCode::OK, Json(report)).into_response(),
        Ok(Err(err)) => error_response(err),
        Err(err) => {
            tracing::error!(error = %err, "expiration scan task failed");
            let payload = json!({ "notice": Notice::error("Expiration scan failed.") });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

pub(crate) async fn report_handler<S, B, D>(
    State(service): State<SharedService<S, B, D>>,
) -> Response
where
    S: RequirementStore + 'static,
    B: BlobStore + 'static,
    D: NotificationDispatcher + 'static,
{
    if let Err(err) = service.refresh() {
        return error_response(err);
    }

    let mut buffer = Vec::new();
    match service.export_csv(&mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{REPORT_FILE_NAME}\""),
                ),
            ],
            buffer,
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: RequirementServiceError) -> Response {
    let notice = err.notice();
    let (status, payload) = match &err {
        RequirementServiceError::Validation(errors) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "errors": errors, "notice": notice }),
        ),
        RequirementServiceError::ReferenceInUse(_) => {
            (StatusCode::CONFLICT, json!({ "notice": notice }))
        }
        RequirementServiceError::Upload(UploadError::Storage(_)) => {
            (StatusCode::BAD_GATEWAY, json!({ "notice": notice }))
        }
        RequirementServiceError::Upload(_) => {
            (StatusCode::UNPROCESSABLE_ENTITY, json!({ "notice": notice }))
        }
        RequirementServiceError::Store(StoreError::Unavailable(_)) => {
            (StatusCode::SERVICE_UNAVAILABLE, json!({ "notice": notice }))
        }
        RequirementServiceError::Store(StoreError::Conflict) => {
            (StatusCode::CONFLICT, json!({ "notice": notice }))
        }
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "notice": notice }),
        ),
    };
    tracing::warn!(status = status.as_u16(), error = %err, "requirement request failed");
    (status, Json(payload)).into_response()
}
