use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::{AuthorId, ReportId, ReportStatus};
use super::intake::{RawReportIntake, RawWalkabilityBuckets};
use super::record::{ReportRecord, ReportView};
use super::repository::{PhotoStore, ReportNotifier, ReportRepository};
use super::service::{AiSubmission, ReportService, ReportServiceError};

const DEFAULT_PAGE_SIZE: usize = 50;
/// Room for the report fields and data-URL prefix around an encoded photo.
const BODY_HEADROOM_BYTES: usize = 256 * 1024;

/// Largest request body accepted: a base64 photo at the configured limit plus headroom.
pub fn body_limit(photo_max_bytes: usize) -> usize {
    photo_max_bytes
        .div_ceil(3)
        .saturating_mul(4)
        .saturating_add(BODY_HEADROOM_BYTES)
}

/// Manual report submission.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualReportRequest {
    pub author_id: AuthorId,
    pub report: RawReportIntake,
    #[serde(default)]
    pub photo: Option<String>,
}

/// Reviewed AI draft submission.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiDraftRequest {
    pub author_id: AuthorId,
    pub submission: AiSubmission,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
    pub author: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: ReportStatus,
}

/// Router builder exposing report intake, moderation, and scoring endpoints.
pub fn report_router<R, P, N>(service: Arc<ReportService<R, P, N>>) -> Router
where
    R: ReportRepository + 'static,
    P: PhotoStore + 'static,
    N: ReportNotifier + 'static,
{
    let limit = body_limit(service.settings().photo_max_bytes);
    Router::new()
        .route(
            "/api/v1/reports",
            post(submit_handler::<R, P, N>).get(list_handler::<R, P, N>),
        )
        .route("/api/v1/reports/ai-draft", post(ai_draft_handler::<R, P, N>))
        .route("/api/v1/reports/:report_id", get(report_handler::<R, P, N>))
        .route(
            "/api/v1/reports/:report_id/status",
            post(status_handler::<R, P, N>),
        )
        .route("/api/v1/walkability/score", post(score_handler::<R, P, N>))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(service)
}

fn error_response(err: ReportServiceError) -> Response {
    let status = err.status_code();
    if status.is_server_error() {
        error!(error = %err, "report request failed");
    }

    let payload = match &err {
        ReportServiceError::Photo { report_id, .. } => json!({
            "error": err.to_string(),
            "reportId": report_id,
        }),
        _ => json!({ "error": err.to_string() }),
    };
    (status, axum::Json(payload)).into_response()
}

fn views(records: Vec<ReportRecord>) -> Vec<ReportView> {
    records.iter().map(|record| record.view()).collect()
}

pub(crate) async fn submit_handler<R, P, N>(
    State(service): State<Arc<ReportService<R, P, N>>>,
    axum::Json(request): axum::Json<ManualReportRequest>,
) -> Response
where
    R: ReportRepository + 'static,
    P: PhotoStore + 'static,
    N: ReportNotifier + 'static,
{
    match service.submit_manual(request.author_id, request.report, request.photo) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn ai_draft_handler<R, P, N>(
    State(service): State<Arc<ReportService<R, P, N>>>,
    axum::Json(request): axum::Json<AiDraftRequest>,
) -> Response
where
    R: ReportRepository + 'static,
    P: PhotoStore + 'static,
    N: ReportNotifier + 'static,
{
    match service.submit_ai_draft(request.author_id, request.submission) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_handler<R, P, N>(
    State(service): State<Arc<ReportService<R, P, N>>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: ReportRepository + 'static,
    P: PhotoStore + 'static,
    N: ReportNotifier + 'static,
{
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let result = match query.author {
        Some(author) => service.by_author(&AuthorId(author), limit),
        None => service.list(limit),
    };

    match result {
        Ok(records) => (StatusCode::OK, axum::Json(views(records))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn report_handler<R, P, N>(
    State(service): State<Arc<ReportService<R, P, N>>>,
    Path(report_id): Path<String>,
) -> Response
where
    R: ReportRepository + 'static,
    P: PhotoStore + 'static,
    N: ReportNotifier + 'static,
{
    match service.get(&ReportId(report_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn status_handler<R, P, N>(
    State(service): State<Arc<ReportService<R, P, N>>>,
    Path(report_id): Path<String>,
    axum::Json(request): axum::Json<StatusRequest>,
) -> Response
where
    R: ReportRepository + 'static,
    P: PhotoStore + 'static,
    N: ReportNotifier + 'static,
{
    match service.advance_status(&ReportId(report_id), request.status) {
        Ok(record) => (StatusCode::OK, axum::Json(record.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn score_handler<R, P, N>(
    State(service): State<Arc<ReportService<R, P, N>>>,
    axum::Json(buckets): axum::Json<RawWalkabilityBuckets>,
) -> Response
where
    R: ReportRepository + 'static,
    P: PhotoStore + 'static,
    N: ReportNotifier + 'static,
{
    match service.score_walkability(buckets) {
        Ok(assessment) => (StatusCode::OK, axum::Json(assessment)).into_response(),
        Err(err) => error_response(err),
    }
}
