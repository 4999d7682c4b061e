use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use super::domain::{
    ActorId, Amount, ApplicationId, InspectionOutcome, InspectionType, PermitApplication,
    PermitStatus, PermitSubmission, ReviewDecision, Timestamp,
};
use super::error::PermitError;
use super::events::EventPublisher;
use super::repository::{PermitRepository, PermitStatusView};
use super::service::{PermitService, PermitServiceError};
use super::validity::PermitValidity;

const DEFAULT_LIST_LIMIT: usize = 50;

type SharedService<R, E> = Arc<PermitService<R, E>>;

/// Router builder exposing the permit lifecycle over HTTP.
pub fn permit_router<R, E>(service: SharedService<R, E>) -> Router
where
    R: PermitRepository + 'static,
    E: EventPublisher + 'static,
{
    Router::new()
        .route(
            "/api/v1/permits/applications",
            post(submit_handler::<R, E>).get(list_handler::<R, E>),
        )
        .route(
            "/api/v1/permits/applications/:application_id",
            get(status_handler::<R, E>),
        )
        .route(
            "/api/v1/permits/applications/:application_id/payment",
            post(payment_handler::<R, E>),
        )
        .route(
            "/api/v1/permits/applications/:application_id/review/start",
            post(start_review_handler::<R, E>),
        )
        .route(
            "/api/v1/permits/applications/:application_id/review",
            post(review_handler::<R, E>),
        )
        .route(
            "/api/v1/permits/applications/:application_id/issue",
            post(issue_handler::<R, E>),
        )
        .route(
            "/api/v1/permits/applications/:application_id/expire",
            post(expire_handler::<R, E>),
        )
        .route(
            "/api/v1/permits/applications/:application_id/inspections",
            post(schedule_inspection_handler::<R, E>),
        )
        .route(
            "/api/v1/permits/applications/:application_id/inspections/complete",
            post(complete_inspection_handler::<R, E>),
        )
        .route(
            "/api/v1/permits/applications/:application_id/validity",
            get(validity_handler::<R, E>),
        )
        .with_state(service)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub payer: ActorId,
    pub amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub reviewer: ActorId,
    pub decision: ReviewDecision,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleInspectionRequest {
    pub caller: ActorId,
    pub inspection_type: InspectionType,
    pub scheduled_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteInspectionRequest {
    pub caller: ActorId,
    pub inspection_type: InspectionType,
    pub outcome: InspectionOutcome,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<PermitStatus>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ValidityQuery {
    pub at: Option<Timestamp>,
}

#[derive(Debug, Serialize)]
pub struct ValidityResponse {
    pub application_id: ApplicationId,
    pub evaluated_at: Timestamp,
    pub valid: bool,
    pub summary: String,
    #[serde(flatten)]
    pub detail: PermitValidity,
}

/// HTTP status an adapter should use for a service failure.
pub fn status_for(error: &PermitServiceError) -> StatusCode {
    match error {
        PermitServiceError::Permit(permit) => match permit {
            PermitError::InvalidSubmission { .. }
            | PermitError::InsufficientFee { .. }
            | PermitError::InvalidSchedule { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            PermitError::DuplicateApplication { .. }
            | PermitError::InvalidState { .. }
            | PermitError::AlreadyReviewed(_)
            | PermitError::NoPendingInspection { .. } => StatusCode::CONFLICT,
            PermitError::NotAuthorized { .. } => StatusCode::FORBIDDEN,
            PermitError::UnknownApplication(_) => StatusCode::NOT_FOUND,
        },
        PermitServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn error_response(error: PermitServiceError) -> Response {
    let status = status_for(&error);
    let payload = match error.permit_error() {
        Some(permit) => json!({
            "error": permit.to_string(),
            "code": permit.code(),
        }),
        None => {
            error!(error = %error, "permit service failure");
            json!({ "error": error.to_string() })
        }
    };
    (status, axum::Json(payload)).into_response()
}

fn view_response(
    status: StatusCode,
    result: Result<PermitApplication, PermitServiceError>,
) -> Response {
    match result {
        Ok(application) => (status, axum::Json(application.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_handler<R, E>(
    State(service): State<SharedService<R, E>>,
    axum::Json(submission): axum::Json<PermitSubmission>,
) -> Response
where
    R: PermitRepository + 'static,
    E: EventPublisher + 'static,
{
    view_response(StatusCode::CREATED, service.submit(submission))
}

pub(crate) async fn list_handler<R, E>(
    State(service): State<SharedService<R, E>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: PermitRepository + 'static,
    E: EventPublisher + 'static,
{
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    match service.list(query.status, limit) {
        Ok(applications) => {
            let views: Vec<PermitStatusView> = applications
                .iter()
                .map(|application| application.status_view())
                .collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn status_handler<R, E>(
    State(service): State<SharedService<R, E>>,
    Path(application_id): Path<u64>,
) -> Response
where
    R: PermitRepository + 'static,
    E: EventPublisher + 'static,
{
    view_response(StatusCode::OK, service.get(ApplicationId(application_id)))
}

pub(crate) async fn payment_handler<R, E>(
    State(service): State<SharedService<R, E>>,
    Path(application_id): Path<u64>,
    axum::Json(request): axum::Json<PaymentRequest>,
) -> Response
where
    R: PermitRepository + 'static,
    E: EventPublisher + 'static,
{
    let result = service.pay_fee(ApplicationId(application_id), &request.payer, request.amount);
    view_response(StatusCode::OK, result)
}

pub(crate) async fn start_review_handler<R, E>(
    State(service): State<SharedService<R, E>>,
    Path(application_id): Path<u64>,
) -> Response
where
    R: PermitRepository + 'static,
    E: EventPublisher + 'static,
{
    view_response(StatusCode::OK, service.start_review(ApplicationId(application_id)))
}

pub(crate) async fn review_handler<R, E>(
    State(service): State<SharedService<R, E>>,
    Path(application_id): Path<u64>,
    axum::Json(request): axum::Json<ReviewRequest>,
) -> Response
where
    R: PermitRepository + 'static,
    E: EventPublisher + 'static,
{
    let result = service.decide(
        ApplicationId(application_id),
        &request.reviewer,
        request.decision,
        request.notes,
    );
    view_response(StatusCode::OK, result)
}

pub(crate) async fn issue_handler<R, E>(
    State(service): State<SharedService<R, E>>,
    Path(application_id): Path<u64>,
) -> Response
where
    R: PermitRepository + 'static,
    E: EventPublisher + 'static,
{
    view_response(StatusCode::OK, service.issue(ApplicationId(application_id)))
}

pub(crate) async fn expire_handler<R, E>(
    State(service): State<SharedService<R, E>>,
    Path(application_id): Path<u64>,
) -> Response
where
    R: PermitRepository + 'static,
    E: EventPublisher + 'static,
{
    view_response(StatusCode::OK, service.expire(ApplicationId(application_id)))
}

pub(crate) async fn schedule_inspection_handler<R, E>(
    State(service): State<SharedService<R, E>>,
    Path(application_id): Path<u64>,
    axum::Json(request): axum::Json<ScheduleInspectionRequest>,
) -> Response
where
    R: PermitRepository + 'static,
    E: EventPublisher + 'static,
{
    let result = service.schedule_inspection(
        ApplicationId(application_id),
        request.inspection_type,
        request.scheduled_at,
        &request.caller,
    );
    view_response(StatusCode::CREATED, result)
}

pub(crate) async fn complete_inspection_handler<R, E>(
    State(service): State<SharedService<R, E>>,
    Path(application_id): Path<u64>,
    axum::Json(request): axum::Json<CompleteInspectionRequest>,
) -> Response
where
    R: PermitRepository + 'static,
    E: EventPublisher + 'static,
{
    let result = service.complete_inspection(
        ApplicationId(application_id),
        request.inspection_type,
        request.outcome,
        request.notes,
        &request.caller,
    );
    view_response(StatusCode::OK, result)
}

pub(crate) async fn validity_handler<R, E>(
    State(service): State<SharedService<R, E>>,
    Path(application_id): Path<u64>,
    Query(query): Query<ValidityQuery>,
) -> Response
where
    R: PermitRepository + 'static,
    E: EventPublisher + 'static,
{
    let application_id = ApplicationId(application_id);
    let evaluated_at = query.at.unwrap_or_else(|| service.now());
    match service.assess_validity(application_id, evaluated_at) {
        Ok(detail) => {
            let body = ValidityResponse {
                application_id,
                evaluated_at,
                valid: detail.is_valid(),
                summary: detail.summary(),
                detail,
            };
            (StatusCode::OK, axum::Json(body)).into_response()
        }
        Err(error) => error_response(error),
    }
}
