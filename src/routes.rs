use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use axum_extra::TypedHeader;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{WorkflowError, WorkflowResult};
use crate::identity::XCaller;
use crate::models::*;
use crate::notify::Notifier;
use crate::store::Store;
use crate::workflow::Workflow;

type App<S, N> = Arc<Workflow<S, N>>;
type Caller = Option<TypedHeader<XCaller>>;

pub fn router<S: Store, N: Notifier>(wf: App<S, N>) -> Router {
    Router::new()
        // catalog
        .route("/api/courses/:course_id", get(get_course::<S, N>))
        .route("/api/admin/courses/:course_id", put(publish_course::<S, N>))
        // enrollment + payments
        .route("/api/courses/:course_id/enroll", post(request_enrollment::<S, N>))
        .route("/api/courses/:course_id/payments", post(submit_payment::<S, N>))
        .route("/api/admin/payments/pending", get(pending_payments::<S, N>))
        .route("/api/admin/payments/:payment_id/review", post(review_payment::<S, N>))
        // progress + certificates
        .route("/api/enrollments/:enrollment_id/progress", post(record_progress::<S, N>))
        .route(
            "/api/certificates/:certificate_id/download",
            post(download_certificate::<S, N>),
        )
        // dashboard
        .route("/api/me/enrollments", get(my_enrollments::<S, N>))
        .route("/api/me/payments", get(my_payments::<S, N>))
        .route("/api/me/certificates", get(my_certificates::<S, N>))
        .with_state(wf)
}

fn authenticated(caller: Caller) -> WorkflowResult<CallerContext> {
    caller
        .map(|TypedHeader(XCaller(c))| c)
        .ok_or(WorkflowError::Unauthenticated)
}

async fn get_course<S: Store, N: Notifier>(
    State(wf): State<App<S, N>>,
    Path(course_id): Path<Uuid>,
) -> WorkflowResult<Json<Course>> {
    Ok(Json(wf.get_course(course_id).await?))
}

async fn publish_course<S: Store, N: Notifier>(
    State(wf): State<App<S, N>>,
    caller: Caller,
    Path(course_id): Path<Uuid>,
    Json(req): Json<PublishCourseReq>,
) -> WorkflowResult<Json<Course>> {
    let caller = authenticated(caller)?;
    Ok(Json(wf.publish_course(&caller, course_id, req).await?))
}

async fn request_enrollment<S: Store, N: Notifier>(
    State(wf): State<App<S, N>>,
    caller: Caller,
    Path(course_id): Path<Uuid>,
) -> WorkflowResult<(StatusCode, Json<Enrollment>)> {
    let caller = authenticated(caller)?;
    let enrollment = wf.request_enrollment(&caller, course_id).await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

async fn submit_payment<S: Store, N: Notifier>(
    State(wf): State<App<S, N>>,
    caller: Caller,
    Path(course_id): Path<Uuid>,
    Json(req): Json<SubmitPaymentReq>,
) -> WorkflowResult<(StatusCode, Json<PaymentRecord>)> {
    let caller = authenticated(caller)?;
    let rec = wf
        .submit_payment(&caller, course_id, req.amount, req.screenshot_ref)
        .await?;
    Ok((StatusCode::CREATED, Json(rec)))
}

async fn pending_payments<S: Store, N: Notifier>(
    State(wf): State<App<S, N>>,
    caller: Caller,
) -> WorkflowResult<Json<Vec<PaymentRecord>>> {
    let caller = authenticated(caller)?;
    Ok(Json(wf.list_pending_payments(&caller).await?))
}

async fn review_payment<S: Store, N: Notifier>(
    State(wf): State<App<S, N>>,
    caller: Caller,
    Path(payment_id): Path<Uuid>,
    Json(req): Json<ReviewPaymentReq>,
) -> WorkflowResult<Json<PaymentRecord>> {
    let caller = authenticated(caller)?;
    Ok(Json(
        wf.review_payment(&caller, payment_id, req.decision, req.notes)
            .await?,
    ))
}

async fn record_progress<S: Store, N: Notifier>(
    State(wf): State<App<S, N>>,
    caller: Caller,
    Path(enrollment_id): Path<Uuid>,
    Json(req): Json<ProgressReq>,
) -> WorkflowResult<Json<ProgressUpdate>> {
    let caller = authenticated(caller)?;
    Ok(Json(
        wf.record_progress(&caller, enrollment_id, req.watched_minutes)
            .await?,
    ))
}

async fn download_certificate<S: Store, N: Notifier>(
    State(wf): State<App<S, N>>,
    caller: Caller,
    Path(certificate_id): Path<String>,
) -> WorkflowResult<Json<CertificateView>> {
    let caller = authenticated(caller)?;
    Ok(Json(wf.download_certificate(&caller, &certificate_id).await?))
}

async fn my_enrollments<S: Store, N: Notifier>(
    State(wf): State<App<S, N>>,
    caller: Caller,
) -> WorkflowResult<Json<Vec<Enrollment>>> {
    let caller = authenticated(caller)?;
    Ok(Json(wf.my_enrollments(&caller).await?))
}

async fn my_payments<S: Store, N: Notifier>(
    State(wf): State<App<S, N>>,
    caller: Caller,
) -> WorkflowResult<Json<Vec<PaymentRecord>>> {
    let caller = authenticated(caller)?;
    Ok(Json(wf.my_payments(&caller).await?))
}

async fn my_certificates<S: Store, N: Notifier>(
    State(wf): State<App<S, N>>,
    caller: Caller,
) -> WorkflowResult<Json<Vec<Certificate>>> {
    let caller = authenticated(caller)?;
    Ok(Json(wf.my_certificates(&caller).await?))
}
