use std::str::FromStr;
use std::sync::Arc;

use actix_web::{web, HttpResponse};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::core::error::AppError;
use crate::middleware::auth::Actor;
use crate::modules::admin::services::{AdminService, RefundTarget};
use crate::modules::jobs::models::JobStatus;

#[derive(Debug, Deserialize)]
pub struct ForceCompleteRequest {
    #[serde(default)]
    pub skip_payment_capture: bool,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ManualStatusRequest {
    pub status: String,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct CaptureRetryRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    #[serde(rename = "type")]
    pub target: RefundTarget,
    pub amount: Option<Decimal>,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ReassignRequest {
    pub provider_id: String,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ToggleActiveRequest {
    pub reason: String,
}

/// Force-complete a job, optionally skipping capture
/// POST /admin/jobs/{id}/force-complete
pub async fn force_complete(
    service: web::Data<Arc<AdminService>>,
    actor: Actor,
    path: web::Path<String>,
    request: web::Json<ForceCompleteRequest>,
) -> Result<HttpResponse, AppError> {
    actor.require_admin()?;

    let request = request.into_inner();
    let outcome = service
        .force_complete(
            &path.into_inner(),
            request.skip_payment_capture,
            &actor.id,
            &request.reason,
        )
        .await?;

    Ok(HttpResponse::Ok().json(outcome))
}

/// Manually set a job's status (the audited trapdoor)
/// POST /admin/jobs/{id}/status
pub async fn manual_status_change(
    service: web::Data<Arc<AdminService>>,
    actor: Actor,
    path: web::Path<String>,
    request: web::Json<ManualStatusRequest>,
) -> Result<HttpResponse, AppError> {
    actor.require_admin()?;

    let request = request.into_inner();
    let target = JobStatus::from_str(&request.status).map_err(AppError::Validation)?;

    let job = service
        .manual_status_change(&path.into_inner(), target, &actor.id, &request.reason)
        .await?;

    Ok(HttpResponse::Ok().json(job))
}

/// Retry capture for every not-yet-captured hold on a record
/// POST /admin/payments/{id}/capture-retry
pub async fn capture_retry(
    service: web::Data<Arc<AdminService>>,
    actor: Actor,
    path: web::Path<String>,
    request: web::Json<CaptureRetryRequest>,
) -> Result<HttpResponse, AppError> {
    actor.require_admin()?;

    let outcome = service
        .capture_retry(&path.into_inner(), &actor.id, &request.reason)
        .await?;

    Ok(HttpResponse::Ok().json(outcome))
}

/// Refund captured hold(s) on a job
/// POST /admin/jobs/{id}/refund
pub async fn refund(
    service: web::Data<Arc<AdminService>>,
    actor: Actor,
    path: web::Path<String>,
    request: web::Json<RefundRequest>,
) -> Result<HttpResponse, AppError> {
    actor.require_admin()?;

    let request = request.into_inner();
    let outcome = service
        .refund(
            &path.into_inner(),
            request.target,
            request.amount,
            &actor.id,
            &request.reason,
        )
        .await?;

    Ok(HttpResponse::Ok().json(outcome))
}

/// Reassign a job to a different provider
/// POST /admin/jobs/{id}/reassign
pub async fn reassign_provider(
    service: web::Data<Arc<AdminService>>,
    actor: Actor,
    path: web::Path<String>,
    request: web::Json<ReassignRequest>,
) -> Result<HttpResponse, AppError> {
    actor.require_admin()?;

    let request = request.into_inner();
    let job = service
        .reassign_provider(
            &path.into_inner(),
            &request.provider_id,
            &actor.id,
            &request.reason,
        )
        .await?;

    Ok(HttpResponse::Ok().json(job))
}

/// Flip a provider's availability flag
/// POST /admin/providers/{id}/toggle-active
pub async fn toggle_provider_active(
    service: web::Data<Arc<AdminService>>,
    actor: Actor,
    path: web::Path<String>,
    request: web::Json<ToggleActiveRequest>,
) -> Result<HttpResponse, AppError> {
    actor.require_admin()?;

    let provider = service
        .toggle_provider_active(&path.into_inner(), &actor.id, &request.reason)
        .await?;

    Ok(HttpResponse::Ok().json(provider))
}

/// Records completed with capture skipped, for reconciliation
/// GET /admin/payments/flagged
pub async fn list_flagged_payments(
    service: web::Data<Arc<AdminService>>,
    actor: Actor,
) -> Result<HttpResponse, AppError> {
    actor.require_admin()?;

    let records = service.list_flagged_payments().await?;
    Ok(HttpResponse::Ok().json(records))
}

/// Audit trail for a job
/// GET /admin/jobs/{id}/audit
pub async fn job_audit_trail(
    service: web::Data<Arc<AdminService>>,
    actor: Actor,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    actor.require_admin()?;

    let entries = service.audit_for_job(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(entries))
}

/// Configure admin routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/jobs/{id}/force-complete", web::post().to(force_complete))
            .route("/jobs/{id}/status", web::post().to(manual_status_change))
            .route("/jobs/{id}/refund", web::post().to(refund))
            .route("/jobs/{id}/reassign", web::post().to(reassign_provider))
            .route("/jobs/{id}/audit", web::get().to(job_audit_trail))
            .route("/payments/flagged", web::get().to(list_flagged_payments))
            .route("/payments/{id}/capture-retry", web::post().to(capture_retry))
            .route(
                "/providers/{id}/toggle-active",
                web::post().to(toggle_provider_active),
            ),
    );
}
