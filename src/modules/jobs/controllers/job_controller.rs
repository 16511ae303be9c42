use std::str::FromStr;
use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::core::error::AppError;
use crate::middleware::auth::{Actor, Role};
use crate::modules::jobs::models::JobStatus;
use crate::modules::jobs::repositories::JobHistoryFilter;
use crate::modules::jobs::services::{JobService, TriageOutcome};

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub category: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct TriageOutcomeRequest {
    pub outcome: TriageOutcome,
}

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub provider_id: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct BookDiagnosticRequest {
    pub payment_method: Option<String>,
}

/// Query parameters for the job history listing
#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub homeowner_id: Option<String>,
    pub provider_id: Option<String>,
    pub status: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

fn require_role(actor: &Actor, role: Role) -> Result<(), AppError> {
    if actor.role != role {
        return Err(AppError::forbidden(format!(
            "Role '{}' required, actor '{}' has '{}'",
            role, actor.id, actor.role
        )));
    }
    Ok(())
}

/// Create a new job
/// POST /jobs
pub async fn create_job(
    service: web::Data<Arc<JobService>>,
    actor: Actor,
    request: web::Json<CreateJobRequest>,
) -> Result<HttpResponse, AppError> {
    require_role(&actor, Role::Homeowner)?;

    let request = request.into_inner();
    let job = service
        .create_job(&actor.id, request.category, request.description)
        .await?;

    Ok(HttpResponse::Created().json(job))
}

/// Get a job with its quote and ledger record
/// GET /jobs/{id}
pub async fn get_job(
    service: web::Data<Arc<JobService>>,
    _actor: Actor,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let detail = service.get_job_detail(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(detail))
}

/// List jobs
/// GET /jobs
pub async fn list_jobs(
    service: web::Data<Arc<JobService>>,
    _actor: Actor,
    query: web::Query<ListJobsQuery>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let status = match query.status.as_deref() {
        Some(raw) => Some(JobStatus::from_str(raw).map_err(AppError::Validation)?),
        None => None,
    };

    let jobs = service
        .get_history(&JobHistoryFilter {
            homeowner_id: query.homeowner_id,
            provider_id: query.provider_id,
            status,
            limit: query.limit,
            offset: query.offset,
        })
        .await?;

    Ok(HttpResponse::Ok().json(jobs))
}

/// Start AI triage
/// POST /jobs/{id}/triage
pub async fn begin_triage(
    service: web::Data<Arc<JobService>>,
    _actor: Actor,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let job = service.begin_triage(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(job))
}

/// Record the triage outcome
/// POST /jobs/{id}/triage/outcome
pub async fn record_triage_outcome(
    service: web::Data<Arc<JobService>>,
    _actor: Actor,
    path: web::Path<String>,
    request: web::Json<TriageOutcomeRequest>,
) -> Result<HttpResponse, AppError> {
    let job = service
        .record_triage_outcome(&path.into_inner(), request.outcome)
        .await?;
    Ok(HttpResponse::Ok().json(job))
}

/// Assign a matched provider
/// POST /jobs/{id}/match
pub async fn match_provider(
    service: web::Data<Arc<JobService>>,
    _actor: Actor,
    path: web::Path<String>,
    request: web::Json<MatchRequest>,
) -> Result<HttpResponse, AppError> {
    let job = service
        .match_provider(&path.into_inner(), &request.provider_id)
        .await?;
    Ok(HttpResponse::Ok().json(job))
}

/// Book the diagnostic visit (places the diagnostic-fee hold)
/// POST /jobs/{id}/book-diagnostic
pub async fn book_diagnostic(
    service: web::Data<Arc<JobService>>,
    actor: Actor,
    path: web::Path<String>,
    request: web::Json<BookDiagnosticRequest>,
) -> Result<HttpResponse, AppError> {
    require_role(&actor, Role::Homeowner)?;

    let job = service
        .book_diagnostic(
            &path.into_inner(),
            &actor.id,
            request.into_inner().payment_method,
        )
        .await?;

    Ok(HttpResponse::Ok().json(job))
}

/// Provider starts the visit
/// POST /jobs/{id}/start
pub async fn start_work(
    service: web::Data<Arc<JobService>>,
    actor: Actor,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    require_role(&actor, Role::ServiceProvider)?;

    let job = service.start_work(&path.into_inner(), &actor.id).await?;
    Ok(HttpResponse::Ok().json(job))
}

/// Capture holds, settle the ledger, and complete the job
/// POST /jobs/{id}/complete
pub async fn mark_complete(
    service: web::Data<Arc<JobService>>,
    actor: Actor,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    require_role(&actor, Role::ServiceProvider)?;

    let detail = service.mark_complete(&path.into_inner(), &actor.id).await?;
    Ok(HttpResponse::Ok().json(detail))
}

/// Cancel a job
/// POST /jobs/{id}/cancel
pub async fn cancel(
    service: web::Data<Arc<JobService>>,
    actor: Actor,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let job = service.cancel(&path.into_inner(), &actor.id).await?;
    Ok(HttpResponse::Ok().json(job))
}

/// Configure job routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/jobs")
            .route("", web::post().to(create_job))
            .route("", web::get().to(list_jobs))
            .route("/{id}", web::get().to(get_job))
            .route("/{id}/triage", web::post().to(begin_triage))
            .route("/{id}/triage/outcome", web::post().to(record_triage_outcome))
            .route("/{id}/match", web::post().to(match_provider))
            .route("/{id}/book-diagnostic", web::post().to(book_diagnostic))
            .route("/{id}/start", web::post().to(start_work))
            .route("/{id}/complete", web::post().to(mark_complete))
            .route("/{id}/cancel", web::post().to(cancel)),
    );
}
