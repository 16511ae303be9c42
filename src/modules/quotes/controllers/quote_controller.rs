use std::sync::Arc;

use actix_web::{web, HttpResponse};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::core::error::AppError;
use crate::middleware::auth::{Actor, Role};
use crate::modules::quotes::services::QuoteService;

#[derive(Debug, Deserialize)]
pub struct SubmitQuoteRequest {
    pub job_id: String,
    pub labor_cost: Decimal,
    pub parts_cost: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ApproveQuoteRequest {
    pub payment_method: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct DeclineQuoteRequest {
    pub reason: Option<String>,
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

/// Submit a quote after the on-site diagnosis
/// POST /quotes
pub async fn submit_quote(
    service: web::Data<Arc<QuoteService>>,
    actor: Actor,
    request: web::Json<SubmitQuoteRequest>,
) -> Result<HttpResponse, AppError> {
    require_role(&actor, Role::ServiceProvider)?;

    let request = request.into_inner();
    let quote = service
        .submit_quote(
            &request.job_id,
            &actor.id,
            request.labor_cost,
            request.parts_cost,
            request.notes,
        )
        .await?;

    Ok(HttpResponse::Created().json(quote))
}

/// Get a quote
/// GET /quotes/{id}
pub async fn get_quote(
    service: web::Data<Arc<QuoteService>>,
    _actor: Actor,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let quote = service.get_quote(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(quote))
}

/// Approve a quote (places the repair hold before marking approved)
/// POST /quotes/{id}/approve
pub async fn approve_quote(
    service: web::Data<Arc<QuoteService>>,
    actor: Actor,
    path: web::Path<String>,
    request: web::Json<ApproveQuoteRequest>,
) -> Result<HttpResponse, AppError> {
    require_role(&actor, Role::Homeowner)?;

    let quote = service
        .approve_quote(
            &path.into_inner(),
            &actor.id,
            request.into_inner().payment_method,
        )
        .await?;

    Ok(HttpResponse::Ok().json(quote))
}

/// Decline a quote
/// POST /quotes/{id}/decline
pub async fn decline_quote(
    service: web::Data<Arc<QuoteService>>,
    actor: Actor,
    path: web::Path<String>,
    request: web::Json<DeclineQuoteRequest>,
) -> Result<HttpResponse, AppError> {
    require_role(&actor, Role::Homeowner)?;

    let quote = service
        .decline_quote(&path.into_inner(), &actor.id, request.into_inner().reason)
        .await?;

    Ok(HttpResponse::Ok().json(quote))
}

/// Configure quote routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/quotes")
            .route("", web::post().to(submit_quote))
            .route("/{id}", web::get().to(get_quote))
            .route("/{id}/approve", web::post().to(approve_quote))
            .route("/{id}/decline", web::post().to(decline_quote)),
    );
}
