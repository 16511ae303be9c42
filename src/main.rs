use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer};
use anyhow::Context;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use homefix::config::Config;
use homefix::middleware::{IdentityAuth, RateLimiter, RequestId};
use homefix::modules::admin::controllers::admin_controller;
use homefix::modules::admin::repositories::AuditRepository;
use homefix::modules::admin::services::AdminService;
use homefix::modules::jobs::controllers::job_controller;
use homefix::modules::jobs::repositories::JobRepository;
use homefix::modules::jobs::services::JobService;
use homefix::modules::notifications::Notifier;
use homefix::modules::payments::repositories::PaymentRepository;
use homefix::modules::payments::services::{EscrowLedger, StripeGateway};
use homefix::modules::providers::repositories::ProviderRepository;
use homefix::modules::quotes::controllers::quote_controller;
use homefix::modules::quotes::repositories::QuoteRepository;
use homefix::modules::quotes::services::QuoteService;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "homefix=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    tracing::info!("Starting HomeFix Repair Coordination Platform");
    tracing::info!("Environment: {}", config.app.env);
    tracing::info!("Server binding to: {}", config.server.bind_address());

    // Create database connection pool
    let db_pool = config
        .database
        .create_pool()
        .await
        .context("Failed to create database pool")?;

    tracing::info!(
        "Database pool initialized (up to {} connections)",
        config.database.max_connections
    );

    // Gateway client and escrow ledger, shared by all services
    let gateway = Arc::new(StripeGateway::new(
        config.stripe.api_key.clone(),
        config.stripe.base_url.clone(),
    ));
    let escrow = Arc::new(EscrowLedger::new(gateway));
    let notifier = Arc::new(Notifier::new(config.notifications.webhook_url.clone()));

    let job_service = Arc::new(JobService::new(
        JobRepository::new(db_pool.clone()),
        QuoteRepository::new(db_pool.clone()),
        PaymentRepository::new(db_pool.clone()),
        ProviderRepository::new(db_pool.clone()),
        escrow.clone(),
        notifier.clone(),
        config.payments.diagnostic_fee,
    ));

    let quote_service = Arc::new(QuoteService::new(
        QuoteRepository::new(db_pool.clone()),
        JobRepository::new(db_pool.clone()),
        escrow.clone(),
        notifier.clone(),
    ));

    let admin_service = Arc::new(AdminService::new(
        JobRepository::new(db_pool.clone()),
        PaymentRepository::new(db_pool.clone()),
        ProviderRepository::new(db_pool.clone()),
        AuditRepository::new(db_pool.clone()),
        escrow.clone(),
    ));

    let rate_limiter = RateLimiter::new(config.security.rate_limit_per_minute);

    // Start HTTP server
    let bind_address = config.server.bind_address();
    let workers = config.server.workers;

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(job_service.clone()))
            .app_data(web::Data::new(quote_service.clone()))
            .app_data(web::Data::new(admin_service.clone()))
            .wrap(IdentityAuth)
            .wrap(rate_limiter.clone())
            .wrap(RequestId)
            .wrap(TracingLogger::default())
            .wrap(Cors::permissive())
            .configure(job_controller::configure)
            .configure(quote_controller::configure)
            .configure(admin_controller::configure)
            .route("/health", web::get().to(health_check))
            .route("/", web::get().to(index))
    })
    .workers(workers)
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?
    .run();

    tracing::info!("Server started at http://{}", bind_address);

    server.await.context("Server error")
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "homefix"
    }))
}

async fn index() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "service": "HomeFix Repair Coordination Platform",
        "version": "0.1.0",
        "status": "running"
    }))
}
