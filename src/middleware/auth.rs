use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    Error, FromRequest, HttpMessage, HttpRequest,
};
use futures_util::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use std::rc::Rc;
use std::str::FromStr;

use crate::core::AppError;

/// Caller role as asserted by the upstream identity service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Homeowner,
    ServiceProvider,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Homeowner => write!(f, "homeowner"),
            Role::ServiceProvider => write!(f, "service_provider"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "homeowner" => Ok(Role::Homeowner),
            "service_provider" => Ok(Role::ServiceProvider),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Authenticated caller, extracted from identity headers by `IdentityAuth`
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    /// Admin-only guard used by the override surface
    pub fn require_admin(&self) -> crate::core::Result<()> {
        if self.role != Role::Admin {
            return Err(AppError::forbidden(format!(
                "Actor '{}' with role '{}' cannot perform admin operations",
                self.id, self.role
            )));
        }
        Ok(())
    }
}

impl FromRequest for Actor {
    type Error = Error;
    type Future = Ready<std::result::Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let actor = req.extensions().get::<Actor>().cloned();
        ready(actor.ok_or_else(|| {
            Error::from(AppError::unauthorized("No authenticated actor on request"))
        }))
    }
}

/// Identity middleware
///
/// The identity/session service sits in front of this core and asserts the
/// caller via `X-Actor-Id` and `X-Actor-Role` headers; these are trusted as-is
/// and never re-derived here. Requests without both headers are rejected.
pub struct IdentityAuth;

impl<S, B> Transform<S, ServiceRequest> for IdentityAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = IdentityAuthMiddleware<S>;
    type Future = Ready<std::result::Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(IdentityAuthMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct IdentityAuthMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for IdentityAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let svc = self.service.clone();

        Box::pin(async move {
            // Health and root endpoints stay public
            let path = req.path();
            if path == "/health" || path == "/" {
                return svc.call(req).await;
            }

            let actor_id = req
                .headers()
                .get("X-Actor-Id")
                .and_then(|h| h.to_str().ok())
                .filter(|s| !s.trim().is_empty())
                .ok_or_else(|| Error::from(AppError::unauthorized("Missing X-Actor-Id header")))?
                .to_string();

            let role_raw = req
                .headers()
                .get("X-Actor-Role")
                .and_then(|h| h.to_str().ok())
                .ok_or_else(|| Error::from(AppError::unauthorized("Missing X-Actor-Role header")))?;

            let role = Role::from_str(role_raw)
                .map_err(|e| Error::from(AppError::unauthorized(e)))?;

            req.extensions_mut().insert(Actor {
                id: actor_id,
                role,
            });

            svc.call(req).await
        })
    }
}
