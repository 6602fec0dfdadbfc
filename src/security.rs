use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, HttpRequest, ResponseError};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use tracing::{error, warn};

use crate::auth::{caller_role, JwtKeys, Role};
use crate::error::ApiError;
use crate::protection::{base_rules, Decision, DenialReason, Mode, ProtectionClient, RequestDetails, Rule};

/// Window over which the per-role quota applies.
pub const QUOTA_INTERVAL: &str = "1m";

/// Requests admitted per [`QUOTA_INTERVAL`] for each role.
pub fn quota(role: Role) -> u32 {
    match role {
        Role::Admin => 20,
        Role::User => 10,
        Role::Guest => 5,
    }
}

pub fn quota_rule(role: Role) -> Rule {
    Rule::SlidingWindow {
        mode: Mode::Live,
        interval: QUOTA_INTERVAL.to_string(),
        max: quota(role),
        name: format!("{role}-rate-limit"),
    }
}

/// Headers never forwarded to the decision service.
const PRIVATE_HEADERS: [&str; 2] = ["authorization", "cookie"];

fn request_details(req: &HttpRequest) -> RequestDetails {
    let conn = req.connection_info();
    // Socket peer only: forwarded-for headers are client-controlled and would
    // let a caller pick a fresh quota bucket per request.
    let ip = req.peer_addr().map(|a| a.ip().to_string()).unwrap_or_default();
    let headers: BTreeMap<String, String> = req
        .headers()
        .iter()
        .filter(|(name, _)| !PRIVATE_HEADERS.contains(&name.as_str()))
        .filter_map(|(name, value)| Some((name.as_str().to_owned(), value.to_str().ok()?.to_owned())))
        .collect();
    RequestDetails {
        ip,
        method: req.method().to_string(),
        protocol: conn.scheme().to_string(),
        host: conn.host().to_string(),
        path: req.path().to_string(),
        headers,
    }
}

/// Wraps every request in a call to the edge-security decision service,
/// adding a sliding-window quota sized by the caller's role.
#[derive(Clone)]
pub struct SecurityMiddleware {
    client: Arc<dyn ProtectionClient>,
    keys: JwtKeys,
    rules: Arc<Vec<Rule>>,
}

impl SecurityMiddleware {
    pub fn new(client: Arc<dyn ProtectionClient>, keys: JwtKeys) -> Self {
        Self::with_rules(client, keys, base_rules())
    }

    /// Replace the base policy (shield + bot detection by default).
    pub fn with_rules(client: Arc<dyn ProtectionClient>, keys: JwtKeys, rules: Vec<Rule>) -> Self {
        Self { client, keys, rules: Arc::new(rules) }
    }

    fn rules_for(&self, role: Role) -> Vec<Rule> {
        let mut rules = self.rules.as_ref().clone();
        rules.push(quota_rule(role));
        rules
    }
}

impl<S, B> Transform<S, ServiceRequest> for SecurityMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = SecurityService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SecurityService {
            service: Rc::new(service),
            cfg: self.clone(),
        }))
    }
}

pub struct SecurityService<S> {
    service: Rc<S>,
    cfg: SecurityMiddleware,
}

/// Message for denials the service blocks on. Other reasons fall through to the handler.
fn block_message(reason: DenialReason) -> Option<(&'static str, &'static str)> {
    match reason {
        DenialReason::RateLimit => Some(("Rate limit exceeded", "Too many requests. Please try again later.")),
        DenialReason::Bot => Some(("Bot request blocked", "Automated requests are not allowed.")),
        DenialReason::Shield => Some(("Shield blocked request", "Request blocked by security policy.")),
        DenialReason::Other => None,
    }
}

impl<S, B> Service<ServiceRequest> for SecurityService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let svc = self.service.clone();
        let cfg = self.cfg.clone();
        Box::pin(async move {
            let role = caller_role(req.request(), &cfg.keys);
            let details = request_details(req.request());
            let rules = cfg.rules_for(role);

            match cfg.client.protect(&details, &rules).await {
                Ok(Decision::Deny(reason)) => {
                    if let Some((log_line, message)) = block_message(reason) {
                        warn!(
                            ip = %details.ip,
                            user_agent = %details.user_agent(),
                            path = %details.path,
                            role = %role,
                            "{log_line}"
                        );
                        let res = ApiError::Forbidden(message).error_response();
                        return Ok(req.into_response(res).map_into_right_body());
                    }
                }
                Ok(Decision::Allow) => {}
                Ok(Decision::Error) => {
                    warn!(path = %details.path, "decision service reported an error, allowing request");
                }
                Err(e) => {
                    error!(error = %e, path = %details.path, "security middleware failed");
                    let res = ApiError::SecurityUnavailable.error_response();
                    return Ok(req.into_response(res).map_into_right_body());
                }
            }

            let res = svc.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}
