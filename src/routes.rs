use std::sync::Arc;
use std::time::Instant;

use actix_web::{web, HttpResponse};
use once_cell::sync::Lazy;
use tracing::{error, info};
use validator::Validate;

use crate::auth::{JwtKeys, TOKEN_COOKIE};
use crate::config::Environment;
use crate::cookies;
use crate::error::{ApiError, ApiErrorBody};
use crate::models::*;
use crate::repo::UserRepo;
use crate::service;

static STARTED: Lazy<Instant> = Lazy::new(Instant::now);

/// Pins the uptime clock to process start rather than the first health probe.
pub fn mark_started() {
    Lazy::force(&STARTED);
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::Validation(err.to_string()).into()),
    )
    .route("/", web::get().to(root))
    .route("/health", web::get().to(health))
    .route("/api", web::get().to(api_index))
    .service(
        web::scope("/api/auth")
            .service(web::resource("/sign-up").route(web::post().to(sign_up)))
            .service(web::resource("/sign-in").route(web::post().to(sign_in)))
            .service(web::resource("/sign-out").route(web::post().to(sign_out))),
    );
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn UserRepo>,
    pub jwt: JwtKeys,
    pub environment: Environment,
}

#[utoipa::path(
    get,
    path = "/",
    tag = "system",
    responses((status = 200, description = "Greeting", body = String))
)]
pub async fn root() -> HttpResponse {
    info!("Hello from authgate!");
    HttpResponse::Ok().body("Hello from authgate!")
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "OK".into(),
        timestamp: chrono::Utc::now(),
        uptime: STARTED.elapsed().as_secs_f64(),
    })
}

#[utoipa::path(
    get,
    path = "/api",
    tag = "system",
    responses((status = 200, description = "API is reachable", body = MessageResponse))
)]
pub async fn api_index() -> HttpResponse {
    HttpResponse::Ok().json(MessageResponse { message: "API is running".into() })
}

#[utoipa::path(
    post,
    path = "/api/auth/sign-up",
    tag = "auth",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "User registered; session cookie set", body = SignUpResponse),
        (status = 400, description = "Validation failed", body = ApiErrorBody),
        (status = 403, description = "Blocked by edge security", body = ApiErrorBody),
        (status = 409, description = "Email already exists", body = ApiErrorBody),
        (status = 500, description = "Token could not be issued; the account was still created, so a retry reports 409", body = ApiErrorBody)
    )
)]
pub async fn sign_up(
    data: web::Data<AppState>,
    payload: web::Json<SignUpRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = payload.into_inner().normalized();
    req.validate()?;

    let user = service::create_user(data.repo.as_ref(), req.into()).await?;

    let token = data.jwt.sign(user.id, &user.email, user.role).map_err(|e| {
        error!(
            user_id = user.id,
            "Account {} was created but its token could not be signed: {e}",
            user.email
        );
        ApiError::Internal
    })?;

    let mut res = HttpResponse::Created();
    cookies::set(&mut res, TOKEN_COOKIE, &token, cookies::options(data.environment));
    info!("User registered successfully: {}", user.email);
    Ok(res.json(SignUpResponse {
        message: "User registered".into(),
        user: UserSummary::from(&user),
    }))
}

#[utoipa::path(
    post,
    path = "/api/auth/sign-in",
    tag = "auth",
    responses((status = 200, description = "Not implemented yet", body = String))
)]
pub async fn sign_in() -> HttpResponse {
    HttpResponse::Ok().body("Sign in")
}

#[utoipa::path(
    post,
    path = "/api/auth/sign-out",
    tag = "auth",
    responses((status = 200, description = "Not implemented yet", body = String))
)]
pub async fn sign_out() -> HttpResponse {
    HttpResponse::Ok().body("Sign out")
}
