use actix_cors::Cors;
use actix_web::{middleware::Compress, web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use tracing::info;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use authgate::auth::JwtKeys;
use authgate::config::Config;
use authgate::openapi::ApiDoc;
use authgate::protection::{HttpProtectionClient, ProtectionClient};
use authgate::repo::UserRepo;
use authgate::routes::{config, mark_started, AppState};
use authgate::{SecurityHeaders, SecurityMiddleware};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    mark_started();
    let cfg = Config::from_env().context("invalid configuration")?;

    // Structured logging initialisation; RUST_LOG wins over LOG_LEVEL when set.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Bootstrapping authgate ({:?})", cfg.environment);

    let repo = build_repo(&cfg).await?;
    let protection: Arc<dyn ProtectionClient> =
        Arc::new(HttpProtectionClient::new(&cfg.protection).context("building decision client")?);
    info!("Edge security decisions via {}", cfg.protection.base_url);

    let state = AppState {
        repo,
        jwt: JwtKeys::new(&cfg.jwt_secret),
        environment: cfg.environment,
    };
    let guard = SecurityMiddleware::new(protection, state.jwt.clone());
    let openapi = ApiDoc::openapi();
    let server_cfg = cfg.clone();

    let server = HttpServer::new(move || {
        let cors = {
            let mut c = Cors::default()
                .allowed_origin("http://localhost:5173")
                .allowed_origin("http://127.0.0.1:5173")
                .allowed_origin("http://localhost:3000")
                .allowed_origin("http://127.0.0.1:3000")
                .allow_any_header()
                .allowed_methods(["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
                .supports_credentials()
                .max_age(3600);
            if let Some(front) = server_cfg.frontend_url.as_deref() {
                c = c.allowed_origin(front);
            }
            c
        };

        App::new()
            .wrap(guard.clone())
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(SecurityHeaders::new(server_cfg.enable_hsts))
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .configure(config)
            .service(SwaggerUi::new("/docs/{_:.*}").url("/docs/openapi.json", openapi.clone()))
    })
    .bind((cfg.host.as_str(), cfg.port))?;

    info!("Listening on http://{}:{}", cfg.host, cfg.port);

    server.run().await?;
    Ok(())
}

#[cfg(feature = "postgres-store")]
async fn build_repo(cfg: &Config) -> anyhow::Result<Arc<dyn UserRepo>> {
    use authgate::repo::pg::PgUserRepo;

    let url = cfg.database_url.as_deref().context("DATABASE_URL must be set for postgres-store")?;
    let repo = PgUserRepo::connect(url, 5).await.context("running migrations")?;
    info!("Using Postgres user repository");
    Ok(Arc::new(repo))
}

#[cfg(all(feature = "inmem-store", not(feature = "postgres-store")))]
async fn build_repo(_cfg: &Config) -> anyhow::Result<Arc<dyn UserRepo>> {
    tracing::warn!("Using in-memory user repository; data is lost on restart");
    Ok(Arc::new(authgate::repo::inmem::InMemUserRepo::new()))
}

#[cfg(not(any(feature = "inmem-store", feature = "postgres-store")))]
async fn build_repo(_cfg: &Config) -> anyhow::Result<Arc<dyn UserRepo>> {
    anyhow::bail!("no user repository backend enabled; build with postgres-store or inmem-store")
}
