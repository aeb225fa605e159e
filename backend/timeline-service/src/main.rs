use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpResponse, HttpServer};
use db_pool::{create_pool as create_pg_pool, DbConfig as DbPoolConfig};
use std::io;
use std::sync::Arc;
use timeline_service::clock::SystemClock;
use timeline_service::config::{Config, StorageBackend};
use timeline_service::db::{InMemoryStore, PgSocialStore, SocialStore, MIGRATOR};
use timeline_service::handlers::{self, HealthState};
use timeline_service::middleware::{JwtAuthMiddleware, JwtVerifier, MetricsMiddleware};
use timeline_service::openapi::ApiDoc;
use timeline_service::services::{Services, TimelineOptions};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

async fn openapi_json(doc: web::Data<utoipa::openapi::OpenApi>) -> actix_web::Result<HttpResponse> {
    let body = serde_json::to_string(&*doc).map_err(|e| {
        tracing::error!("OpenAPI serialization failed: {}", e);
        actix_web::error::ErrorInternalServerError("OpenAPI serialization error")
    })?;

    Ok(HttpResponse::Ok()
        .content_type("application/json")
        .body(body))
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("SIGTERM handler unavailable: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn connect_store(config: &Config) -> io::Result<Arc<dyn SocialStore>> {
    match config.database.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Ok(Arc::new(InMemoryStore::new()))
        }
        StorageBackend::Postgres => {
            let db_cfg = DbPoolConfig::from_env("timeline-service", &config.database.url);
            db_cfg.log_config();

            let pool = create_pg_pool(db_cfg).await.map_err(|e| {
                io::Error::new(
                    io::ErrorKind::Other,
                    format!("Failed to create database pool: {e}"),
                )
            })?;

            if config.database.run_migrations {
                MIGRATOR.run(&pool).await.map_err(|e| {
                    io::Error::new(io::ErrorKind::Other, format!("Migrations failed: {e}"))
                })?;
                tracing::info!("Database migrations applied");
            }

            tracing::info!("Connected to database via db-pool crate");
            Ok(Arc::new(PgSocialStore::new(pool)))
        }
    }
}

/// Timeline Service
///
/// # Routes
///
/// - `/api/posts/*` - feeds, post lifecycle, likes, retweets, comments
/// - `/api/users/*` - profiles, user posts, follow graph
/// - `/health`, `/health/ready`, `/health/live`, `/metrics`
#[actix_web::main]
async fn main() -> io::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("WARN: failed to read .env: {}", e);
        }
    }

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(config.logging.json);

    tracing::info!("Starting timeline-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    let store = connect_store(&config).await?;
    let services = web::Data::new(Services::new(
        store.clone(),
        Arc::new(SystemClock),
        TimelineOptions {
            following_includes_self: config.feed.following_includes_self,
        },
    ));
    let health_state = web::Data::new(HealthState::new(store));
    let jwt = JwtAuthMiddleware::new(JwtVerifier::new(&config.auth.jwt_secret));

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Starting HTTP server at {}", bind_address);

    let cors_config = config.cors.clone();
    let server = HttpServer::new(move || {
        let mut cors = Cors::default();
        for origin in cors_config.origins() {
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors
            .allow_any_method()
            .allow_any_header()
            .supports_credentials()
            .max_age(3600);

        let openapi_doc = ApiDoc::openapi();

        App::new()
            .app_data(web::Data::new(openapi_doc.clone()))
            .app_data(services.clone())
            .app_data(health_state.clone())
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url(ApiDoc::openapi_json_path(), openapi_doc))
            .route(ApiDoc::openapi_json_path(), web::get().to(openapi_json))
            .route("/metrics", web::get().to(timeline_service::metrics::serve_metrics))
            .route("/health", web::get().to(handlers::health_summary))
            .route("/health/ready", web::get().to(handlers::readiness_summary))
            .route("/health/live", web::get().to(handlers::liveness_check))
            .configure(handlers::configure)
            .wrap(jwt.clone())
            .wrap(MetricsMiddleware)
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(tracing_actix_web::TracingLogger::default())
    })
    .bind(&bind_address)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(Ok(())) => tracing::info!("HTTP server stopped"),
                Ok(Err(e)) => {
                    tracing::error!("HTTP server error: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    tracing::error!("HTTP server task failed: {}", e);
                    return Err(io::Error::new(io::ErrorKind::Other, e.to_string()));
                }
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received");
            server_handle.stop(true).await;
        }
    }

    tracing::info!("timeline-service shutting down");
    Ok(())
}
