mod core;
mod features;
mod modules;
mod shared;

use crate::core::config::Config;
use crate::core::openapi::{ApiDoc, SwaggerInfoModifier};
use crate::core::{database, middleware};
use crate::features::auth;
use crate::features::comparisons::{
    routes as comparisons_routes, ComparisonService, LlmVisionClassifier,
};
use crate::features::disputes::{routes as disputes_routes, DisputeService};
use crate::features::inspections::{
    routes as inspections_routes, InspectionService, InspectionState, LifecycleService,
    TemplateService,
};
use crate::features::outsourcing::{
    routes as outsourcing_routes, AccessTokenService, AssignmentService,
    ExternalInspectionService, OutsourcingState,
};
use crate::modules::storage::{EvidenceStorage, MinIOClient};
use crate::modules::store::{InspectionStore, PgInspectionStore};
use axum::{extract::DefaultBodyLimit, middleware::from_fn, Router};
use std::sync::Arc;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn main() -> anyhow::Result<()> {
    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(worker_threads * 4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(worker_threads))
}

async fn async_main(worker_threads: usize) -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(
        "System info: tokio_worker_threads={}, pid={}",
        worker_threads,
        std::process::id()
    );
    tracing::info!("Configuration loaded successfully");

    let pool = database::create_pool(&config.database).await?;
    tracing::info!("Database connection pool created");

    tracing::info!("Running database migrations...");
    database::run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
    tracing::info!("Database migrations completed successfully");

    // Initialize auth
    let jwks_client = Arc::new(auth::JwksClient::new(
        &config.auth.issuer,
        config.auth.jwks_cache_ttl,
    ));
    let jwt_validator = Arc::new(auth::JwtValidator::new(
        jwks_client,
        config.auth.issuer.clone(),
        config.auth.audience.clone(),
        config.auth.jwt_leeway,
    ));
    tracing::info!("Auth configuration initialized");

    let pg_store = PgInspectionStore::new(pool.clone());
    pg_store
        .ensure_default_template()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to seed default template: {}", e))?;
    let store: Arc<dyn InspectionStore> = Arc::new(pg_store);
    tracing::info!("Inspection store initialized");

    let evidence: Arc<dyn EvidenceStorage> = Arc::new(
        MinIOClient::new(config.minio.clone())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to initialize MinIO client: {}", e))?,
    );

    let classifier = Arc::new(
        LlmVisionClassifier::new(config.vision.clone())
            .map_err(|e| anyhow::anyhow!("Failed to initialize vision classifier: {}", e))?,
    );
    tracing::info!(
        "Vision classifier initialized (model: {}, max_concurrency: {})",
        config.vision.model,
        config.vision.max_concurrency
    );

    // Services
    let inspection_service = Arc::new(InspectionService::new(
        Arc::clone(&store),
        Arc::clone(&evidence),
    ));
    let lifecycle_service = Arc::new(LifecycleService::new(Arc::clone(&store)));
    let template_service = Arc::new(TemplateService::new(Arc::clone(&store)));
    let assignment_service = Arc::new(AssignmentService::new(Arc::clone(&store)));
    let access_token_service = Arc::new(AccessTokenService::new(
        Arc::clone(&store),
        config.app.frontend_url.clone(),
    ));
    let external_service = Arc::new(ExternalInspectionService::new(
        Arc::clone(&store),
        Arc::clone(&access_token_service),
        Arc::clone(&assignment_service),
        Arc::clone(&inspection_service),
        Arc::clone(&lifecycle_service),
    ));
    let comparison_service = Arc::new(ComparisonService::new(
        Arc::clone(&store),
        classifier,
        config.vision.max_concurrency,
    ));
    let dispute_service = Arc::new(DisputeService::new(
        Arc::clone(&store),
        Arc::clone(&inspection_service),
    ));
    tracing::info!("Inspection services initialized");

    // Build application router with dynamic swagger config
    let swagger_modifier = SwaggerInfoModifier {
        title: config.swagger.title.clone(),
        version: config.swagger.version.clone(),
        description: config.swagger.description.clone(),
    };

    let mut openapi = ApiDoc::openapi();
    swagger_modifier.modify(&mut openapi);

    let swagger = if let Some(credentials) = config.swagger.credentials() {
        tracing::info!("Swagger UI basic auth enabled");
        Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
            .layer(from_fn(middleware::basic_auth_middleware(Arc::new(
                credentials,
            ))))
    } else {
        tracing::info!("Swagger UI basic auth disabled (no credentials configured)");
        Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
    };

    // Protected routes (require JWT authentication)
    let protected_routes = Router::new()
        .merge(inspections_routes::routes(InspectionState {
            inspections: Arc::clone(&inspection_service),
            lifecycle: Arc::clone(&lifecycle_service),
            templates: template_service,
            comparisons: Arc::clone(&comparison_service),
        }))
        .merge(outsourcing_routes::routes(OutsourcingState {
            assignments: assignment_service,
            tokens: access_token_service,
        }))
        .merge(comparisons_routes::routes(Arc::clone(&comparison_service)))
        .merge(disputes_routes::routes(dispute_service))
        .route_layer(axum::middleware::from_fn_with_state(
            jwt_validator.clone(),
            middleware::auth_middleware,
        ));

    // Simple health check endpoint (no auth required)
    async fn health_check() -> axum::http::StatusCode {
        axum::http::StatusCode::OK
    }
    let health_route = Router::new().route("/health", axum::routing::get(health_check));

    // External inspector routes (access token in the path, no JWT)
    let access_routes = outsourcing_routes::access_routes(external_service);

    let app = Router::new()
        .merge(swagger)
        .merge(protected_routes)
        .merge(access_routes)
        .merge(health_route)
        .layer(DefaultBodyLimit::max(config.app.max_request_body_size))
        .layer(middleware::cors_layer(
            config.app.cors_allowed_origins.clone(),
        ))
        // Propagate X-Request-Id to response headers
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(middleware::MakeSpanWithRequestId)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Generate X-Request-Id using UUID v7 (or use client-provided one)
        .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid));

    // Start server
    let addr = config.app.server_address();
    let socket_addr: std::net::SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    // Use socket2 for TCP listener configuration
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(socket_addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_nodelay(true)?;

    #[cfg(target_os = "linux")]
    {
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(std::time::Duration::from_secs(60))
            .with_interval(std::time::Duration::from_secs(10))
            .with_retries(3);
        socket.set_tcp_keepalive(&keepalive)?;
    }
    #[cfg(not(target_os = "linux"))]
    {
        let keepalive = socket2::TcpKeepalive::new().with_time(std::time::Duration::from_secs(60));
        socket.set_tcp_keepalive(&keepalive)?;
    }

    socket.set_nonblocking(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(1024)?;

    let listener = tokio::net::TcpListener::from_std(socket.into())?;
    tracing::info!("Server listening on {}", format!("http://{}", addr));
    tracing::info!(
        "Swagger UI available at {}",
        format!("http://{}/swagger-ui/", addr)
    );

    axum::serve(listener, app).await?;

    Ok(())
}
