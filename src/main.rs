use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use slo_server::config::Config;
use slo_server::db;
use slo_server::handlers;
use slo_server::models;
use slo_server::services::{
    ConstraintAnalysisService, GraphStore, ImpactAnalysisService, SloLifecycleService,
    SqlTelemetryAdapter, StaleEdgeSweepTask,
};
use slo_server::services::slo_lifecycle::SqlSloRepository;
use slo_server::utils::ScheduledExecutor;
use slo_server::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::ingestion::ingest,
        handlers::subgraph::get_subgraph,
        handlers::constraint_analysis::get_constraint_analysis,
        handlers::error_budget::get_error_budget,
        handlers::impact_analysis::post_impact_analysis,
        handlers::slo::transition_slo,
        handlers::slo::get_active_slo,
        handlers::slo::get_slo_history,
        handlers::health::health_check,
    ),
    components(
        schemas(
            models::Service,
            models::ServiceType,
            models::Criticality,
            models::ServiceNodeDto,
            models::DependencyEdge,
            models::CommunicationMode,
            models::DependencyCriticality,
            models::DiscoverySource,
            models::RetryConfig,
            models::DependencyEdgeDto,
            models::EdgeAttributesDto,
            models::ActiveSlo,
            models::SloSource,
            models::SloSnapshot,
            models::TierTargets,
            models::SloAuditEntry,
            models::SloAction,
            handlers::ingestion::IngestRequest,
            handlers::ingestion::IngestResponse,
            handlers::ingestion::CycleAlertSummary,
            handlers::ingestion::EdgeConflictSummary,
            handlers::subgraph::SubgraphResponse,
            handlers::subgraph::SubgraphStatistics,
            handlers::constraint_analysis::ConstraintAnalysisResponse,
            handlers::error_budget::ErrorBudgetResponse,
            handlers::dto::ErrorBudgetDto,
            handlers::dto::DependencyConsumptionDto,
            handlers::dto::UnachievabilityWarningDto,
            handlers::impact_analysis::ImpactAnalysisRequestDto,
            handlers::impact_analysis::ProposedChangeDto,
            slo_server::services::impact_analysis_service::ImpactAnalysisResult,
            slo_server::services::impact_analysis_service::ImpactedService,
            handlers::slo::SloTransitionRequestDto,
            handlers::slo::SloModificationsDto,
            handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "Ingestion", description = "Dependency graph ingestion from discovery sources"),
        (name = "Graph", description = "Dependency graph traversal and inspection"),
        (name = "Analysis", description = "Composite availability and error-budget analysis"),
        (name = "SLO Lifecycle", description = "SLO recommendation accept/modify/reject and audit history"),
        (name = "System", description = "Service health"),
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    let log_filter = tracing_subscriber::EnvFilter::new(&config.logging.level);
    let registry = tracing_subscriber::registry().with(log_filter);

    if let Some(log_dir) = &config.logging.directory {
        let _ = std::fs::create_dir_all(log_dir);
        let file_appender = tracing_appender::rolling::daily(log_dir, "slo-server.log");
        let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(non_blocking))
            .with(tracing_subscriber::fmt::layer())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("SLO reliability-analysis server starting up");
    tracing::info!("Configuration loaded successfully");

    let pool = db::create_pool(
        &config.database.url,
        config.database.max_connections,
        config.database.acquire_timeout_secs,
    )
    .await?;
    tracing::info!("Database pool created successfully, migrations applied");

    let policy = Arc::new(config.graph_policy);

    let graph_store = Arc::new(GraphStore::new(pool.clone()));
    let telemetry = Arc::new(SqlTelemetryAdapter::new(pool.clone()));
    let slo_repository = Arc::new(SqlSloRepository::new(pool.clone()));

    let constraint_analysis_service = Arc::new(ConstraintAnalysisService::new(
        Arc::clone(&graph_store),
        Arc::clone(&telemetry) as _,
        Arc::clone(&policy),
    ));

    let impact_analysis_service = Arc::new(ImpactAnalysisService::new(
        Arc::clone(&graph_store),
        Arc::clone(&telemetry) as _,
        Arc::clone(&policy),
    ));

    let slo_lifecycle_service = Arc::new(SloLifecycleService::new(slo_repository));

    let app_state = Arc::new(AppState {
        db: pool.clone(),
        policy: Arc::clone(&policy),
        graph_store: Arc::clone(&graph_store),
        telemetry: Arc::clone(&telemetry) as _,
        constraint_analysis_service,
        impact_analysis_service,
        slo_lifecycle_service,
    });

    if config.stale_sweep.enabled {
        let interval = Duration::from_secs(config.stale_sweep.interval_secs);
        tracing::info!(
            "Starting stale-edge sweep with interval: {:?} (threshold={}h)",
            interval,
            policy.stale_edge_threshold_hours
        );
        let task = StaleEdgeSweepTask::new(Arc::clone(&graph_store), policy.stale_edge_threshold_hours);
        let executor = ScheduledExecutor::new("stale-edge-sweep", interval);
        tokio::spawn(async move {
            executor.start(task).await;
        });
    } else {
        tracing::warn!("Stale-edge sweep disabled by configuration");
    }

    let app = Router::new()
        .route("/api/ingest", post(handlers::ingestion::ingest))
        .route("/api/services/{service_id}/subgraph", get(handlers::subgraph::get_subgraph))
        .route(
            "/api/services/{service_id}/constraint-analysis",
            get(handlers::constraint_analysis::get_constraint_analysis),
        )
        .route("/api/services/{service_id}/error-budget", get(handlers::error_budget::get_error_budget))
        .route("/api/impact-analysis", post(handlers::impact_analysis::post_impact_analysis))
        .route(
            "/api/services/{service_id}/slo",
            post(handlers::slo::transition_slo).get(handlers::slo::get_active_slo),
        )
        .route("/api/services/{service_id}/slo/history", get(handlers::slo::get_slo_history))
        .route("/health", get(handlers::health::health_check))
        .with_state(Arc::clone(&app_state));

    let app = Router::new()
        .merge(SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(app)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("API documentation available at http://{}/api-docs", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
