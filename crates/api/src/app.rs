use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use domain::services::notification::{LogPushSender, PushSender};
use shared::crypto::PayloadCipher;

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, security_headers_middleware, trace_id,
};
use crate::routes::{activities, archive, devices, export, health, scan, workspaces};
use crate::services::ScanService;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub cipher: PayloadCipher,
    pub push: Arc<dyn PushSender>,
}

impl AppState {
    /// Build a scan service over this state.
    pub fn scan_service(&self) -> ScanService {
        ScanService::new(
            self.pool.clone(),
            self.cipher.clone(),
            self.push.clone(),
            self.config.limits.scan_reward_points,
        )
    }
}

pub fn create_app(config: Config, pool: PgPool) -> Router {
    create_app_with_push(config, pool, Arc::new(LogPushSender))
}

pub fn create_app_with_push(
    config: Config,
    pool: PgPool,
    push: Arc<dyn PushSender>,
) -> Router {
    let config = Arc::new(config);
    let cipher = config
        .payload_cipher()
        .expect("config validation guarantees a well-formed QR key");

    let state = AppState {
        pool,
        config: config.clone(),
        cipher,
        push,
    };

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        // Production: only allow specified origins
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Workspace-scoped routes. Caller identity arrives via the trusted
    // X-User-Id header; each handler enforces membership itself.
    let api_routes = Router::new()
        // Scan routes (v1)
        .route("/api/v1/scan", post(scan::scan_global))
        .route(
            "/api/v1/workspaces/:workspace_id/scan",
            post(scan::scan_workspace),
        )
        // Workspace routes (v1)
        .route("/api/v1/workspaces", post(workspaces::create_workspace))
        .route(
            "/api/v1/workspaces/:workspace_id",
            delete(workspaces::delete_workspace),
        )
        // Device routes (v1)
        .route(
            "/api/v1/workspaces/:workspace_id/devices",
            post(devices::register_device).get(devices::list_devices),
        )
        .route(
            "/api/v1/workspaces/:workspace_id/devices/:device_id",
            get(devices::get_device)
                .patch(devices::update_device)
                .delete(devices::delete_device),
        )
        .route(
            "/api/v1/workspaces/:workspace_id/devices/:device_id/transfer",
            post(devices::transfer_device),
        )
        // Activity routes (v1)
        .route(
            "/api/v1/workspaces/:workspace_id/activities",
            get(activities::list_activities),
        )
        .route(
            "/api/v1/workspaces/:workspace_id/activities/graph",
            get(activities::activity_graph),
        )
        // Archive routes (v1)
        .route(
            "/api/v1/workspaces/:workspace_id/archive/stats",
            get(archive::archive_stats),
        )
        .route(
            "/api/v1/workspaces/:workspace_id/archive/types",
            get(archive::archive_type_breakdown),
        )
        // Export route (v1)
        .route(
            "/api/v1/workspaces/:workspace_id/export",
            post(export::export_activity),
        )
        // Admin routes (v1)
        .route(
            "/api/v1/admin/archive/compact",
            post(archive::trigger_compaction),
        );

    // Public routes (no caller identity required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    // Merge all routes
    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
