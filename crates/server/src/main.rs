//! Agora server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use agora_api::{AppState, StreamingState, router as api_router};
use agora_common::{Config, LocalStorage, StorageBackend, SystemClock};
use agora_core::{
    AdminService, CommentService, GroupService, MediaService, NotificationService, PostService,
    ReactionService, ReportService, StatsService, UserService,
};
use agora_db::repositories::{
    CommentRepository, GroupRepository, NotificationRepository, PostRepository,
    ReactionRepository, ReportRepository, UserRepository,
};
use axum::Router;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Windows only Ctrl+C is observed.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agora=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting agora server...");

    let config = Config::load()?;

    let db = agora_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    agora_db::migrate(&db).await?;
    info!("Migrations completed");

    // Initialize repositories
    let db = Arc::new(db);
    let user_repo = UserRepository::new(Arc::clone(&db));
    let post_repo = PostRepository::new(Arc::clone(&db));
    let comment_repo = CommentRepository::new(Arc::clone(&db));
    let group_repo = GroupRepository::new(Arc::clone(&db));
    let report_repo = ReportRepository::new(Arc::clone(&db));
    let reaction_repo = ReactionRepository::new(Arc::clone(&db));
    let notification_repo = NotificationRepository::new(Arc::clone(&db));

    let storage: Arc<dyn StorageBackend> = Arc::new(LocalStorage::from_settings(&config.storage));
    let media_service = MediaService::new(storage, config.storage.max_video_bytes);
    info!(path = %config.storage.base_path.display(), "Media storage ready");

    // Notifications are pushed to WebSocket subscribers as they are stored
    let streaming = StreamingState::new();
    let mut notification_service = NotificationService::new(notification_repo);
    notification_service.set_event_publisher(Arc::new(streaming.clone()));

    // Initialize services
    let post_service = PostService::new(
        post_repo.clone(),
        user_repo.clone(),
        group_repo.clone(),
        media_service.clone(),
    );
    let reaction_service = ReactionService::new(reaction_repo, post_repo.clone());
    let comment_service = CommentService::new(
        comment_repo,
        post_repo.clone(),
        user_repo.clone(),
        notification_service.clone(),
    );
    let group_service = GroupService::new(group_repo, media_service.clone());
    let report_service = ReportService::new(
        report_repo,
        post_repo.clone(),
        user_repo.clone(),
        post_service.clone(),
    );
    let user_service = UserService::new(user_repo.clone(), media_service);
    let admin_service = AdminService::new(user_repo.clone());
    let stats_service = StatsService::new(
        user_repo,
        post_repo,
        Arc::new(SystemClock),
        chrono::Duration::from_std(Duration::from_secs(config.stats.ttl_secs))?,
    );

    let state = AppState {
        reaction_service,
        comment_service,
        post_service,
        group_service,
        notification_service,
        report_service,
        user_service,
        admin_service,
        stats_service,
        streaming,
        environment: config.server.environment.clone(),
    };

    let app = Router::new()
        .nest("/api", api_router(config.storage.max_request_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!(%addr, url = %config.server.url, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
