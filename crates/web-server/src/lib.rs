use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use configuration::{Config, PaginationSettings};
use core_types::{PageQuery, PageRequest};
use database::{DbRepository, PgEnrollmentStore};
use enrollment::EnrollmentCoordinator;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer, ExposeHeaders},
    trace::TraceLayer,
};

pub mod error;
pub mod extract;
pub mod handlers;
pub mod validation;

/// The shared application state that all handlers can access.
pub struct AppState {
    pub db_repo: DbRepository,
    pub coordinator: EnrollmentCoordinator<PgEnrollmentStore>,
    pub pagination: PaginationSettings,
}

impl AppState {
    /// Builds the repository and the enrollment coordinator over one shared pool.
    pub fn new(pool: PgPool, pagination: PaginationSettings) -> Self {
        Self {
            db_repo: DbRepository::new(pool.clone()),
            coordinator: EnrollmentCoordinator::new(PgEnrollmentStore::new(pool)),
            pagination,
        }
    }

    /// Normalises a client page query against the configured limits.
    pub fn page(&self, query: PageQuery) -> PageRequest {
        PageRequest::from_query(
            query,
            self.pagination.default_limit,
            self.pagination.max_limit,
        )
    }
}

/// Builds the application router with all routes and middleware.
pub fn router(state: Arc<AppState>, body_limit_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any())
        .expose_headers(ExposeHeaders::any());

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route(
            "/api/students",
            post(handlers::create_student).get(handlers::list_students),
        )
        .route(
            "/api/students/:id",
            get(handlers::get_student)
                .patch(handlers::update_student)
                .delete(handlers::delete_student),
        )
        .route(
            "/api/teachers",
            post(handlers::create_teacher).get(handlers::list_teachers),
        )
        .route(
            "/api/teachers/:id",
            get(handlers::get_teacher).delete(handlers::delete_teacher),
        )
        .route(
            "/api/careers",
            post(handlers::create_career).get(handlers::list_careers),
        )
        .route(
            "/api/subjects",
            post(handlers::create_subject).get(handlers::list_subjects),
        )
        .route("/api/subjects/:id", get(handlers::get_subject))
        .route("/api/subjects/:id/teacher", put(handlers::assign_teacher))
        .route(
            "/api/enrollments",
            post(handlers::create_enrollment).get(handlers::list_enrollments),
        )
        .route("/api/enrollments/enroll", post(handlers::enroll))
        .route(
            "/api/enrollments/:id",
            get(handlers::get_enrollment)
                .patch(handlers::update_enrollment)
                .delete(handlers::delete_enrollment),
        )
        .with_state(state)
        .layer(cors)
        // This middleware will automatically log information about every incoming request.
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(body_limit_bytes))
}

/// The main function to configure and run the web server.
///
/// Tracing must already be initialized by the caller.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let db_pool = database::connect(&config.database).await?;
    if config.database.run_migrations {
        database::run_migrations(&db_pool).await?;
        tracing::info!("Database migrations applied.");
    }

    let app_state = Arc::new(AppState::new(db_pool, config.pagination.clone()));
    let app = router(app_state, config.server.body_limit_bytes);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Web server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Web server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for the shutdown signal.");
        // Without a signal handler, keep serving until the process is killed.
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received.");
}
