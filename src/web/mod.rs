//! HTTP surface: routes, shared state, and the server loop.

mod auth;
mod files;
mod notice;
mod templates;

pub use self::templates::Templates;
use crate::error::{ErrorKind, Result};
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use exn::ResultExt;
use parcel_config::AuthConfig;
use parcel_library::Library;
use parcel_stats::{StatsAggregator, StatsSnapshot};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// Everything a handler can reach. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    library: Library,
    stats: Arc<StatsAggregator>,
    sessions: Arc<auth::Sessions>,
    notices: Arc<notice::Notices>,
    templates: Arc<Templates>,
}

impl AppState {
    pub fn new(library: Library, stats: StatsAggregator, auth: &AuthConfig, templates: Templates) -> Self {
        Self {
            library,
            stats: Arc::new(stats),
            sessions: Arc::new(auth::Sessions::new(auth)),
            notices: Arc::new(notice::Notices::default()),
            templates: Arc::new(templates),
        }
    }
}

/// Build the application router. Request bodies (uploads) larger than
/// `max_upload_size` bytes are rejected.
pub fn router(state: AppState, max_upload_size: u64) -> Router {
    let operator_pages = Router::new()
        .route("/dashboard", get(files::dashboard))
        .route("/upload", post(files::upload))
        .route("/rename/{id}", post(files::rename))
        .route("/delete/{id}", get(files::delete))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_session));
    let operator_api = Router::new()
        .route("/stats", get(stats))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_session_json));

    Router::new()
        .route("/", get(auth::index))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/download/{id}", get(files::download_page))
        .route("/download_file/{id}", get(files::download_file))
        .merge(operator_pages)
        .merge(operator_api)
        .layer(DefaultBodyLimit::max(usize::try_from(max_upload_size).unwrap_or(usize::MAX)))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn stats(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.stats.sample().await)
}

/// Serve until interrupted, then let in-flight requests finish.
pub async fn serve(listener: TcpListener, app: Router) -> Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .or_raise(|| ErrorKind::Server)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Could not listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(e) => {
                tracing::error!(error = %e, "Could not listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutting down");
}
