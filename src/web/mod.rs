use crate::client::login_url;
use crate::config::AppConfig;
use axum::{
    Router,
    extract::{Path as AxumPath, Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use rust_embed::Embed;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// Shared application state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        AppState {
            config: Arc::new(config),
            http: reqwest::Client::new(),
        }
    }
}

mod errors;
mod handlers;
mod session;
mod views;

pub use errors::AppError;
pub use session::{CookieTokenStore, PageOrigin};

/// Embedded static assets (stylesheet, small helpers) compiled into the binary.
#[derive(Embed)]
#[folder = "static/"]
struct StaticAssets;

/// Serve embedded static files at /static/{path}.
async fn static_handler(AxumPath(path): AxumPath<String>) -> Response {
    match StaticAssets::get(&path) {
        Some(content) => {
            let mime = if path.ends_with(".js") {
                "application/javascript"
            } else if path.ends_with(".css") {
                "text/css"
            } else {
                "application/octet-stream"
            };
            ([(header::CONTENT_TYPE, mime)], content.data).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Send visitors without a session cookie to the login view, remembering
/// where they were headed.
async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path();
    if state.config.is_protected(path) && session::token_from(&jar).is_none() {
        let origin = PageOrigin::of(req.method(), req.uri(), req.headers());
        debug!(path, origin = %origin.0, "no session, redirecting to login");
        let htmx = req.headers().contains_key("hx-request");
        return session::redirect(&login_url(&origin.0), htmx);
    }
    next.run(req).await
}

/// Build the axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/login", get(handlers::login_page).post(handlers::login_submit))
        .route("/logout", post(handlers::logout))
        .route("/dashboard", get(handlers::dashboard))
        .route("/tasks", get(handlers::tasks).post(handlers::create_task))
        .route(
            "/tasks/{id}",
            get(handlers::task_detail).post(handlers::update_task),
        )
        .route("/tasks/{id}/delete", post(handlers::delete_task))
        .route("/tasks/{id}/logs", post(handlers::append_log))
        .route("/static/{*path}", get(static_handler))
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(state.clone(), require_session))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the dashboard on the configured address.
pub async fn serve(config: AppConfig) -> Result<(), String> {
    let addr = config.bind_addr.clone();
    let api = config.api_base_url.clone();
    let app = create_router(AppState::new(config));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("failed to bind to {addr}: {e}"))?;
    info!(api = %api, "task dashboard listening on http://{addr}");
    println!("Task dashboard: http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("server error: {e}"))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
            let _ = sigterm.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received");
}
