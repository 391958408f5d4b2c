//! API 模組
//!
//! HTTP handlers、路由組裝與伺服器啟動

pub mod check;
pub mod error;
pub mod events;
pub mod health;
pub mod state;

use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::utils::error::{AppError, Result};

pub use state::AppState;

/// 建立完整路由；有設定靜態目錄時其餘路徑交給 ServeDir
pub fn router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .merge(check::router())
        .merge(events::router())
        .merge(health::router());

    if let Some(dir) = &state.static_dir {
        tracing::info!("📁 Serving static files from {}", dir.display());
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// 啟動 keepalive 並提供服務，直到 shutdown 完成
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let keepalive = state.events().spawn_keepalive(state.keepalive_interval);
    let app = router(state);

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| AppError::ServerError {
            message: e.to_string(),
        });

    keepalive.abort();
    result
}
