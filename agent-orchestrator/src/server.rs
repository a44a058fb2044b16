//! Static file server for the todo demo
//!
//! `GET /` returns `index.html` from the static directory; every other path
//! is served from the same directory.

use axum::{
    extract::State,
    http::StatusCode,
    response::Html,
    routing::get,
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Server state
pub struct DemoState {
    pub static_dir: PathBuf,
}

/// Create the demo router
pub fn create_router(state: Arc<DemoState>) -> Router {
    let assets = ServeDir::new(&state.static_dir);
    Router::new()
        .route("/", get(index_page))
        .fallback_service(assets)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Entry page
async fn index_page(
    State(state): State<Arc<DemoState>>,
) -> Result<Html<String>, (StatusCode, String)> {
    let path = state.static_dir.join("index.html");
    match tokio::fs::read_to_string(&path).await {
        Ok(html) => Ok(Html(html)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "index.html not readable");
            Err((StatusCode::NOT_FOUND, "index.html not found".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn router(dir: &std::path::Path) -> Router {
        create_router(Arc::new(DemoState {
            static_dir: dir.to_path_buf(),
        }))
    }

    async fn get_path(app: Router, path: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_root_serves_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>Todo</h1>").unwrap();

        let (status, body) = get_path(router(dir.path()), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<h1>Todo</h1>");
    }

    #[tokio::test]
    async fn test_static_assets_are_served() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("style.css"), "body { margin: 0; }").unwrap();

        let (status, body) = get_path(router(dir.path()), "/style.css").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "body { margin: 0; }");
    }

    #[tokio::test]
    async fn test_missing_index_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (status, _) = get_path(router(dir.path()), "/").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
