/// Read-only HTTP view of the running session: `/api/health` and
/// `/api/status` (the status file contents).
use crate::config::ServeConfig;
use crate::status::StatusFile;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
struct AppState {
    status: Arc<StatusFile>,
}

pub fn router(status_path: PathBuf) -> Router {
    let state = AppState {
        status: Arc::new(StatusFile::new(status_path)),
    };
    Router::new()
        .route("/api/health", get(health))
        .route("/api/status", get(api_status))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

pub async fn run(
    serve_config: &ServeConfig,
    status_path: PathBuf,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = format!("{}:{}", serve_config.bind, serve_config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!("status endpoint listening on {local_addr}");

    axum::serve(listener, router(status_path)).await?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"ok": true}))
}

async fn api_status(
    State(state): State<AppState>,
) -> Result<Json<crate::status::StatusData>, StatusCode> {
    match state.status.read() {
        Ok(Some(data)) => Ok(Json(data)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::warn!(error = %e, "failed to read status file");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Target;
    use crate::status::{StatusTracker, SupervisorState};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = get_json(router(dir.path().join("status")), "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_status_not_found_without_session() {
        let dir = tempfile::tempdir().unwrap();
        let (status, _) = get_json(router(dir.path().join("status")), "/api/status").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_status_returns_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status");
        StatusTracker::new(path.clone(), Target::Server).update(SupervisorState::Running);

        let (status, body) = get_json(router(path), "/api/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "running");
        assert_eq!(body["target"], "server");
    }
}
