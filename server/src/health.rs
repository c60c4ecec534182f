use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::realtime::BroadcastEngine;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: String,
    db_connected: bool,
    connections: usize,
}

/// Health endpoint: live store reachability plus the size of the fan-out
/// set. Returns 503 exactly when the backing store is unreachable.
pub async fn health(
    State(engine): State<Arc<BroadcastEngine>>,
) -> (StatusCode, Json<HealthResponse>) {
    let db_connected = engine.store().ping().await;
    let status = if db_connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if db_connected {
                "healthy".to_string()
            } else {
                "unhealthy".to_string()
            },
            db_connected,
            connections: engine.registry().len(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::ConnectionRegistry;
    use crate::store::MemoryStore;

    fn engine_with_store(store: Arc<MemoryStore>) -> Arc<BroadcastEngine> {
        Arc::new(BroadcastEngine::new(
            store,
            Arc::new(ConnectionRegistry::new()),
        ))
    }

    #[tokio::test]
    async fn test_health_reports_reachable_store() {
        let engine = engine_with_store(Arc::new(MemoryStore::new()));
        let (status, Json(body)) = health(State(engine)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "healthy");
        assert!(body.db_connected);
        assert_eq!(body.connections, 0);
    }

    #[tokio::test]
    async fn test_health_degrades_with_unreachable_store() {
        let store = Arc::new(MemoryStore::new());
        store.set_reachable(false);
        let engine = engine_with_store(store);

        let (status, Json(body)) = health(State(engine)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status, "unhealthy");
        assert!(!body.db_connected);
    }
}
