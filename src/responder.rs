//! Minimal web responder deployed to each machine behind the load balancer.
//!
//! Three routes returning static strings; the configured machine id is
//! echoed in every body so an operator can see which machine answered.

use std::time::Duration;

use anyhow::Result;
use axum::{extract::State, response::Html, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

use crate::config::ResponderConfig;
use crate::telemetry;

#[derive(Debug, Clone)]
struct ResponderState {
    machine_id: String,
}

pub fn router(cfg: &ResponderConfig) -> Router {
    let state = ResponderState {
        machine_id: cfg.machine_id.clone(),
    };
    Router::new()
        .route("/", get(hello))
        .route("/cluster1", get(cluster1))
        .route("/cluster2", get(cluster2))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(cfg.request_timeout_secs))),
        )
}

async fn hello(State(state): State<ResponderState>) -> Html<String> {
    Html(format!("<h1>Hello, World! FROM: {}</h1>", state.machine_id))
}

async fn cluster1(State(state): State<ResponderState>) -> Html<String> {
    Html(format!("<h1>Hello from cluster1! FROM: {}</h1>", state.machine_id))
}

async fn cluster2(State(state): State<ResponderState>) -> Html<String> {
    Html(format!("<h1>Hello from cluster2! FROM: {}</h1>", state.machine_id))
}

pub async fn serve(cfg: &ResponderConfig) -> Result<()> {
    let addr = cfg.socket_addr()?;
    info!(%addr, machine_id = %cfg.machine_id, "starting responder");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(cfg))
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    info!("responder shut down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn test_router() -> Router {
        router(&ResponderConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            machine_id: "i-0abc123".to_string(),
            request_timeout_secs: 5,
        })
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn root_route_reports_machine_id() {
        let response = test_router()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_string(response).await,
            "<h1>Hello, World! FROM: i-0abc123</h1>"
        );
    }

    #[tokio::test]
    async fn cluster_routes_name_their_cluster() {
        for cluster in ["cluster1", "cluster2"] {
            let response = test_router()
                .oneshot(
                    Request::builder()
                        .uri(format!("/{cluster}"))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let body = body_string(response).await;
            assert!(body.contains(cluster));
            assert!(body.contains("i-0abc123"));
        }
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let response = test_router()
            .oneshot(Request::builder().uri("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
