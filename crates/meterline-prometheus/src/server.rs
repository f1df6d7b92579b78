// Copyright (C) 2026  winnyboy5
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//! HTTP server for the scrape endpoint
//!
//! Serves whatever a [`Servable`] renders on a configurable route, plus a
//! `/health` check.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use meterline_sdk::{PrometheusConfig, Servable, HEALTH_PATH};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// HTTP server exposing a [`Servable`]
///
/// Keeps only a shared handle to the exporter; the exporter keeps
/// receiving pushes while the server is running.
#[derive(Clone)]
pub struct MetricsServer {
    exposition: Arc<dyn Servable>,
    config: PrometheusConfig,
}

impl MetricsServer {
    /// Create a new metrics server
    ///
    /// # Arguments
    /// * `exposition` - The exporter to serve
    /// * `port` - Port to bind the server to
    pub fn new<S: Servable + 'static>(exposition: Arc<S>, port: u16) -> Self {
        Self {
            exposition,
            config: PrometheusConfig::with_port(port),
        }
    }

    /// Create a new metrics server with custom configuration
    pub fn with_config<S: Servable + 'static>(exposition: Arc<S>, config: PrometheusConfig) -> Self {
        Self { exposition, config }
    }

    /// Get the bind address for the server
    pub fn bind_address(&self) -> String {
        self.config.socket_addr()
    }

    /// Router with the scrape route and `/health`
    ///
    /// A scrape route configured as `/health` shadows the health check.
    pub fn router(&self) -> Router {
        let router: Router<Arc<dyn Servable>> =
            Router::new().route(&self.config.path, get(metrics_handler));
        let router = if self.config.path == HEALTH_PATH {
            warn!(path = %self.config.path, "Scrape route shadows the health check");
            router
        } else {
            router.route(HEALTH_PATH, get(health_handler))
        };
        router.with_state(Arc::clone(&self.exposition))
    }

    /// Start the metrics server
    ///
    /// This method runs the server indefinitely. It should typically be spawned
    /// as a background task.
    ///
    /// # Example
    /// ```ignore
    /// let server = MetricsServer::new(exporter, 9184);
    /// tokio::spawn(async move {
    ///     server.serve().await
    /// });
    /// ```
    pub async fn serve(self) -> anyhow::Result<()> {
        if !self.config.enabled {
            info!("Metrics server disabled");
            return Ok(());
        }

        let addr = self.config.socket_addr();
        let listener = TcpListener::bind(&addr).await?;
        self.serve_on(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve_on(self, listener: TcpListener) -> anyhow::Result<()> {
        let addr = listener.local_addr()?;
        info!("Metrics server listening on http://{}{}", addr, self.config.path);

        axum::serve(listener, self.router())
            .await
            .map_err(|e| anyhow::anyhow!("Metrics server error: {}", e))
    }
}

impl std::fmt::Debug for MetricsServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsServer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Handler for the scrape route
async fn metrics_handler(State(exposition): State<Arc<dyn Servable>>) -> Response {
    let rendered = exposition.render();
    debug!(bytes = rendered.body.len(), "Serving metrics");

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, rendered.content_type)],
        rendered.body,
    )
        .into_response()
}

/// Handler for `/health` endpoint
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PrometheusExporter;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    #[test]
    fn test_server_creation() {
        let server = MetricsServer::new(Arc::new(PrometheusExporter::new()), 9191);
        assert_eq!(server.bind_address(), "127.0.0.1:9191");
    }

    #[test]
    fn test_server_with_config() {
        let config = PrometheusConfig {
            port: 8080,
            bind_address: "0.0.0.0".to_string(),
            ..Default::default()
        };

        let server = MetricsServer::with_config(Arc::new(PrometheusExporter::new()), config);
        assert_eq!(server.bind_address(), "0.0.0.0:8080");
    }

    #[tokio::test]
    async fn test_metrics_route() {
        let server = MetricsServer::new(Arc::new(PrometheusExporter::new()), 9192);
        let response = server
            .router()
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            crate::renderer::CONTENT_TYPE
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_custom_path() {
        let config = PrometheusConfig {
            path: "/scrape".to_string(),
            ..Default::default()
        };
        let server = MetricsServer::with_config(Arc::new(PrometheusExporter::new()), config);

        let found = server
            .router()
            .oneshot(Request::get("/scrape").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(found.status(), StatusCode::OK);

        let missing = server
            .router()
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_route() {
        let server = MetricsServer::new(Arc::new(PrometheusExporter::new()), 9193);
        let response = server
            .router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn test_scrape_route_on_health_path() {
        let config = PrometheusConfig {
            path: HEALTH_PATH.to_string(),
            ..Default::default()
        };
        let server = MetricsServer::with_config(Arc::new(PrometheusExporter::new()), config);

        let response = server
            .router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            crate::renderer::CONTENT_TYPE
        );
    }

    #[tokio::test]
    async fn test_disabled_server() {
        let config = PrometheusConfig {
            enabled: false,
            ..Default::default()
        };

        let server = MetricsServer::with_config(Arc::new(PrometheusExporter::new()), config);

        // Server should return immediately when disabled
        let result = server.serve().await;
        assert!(result.is_ok());
    }
}
