//! Health checks ("Save & Test") and metrics collection.
use std::convert::Infallible;

use akenza_client::AkenzaClient;
use grafana_plugin_sdk::backend;
use tracing::{info, warn};

use crate::{config::ConfigError, plugin::AkenzaDataSource};

/// Message reported by a successful health check.
pub const HEALTHY_MESSAGE: &str = "Success";

/// Test the configured credentials of an instance.
pub async fn health(client: Result<AkenzaClient, ConfigError>) -> backend::CheckHealthResponse {
    let client = match client {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "Data source is misconfigured");
            return backend::CheckHealthResponse::error(e.to_string());
        }
    };
    match client.test_connection().await {
        Ok(()) => {
            info!(route = %client.route(), "Health check succeeded");
            backend::CheckHealthResponse::ok(HEALTHY_MESSAGE.to_string())
        }
        Err(e) => {
            warn!(route = %client.route(), error = ?e, "Health check failed");
            backend::CheckHealthResponse::error(e.to_string())
        }
    }
}

#[backend::async_trait]
impl backend::DiagnosticsService for AkenzaDataSource {
    type CheckHealthError = Infallible;

    async fn check_health(
        &self,
        request: backend::CheckHealthRequest<Self>,
    ) -> Result<backend::CheckHealthResponse, Self::CheckHealthError> {
        let client = self
            .client_for(request.plugin_context.instance_settings.as_ref())
            .await;
        Ok(health(client).await)
    }

    type CollectMetricsError = prometheus::Error;

    async fn collect_metrics(
        &self,
        _request: backend::CollectMetricsRequest<Self>,
    ) -> Result<backend::CollectMetricsResponse, Self::CollectMetricsError> {
        self.metrics.encode()
    }
}
