//! Prometheus metrics for upstream API calls.
use std::{sync::Arc, time::Instant};

use akenza_client::{ApiRequest, ApiResponse, Transport, TransportError};
use grafana_plugin_sdk::backend;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

/// The plugin's metrics registry.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    requests: IntCounterVec,
    duration: HistogramVec,
}

impl Metrics {
    /// Create and register the plugin's metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let requests = IntCounterVec::new(
            Opts::new(
                "akenza_api_requests_total",
                "Requests made to the Akenza API, by route and outcome.",
            ),
            &["route", "outcome"],
        )?;
        let duration = HistogramVec::new(
            HistogramOpts::new(
                "akenza_api_request_duration_seconds",
                "Latency of requests made to the Akenza API.",
            ),
            &["route"],
        )?;
        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(duration.clone()))?;
        Ok(Self {
            registry,
            requests,
            duration,
        })
    }

    fn observe(&self, route: &str, outcome: &str, seconds: f64) {
        self.requests.with_label_values(&[route, outcome]).inc();
        self.duration.with_label_values(&[route]).observe(seconds);
    }

    /// Encode all metrics in the Prometheus text format.
    pub fn encode(&self) -> Result<backend::CollectMetricsResponse, prometheus::Error> {
        let mut buffer = vec![];
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(backend::CollectMetricsResponse::new(Some(
            backend::MetricsPayload::prometheus(buffer),
        )))
    }

    #[cfg(test)]
    pub(crate) fn request_count(&self, route: &str, outcome: &str) -> u64 {
        self.requests.with_label_values(&[route, outcome]).get()
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

fn outcome(result: &Result<ApiResponse, TransportError>) -> &'static str {
    match result {
        Ok(r) if r.status < 200 => "1xx",
        Ok(r) if r.status < 300 => "2xx",
        Ok(r) if r.status < 400 => "3xx",
        Ok(r) if r.status < 500 => "4xx",
        Ok(_) => "5xx",
        Err(_) => "error",
    }
}

/// A [`Transport`] decorator recording request counts and latencies.
pub struct InstrumentedTransport {
    inner: Arc<dyn Transport>,
    metrics: Metrics,
}

impl InstrumentedTransport {
    /// Wrap `inner`, recording into `metrics`.
    pub fn new(inner: Arc<dyn Transport>, metrics: Metrics) -> Self {
        Self { inner, metrics }
    }
}

#[backend::async_trait]
impl Transport for InstrumentedTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let route = request.route;
        let start = Instant::now();
        let result = self.inner.execute(request).await;
        self.metrics.observe(
            route.as_str(),
            outcome(&result),
            start.elapsed().as_secs_f64(),
        );
        result
    }
}
