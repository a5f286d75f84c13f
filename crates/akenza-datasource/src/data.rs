//! The data service: answering panel queries with time series frames.
use akenza_client::AkenzaClient;
use chrono::{DateTime, Utc};
use futures_util::stream::FuturesOrdered;
use grafana_plugin_sdk::{backend, data};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    config::ConfigError,
    plugin::AkenzaDataSource,
    query::AkenzaQuery,
    series::{assemble, series_name, SeriesError, TimeSeries},
};

/// Why a query failed.
#[derive(Debug, Error)]
pub enum QueryFailure {
    /// The data source is misconfigured.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The Akenza API call failed.
    #[error(transparent)]
    Api(#[from] akenza_client::Error),
    /// Akenza returned samples that could not be assembled.
    #[error("Invalid time series returned by Akenza: {0}")]
    Series(#[from] SeriesError),
    /// The assembled frame was invalid.
    #[error("Invalid frame: {0}")]
    Frame(#[from] data::Error),
}

/// An error for a single query.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct QueryError {
    ref_id: String,
    source: QueryFailure,
}

impl backend::DataQueryError for QueryError {
    fn ref_id(self) -> String {
        self.ref_id
    }

    fn status(&self) -> backend::DataQueryStatus {
        use backend::DataQueryStatus;
        match &self.source {
            QueryFailure::Config(_) => DataQueryStatus::BadRequest,
            QueryFailure::Api(akenza_client::Error::Unauthorized) => DataQueryStatus::Unauthorized,
            QueryFailure::Api(e) => e
                .status()
                .and_then(|s| http::StatusCode::from_u16(s).ok())
                .map_or(DataQueryStatus::BadGateway, DataQueryStatus::Custom),
            QueryFailure::Series(_) => DataQueryStatus::BadGateway,
            QueryFailure::Frame(_) => DataQueryStatus::Internal,
        }
    }

    fn source(&self) -> backend::ErrorSource {
        match &self.source {
            QueryFailure::Api(_) | QueryFailure::Series(_) => backend::ErrorSource::Downstream,
            QueryFailure::Config(_) | QueryFailure::Frame(_) => backend::ErrorSource::Plugin,
        }
    }
}

/// Fetch the series of a single query.
///
/// Returns `None` for incomplete or hidden queries, which produce no frames.
pub async fn query_series(
    client: &AkenzaClient,
    query: &AkenzaQuery,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Option<TimeSeries>, QueryFailure> {
    let Some(target) = query.target() else {
        debug!(?query, "Skipping incomplete or hidden query");
        return Ok(None);
    };
    let data = client
        .fetch_time_series(target.device_id, target.topic, target.data_key, from, to)
        .await?;
    let series = assemble(
        &data.data_points,
        &series_name(target.device_name, target.data_key),
    )?;
    Ok(Some(series))
}

fn into_response(
    ref_id: String,
    series: Option<TimeSeries>,
) -> Result<backend::DataResponse, QueryFailure> {
    let frames = series.map(|s| s.to_frame()).transpose()?;
    let checked = frames
        .iter()
        .map(data::Frame::check)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(backend::DataResponse::new(ref_id, checked))
}

type Settings = backend::DataSourceInstanceSettings<
    crate::config::AkenzaJsonData,
    crate::config::AkenzaSecureJsonData,
>;

impl AkenzaDataSource {
    async fn run_query(
        &self,
        settings: Option<&Settings>,
        query: backend::DataQuery<AkenzaQuery>,
    ) -> Result<backend::DataResponse, QueryError> {
        let ref_id = query.ref_id;
        let result = match self.client_for(settings).await {
            Ok(client) => query_series(
                &client,
                &query.query,
                query.time_range.from,
                query.time_range.to,
            )
            .await
            .and_then(|series| into_response(ref_id.clone(), series)),
            Err(e) => Err(e.into()),
        };
        result.map_err(|source| {
            warn!(%ref_id, error = %source, "Query failed");
            QueryError { ref_id, source }
        })
    }
}

#[backend::async_trait]
impl backend::DataService for AkenzaDataSource {
    type Query = AkenzaQuery;
    type QueryError = QueryError;
    type Stream = backend::BoxDataResponseStream<Self::QueryError>;

    async fn query_data(
        &self,
        request: backend::QueryDataRequest<Self::Query, Self>,
    ) -> Self::Stream {
        let settings = request.plugin_context.instance_settings;
        Box::pin(
            request
                .queries
                .into_iter()
                .map(|q: backend::DataQuery<Self::Query>| {
                    let plugin = self.clone();
                    let settings = settings.clone();
                    async move { plugin.run_query(settings.as_ref(), q).await }
                })
                .collect::<FuturesOrdered<_>>(),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use akenza_client::{testing::FakeTransport, Route, UNAUTHORIZED_MESSAGE};
    use chrono::TimeZone;
    use grafana_plugin_sdk::backend::{DataQueryError, DataQueryStatus, ErrorSource};
    use http::Method;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap(),
        )
    }

    fn sensor_query() -> AkenzaQuery {
        serde_json::from_value(json!({
            "refId": "A",
            "deviceId": "d1",
            "device": {"id": "d1", "name": "Sensor A"},
            "topic": "telemetry",
            "dataKey": "temperature",
        }))
        .unwrap()
    }

    fn client(transport: &Arc<FakeTransport>) -> AkenzaClient {
        AkenzaClient::with_transport(transport.clone(), Route::Secure)
    }

    #[tokio::test]
    async fn complete_queries_produce_a_named_series() {
        let transport = Arc::new(FakeTransport::new().respond(
            Method::POST,
            "/v3/devices/d1/query/time-series",
            200,
            json!({"dataPoints": [[21.5, "2024-06-01T12:00:00Z"]], "key": "temperature"}),
        ));
        let (from, to) = window();
        let series = query_series(&client(&transport), &sensor_query(), from, to)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(series.name, "Sensor A - temperature");
        assert_eq!(series.values, vec![21.5]);
        assert_eq!(
            series.time_ms,
            vec![Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap().timestamp_millis()]
        );
        assert!(into_response("A".to_string(), Some(series)).is_ok());
    }

    #[tokio::test]
    async fn hidden_and_incomplete_queries_make_no_requests() {
        let transport = Arc::new(FakeTransport::new());
        let (from, to) = window();
        let mut hidden = sensor_query();
        hidden.hide = true;
        let mut incomplete = sensor_query();
        incomplete.data_key = None;
        for query in [hidden, incomplete] {
            let series = query_series(&client(&transport), &query, from, to).await.unwrap();
            assert_eq!(series, None);
        }
        assert!(transport.requests().is_empty());
        assert!(into_response("A".to_string(), None).is_ok());
    }

    #[tokio::test]
    async fn failures_are_not_turned_into_empty_series() {
        let transport = Arc::new(FakeTransport::new().respond(
            Method::POST,
            "/v3/devices/d1/query/time-series",
            401,
            json!({}),
        ));
        let (from, to) = window();
        let source = query_series(&client(&transport), &sensor_query(), from, to)
            .await
            .unwrap_err();
        let err = QueryError {
            ref_id: "A".to_string(),
            source,
        };
        assert_eq!(err.to_string(), UNAUTHORIZED_MESSAGE);
        assert!(matches!(err.status(), DataQueryStatus::Unauthorized));
        assert_eq!(DataQueryError::source(&err), ErrorSource::Downstream);
        assert_eq!(err.ref_id(), "A");
    }

    #[test]
    fn statuses_follow_the_failure() {
        let err = |source| QueryError {
            ref_id: "A".to_string(),
            source,
        };
        let api = err(QueryFailure::Api(akenza_client::Error::Api {
            status: 404,
            status_text: "Not Found".to_string(),
            message: "Device not found".to_string(),
        }));
        assert_eq!(api.to_string(), "404 Not Found: Device not found");
        assert!(matches!(
            api.status(),
            DataQueryStatus::Custom(s) if s == http::StatusCode::NOT_FOUND
        ));

        let unknown = err(QueryFailure::Api(akenza_client::Error::Unknown {
            detail: "connection reset".to_string(),
        }));
        assert!(matches!(unknown.status(), DataQueryStatus::BadGateway));
        assert!(!unknown.to_string().contains("connection reset"));

        let config = err(QueryFailure::Config(ConfigError::MissingApiKey));
        assert!(matches!(config.status(), DataQueryStatus::BadRequest));
        assert_eq!(DataQueryError::source(&config), ErrorSource::Plugin);
    }
}
