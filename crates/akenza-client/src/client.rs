use std::{sync::Arc, time::Duration};

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;
use tracing::{debug, instrument};

use crate::{
    access::{self, AccessResolver, AccessScope},
    api::Api,
    credential::{Credential, Route},
    error::Error,
    transport::{HttpTransport, Transport, TransportError},
    types::{Device, DeviceRecord, Page, TimeSeriesData},
};

/// Client for the Akenza inventory and time-series endpoints.
///
/// Cloning is cheap; clones share the same [`AccessResolver`], so the access
/// scope of the API key is resolved at most once across all of them.
#[derive(Clone, Debug)]
pub struct AkenzaClient {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    api: Api,
    access: AccessResolver,
}

impl AkenzaClient {
    /// Create a client calling `base_url` directly with the given credential.
    pub fn new(
        base_url: impl Into<String>,
        credential: Credential,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let route = credential.route();
        let transport = HttpTransport::new(base_url, credential, timeout)?;
        Ok(Self::with_transport(Arc::new(transport), route))
    }

    /// Create a client using a custom [`Transport`].
    pub fn with_transport(transport: Arc<dyn Transport>, route: Route) -> Self {
        let api = Api::new(transport, route);
        Self {
            inner: Arc::new(Inner {
                access: AccessResolver::new(api.clone()),
                api,
            }),
        }
    }

    /// The route every request of this client takes.
    pub fn route(&self) -> Route {
        self.inner.api.route()
    }

    /// The organization and workspaces the API key may read.
    pub async fn access_scope(&self) -> Result<AccessScope, Error> {
        self.inner.access.resolve().await
    }

    /// Check that the API key is accepted, using the cheapest authenticated call.
    #[instrument(skip(self), fields(route = %self.route()))]
    pub async fn test_connection(&self) -> Result<(), Error> {
        let api = &self.inner.api;
        let _: serde_json::Value = api.send(access::organizations_request(api)).await?;
        Ok(())
    }

    /// List the devices visible to the API key, optionally filtered server-side by `search`.
    #[instrument(skip(self))]
    pub async fn list_devices(&self, search: Option<&str>) -> Result<Vec<Device>, Error> {
        let scope = self.access_scope().await?;
        let api = &self.inner.api;
        let mut request = api
            .get("/v3/assets")
            .with_query("type", "DEVICE")
            .with_query("fields", "id,name");
        if scope.all {
            request = request.with_query("organizationId", scope.organization_id.as_str());
        } else {
            for workspace_id in &scope.workspace_ids {
                request = request.with_query("workspaceIds", workspace_id.as_str());
            }
        }
        if let Some(search) = search.filter(|s| !s.is_empty()) {
            request = request.with_query("search", search);
        }
        let page: Page<Device> = api.send(request).await?;
        debug!(count = page.content.len(), "Listed devices");
        Ok(page.content)
    }

    /// List the topics a device has published on.
    #[instrument(skip(self))]
    pub async fn list_topics(&self, device_id: &str) -> Result<Vec<String>, Error> {
        let api = &self.inner.api;
        api.send(api.get(format!("/v3/devices/{device_id}/query/topics")))
            .await
    }

    /// List the data keys of a topic.
    ///
    /// The keys are taken from the most recent record only, so keys missing from
    /// that record are not reported.
    #[instrument(skip(self))]
    pub async fn list_data_keys(&self, device_id: &str, topic: &str) -> Result<Vec<String>, Error> {
        let api = &self.inner.api;
        let records: Vec<DeviceRecord> = api
            .send(api.post(
                format!("/v3/devices/{device_id}/query"),
                json!({"topic": topic, "limit": 1, "skip": 0}),
            ))
            .await?;
        Ok(records
            .into_iter()
            .next()
            .and_then(|record| match record.data {
                serde_json::Value::Object(data) => Some(data.keys().cloned().collect()),
                _ => None,
            })
            .unwrap_or_default())
    }

    /// Fetch the samples of `data_key` in the closed interval `[from, to]`.
    #[instrument(skip(self))]
    pub async fn fetch_time_series(
        &self,
        device_id: &str,
        topic: &str,
        data_key: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<TimeSeriesData, Error> {
        let api = &self.inner.api;
        let data: TimeSeriesData = api
            .send(api.post(
                format!("/v3/devices/{device_id}/query/time-series"),
                json!({
                    "dataKey": data_key,
                    "topic": topic,
                    "timestamp": {
                        "gte": iso_timestamp(from),
                        "lte": iso_timestamp(to),
                    },
                }),
            ))
            .await?;
        debug!(points = data.data_points.len(), "Fetched time series");
        Ok(data)
    }
}

fn iso_timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The inventory lookups driving the query editor's cascading selection.
#[async_trait::async_trait]
pub trait Inventory: Send + Sync + 'static {
    /// Devices matching `search`, or all devices when it is `None`.
    async fn devices(&self, search: Option<String>) -> Result<Vec<Device>, Error>;
    /// Topics of a device.
    async fn topics(&self, device_id: String) -> Result<Vec<String>, Error>;
    /// Data keys of a device topic.
    async fn data_keys(&self, device_id: String, topic: String) -> Result<Vec<String>, Error>;
}

#[async_trait::async_trait]
impl Inventory for AkenzaClient {
    async fn devices(&self, search: Option<String>) -> Result<Vec<Device>, Error> {
        self.list_devices(search.as_deref()).await
    }

    async fn topics(&self, device_id: String) -> Result<Vec<String>, Error> {
        self.list_topics(&device_id).await
    }

    async fn data_keys(&self, device_id: String, topic: String) -> Result<Vec<String>, Error> {
        self.list_data_keys(&device_id, &topic).await
    }
}
