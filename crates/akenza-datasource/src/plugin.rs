//! The plugin type and its per-instance client cache.
use std::{collections::HashMap, fmt, sync::Arc};

use akenza_client::{AkenzaClient, Credential, HttpTransport, Transport};
use chrono::{DateTime, Utc};
use grafana_plugin_sdk::{backend, prelude::*};
use tokio::sync::RwLock;
use tracing::info;

use crate::{
    config::{credential_from_settings, AkenzaJsonData, AkenzaSecureJsonData, ConfigError},
    metrics::{InstrumentedTransport, Metrics},
};

/// Builds the transport for a data source instance.
pub type Connector = Arc<
    dyn Fn(&AkenzaJsonData, Credential) -> Result<Arc<dyn Transport>, ConfigError> + Send + Sync,
>;

fn http_connector() -> Connector {
    Arc::new(|json: &AkenzaJsonData, credential: Credential| {
        let base_url = json.validated_base_url()?;
        let transport = HttpTransport::new(base_url, credential, json.timeout())?;
        Ok(Arc::new(transport) as Arc<dyn Transport>)
    })
}

/// Identifies one lifetime of a data source instance.
///
/// Saving a data source's settings bumps `updated`, which starts a new lifetime.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InstanceId {
    /// The data source uid.
    pub uid: String,
    /// When the settings were last saved.
    pub updated: DateTime<Utc>,
}

impl InstanceId {
    pub(crate) fn of(
        settings: &backend::DataSourceInstanceSettings<AkenzaJsonData, AkenzaSecureJsonData>,
    ) -> Self {
        Self {
            uid: settings.uid.clone(),
            updated: settings.updated,
        }
    }
}

/// Clients per data source instance.
///
/// A client (and so its resolved access scope) lives as long as the instance's
/// settings are unchanged.
#[derive(Clone)]
pub struct Instances {
    clients: Arc<RwLock<HashMap<String, (DateTime<Utc>, AkenzaClient)>>>,
    connector: Connector,
    metrics: Metrics,
}

impl fmt::Debug for Instances {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instances").finish_non_exhaustive()
    }
}

impl Instances {
    /// Create an empty cache using `connector` to build transports.
    pub fn new(connector: Connector, metrics: Metrics) -> Self {
        Self {
            clients: Default::default(),
            connector,
            metrics,
        }
    }

    /// Return the client of an instance, creating it if the instance is new or was reconfigured.
    pub async fn client(
        &self,
        id: &InstanceId,
        json: &AkenzaJsonData,
        secure: &AkenzaSecureJsonData,
    ) -> Result<AkenzaClient, ConfigError> {
        if let Some((updated, client)) = self.clients.read().await.get(&id.uid) {
            if *updated == id.updated {
                return Ok(client.clone());
            }
        }

        let mut clients = self.clients.write().await;
        // Another request may have created the client while we waited for the lock.
        if let Some((updated, client)) = clients.get(&id.uid) {
            if *updated == id.updated {
                return Ok(client.clone());
            }
        }
        let credential = credential_from_settings(json, secure)?;
        let route = credential.route();
        let transport = (self.connector)(json, credential)?;
        let client = AkenzaClient::with_transport(
            Arc::new(InstrumentedTransport::new(transport, self.metrics.clone())),
            route,
        );
        info!(uid = %id.uid, updated = %id.updated, %route, "Created Akenza client for data source instance");
        clients.insert(id.uid.clone(), (id.updated, client.clone()));
        Ok(client)
    }
}

/// The Akenza data source plugin.
#[derive(Clone, Debug, GrafanaPlugin)]
#[grafana_plugin(
    plugin_type = "datasource",
    json_data = "AkenzaJsonData",
    secure_json_data = "AkenzaSecureJsonData"
)]
pub struct AkenzaDataSource {
    pub(crate) instances: Instances,
    pub(crate) metrics: Metrics,
}

impl AkenzaDataSource {
    /// Create the plugin, calling the Akenza API over HTTP.
    pub fn new() -> Result<Self, prometheus::Error> {
        Ok(Self::with_connector(http_connector(), Metrics::new()?))
    }

    /// Create the plugin with a custom transport factory.
    pub fn with_connector(connector: Connector, metrics: Metrics) -> Self {
        Self {
            instances: Instances::new(connector, metrics.clone()),
            metrics,
        }
    }

    /// The client for the instance a request was made on behalf of.
    pub(crate) async fn client_for(
        &self,
        settings: Option<
            &backend::DataSourceInstanceSettings<AkenzaJsonData, AkenzaSecureJsonData>,
        >,
    ) -> Result<AkenzaClient, ConfigError> {
        let settings = settings.ok_or(ConfigError::MissingInstanceSettings)?;
        self.instances
            .client(
                &InstanceId::of(settings),
                &settings.json_data,
                &settings.decrypted_secure_json_data,
            )
            .await
    }
}
