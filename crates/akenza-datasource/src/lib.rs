/*! A Grafana backend data source for the [Akenza] IoT platform.

Panels query the numeric history of one data key of one device topic. Queries are
built in the query editor by picking a device, then one of its topics, then one of
the topic's data keys; the options come from the [`resource`] endpoints and the
selection logic lives in [`editor`].

The plugin implements three of the SDK's services on [`AkenzaDataSource`]:

- [`backend::DataService`](grafana_plugin_sdk::backend::DataService): fetches each
  complete query's time series and returns it as a single frame,
- [`backend::DiagnosticsService`](grafana_plugin_sdk::backend::DiagnosticsService):
  tests the configured API key and exposes Prometheus metrics,
- [`backend::ResourceService`](grafana_plugin_sdk::backend::ResourceService): serves
  the query editor's dropdown options.

[Akenza]: https://akenza.io
*/
#![warn(missing_docs)]

pub mod config;
pub mod data;
pub mod diagnostics;
pub mod editor;
pub mod metrics;
pub mod plugin;
pub mod query;
pub mod resource;
pub mod series;

pub use config::{AkenzaJsonData, AkenzaSecureJsonData, ConfigEditor, ConfigError};
pub use plugin::{AkenzaDataSource, InstanceId, Instances};
pub use query::{AkenzaQuery, SelectOption};
