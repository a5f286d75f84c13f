//! Resource endpoints backing the query editor's dropdowns.
//!
//! - `GET /devices?search=<text>`
//! - `GET /topics?deviceId=<id>`
//! - `GET /data-keys?deviceId=<id>&topic=<topic>`
//!
//! Each responds with a JSON array of [`SelectOption`]s.
use akenza_client::Inventory;
use bytes::Bytes;
use grafana_plugin_sdk::backend;
use http::{Method, Response, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::{config::ConfigError, plugin::AkenzaDataSource, query::SelectOption};

/// Errors returned from resource calls.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// A required query parameter was missing or empty.
    #[error("Missing query parameter {0:?}")]
    MissingParameter(&'static str),
    /// The query string could not be decoded.
    #[error("Invalid query string: {0}")]
    InvalidQuery(#[from] serde_urlencoded::de::Error),
    /// No resource exists at the path.
    #[error("Resource {0:?} not found")]
    NotFound(String),
    /// Only `GET` is supported.
    #[error("Method {0} not allowed")]
    MethodNotAllowed(Method),
    /// The data source is misconfigured.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The Akenza API call failed.
    #[error(transparent)]
    Api(#[from] akenza_client::Error),
    /// The response could not be built.
    #[error("HTTP error: {0}")]
    Http(#[from] http::Error),
    /// The response could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ResourceError {
    fn status(&self) -> StatusCode {
        match self {
            Self::MissingParameter(_) | Self::InvalidQuery(_) | Self::Config(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Api(akenza_client::Error::Unauthorized) => StatusCode::UNAUTHORIZED,
            Self::Api(e) => e
                .status()
                .and_then(|s| StatusCode::from_u16(s).ok())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            Self::Http(_) | Self::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl backend::ErrIntoHttpResponse for ResourceError {
    fn into_http_response(self) -> Result<Response<Bytes>, Box<dyn std::error::Error>> {
        Ok(Response::builder()
            .status(self.status())
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Bytes::from(serde_json::to_vec(
                &serde_json::json!({"error": self.to_string()}),
            )?))?)
    }
}

#[derive(Debug, Default, Deserialize)]
struct DeviceParams {
    search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TopicParams {
    device_id: Option<String>,
    topic: Option<String>,
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ResourceError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(ResourceError::MissingParameter(name))
}

/// A parsed resource request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resource {
    /// Devices, optionally filtered server-side.
    Devices {
        /// Search text; empty means no filter.
        search: Option<String>,
    },
    /// Topics of a device.
    Topics {
        /// Device id.
        device_id: String,
    },
    /// Data keys of a device topic.
    DataKeys {
        /// Device id.
        device_id: String,
        /// Topic.
        topic: String,
    },
}

impl Resource {
    /// Parse a request path and query string.
    pub fn parse(path: &str, query: Option<&str>) -> Result<Self, ResourceError> {
        let query = query.unwrap_or_default();
        match path.trim_matches('/') {
            "devices" => {
                let params: DeviceParams = serde_urlencoded::from_str(query)?;
                Ok(Self::Devices {
                    search: params.search.filter(|s| !s.is_empty()),
                })
            }
            "topics" => {
                let params: TopicParams = serde_urlencoded::from_str(query)?;
                Ok(Self::Topics {
                    device_id: required(params.device_id, "deviceId")?,
                })
            }
            "data-keys" => {
                let params: TopicParams = serde_urlencoded::from_str(query)?;
                Ok(Self::DataKeys {
                    device_id: required(params.device_id, "deviceId")?,
                    topic: required(params.topic, "topic")?,
                })
            }
            other => Err(ResourceError::NotFound(other.to_string())),
        }
    }

    /// Look the resource up, returning the JSON body of the response.
    pub async fn fetch<I: Inventory>(self, inventory: &I) -> Result<Vec<u8>, ResourceError> {
        let body = match self {
            Self::Devices { search } => {
                let options: Vec<_> = inventory
                    .devices(search)
                    .await?
                    .into_iter()
                    .map(SelectOption::device)
                    .collect();
                serde_json::to_vec(&options)?
            }
            Self::Topics { device_id } => {
                text_options(inventory.topics(device_id).await?)?
            }
            Self::DataKeys { device_id, topic } => {
                text_options(inventory.data_keys(device_id, topic).await?)?
            }
        };
        Ok(body)
    }
}

fn text_options(values: Vec<String>) -> Result<Vec<u8>, serde_json::Error> {
    let options: Vec<_> = values.into_iter().map(SelectOption::text).collect();
    serde_json::to_vec(&options)
}

#[backend::async_trait]
impl backend::ResourceService for AkenzaDataSource {
    type Error = ResourceError;
    type InitialResponse = Response<Bytes>;
    type Stream = backend::BoxResourceStream<Self::Error>;

    async fn call_resource(
        &self,
        r: backend::CallResourceRequest<Self>,
    ) -> Result<(Self::InitialResponse, Self::Stream), Self::Error> {
        if r.request.method() != Method::GET {
            return Err(ResourceError::MethodNotAllowed(r.request.method().clone()));
        }
        let resource = Resource::parse(r.request.uri().path(), r.request.uri().query())?;
        debug!(?resource, "Handling resource request");
        let client = self
            .client_for(r.plugin_context.instance_settings.as_ref())
            .await?;
        let body = resource.fetch(&client).await?;
        let response = Response::builder()
            .status(StatusCode::OK)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Bytes::from(body))?;
        Ok((response, Box::pin(futures_util::stream::empty()) as Self::Stream))
    }
}
