use std::{fmt, sync::Arc};

use http::Method;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{
    credential::Route,
    error::{Error, ErrorBody},
    transport::{ApiRequest, ApiResponse, Transport},
};

/// The single request-execution primitive every API call goes through.
///
/// Stamps the route chosen at construction onto each request, turns non-2xx
/// responses into normalised [`Error`]s and decodes successful bodies.
#[derive(Clone)]
pub(crate) struct Api {
    transport: Arc<dyn Transport>,
    route: Route,
}

impl fmt::Debug for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Api").field("route", &self.route).finish()
    }
}

impl Api {
    pub(crate) fn new(transport: Arc<dyn Transport>, route: Route) -> Self {
        Self { transport, route }
    }

    pub(crate) fn route(&self) -> Route {
        self.route
    }

    pub(crate) fn get(&self, path: impl Into<String>) -> ApiRequest {
        ApiRequest::new(self.route, Method::GET, path)
    }

    pub(crate) fn post(&self, path: impl Into<String>, body: serde_json::Value) -> ApiRequest {
        ApiRequest::new(self.route, Method::POST, path).with_body(body)
    }

    /// Execute a request and decode its JSON body.
    pub(crate) async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, Error> {
        let method = request.method.clone();
        let path = request.path.clone();
        let response = self.transport.execute(request).await.map_err(|e| {
            warn!(route = %self.route, %method, %path, error = %e, "Akenza request failed");
            Error::unknown(e.to_string())
        })?;
        debug!(route = %self.route, %method, %path, status = response.status, "Akenza request completed");
        decode(response)
    }
}

fn decode<T: DeserializeOwned>(response: ApiResponse) -> Result<T, Error> {
    if !response.is_success() {
        // An unparseable error body is treated the same as a missing one.
        let body = serde_json::from_slice::<ErrorBody>(&response.body).ok();
        let error = Error::from_response(response.status, &response.status_text, body.as_ref());
        warn!(status = response.status, error = %error, "Akenza API returned an error");
        return Err(error);
    }
    serde_json::from_slice(&response.body)
        .map_err(|e| Error::unknown(format!("unexpected response body: {e}")))
}
