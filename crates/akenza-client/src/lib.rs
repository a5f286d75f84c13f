/*! Client for the [Akenza] IoT platform REST API.

The client covers the handful of endpoints a dashboard needs:

- the inventory lookups (devices, their topics, and the data keys of a topic)
  used to build queries,
- the time-series endpoint used to answer them,
- a cheap authenticated call used to test a configured API key.

Device listings are scoped to what the API key may see. The [`AccessScope`] of a key
is resolved lazily, once per [`AkenzaClient`], and shared by every clone of it.

All requests go through a [`Transport`]. [`HttpTransport`] calls the API with `reqwest`;
failures are normalised into [`Error`], whose `Display` output is suitable for showing
to users directly.

# Feature flags

- `test-util` - exposes [`testing::FakeTransport`], an in-memory transport with canned responses.

[Akenza]: https://akenza.io
*/
#![warn(missing_docs)]

mod access;
mod api;
mod client;
mod credential;
mod error;
mod transport;
pub mod types;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use access::{AccessResolver, AccessScope};
pub use client::{AkenzaClient, Inventory};
pub use credential::{route_for, Credential, Route, SecretKey};
pub use error::{error_message, Error, ErrorBody, UNAUTHORIZED_MESSAGE, UNKNOWN_ERROR_MESSAGE};
pub use transport::{
    ApiRequest, ApiResponse, HttpTransport, Transport, TransportError, DEFAULT_TIMEOUT,
};
pub use types::{Device, TimeSeriesData, TimeSeriesPoint};
