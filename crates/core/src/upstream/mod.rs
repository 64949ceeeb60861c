//! Upstream marketplace access.
//!
//! [`UpstreamApi`] performs single requests; [`AccessLayer`] wraps them with a
//! fixed-delay retry policy and transparent token refresh.

mod access;
mod config;
mod error;
mod http;
mod traits;
mod types;

pub use access::AccessLayer;
pub use config::{RetryPolicy, UpstreamConfig};
pub use error::UpstreamError;
pub use http::HttpUpstreamClient;
pub use traits::UpstreamApi;
pub use types::*;
