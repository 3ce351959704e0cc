//! HTTP-backed network clients.
//!
//! Both clients describe requests with [`HttpRequest`] and execute them on the
//! injected [`HttpClient`]; neither retries.

mod cloud;
mod pink_spider;

pub use cloud::CloudApiClient;
pub use pink_spider::PinkSpiderClient;

use bridge_traits::http::{HttpClient, HttpRequest};
use serde_json::Value;
use tracing::debug;

use crate::error::{LibraryError, Result};

/// Execute `request` and parse a 2xx body as JSON.
async fn get_json(http: &dyn HttpClient, request: HttpRequest) -> Result<Value> {
    let url = request.url.clone();
    let response = http.execute(request).await?.error_for_status()?;
    debug!(url = %url, status = response.status, "Received response");
    response
        .json::<Value>()
        .map_err(|e| LibraryError::Decode(format!("Invalid JSON from {}: {}", url, e)))
}
