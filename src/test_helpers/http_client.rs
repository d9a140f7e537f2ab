use std::sync::Arc;

use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};

/// Creates an HTTP client without retry middleware for testing purposes.
///
/// Tests asserting on error responses want exactly one request per send, so
/// the retry layer is deliberately absent.
pub fn plain_http_client() -> Arc<ClientWithMiddleware> {
    Arc::new(ClientBuilder::new(Client::new()).build())
}
