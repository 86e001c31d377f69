use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Serialize;

/// Header the proxy reads the shared secret from unless configured otherwise.
pub const DEFAULT_SECRET_HEADER: &str = "x-proxy-secret";

/// Client for services sitting behind the admission proxy.
///
/// Every request carries the shared secret. Callers should set their own
/// timeout: queued requests wait as long as the queue takes to drain.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    client: Client,
    proxy_url: String,
    header_name: String,
    secret: String,
}

impl ProxyClient {
    pub fn new(proxy_url: &str, secret: &str) -> Self {
        Self::with_client(Client::new(), proxy_url, secret)
    }

    /// Use a preconfigured `reqwest::Client` (timeouts, pool settings).
    pub fn with_client(client: Client, proxy_url: &str, secret: &str) -> Self {
        Self {
            client,
            proxy_url: proxy_url.trim_end_matches('/').to_string(),
            header_name: DEFAULT_SECRET_HEADER.to_string(),
            secret: secret.to_string(),
        }
    }

    /// Send the secret in a different header.
    pub fn header_name(mut self, name: &str) -> Self {
        self.header_name = name.to_string();
        self
    }

    /// Start an authenticated request to `path` (path and query).
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.proxy_url, path))
            .header(self.header_name.as_str(), self.secret.as_str())
    }

    pub async fn get(&self, path: &str) -> Result<Response, reqwest::Error> {
        self.request(Method::GET, path).send().await
    }

    pub async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Response, reqwest::Error> {
        self.request(Method::POST, path).json(body).send().await
    }

    /// A rejected-for-load response (503); worth retrying later with backoff.
    pub fn is_backpressure(response: &Response) -> bool {
        response.status() == reqwest::StatusCode::SERVICE_UNAVAILABLE
    }
}
