//! `reqwest` implementation of [`RemoteCartService`].

use async_trait::async_trait;
use pharmacart_core::{AccessToken, CartLine, ProductId};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, instrument};
use url::Url;

use super::types::{CartResponse, LineQuantityRequest, error_message};
use super::{RemoteCartService, RemoteError};
use crate::config::ApiConfig;

/// HTTP client for the account cart endpoints.
#[derive(Clone)]
pub struct HttpCartService {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpCartService {
    /// Create a new cart API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("pharmacart/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// Resolve an endpoint path against the configured base URL.
    fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
        self.base_url
            .join(path)
            .map_err(|e| RemoteError::Parse(format!("Invalid endpoint {path}: {e}")))
    }

    /// Build an authenticated request.
    fn request(
        &self,
        method: Method,
        path: &str,
        token: &AccessToken,
    ) -> Result<RequestBuilder, RemoteError> {
        Ok(self
            .client
            .request(method, self.endpoint(path)?)
            .bearer_auth(token.expose()))
    }

    /// Send a request and map non-success statuses to [`RemoteError`].
    async fn send(request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body);
        debug!(status = %status, message = %message, "Cart API returned non-success status");

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::Auth(message),
            StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                RemoteError::Validation(message)
            }
            StatusCode::NOT_FOUND => RemoteError::NotFound(message),
            _ => RemoteError::Api {
                status: status.as_u16(),
                message,
            },
        })
    }
}

#[async_trait]
impl RemoteCartService for HttpCartService {
    #[instrument(skip(self, token))]
    async fn fetch_cart(&self, token: &AccessToken) -> Result<Vec<CartLine>, RemoteError> {
        let response = Self::send(self.request(Method::GET, "cart/", token)?).await?;
        let text = response.text().await?;

        let cart: CartResponse =
            serde_json::from_str(&text).map_err(|e| RemoteError::Parse(e.to_string()))?;
        Ok(cart.into_lines())
    }

    #[instrument(skip(self, token), fields(product_id = %product_id))]
    async fn add_line(
        &self,
        token: &AccessToken,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), RemoteError> {
        let body = LineQuantityRequest {
            product_id: product_id.as_str(),
            quantity,
        };
        Self::send(self.request(Method::POST, "cart/add", token)?.json(&body)).await?;
        Ok(())
    }

    #[instrument(skip(self, token), fields(product_id = %product_id))]
    async fn update_line(
        &self,
        token: &AccessToken,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), RemoteError> {
        let body = LineQuantityRequest {
            product_id: product_id.as_str(),
            quantity,
        };
        Self::send(self.request(Method::PUT, "cart/update", token)?.json(&body)).await?;
        Ok(())
    }

    #[instrument(skip(self, token), fields(product_id = %product_id))]
    async fn remove_line(
        &self,
        token: &AccessToken,
        product_id: &ProductId,
    ) -> Result<(), RemoteError> {
        let path = format!("cart/remove/{}", urlencoding::encode(product_id.as_str()));
        Self::send(self.request(Method::DELETE, &path, token)?).await?;
        Ok(())
    }

    #[instrument(skip(self, token))]
    async fn clear_cart(&self, token: &AccessToken) -> Result<(), RemoteError> {
        Self::send(self.request(Method::DELETE, "cart/clear", token)?).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn service(base: &str) -> HttpCartService {
        HttpCartService::new(&ApiConfig::new(base).unwrap()).unwrap()
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let service = service("https://api.example.in/v1");
        assert_eq!(
            service.endpoint("cart/").unwrap().as_str(),
            "https://api.example.in/v1/cart/"
        );
        assert_eq!(
            service.endpoint("cart/remove/a%2Fb").unwrap().path(),
            "/v1/cart/remove/a%2Fb"
        );
    }

    #[test]
    fn test_request_sets_bearer_auth() {
        let service = service("http://localhost:8000");
        let request = service
            .request(Method::GET, "cart/", &AccessToken::new("tok-123"))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.url().as_str(), "http://localhost:8000/cart/");
        assert_eq!(
            request.headers()["authorization"].to_str().unwrap(),
            "Bearer tok-123"
        );
    }
}
