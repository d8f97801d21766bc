//! REST client for the gateway.
//!
//! Uses `reqwest` 0.13 for HTTP. Single products and unfiltered listings are
//! cached using `moka`.

use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use shopfront_core::{CartLineId, OrderId, ProductId, Quantity};

use crate::config::{GatewayConfig, ProductCacheConfig};
use crate::models::{Cart, Order, Product, ProductPage, ProductQuery, User};
use crate::store::{LocalStore, keys};

use super::cache::{CacheKey, CacheValue};
use super::conversions::{convert_auth, convert_cart, convert_product_page};
use super::types::{
    AddToCartRequest, AuthData, AuthGrant, CartLineData, Envelope, ErrorBody, LoginRequest,
    RegisterRequest, UpdateCartLineRequest,
};
use super::{Gateway, GatewayError};

// =============================================================================
// RestGateway
// =============================================================================

/// Gateway client over the JSON REST API.
///
/// The bearer credential is read from the local store on every request, so a
/// login or logout through any handle sharing the store takes effect
/// immediately.
#[derive(Clone)]
pub struct RestGateway {
    inner: Arc<RestGatewayInner>,
}

struct RestGatewayInner {
    client: reqwest::Client,
    base_url: Url,
    store: Arc<dyn LocalStore>,
    cache: Cache<CacheKey, CacheValue>,
}

impl std::fmt::Debug for RestGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestGateway")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl RestGateway {
    /// Create a new gateway client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        config: &GatewayConfig,
        cache_config: &ProductCacheConfig,
        store: Arc<dyn LocalStore>,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(cache_config.capacity)
            .time_to_live(cache_config.ttl)
            .build();

        Ok(Self {
            inner: Arc::new(RestGatewayInner {
                client,
                base_url: config.base_url.clone(),
                store,
                cache,
            }),
        })
    }

    /// Base URL all endpoint paths are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    /// URL of a single resource under `collection`. The id is pushed as one
    /// percent-encoded path segment, so it can never escape the collection.
    fn resource(&self, collection: &str, id: &str) -> Result<Url, GatewayError> {
        let mut url = self.endpoint(collection)?;
        url.path_segments_mut()
            .map_err(|()| GatewayError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }

    /// Bearer token from the store. A store failure is logged and treated as
    /// no credential; the gateway then answers 401.
    fn bearer(&self) -> Option<String> {
        match self.inner.store.get(keys::TOKEN) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read bearer token");
                None
            }
        }
    }

    /// Build a request for `url` with the bearer credential attached.
    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.inner.client.request(method, url);
        match self.bearer() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and parse the response envelope.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        endpoint: &str,
    ) -> Result<Envelope<T>, GatewayError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(GatewayError::RateLimited(retry_after));
        }

        // Read the body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            return Err(status_error(status, &response_text, endpoint));
        }

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                endpoint,
                error = %e,
                body = %truncate(&response_text, 500),
                "Failed to parse gateway response"
            );
            GatewayError::Parse(e)
        })
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
    ) -> Result<T, GatewayError> {
        let url = self.endpoint(path)?;
        self.fetch_url(method, url, path).await
    }

    /// Like [`Self::fetch`] for a prebuilt URL; `endpoint` labels logs and errors.
    async fn fetch_url<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        endpoint: &str,
    ) -> Result<T, GatewayError> {
        self.execute::<T>(self.request(method, url), endpoint)
            .await?
            .into_data(endpoint)
    }

    /// Send a request whose response payload is irrelevant. The status is
    /// still checked; an empty or non-JSON success body is accepted.
    async fn send_ignoring_data(&self, method: Method, path: &str) -> Result<(), GatewayError> {
        let url = self.endpoint(path)?;
        let response = self.request(method, url).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(GatewayError::RateLimited(1));
        }
        let body = response.text().await?;
        Err(status_error(status, &body, path))
    }

    async fn cart_from(&self, request: RequestBuilder, path: &str) -> Result<Cart, GatewayError> {
        let lines = self
            .execute::<Vec<CartLineData>>(request, path)
            .await?
            .into_data(path)?;
        Ok(convert_cart(lines))
    }
}

/// Map a non-success status to an error carrying the envelope's message.
fn status_error(status: StatusCode, body: &str, endpoint: &str) -> GatewayError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });

    match status {
        StatusCode::UNAUTHORIZED => GatewayError::Unauthorized(message),
        StatusCode::NOT_FOUND => GatewayError::NotFound(message),
        s if s.is_client_error() => {
            debug!(endpoint, status = %s, %message, "Gateway rejected request");
            GatewayError::Rejected {
                status: s.as_u16(),
                message,
            }
        }
        s => {
            tracing::error!(
                endpoint,
                status = %s,
                body = %truncate(body, 500),
                "Gateway returned non-success status"
            );
            GatewayError::Server {
                status: s.as_u16(),
                message,
            }
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[async_trait]
impl Gateway for RestGateway {
    #[instrument(skip(self, request), fields(email = %request.email))]
    async fn register(&self, request: &RegisterRequest<'_>) -> Result<AuthGrant, GatewayError> {
        let path = "auth/register";
        let url = self.endpoint(path)?;
        let data = self
            .execute::<AuthData>(self.inner.client.post(url).json(request), path)
            .await?
            .into_data(path)?;
        Ok(convert_auth(data))
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    async fn login(&self, request: &LoginRequest<'_>) -> Result<AuthGrant, GatewayError> {
        let path = "auth/login";
        let url = self.endpoint(path)?;
        let data = self
            .execute::<AuthData>(self.inner.client.post(url).json(request), path)
            .await?
            .into_data(path)?;
        Ok(convert_auth(data))
    }

    #[instrument(skip(self))]
    async fn current_user(&self) -> Result<User, GatewayError> {
        self.fetch(Method::GET, "auth/me").await
    }

    #[instrument(skip(self))]
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, GatewayError> {
        let unfiltered = query.search.is_none()
            && query.category.is_none()
            && query.size.is_none()
            && query.min_price.is_none()
            && query.max_price.is_none();
        let cache_key = CacheKey::Products {
            page: query.page,
            limit: query.limit,
        };

        // Only unfiltered listings are cached
        if unfiltered
            && let Some(CacheValue::Products(page)) = self.inner.cache.get(&cache_key).await
        {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let path = "products";
        let mut url = self.endpoint(path)?;
        url.query_pairs_mut().extend_pairs(query.to_params());

        let envelope = self
            .execute::<Vec<Product>>(self.request(Method::GET, url), path)
            .await?;
        let pagination = envelope.pagination;
        let page = convert_product_page(envelope.into_data(path)?, pagination, query);

        if unfiltered {
            self.inner
                .cache
                .insert(cache_key, CacheValue::Products(page.clone()))
                .await;
        }

        Ok(page)
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn get_product(&self, id: &ProductId) -> Result<Product, GatewayError> {
        let cache_key = CacheKey::Product(id.clone());

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let url = self.resource("products", id.as_str())?;
        let product: Product = self.fetch_url(Method::GET, url, "products/:id").await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    #[instrument(skip(self))]
    async fn seed_products(&self) -> Result<(), GatewayError> {
        self.send_ignoring_data(Method::POST, "products/seed")
            .await?;
        self.inner.cache.invalidate_all();
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_cart(&self) -> Result<Cart, GatewayError> {
        let url = self.endpoint("cart")?;
        self.cart_from(self.request(Method::GET, url), "cart").await
    }

    #[instrument(skip(self), fields(product_id = %request.product_id, size = %request.size))]
    async fn add_to_cart(&self, request: &AddToCartRequest) -> Result<Cart, GatewayError> {
        let url = self.endpoint("cart")?;
        self.cart_from(self.request(Method::POST, url).json(request), "cart")
            .await
    }

    #[instrument(skip(self), fields(line_id = %line_id, quantity = %quantity))]
    async fn update_cart_line(
        &self,
        line_id: &CartLineId,
        quantity: Quantity,
    ) -> Result<Cart, GatewayError> {
        let url = self.resource("cart", line_id.as_str())?;
        let body = UpdateCartLineRequest { quantity };
        self.cart_from(self.request(Method::PUT, url).json(&body), "cart/:itemId")
            .await
    }

    #[instrument(skip(self), fields(line_id = %line_id))]
    async fn remove_cart_line(&self, line_id: &CartLineId) -> Result<Cart, GatewayError> {
        let url = self.resource("cart", line_id.as_str())?;
        self.cart_from(self.request(Method::DELETE, url), "cart/:itemId")
            .await
    }

    #[instrument(skip(self))]
    async fn clear_cart(&self) -> Result<(), GatewayError> {
        self.send_ignoring_data(Method::DELETE, "cart").await
    }

    #[instrument(skip(self))]
    async fn create_order(&self) -> Result<Order, GatewayError> {
        self.fetch(Method::POST, "orders").await
    }

    #[instrument(skip(self))]
    async fn list_orders(&self) -> Result<Vec<Order>, GatewayError> {
        self.fetch(Method::GET, "orders").await
    }

    #[instrument(skip(self), fields(order_id = %id))]
    async fn get_order(&self, id: &OrderId) -> Result<Order, GatewayError> {
        let url = self.resource("orders", id.as_str())?;
        self.fetch_url(Method::GET, url, "orders/:id").await
    }
}
