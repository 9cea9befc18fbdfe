use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{Config, ORDERS_PATH, PRODUCTS_PATH};
use crate::error::{AppError, Result};
use crate::types::{OrderLine, OrderQuery, OrdersResponse, Product, ProductsResponse};

/// Shown when the backend fails without saying why.
pub const GENERIC_LOAD_ERROR: &str = "주문 정보를 불러오는데 실패했습니다.";

/// Anything that can answer an `/api/orders` query.
#[async_trait]
pub trait OrderSource: Send + Sync {
    async fn fetch_orders(&self, query: &OrderQuery) -> Result<Vec<OrderLine>>;
}

#[async_trait]
impl<T: OrderSource + ?Sized> OrderSource for std::sync::Arc<T> {
    async fn fetch_orders(&self, query: &OrderQuery) -> Result<Vec<OrderLine>> {
        (**self).fetch_orders(query).await
    }
}

/// HTTP client for the dashboard backend.
///
/// `/api/orders` requests never set a client-side timeout; that is left to
/// the transport, and keeping each sync chunk small is what avoids the
/// upstream timing out. Only the products read uses `read_timeout`.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    read_timeout: Duration,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, read_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            read_timeout,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(cfg.api_url.clone(), cfg.http_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch product stock cards from `/api/products`.
    pub async fn fetch_products(&self) -> Result<Vec<Product>> {
        let url = format!("{}{}", self.base_url, PRODUCTS_PATH);
        let resp = self.client.get(&url).timeout(self.read_timeout).send().await?;
        let body: ProductsResponse = read_json(resp).await?;

        // The products endpoint reports token failures in the body.
        if let Some(message) = body.error.filter(|e| !e.is_empty()) {
            return Err(AppError::Backend { status: 200, message });
        }
        Ok(body.products.unwrap_or_default())
    }
}

#[async_trait]
impl OrderSource for BackendClient {
    async fn fetch_orders(&self, query: &OrderQuery) -> Result<Vec<OrderLine>> {
        let url = format!("{}{}", self.base_url, ORDERS_PATH);
        let resp = self.client.get(&url).query(&query.params()).send().await?;
        let body: OrdersResponse = read_json(resp).await?;
        let orders = body.orders.unwrap_or_default();
        debug!(?query, lines = orders.len(), "orders fetched");
        Ok(orders)
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// Decode a backend answer, turning any non-2xx status into `AppError::Backend`
/// even when a body is present.
async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    let bytes = resp.bytes().await?;

    if !status.is_success() {
        let message = match serde_json::from_slice::<ErrorBody>(&bytes) {
            Ok(ErrorBody { error: Some(e) }) if !e.is_empty() => e,
            Ok(_) => GENERIC_LOAD_ERROR.to_string(),
            Err(_) => {
                warn!(status = status.as_u16(), "backend error body was not JSON");
                status
                    .canonical_reason()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
            }
        };
        return Err(AppError::Backend { status: status.as_u16(), message });
    }

    Ok(serde_json::from_slice(&bytes)?)
}
