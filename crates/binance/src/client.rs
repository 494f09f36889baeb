use crate::sign::sign_query;
use crate::wire::{
    AccountResponse, ApiErrorBody, DepositAddressResponse, DepthResponse, ListenKeyResponse,
    OrderResponse,
};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use stratbot_core::common::time::{RealTimeProvider, TimeProvider};
use stratbot_core::config::ExchangeConfig;
use stratbot_core::exchange::entity::{
    AccountInfo, ApiCredentials, DepositAddress, ExchangeOrder, NewOrderRequest, OrderBook,
};
use stratbot_core::exchange::error::ExchangeError;
use stratbot_core::exchange::port::{ExchangeClient, ExchangeConnector};
use tracing::{debug, warn};

/// 订单不存在 / 撤销未知订单
const CODE_NO_SUCH_ORDER: i64 = -2013;
const CODE_CANCEL_REJECTED: i64 = -2011;

/// Binance REST 接入参数
#[derive(Debug, Clone)]
pub struct BinanceConfig {
    pub rest_url: String,
    pub recv_window_ms: u64,
    pub http_timeout: Duration,
}

impl From<&ExchangeConfig> for BinanceConfig {
    fn from(cfg: &ExchangeConfig) -> Self {
        Self {
            rest_url: cfg.rest_url.clone(),
            recv_window_ms: cfg.recv_window_ms,
            http_timeout: Duration::from_secs(cfg.http_timeout_secs),
        }
    }
}

/// # Summary
/// Binance 客户端工厂，持有共享的 HTTP 连接池。
///
/// # Invariants
/// - 本身不持有任何用户凭证，凭证只在 `connect` 时注入到单个客户端。
pub struct BinanceConnector {
    http: Client,
    config: Arc<BinanceConfig>,
    clock: Arc<dyn TimeProvider>,
}

impl BinanceConnector {
    pub fn new(config: BinanceConfig) -> Result<Self, ExchangeError> {
        Self::with_clock(config, Arc::new(RealTimeProvider))
    }

    /// 使用指定时钟生成签名时间戳
    pub fn with_clock(
        config: BinanceConfig,
        clock: Arc<dyn TimeProvider>,
    ) -> Result<Self, ExchangeError> {
        if rustls::crypto::ring::default_provider()
            .install_default()
            .is_err()
        {
            debug!("rustls crypto provider already installed");
        }
        let http = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            config: Arc::new(config),
            clock,
        })
    }
}

impl ExchangeConnector for BinanceConnector {
    fn connect(&self, credentials: ApiCredentials) -> Arc<dyn ExchangeClient> {
        Arc::new(BinanceClient {
            http: self.http.clone(),
            config: self.config.clone(),
            clock: self.clock.clone(),
            credentials,
        })
    }
}

/// 绑定单组凭证的 Binance 现货客户端
pub struct BinanceClient {
    http: Client,
    config: Arc<BinanceConfig>,
    clock: Arc<dyn TimeProvider>,
    credentials: ApiCredentials,
}

impl BinanceClient {
    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.rest_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn encode(params: &[(&str, String)]) -> Result<String, ExchangeError> {
        serde_urlencoded::to_string(params).map_err(|e| ExchangeError::Decode(e.to_string()))
    }

    fn with_query(&self, path: &str, query: &str) -> String {
        if query.is_empty() {
            self.url(path)
        } else {
            format!("{}?{}", self.url(path), query)
        }
    }

    /// 无需鉴权的行情接口
    async fn public_request<T>(&self, path: &str, params: &[(&str, String)]) -> Result<T, ExchangeError>
    where
        T: DeserializeOwned,
    {
        let query = Self::encode(params)?;
        let request = self.http.get(self.with_query(path, &query));
        self.send(path, request).await
    }

    /// 只需 API Key 头、不需签名的接口 (用户数据流)
    async fn keyed_request<T>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ExchangeError>
    where
        T: DeserializeOwned,
    {
        let query = Self::encode(params)?;
        let request = self
            .http
            .request(method, self.with_query(path, &query))
            .header("X-MBX-APIKEY", &self.credentials.api_key);
        self.send(path, request).await
    }

    /// # Summary
    /// 发送签名请求。
    ///
    /// # Logic
    /// 1. 追加 `recvWindow` 与 `timestamp` 参数。
    /// 2. 对编码后的查询串签名，并把 `signature` 追加在末尾。
    /// 3. 以 `X-MBX-APIKEY` 头携带 API Key 发出请求。
    async fn signed_request<T>(
        &self,
        method: Method,
        path: &str,
        mut params: Vec<(&str, String)>,
    ) -> Result<T, ExchangeError>
    where
        T: DeserializeOwned,
    {
        params.push(("recvWindow", self.config.recv_window_ms.to_string()));
        params.push(("timestamp", self.clock.now().timestamp_millis().to_string()));
        let query = Self::encode(&params)?;
        let signature = sign_query(&self.credentials.secret_key, &query)?;
        let url = format!("{}?{}&signature={}", self.url(path), query, signature);
        let request = self
            .http
            .request(method, url)
            .header("X-MBX-APIKEY", &self.credentials.api_key);
        self.send(path, request).await
    }

    async fn send<T>(&self, path: &str, request: RequestBuilder) -> Result<T, ExchangeError>
    where
        T: DeserializeOwned,
    {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ExchangeError::Timeout
            } else {
                ExchangeError::Transport(e.to_string())
            }
        })?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<ApiErrorBody>(&body) {
                Ok(err) => {
                    warn!(path, code = err.code, msg = %err.msg, "binance rejected request");
                    map_api_error(err)
                }
                Err(_) => ExchangeError::Transport(format!("HTTP {}: {}", status, body)),
            });
        }

        serde_json::from_str::<T>(&body).map_err(|e| ExchangeError::Decode(e.to_string()))
    }
}

fn map_api_error(err: ApiErrorBody) -> ExchangeError {
    match err.code {
        CODE_NO_SUCH_ORDER | CODE_CANCEL_REJECTED => ExchangeError::OrderNotFound(err.msg),
        code => ExchangeError::Rejected { code, msg: err.msg },
    }
}

#[async_trait]
impl ExchangeClient for BinanceClient {
    async fn start_user_stream(&self) -> Result<String, ExchangeError> {
        let resp: ListenKeyResponse = self
            .keyed_request(Method::POST, "/api/v3/userDataStream", &[])
            .await?;
        Ok(resp.listen_key)
    }

    async fn keep_alive_user_stream(&self, stream_key: &str) -> Result<(), ExchangeError> {
        self.keyed_request::<serde_json::Value>(
            Method::PUT,
            "/api/v3/userDataStream",
            &[("listenKey", stream_key.to_string())],
        )
        .await
        .map(|_| ())
    }

    async fn create_order(&self, request: NewOrderRequest) -> Result<ExchangeOrder, ExchangeError> {
        let params = vec![
            ("symbol", request.symbol),
            ("side", request.side.as_str().to_string()),
            ("type", request.order_type.as_str().to_string()),
            ("timeInForce", request.time_in_force.as_str().to_string()),
            ("quantity", request.quantity.normalize().to_string()),
            ("price", request.price.normalize().to_string()),
        ];
        let resp: OrderResponse = self.signed_request(Method::POST, "/api/v3/order", params).await?;
        Ok(resp.into())
    }

    async fn get_order(&self, symbol: &str, order_id: i64) -> Result<ExchangeOrder, ExchangeError> {
        let params = vec![("symbol", symbol.to_string()), ("orderId", order_id.to_string())];
        let resp: OrderResponse = self.signed_request(Method::GET, "/api/v3/order", params).await?;
        Ok(resp.into())
    }

    async fn cancel_order(
        &self,
        symbol: &str,
        order_id: i64,
    ) -> Result<ExchangeOrder, ExchangeError> {
        let params = vec![("symbol", symbol.to_string()), ("orderId", order_id.to_string())];
        let resp: OrderResponse = self
            .signed_request(Method::DELETE, "/api/v3/order", params)
            .await?;
        Ok(resp.into())
    }

    async fn list_open_orders(&self, symbol: &str) -> Result<Vec<ExchangeOrder>, ExchangeError> {
        let params = vec![("symbol", symbol.to_string())];
        let resp: Vec<OrderResponse> = self
            .signed_request(Method::GET, "/api/v3/openOrders", params)
            .await?;
        Ok(resp.into_iter().map(Into::into).collect())
    }

    async fn list_orders(&self, symbol: &str) -> Result<Vec<ExchangeOrder>, ExchangeError> {
        let params = vec![("symbol", symbol.to_string())];
        let resp: Vec<OrderResponse> = self
            .signed_request(Method::GET, "/api/v3/allOrders", params)
            .await?;
        Ok(resp.into_iter().map(Into::into).collect())
    }

    async fn get_account(&self) -> Result<AccountInfo, ExchangeError> {
        let resp: AccountResponse = self
            .signed_request(Method::GET, "/api/v3/account", Vec::new())
            .await?;
        Ok(resp.into())
    }

    async fn get_deposit_address(&self, coin: &str) -> Result<DepositAddress, ExchangeError> {
        let params = vec![("coin", coin.to_string())];
        let resp: DepositAddressResponse = self
            .signed_request(Method::GET, "/sapi/v1/capital/deposit/address", params)
            .await?;
        Ok(resp.into())
    }

    async fn get_depth(&self, symbol: &str) -> Result<OrderBook, ExchangeError> {
        let resp: DepthResponse = self
            .public_request("/api/v3/depth", &[("symbol", symbol.to_string())])
            .await?;
        Ok(resp.into_order_book(symbol))
    }
}
