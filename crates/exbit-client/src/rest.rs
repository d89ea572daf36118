//! Exbitron v1 REST client.
//!
//! Every call is a single authenticated HTTP request. Responses are decoded
//! by [`crate::wire`]; this module only owns transport, auth and status
//! handling.

use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, info, warn};

use exbit_core::{
    Balances, MarketId, MarketInfo, Order, OrderBookSnapshot, OrderReceipt, OrderRequest,
};

use crate::error::{ClientError, ClientResult};
use crate::exchange::{BoxFuture, ExchangeClient};
use crate::session::ClientSession;
use crate::wire::{self, RawOrderRequest};

/// reqwest-backed [`ExchangeClient`].
pub struct RestClient {
    client: Client,
    session: ClientSession,
}

impl RestClient {
    /// Create a client for `session`.
    pub fn new(session: ClientSession) -> ClientResult<Self> {
        if session.api_key().trim().is_empty() {
            return Err(ClientError::Config("API key is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(session.timeout())
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, session })
    }

    pub fn session(&self) -> &ClientSession {
        &self.session
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.session.url(path))
            .bearer_auth(self.session.api_key())
    }

    /// Send, check status, and decode the body as JSON.
    ///
    /// An empty success body decodes to `Value::Null`.
    async fn execute(&self, builder: RequestBuilder, what: &str) -> ClientResult<Value> {
        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("{what} request failed: {e}")))?;

        let response = check_status(response, what).await?;
        let text = response
            .text()
            .await
            .map_err(|e| ClientError::Transport(format!("{what} body read failed: {e}")))?;

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| ClientError::Parse(format!("{what} response is not JSON: {e}")))
    }

    async fn fetch_balances(&self) -> ClientResult<Balances> {
        let body = self
            .execute(
                self.request(Method::GET, "/balances")
                    .query(&[("zero", "false")]),
                "balances",
            )
            .await?;

        // Unexpected shapes degrade to "no funds" so callers skip the
        // cycle instead of aborting the session.
        match wire::parse_balances(body) {
            Ok(balances) => Ok(balances),
            Err(e) => {
                warn!(error = %e, "Unexpected balances response, treating as empty");
                Ok(Balances::new())
            }
        }
    }

    async fn fetch_order_book(&self, market: &MarketId) -> ClientResult<Option<OrderBookSnapshot>> {
        let path = format!("/orderbook/{}", market.as_str());
        let body = self
            .execute(self.request(Method::GET, &path), "orderbook")
            .await?;
        let book = wire::parse_order_book(body)?;
        debug!(
            market = %market,
            bids = book.as_ref().map_or(0, |b| b.bids().len()),
            asks = book.as_ref().map_or(0, |b| b.asks().len()),
            "Fetched order book"
        );
        Ok(book)
    }

    async fn fetch_market_info(&self, market: &MarketId) -> ClientResult<Option<MarketInfo>> {
        let path = format!("/trading/info/{}", market.as_str());
        let body = self
            .execute(self.request(Method::GET, &path), "market info")
            .await?;
        wire::parse_market_info(body)
    }

    async fn submit_order(&self, request: OrderRequest) -> ClientResult<OrderReceipt> {
        let body = RawOrderRequest::from(&request);
        let response = self
            .execute(self.request(Method::POST, "/order").json(&body), "order")
            .await?;
        let receipt = wire::parse_receipt(&response);
        info!(
            market = %request.market,
            side = %request.side,
            price = %request.price,
            volume = %request.volume,
            order_id = %receipt,
            "Order accepted"
        );
        Ok(receipt)
    }

    async fn fetch_open_orders(&self, market: &MarketId) -> ClientResult<Vec<Order>> {
        let path = format!("/order/market/{}", market.as_str());
        let body = self
            .execute(
                self.request(Method::GET, &path).query(&[("status", "open")]),
                "open orders",
            )
            .await?;
        if body.is_null() {
            return Ok(Vec::new());
        }
        wire::parse_orders(body, market)
    }

    async fn delete_order(&self, order_id: &str) -> ClientResult<()> {
        let path = format!("/order/{order_id}");
        self.execute(self.request(Method::DELETE, &path), "cancel")
            .await?;
        info!(order_id, "Order cancelled");
        Ok(())
    }
}

async fn check_status(response: Response, what: &str) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!(request = what, status = status.as_u16(), %body, "Exchange rejected request");
    Err(ClientError::Status {
        status: status.as_u16(),
        body,
    })
}

impl ExchangeClient for RestClient {
    fn get_balances(&self) -> BoxFuture<'_, ClientResult<Balances>> {
        Box::pin(self.fetch_balances())
    }

    fn get_order_book<'a>(
        &'a self,
        market: &'a MarketId,
    ) -> BoxFuture<'a, ClientResult<Option<OrderBookSnapshot>>> {
        Box::pin(self.fetch_order_book(market))
    }

    fn get_market_info<'a>(
        &'a self,
        market: &'a MarketId,
    ) -> BoxFuture<'a, ClientResult<Option<MarketInfo>>> {
        Box::pin(self.fetch_market_info(market))
    }

    fn place_order(&self, request: OrderRequest) -> BoxFuture<'_, ClientResult<OrderReceipt>> {
        Box::pin(self.submit_order(request))
    }

    fn list_open_orders<'a>(
        &'a self,
        market: &'a MarketId,
    ) -> BoxFuture<'a, ClientResult<Vec<Order>>> {
        Box::pin(self.fetch_open_orders(market))
    }

    fn cancel_order<'a>(&'a self, order_id: &'a str) -> BoxFuture<'a, ClientResult<()>> {
        Box::pin(self.delete_order(order_id))
    }
}
