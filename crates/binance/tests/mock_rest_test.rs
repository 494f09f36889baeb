use axum::extract::{RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{TimeZone, Utc};
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stratbot_binance::sign::sign_query;
use stratbot_binance::{BinanceConfig, BinanceConnector};
use stratbot_core::common::time::FakeClockProvider;
use stratbot_core::exchange::entity::{ApiCredentials, NewOrderRequest, OrderSide};
use stratbot_core::exchange::error::ExchangeError;
use stratbot_core::exchange::port::ExchangeConnector;

const API_KEY: &str = "test-api-key";
const SECRET: &str = "test-secret";
const FIXED_MILLIS: i64 = 1_700_000_000_000;

#[derive(Clone, Default)]
struct Recorded {
    queries: Arc<Mutex<Vec<String>>>,
}

type Reply = (StatusCode, Json<Value>);

fn reject(code: i64, msg: &str) -> Reply {
    (StatusCode::BAD_REQUEST, Json(json!({ "code": code, "msg": msg })))
}

/// 按 Binance 规则校验 API Key 头与签名
fn verify(headers: &HeaderMap, query: &str) -> Result<HashMap<String, String>, Reply> {
    if headers.get("X-MBX-APIKEY").and_then(|v| v.to_str().ok()) != Some(API_KEY) {
        return Err(reject(-2015, "Invalid API-key"));
    }
    let (payload, signature) = query
        .rsplit_once("&signature=")
        .ok_or_else(|| reject(-1102, "signature missing"))?;
    let expected = sign_query(SECRET, payload).map_err(|_| reject(-1022, "bad secret"))?;
    if expected != signature {
        return Err(reject(-1022, "Signature for this request is not valid."));
    }
    Ok(serde_urlencoded::from_str(payload).unwrap_or_default())
}

async fn create_order(
    State(rec): State<Recorded>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Reply {
    let query = query.unwrap_or_default();
    rec.queries.lock().unwrap().push(query.clone());
    let params = match verify(&headers, &query) {
        Ok(p) => p,
        Err(reply) => return reply,
    };
    (
        StatusCode::OK,
        Json(json!({
            "symbol": params.get("symbol"),
            "orderId": 4242,
            "clientOrderId": "abc123",
            "transactTime": FIXED_MILLIS,
            "price": params.get("price"),
            "origQty": params.get("quantity"),
            "executedQty": "0.00000000",
            "status": "NEW",
            "timeInForce": params.get("timeInForce"),
            "type": params.get("type"),
            "side": params.get("side")
        })),
    )
}

async fn cancel_order(headers: HeaderMap, RawQuery(query): RawQuery) -> Reply {
    if let Err(reply) = verify(&headers, &query.unwrap_or_default()) {
        return reply;
    }
    reject(-2011, "Unknown order sent.")
}

async fn user_stream(headers: HeaderMap) -> Reply {
    if headers.get("X-MBX-APIKEY").and_then(|v| v.to_str().ok()) != Some(API_KEY) {
        return reject(-2015, "Invalid API-key");
    }
    (StatusCode::OK, Json(json!({ "listenKey": "pqia91ma19a5s61cv6a81va65sdf19v8a65a1" })))
}

async fn depth() -> Reply {
    (
        StatusCode::OK,
        Json(json!({
            "lastUpdateId": 7,
            "bids": [["100.5", "2"]],
            "asks": [["101", "1.5"]]
        })),
    )
}

async fn account() -> (StatusCode, &'static str) {
    (StatusCode::BAD_GATEWAY, "upstream unavailable")
}

async fn spawn_mock() -> anyhow::Result<(String, Recorded)> {
    let rec = Recorded::default();
    let app = Router::new()
        .route("/api/v3/order", post(create_order).delete(cancel_order))
        .route("/api/v3/userDataStream", post(user_stream))
        .route("/api/v3/depth", get(depth))
        .route("/api/v3/account", get(account))
        .with_state(rec.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Ok((format!("http://{}", addr), rec))
}

fn connector(base_url: &str) -> anyhow::Result<BinanceConnector> {
    let clock = Arc::new(FakeClockProvider::new(
        Utc.timestamp_millis_opt(FIXED_MILLIS).unwrap(),
    ));
    Ok(BinanceConnector::with_clock(
        BinanceConfig {
            rest_url: base_url.to_string(),
            recv_window_ms: 5000,
            http_timeout: Duration::from_secs(5),
        },
        clock,
    )?)
}

fn credentials(secret: &str) -> ApiCredentials {
    ApiCredentials {
        api_key: API_KEY.to_string(),
        secret_key: secret.to_string(),
    }
}

#[tokio::test]
async fn test_signed_limit_order_roundtrip() -> anyhow::Result<()> {
    let (base, rec) = spawn_mock().await?;
    let client = connector(&base)?.connect(credentials(SECRET));

    let order = client
        .create_order(NewOrderRequest::limit_gtc(
            "BTCUSDT",
            OrderSide::Buy,
            dec!(25000.50),
            dec!(0.010),
        ))
        .await?;

    assert_eq!(order.order_id, 4242);
    assert_eq!(order.client_order_id, "abc123");
    assert_eq!(order.price, dec!(25000.5));
    assert_eq!(order.side, "BUY");
    assert_eq!(order.order_type, "LIMIT");
    assert_eq!(order.time_in_force, "GTC");

    let queries = rec.queries.lock().unwrap().clone();
    assert_eq!(queries.len(), 1);
    let q = &queries[0];
    assert!(q.starts_with("symbol=BTCUSDT&side=BUY&type=LIMIT&timeInForce=GTC&quantity=0.01&price=25000.5"));
    assert!(q.contains(&format!("recvWindow=5000&timestamp={}", FIXED_MILLIS)));
    Ok(())
}

#[tokio::test]
async fn test_wrong_secret_is_rejected() -> anyhow::Result<()> {
    let (base, _) = spawn_mock().await?;
    let client = connector(&base)?.connect(credentials("other-secret"));

    let err = client
        .create_order(NewOrderRequest::limit_gtc("BTCUSDT", OrderSide::Sell, dec!(1), dec!(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeError::Rejected { code: -1022, .. }));
    Ok(())
}

#[tokio::test]
async fn test_cancel_unknown_order_is_not_found() -> anyhow::Result<()> {
    let (base, _) = spawn_mock().await?;
    let client = connector(&base)?.connect(credentials(SECRET));

    let err = client.cancel_order("BTCUSDT", 1).await.unwrap_err();
    assert!(matches!(err, ExchangeError::OrderNotFound(_)));
    Ok(())
}

#[tokio::test]
async fn test_user_stream_and_public_depth() -> anyhow::Result<()> {
    let (base, _) = spawn_mock().await?;
    let client = connector(&base)?.connect(credentials(SECRET));

    let key = client.start_user_stream().await?;
    assert_eq!(key, "pqia91ma19a5s61cv6a81va65sdf19v8a65a1");

    let book = client.get_depth("ETHUSDT").await?;
    assert_eq!(book.symbol, "ETHUSDT");
    assert_eq!(book.bids[0].price, dec!(100.5));
    assert_eq!(book.asks[0].quantity, dec!(1.5));
    Ok(())
}

#[tokio::test]
async fn test_non_json_error_is_transport() -> anyhow::Result<()> {
    let (base, _) = spawn_mock().await?;
    let client = connector(&base)?.connect(credentials(SECRET));

    let err = client.get_account().await.unwrap_err();
    match err {
        ExchangeError::Transport(msg) => assert!(msg.contains("502")),
        other => panic!("unexpected error: {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_unreachable_host_is_transport_error() -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let client = connector(&format!("http://{}", addr))?.connect(credentials(SECRET));
    let err = client.get_depth("BTCUSDT").await.unwrap_err();
    assert!(matches!(err, ExchangeError::Transport(_) | ExchangeError::Timeout));
    Ok(())
}
