//! Binance REST 报文结构，以及到领域实体的转换。

use rust_decimal::Decimal;
use serde::Deserialize;
use stratbot_core::exchange::entity::{
    AccountInfo, Balance, DepositAddress, ExchangeOrder, OrderBook, PriceLevel,
};

/// 错误响应体 `{"code": -2013, "msg": "Order does not exist."}`
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub code: i64,
    pub msg: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListenKeyResponse {
    pub listen_key: String,
}

/// 下单 / 查单 / 撤单 / 挂单列表共用的订单结构，各接口字段略有差异。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OrderResponse {
    pub symbol: String,
    pub order_id: i64,
    pub client_order_id: String,
    pub price: Decimal,
    pub orig_qty: Decimal,
    pub executed_qty: Decimal,
    pub status: String,
    pub time_in_force: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub side: String,
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub update_time: Option<i64>,
    // 下单接口只返回 transactTime
    #[serde(default)]
    pub transact_time: Option<i64>,
}

impl From<OrderResponse> for ExchangeOrder {
    fn from(o: OrderResponse) -> Self {
        ExchangeOrder {
            symbol: o.symbol,
            order_id: o.order_id,
            client_order_id: o.client_order_id,
            price: o.price,
            orig_qty: o.orig_qty,
            executed_qty: o.executed_qty,
            status: o.status,
            time_in_force: o.time_in_force,
            order_type: o.order_type,
            side: o.side,
            time: o.time.or(o.transact_time),
            update_time: o.update_time.or(o.transact_time),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct BalanceResponse {
    pub asset: String,
    pub free: Decimal,
    pub locked: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AccountResponse {
    pub maker_commission: i64,
    pub taker_commission: i64,
    pub can_trade: bool,
    pub can_withdraw: bool,
    pub can_deposit: bool,
    pub update_time: i64,
    pub balances: Vec<BalanceResponse>,
}

impl From<AccountResponse> for AccountInfo {
    fn from(a: AccountResponse) -> Self {
        AccountInfo {
            maker_commission: a.maker_commission,
            taker_commission: a.taker_commission,
            can_trade: a.can_trade,
            can_withdraw: a.can_withdraw,
            can_deposit: a.can_deposit,
            update_time: a.update_time,
            balances: a
                .balances
                .into_iter()
                .map(|b| Balance {
                    asset: b.asset,
                    free: b.free,
                    locked: b.locked,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DepositAddressResponse {
    pub coin: String,
    pub address: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub url: String,
}

impl From<DepositAddressResponse> for DepositAddress {
    fn from(d: DepositAddressResponse) -> Self {
        DepositAddress {
            coin: d.coin,
            address: d.address,
            tag: d.tag,
            url: d.url,
        }
    }
}

/// 档位以 `["价格", "数量"]` 二元数组表示
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DepthResponse {
    pub last_update_id: i64,
    pub bids: Vec<(Decimal, Decimal)>,
    pub asks: Vec<(Decimal, Decimal)>,
}

impl DepthResponse {
    pub fn into_order_book(self, symbol: &str) -> OrderBook {
        let level = |(price, quantity): (Decimal, Decimal)| PriceLevel { price, quantity };
        OrderBook {
            symbol: symbol.to_string(),
            last_update_id: self.last_update_id,
            bids: self.bids.into_iter().map(level).collect(),
            asks: self.asks.into_iter().map(level).collect(),
        }
    }
}
