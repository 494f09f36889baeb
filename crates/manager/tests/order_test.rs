mod common;

use common::Harness;
use rust_decimal_macros::dec;
use std::time::Duration;
use stratbot_core::common::RobotId;
use stratbot_core::common::time::TimeProvider;
use stratbot_core::exchange::entity::OrderSide;
use stratbot_core::exchange::error::ExchangeError;
use stratbot_core::test_utils::MockCall;
use stratbot_manager::ManagerError;
use stratbot_manager::order::PlaceOrder;

fn order(robot_id: RobotId, side: Option<&str>, price: Option<&str>, quantity: Option<&str>) -> PlaceOrder {
    PlaceOrder {
        robot_id,
        side: side.map(str::to_string),
        price: price.map(str::to_string),
        quantity: quantity.map(str::to_string),
    }
}

fn buy(robot_id: RobotId) -> PlaceOrder {
    order(robot_id, Some("buy"), Some("25000.5"), Some("0.01"))
}

#[tokio::test]
async fn test_place_without_binding_is_not_bound() -> anyhow::Result<()> {
    let h = Harness::new();
    let u = h.user("u@example.com").await;
    let robot = h.robots.create(u, "BTCUSDT").await?;

    assert!(matches!(
        h.orders.place(u, buy(robot.id)).await,
        Err(ManagerError::NotBound)
    ));
    assert!(h.exchange.calls().is_empty());

    h.bindings.bind(u, "k1", "s1").await?;
    let placed = h.orders.place(u, buy(robot.id)).await?;
    assert_eq!(placed.record.robot_id, robot.id);
    assert_eq!(placed.record.exchange_order_id, placed.exchange.order_id);
    assert_eq!(placed.record.client_order_id, placed.exchange.client_order_id);
    assert_eq!(placed.record.ordered_at, h.clock.now());

    assert_eq!(
        h.exchange.calls_for("k1"),
        vec![MockCall::CreateOrder {
            symbol: "BTCUSDT".to_string(),
            side: OrderSide::Buy,
            price: dec!(25000.5),
            quantity: dec!(0.01),
        }]
    );
    assert_eq!(placed.exchange.order_type, "LIMIT");
    assert_eq!(placed.exchange.time_in_force, "GTC");

    let history = h.robots.local_orders(u, robot.id).await?;
    assert_eq!(history.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_place_on_foreign_robot_is_forbidden() -> anyhow::Result<()> {
    let h = Harness::new();
    let alice = h.user("alice@example.com").await;
    let bob = h.user("bob@example.com").await;
    let alice_robot = h.robots.create(alice, "BTCUSDT").await?;
    h.bindings.bind(bob, "kb", "sb").await?;

    assert!(matches!(
        h.orders.place(bob, buy(alice_robot.id)).await,
        Err(ManagerError::Forbidden)
    ));
    assert!(matches!(
        h.orders.place(bob, buy(RobotId(999))).await,
        Err(ManagerError::NotFound(_))
    ));
    // 从未以他人的标的触达交易所
    assert!(h.exchange.calls().is_empty());
    assert_eq!(h.store.order_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_place_validates_before_exchange() -> anyhow::Result<()> {
    let h = Harness::new();
    let u = h.user("u@example.com").await;
    let robot = h.robots.create(u, "BTCUSDT").await?;
    h.bindings.bind(u, "k1", "s1").await?;

    let cases = [
        (Some(""), Some("1"), Some("1")),
        (None, Some("1"), Some("1")),
        (Some("HOLD"), Some("1"), Some("1")),
        (Some("SELL"), Some("0"), Some("1")),
        (Some("SELL"), Some("abc"), Some("1")),
        (Some("SELL"), None, Some("1")),
        (Some("SELL"), Some("1"), Some("-2")),
    ];
    for (side, price, quantity) in cases {
        let res = h.orders.place(u, order(robot.id, side, price, quantity)).await;
        assert!(
            matches!(res, Err(ManagerError::Validation(_))),
            "{side:?} {price:?} {quantity:?}"
        );
    }
    assert!(h.exchange.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_binding_and_ownership_are_checked_before_body_fields() -> anyhow::Result<()> {
    let h = Harness::new();
    let alice = h.user("alice@example.com").await;
    let bob = h.user("bob@example.com").await;
    let alice_robot = h.robots.create(alice, "BTCUSDT").await?;

    // 未绑定：缺失的方向不会先于 NotBound 报告
    assert!(matches!(
        h.orders.place(bob, order(alice_robot.id, None, Some("1"), Some("1"))).await,
        Err(ManagerError::NotBound)
    ));

    // 已绑定但机器人属于他人：非法价格不会先于 Forbidden 报告
    h.bindings.bind(bob, "kb", "sb").await?;
    assert!(matches!(
        h.orders
            .place(bob, order(alice_robot.id, Some("BUY"), Some("abc"), Some("1")))
            .await,
        Err(ManagerError::Forbidden)
    ));
    assert!(matches!(
        h.orders.place(bob, order(RobotId(999), None, None, None)).await,
        Err(ManagerError::NotFound(_))
    ));
    assert!(h.exchange.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_exchange_rejection_is_upstream_and_not_persisted() -> anyhow::Result<()> {
    let h = Harness::new();
    let u = h.user("u@example.com").await;
    let robot = h.robots.create(u, "BTCUSDT").await?;
    h.bindings.bind(u, "k1", "s1").await?;

    h.exchange.fail_next(ExchangeError::Rejected {
        code: -2010,
        msg: "Account has insufficient balance".to_string(),
    });
    match h.orders.place(u, buy(robot.id)).await {
        Err(ManagerError::Upstream(msg)) => assert!(msg.contains("insufficient balance")),
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(h.store.order_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_persist_failure_after_accept_is_internal() -> anyhow::Result<()> {
    let h = Harness::new();
    let u = h.user("u@example.com").await;
    let robot = h.robots.create(u, "BTCUSDT").await?;
    h.bindings.bind(u, "k1", "s1").await?;

    h.store.set_fail_order_inserts(true);
    assert!(matches!(
        h.orders.place(u, buy(robot.id)).await,
        Err(ManagerError::Internal(_))
    ));
    // 交易所侧订单已存在，本地没有记录
    assert_eq!(h.exchange.order_count(), 1);
    assert_eq!(h.store.order_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_get_and_cancel_orders() -> anyhow::Result<()> {
    let h = Harness::new();
    let u = h.user("u@example.com").await;
    let robot = h.robots.create(u, "BTCUSDT").await?;
    h.bindings.bind(u, "k1", "s1").await?;
    let placed = h.orders.place(u, buy(robot.id)).await?;
    let order_id = placed.exchange.order_id;

    let fetched = h.orders.get(u, robot.id, order_id).await?;
    assert_eq!(fetched.status, "NEW");
    assert_eq!(h.orders.list_open(u, robot.id).await?.len(), 1);

    let canceled = h.orders.cancel(u, robot.id, order_id).await?;
    assert_eq!(canceled.status, "CANCELED");
    assert!(h.orders.list_open(u, robot.id).await?.is_empty());
    assert_eq!(h.orders.list_all(u, robot.id).await?.len(), 1);

    assert!(matches!(
        h.orders.get(u, robot.id, order_id + 1000).await,
        Err(ManagerError::NotFound(_))
    ));
    assert!(matches!(
        h.orders.cancel(u, robot.id, order_id + 1000).await,
        Err(ManagerError::NotFound(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_reads_are_gated_on_binding() -> anyhow::Result<()> {
    let h = Harness::new();
    let u = h.user("u@example.com").await;

    assert!(matches!(h.orders.account(u).await, Err(ManagerError::NotBound)));
    assert!(matches!(
        h.orders.deposit_address(u, None).await,
        Err(ManagerError::NotBound)
    ));
    assert!(matches!(
        h.orders.depth(u, "BTCUSDT").await,
        Err(ManagerError::NotBound)
    ));

    h.bindings.bind(u, "k1", "s1").await?;
    let account = h.orders.account(u).await?;
    assert!(account.can_trade);

    let address = h.orders.deposit_address(u, None).await?;
    assert_eq!(address.coin, "BTC");
    let address = h.orders.deposit_address(u, Some("eth")).await?;
    assert_eq!(address.coin, "ETH");

    let book = h.orders.depth(u, "btcusdt").await?;
    assert_eq!(book.symbol, "BTCUSDT");
    Ok(())
}

#[tokio::test]
async fn test_slow_exchange_hits_deadline() -> anyhow::Result<()> {
    let h = Harness::with_timeout(Duration::from_millis(50));
    let u = h.user("u@example.com").await;
    let robot = h.robots.create(u, "BTCUSDT").await?;
    h.bindings.bind(u, "k1", "s1").await?;

    h.exchange.set_delay(Duration::from_millis(500));
    assert!(matches!(
        h.orders.place(u, buy(robot.id)).await,
        Err(ManagerError::Upstream(_))
    ));
    assert_eq!(h.store.order_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_rebinding_switches_exchange_identity() -> anyhow::Result<()> {
    let h = Harness::new();
    let u = h.user("u@example.com").await;
    let robot = h.robots.create(u, "BTCUSDT").await?;
    let binding = h.bindings.bind(u, "k1", "s1").await?;

    h.orders.list_open(u, robot.id).await?;
    h.bindings.update(u, binding.id, "k2", "s2").await?;
    h.orders.list_open(u, robot.id).await?;

    assert_eq!(h.exchange.calls_for("k1").len(), 1);
    assert_eq!(
        h.exchange.calls_for("k2"),
        vec![MockCall::ListOpenOrders("BTCUSDT".to_string())]
    );
    Ok(())
}
