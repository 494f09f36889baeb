mod common;

use common::Harness;
use stratbot_core::common::RobotId;
use stratbot_manager::ManagerError;
use stratbot_manager::order::PlaceOrder;

#[tokio::test]
async fn test_create_normalizes_symbol() -> anyhow::Result<()> {
    let h = Harness::new();
    let u = h.user("u@example.com").await;

    let robot = h.robots.create(u, " btcusdt ").await?;
    assert_eq!(robot.symbol, "BTCUSDT");
    assert_eq!(robot.owner, u);

    let found = h.robots.find_for_owner(u).await?.expect("robot");
    assert_eq!(found.id, robot.id);
    Ok(())
}

#[tokio::test]
async fn test_one_robot_per_user() -> anyhow::Result<()> {
    let h = Harness::new();
    let u = h.user("u@example.com").await;

    h.robots.create(u, "BTCUSDT").await?;
    assert!(matches!(
        h.robots.create(u, "BTCUSDT").await,
        Err(ManagerError::Conflict(_))
    ));
    assert!(matches!(
        h.robots.create(u, "ETHUSDT").await,
        Err(ManagerError::Conflict(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_invalid_symbol_is_validation_error() -> anyhow::Result<()> {
    let h = Harness::new();
    let u = h.user("u@example.com").await;

    for bad in ["", "x", "BTC/USDT", "比特币"] {
        assert!(matches!(
            h.robots.create(u, bad).await,
            Err(ManagerError::Validation(_))
        ));
    }
    assert!(h.robots.find_for_owner(u).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_foreign_robot_is_forbidden_missing_is_not_found() -> anyhow::Result<()> {
    let h = Harness::new();
    let alice = h.user("alice@example.com").await;
    let bob = h.user("bob@example.com").await;
    let robot = h.robots.create(alice, "BTCUSDT").await?;

    assert!(matches!(
        h.robots.update(bob, robot.id, "ETHUSDT").await,
        Err(ManagerError::Forbidden)
    ));
    assert!(matches!(
        h.robots.delete(bob, robot.id).await,
        Err(ManagerError::Forbidden)
    ));
    assert!(matches!(
        h.robots.resolve_symbol_for_owner(bob, robot.id).await,
        Err(ManagerError::Forbidden)
    ));
    assert!(matches!(
        h.robots.get(bob, RobotId(424242)).await,
        Err(ManagerError::NotFound(_))
    ));

    // 失败的尝试不改变任何状态
    let intact = h.robots.get(alice, robot.id).await?;
    assert_eq!(intact.symbol, "BTCUSDT");
    Ok(())
}

#[tokio::test]
async fn test_owner_update_and_delete() -> anyhow::Result<()> {
    let h = Harness::new();
    let u = h.user("u@example.com").await;
    let robot = h.robots.create(u, "BTCUSDT").await?;

    let updated = h.robots.update(u, robot.id, "ethusdt").await?;
    assert_eq!(updated.symbol, "ETHUSDT");
    assert_eq!(
        h.robots.resolve_symbol_for_owner(u, robot.id).await?,
        "ETHUSDT"
    );

    h.robots.delete(u, robot.id).await?;
    assert!(h.robots.find_for_owner(u).await?.is_none());
    assert!(matches!(
        h.robots.delete(u, robot.id).await,
        Err(ManagerError::NotFound(_))
    ));

    // 删除后可以重新创建
    h.robots.create(u, "BNBUSDT").await?;
    Ok(())
}

#[tokio::test]
async fn test_delete_cascades_local_orders() -> anyhow::Result<()> {
    let h = Harness::new();
    let u = h.user("u@example.com").await;
    let robot = h.robots.create(u, "BTCUSDT").await?;
    h.bindings.bind(u, "k1", "s1").await?;

    h.orders
        .place(
            u,
            PlaceOrder {
                robot_id: robot.id,
                side: Some("BUY".to_string()),
                price: Some("100".to_string()),
                quantity: Some("1".to_string()),
            },
        )
        .await?;
    assert_eq!(h.robots.local_orders(u, robot.id).await?.len(), 1);

    h.robots.delete(u, robot.id).await?;
    assert_eq!(h.store.order_count().await, 0);
    Ok(())
}
