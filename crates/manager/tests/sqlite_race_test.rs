//! 以真实 SQLite 存储验证并发写入下的唯一性裁决。

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use stratbot_core::common::time::RealTimeProvider;
use stratbot_core::store::port::{CredentialStore, NewUser, UserStore};
use stratbot_core::test_utils::MockExchange;
use stratbot_manager::ManagerError;
use stratbot_manager::binding::CredentialBindingManager;
use stratbot_manager::robot::RobotRegistry;
use stratbot_store::SqliteSystemStore;
use tempfile::tempdir;

#[tokio::test]
async fn test_racing_binds_and_robots_resolve_to_one_row() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let store = Arc::new(SqliteSystemStore::open(dir.path()).await?);
    let user = store
        .create_user(&NewUser {
            name: "racer".to_string(),
            email: "racer@example.com".to_string(),
            password_hash: "x".to_string(),
            created_at: Utc::now(),
        })
        .await?;

    let bindings = Arc::new(CredentialBindingManager::new(
        store.clone(),
        Arc::new(MockExchange::new()),
        Arc::new(RealTimeProvider),
        Duration::from_secs(5),
    ));
    let robots = Arc::new(RobotRegistry::new(
        store.clone(),
        store.clone(),
        Arc::new(RealTimeProvider),
    ));

    let mut bind_tasks = Vec::new();
    let mut robot_tasks = Vec::new();
    for i in 0..6 {
        let bindings = bindings.clone();
        let robots = robots.clone();
        let uid = user.id;
        bind_tasks.push(tokio::spawn(async move {
            bindings.bind(uid, &format!("k{i}"), "secret").await
        }));
        robot_tasks.push(tokio::spawn(async move {
            robots.create(uid, if i % 2 == 0 { "BTCUSDT" } else { "ETHUSDT" }).await
        }));
    }

    let mut bound = 0;
    for task in bind_tasks {
        match task.await? {
            Ok(_) => bound += 1,
            Err(ManagerError::Conflict(_)) => {}
            Err(other) => panic!("unexpected bind error: {other:?}"),
        }
    }
    let mut created = 0;
    for task in robot_tasks {
        match task.await? {
            Ok(_) => created += 1,
            Err(ManagerError::Conflict(_)) => {}
            Err(other) => panic!("unexpected robot error: {other:?}"),
        }
    }

    assert_eq!(bound, 1);
    assert_eq!(created, 1);
    assert!(store.find_binding_by_user(user.id).await?.is_some());
    Ok(())
}
