#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use stratbot_core::common::UserId;
use stratbot_core::common::time::FakeClockProvider;
use stratbot_core::test_utils::{MemoryStore, MockExchange};
use stratbot_manager::binding::CredentialBindingManager;
use stratbot_manager::order::OrderOrchestrator;
use stratbot_manager::robot::RobotRegistry;

/// 以内存仓储与模拟交易所装配的服务集合
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub exchange: MockExchange,
    pub clock: Arc<FakeClockProvider>,
    pub bindings: Arc<CredentialBindingManager>,
    pub robots: Arc<RobotRegistry>,
    pub orders: OrderOrchestrator,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(5))
    }

    pub fn with_timeout(call_timeout: Duration) -> Self {
        let store = Arc::new(MemoryStore::new());
        let exchange = MockExchange::new();
        let clock = Arc::new(FakeClockProvider::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap(),
        ));
        let bindings = Arc::new(CredentialBindingManager::new(
            store.clone(),
            Arc::new(exchange.clone()),
            clock.clone(),
            call_timeout,
        ));
        let robots = Arc::new(RobotRegistry::new(store.clone(), store.clone(), clock.clone()));
        let orders = OrderOrchestrator::new(
            bindings.clone(),
            robots.clone(),
            store.clone(),
            clock.clone(),
        );
        Self {
            store,
            exchange,
            clock,
            bindings,
            robots,
            orders,
        }
    }

    pub async fn user(&self, email: &str) -> UserId {
        self.store.seed_user("tester", email).await.id
    }
}
