mod settings;
mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use stratbot_api::server::{AppState, start_server};
use stratbot_binance::{BinanceConfig, BinanceConnector};
use stratbot_core::common::time::{RealTimeProvider, TimeProvider};
use stratbot_manager::account::AccountService;
use stratbot_manager::binding::CredentialBindingManager;
use stratbot_manager::identity::{IdentityContext, JwtService};
use stratbot_manager::order::OrderOrchestrator;
use stratbot_manager::robot::RobotRegistry;
use stratbot_store::SqliteSystemStore;
use tracing::{error, info, warn};

/// # Summary
/// 应用启动入口，纯粹的依赖装配容器。
///
/// # Logic
/// 1. 分层加载配置并初始化日志。
/// 2. 实例化基础设施层 (SQLite 存储、币安连接器、JWT 服务)。
/// 3. 构造业务服务层并注入 API 状态。
/// 4. 启动 HTTP 服务，收到 Ctrl-C 后优雅退出。
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // 1. 配置与日志
    let config = settings::load()?;
    let _log_guard = telemetry::init_tracing(&config.log)?;
    info!("StratBot starting...");
    if config.server.uses_default_secret() {
        warn!("server.jwt_secret is the built-in development default; override it in production");
    }

    // 2. 基础设施层
    let clock: Arc<dyn TimeProvider> = Arc::new(RealTimeProvider);
    let store = Arc::new(SqliteSystemStore::open(&config.database.data_dir).await?);
    let connector = Arc::new(BinanceConnector::with_clock(
        BinanceConfig::from(&config.exchange),
        clock.clone(),
    )?);
    let jwt = Arc::new(JwtService::with_clock(
        &config.server.jwt_secret,
        config.server.jwt_issuer.clone(),
        config.server.token_ttl_secs,
        clock.clone(),
    ));
    info!(
        data_dir = %config.database.data_dir,
        exchange = %config.exchange.rest_url,
        "infrastructure ready"
    );

    // 3. 业务服务层
    let bindings = Arc::new(CredentialBindingManager::new(
        store.clone(),
        connector,
        clock.clone(),
        Duration::from_secs(config.exchange.call_timeout_secs),
    ));
    let robots = Arc::new(RobotRegistry::new(store.clone(), store.clone(), clock.clone()));
    let orders = Arc::new(OrderOrchestrator::new(
        bindings.clone(),
        robots.clone(),
        store.clone(),
        clock.clone(),
    ));
    let state = AppState {
        identity: IdentityContext::new(jwt.clone()),
        accounts: Arc::new(AccountService::new(store, jwt, clock)),
        bindings,
        robots,
        orders,
    };

    // 4. HTTP 服务
    start_server(state, &config.server.bind_addr(), shutdown_signal()).await?;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            // 无法监听信号时保持运行，由外部终止
            error!("failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
