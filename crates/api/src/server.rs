//! # API 服务启动器
//!
//! 组装 axum 路由、挂载 Swagger UI、配置 CORS 并绑定 TCP 端口对外提供服务。
//! 本模块不包含 `main()`，由 `crates/app` 完成依赖装配后调用。

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;
use utoipa_swagger_ui::SwaggerUi;

use stratbot_manager::account::AccountService;
use stratbot_manager::binding::CredentialBindingManager;
use stratbot_manager::identity::IdentityContext;
use stratbot_manager::order::OrderOrchestrator;
use stratbot_manager::robot::RobotRegistry;

use crate::routes::{auth, binding, order, robot, stream, user};

// ============================================================
//  共享应用状态
// ============================================================

/// 应用状态，通过 axum 的 `State` 提取器注入到每个 Handler 中。
///
/// # Invariants
/// - 只持有无状态服务的共享引用；调用者身份与交易所客户端都是请求级的值，不存放于此。
#[derive(Clone)]
pub struct AppState {
    pub identity: IdentityContext,
    pub accounts: Arc<AccountService>,
    pub bindings: Arc<CredentialBindingManager>,
    pub robots: Arc<RobotRegistry>,
    pub orders: Arc<OrderOrchestrator>,
}

// ============================================================
//  OpenAPI 文档定义
// ============================================================

#[derive(OpenApi)]
#[openapi(
    info(
        title = "StratBot API",
        version = "0.1.0",
        description = "多租户币安交易机器人后端：凭证绑定、机器人管理、限价下单与账户查询。"
    ),
    tags(
        (name = "鉴权 (Auth)", description = "注册与登录"),
        (name = "用户 (User)", description = "个人资料"),
        (name = "凭证 (Binding)", description = "交易所 API Key 绑定"),
        (name = "数据流 (Stream)", description = "交易所用户数据流"),
        (name = "交易 (Order)", description = "下单、查单、撤单与账户查询"),
        (name = "机器人 (Robot)", description = "交易机器人与其本地订单记录")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// 注册名为 "bearer_jwt" 的 HTTP Bearer 鉴权方案，Swagger UI 顶部显示 Authorize 按钮。
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some("填入登录接口返回的 token（无需 'Bearer ' 前缀）"))
                    .build(),
            ),
        );
    }
}

// ============================================================
//  服务构建与启动
// ============================================================

/// 构建完整的路由树 (含 Swagger UI 与 CORS)。
pub fn build_router(state: AppState) -> Router {
    let public_router = OpenApiRouter::new()
        .routes(routes!(auth::register))
        .routes(routes!(auth::login));

    let protected_router = OpenApiRouter::new()
        .routes(routes!(user::get_profile, user::update_profile))
        .routes(routes!(binding::get_bind))
        .routes(routes!(binding::bind))
        .routes(routes!(binding::update_bind))
        .routes(routes!(binding::unbind))
        .routes(routes!(stream::start_stream, stream::keep_alive))
        .routes(routes!(order::place_order, order::list_orders))
        .routes(routes!(order::get_order, order::cancel_order))
        .routes(routes!(order::open_orders))
        .routes(routes!(order::account))
        .routes(routes!(order::deposit_address))
        .routes(routes!(order::depth))
        .routes(routes!(robot::my_robot, robot::create_robot))
        .routes(routes!(robot::get_robot, robot::update_robot, robot::delete_robot))
        .routes(routes!(robot::robot_orders))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth::auth_middleware,
        ));

    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(public_router)
        .merge(protected_router)
        .with_state(state)
        .split_for_parts();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api))
        .layer(cors)
}

/// 绑定端口并提供服务，直到 `shutdown` 完成后优雅退出。
///
/// # Arguments
/// * `state` - 装配好的共享状态
/// * `bind_addr` - 监听地址，如 `"0.0.0.0:5000"`
/// * `shutdown` - 关停信号 (例如 Ctrl-C)
///
/// # Returns
/// 绑定失败或服务异常时返回 `Err`，不终止进程。
pub async fn start_server<F>(
    state: AppState,
    bind_addr: &str,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;

    tracing::info!("StratBot API listening on {}", bind_addr);
    tracing::info!("Swagger UI: http://{}/swagger-ui/", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("API server stopped");
    Ok(())
}
