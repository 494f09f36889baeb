use serde::{Deserialize, Serialize};

/// 开发环境默认的 JWT 密钥，生产环境必须通过配置覆盖
pub const DEFAULT_JWT_SECRET: &str = "YOUR_SUPER_SECRET_KEY";

/// 全局应用配置
///
/// 由 `stratbot-app` 按 "默认值 → 配置文件 → 环境变量" 的顺序分层加载。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub exchange: ExchangeConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    /// 令牌有效期 (秒)
    pub token_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub data_dir: String,
}

/// 交易所接入配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// REST 根地址
    pub rest_url: String,
    /// 签名请求的 `recvWindow` (毫秒)
    pub recv_window_ms: u64,
    /// HTTP 客户端整体超时 (秒)
    pub http_timeout_secs: u64,
    /// 单次交易所调用的业务层截止时间 (秒)
    pub call_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// EnvFilter 语法，`RUST_LOG` 优先
    pub level: String,
    /// 滚动 JSON 日志目录，为空则只输出到 stdout
    pub dir: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            jwt_issuer: "stratbot".to_string(),
            token_ttl_secs: 86400 * 7,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
        }
    }
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            rest_url: "https://api.binance.com".to_string(),
            recv_window_ms: 5000,
            http_timeout_secs: 10,
            call_timeout_secs: 10,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
        }
    }
}

impl ServerConfig {
    /// 监听地址，形如 `0.0.0.0:5000`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// 是否仍在使用开发默认密钥
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}
