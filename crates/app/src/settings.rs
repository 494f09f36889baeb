//! 分层配置加载：内置默认值 → `config/default.toml` → `config/local.toml`
//! → `STRATBOT_CONFIG` 指定的文件 → `STRATBOT__SECTION__KEY` 环境变量。

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File, Map};
use stratbot_core::config::AppConfig;

const ENV_PREFIX: &str = "STRATBOT";
const CONFIG_PATH_ENV: &str = "STRATBOT_CONFIG";

/// 从当前工作目录的 `config/` 与进程环境加载配置
pub fn load() -> Result<AppConfig, ConfigError> {
    let explicit = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
    load_from(Path::new("config"), explicit.as_deref(), None)
}

/// # Summary
/// 按优先级合并所有配置源。
///
/// # Arguments
/// * `base` - 存放 `default.toml` / `local.toml` 的目录，文件均可缺省
/// * `explicit` - 显式指定的配置文件，给出时必须存在
/// * `env` - 替代进程环境的变量表，`None` 时读取真实环境
fn load_from(
    base: &Path,
    explicit: Option<&Path>,
    env: Option<Map<String, String>>,
) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder()
        .add_source(File::from(base.join("default.toml")).required(false))
        .add_source(File::from(base.join("local.toml")).required(false));

    if let Some(path) = explicit {
        builder = builder.add_source(File::from(path).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .ignore_empty(true)
            .source(env),
    );

    builder.build()?.try_deserialize()
}
