use std::path::Path;

use stratbot_core::config::LogConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE_PREFIX: &str = "stratbot.log";

/// `RUST_LOG` 优先，其次是配置中的级别
fn filter(cfg: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.level))
}

/// # Summary
/// 安装全局 tracing 订阅器：stdout 文本输出，配置了 `log.dir` 时另写按天滚动的 JSON 文件。
///
/// # Returns
/// 文件写入器的 guard，调用方必须持有到进程退出，否则尾部日志会丢失。
pub fn init_tracing(
    cfg: &LogConfig,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error + Send + Sync>> {
    let stdout_layer = fmt::layer().with_target(false).with_filter(filter(cfg));

    match cfg.dir.as_deref().filter(|d| !d.is_empty()) {
        Some(dir) => {
            std::fs::create_dir_all(Path::new(dir))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = fmt::layer()
                .json()
                .with_ansi(false)
                .with_target(true)
                .with_writer(writer)
                .with_filter(filter(cfg));
            tracing_subscriber::registry()
                .with(stdout_layer)
                .with(file_layer)
                .try_init()?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry().with(stdout_layer).try_init()?;
            Ok(None)
        }
    }
}
