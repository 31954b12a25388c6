use anyhow::{Context, Result};
use exam_proctor::utils::logging;
use exam_proctor::{App, Config};
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置：可选的 TOML 路径作为第一个参数，环境变量优先
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_toml_file(Path::new(&path))
            .with_context(|| format!("无法加载配置文件: {}", path))?,
        None => Config::from_env(),
    };

    // 初始化日志
    if config.verbose_logging {
        logging::init("debug");
    } else {
        logging::init(&config.log_filter);
    }

    // 初始化并运行应用
    let report = App::initialize(config).await?.run().await?;
    if report.flush_error.is_some() {
        anyhow::bail!("答案上传失败");
    }

    Ok(())
}
