//! 通知发送命令行入口
//!
//! `notifier [PATH]`：从 PATH（缺省为标准输入）读取 JSON 通知请求并发送一次。

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;
use tracing::info;

use notifier_service::request_file::NotificationFile;
use notifier_service::wiring;
use notifier_shared::{config::AppConfig, observability};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. 加载配置，失败时使用默认值
    let config = AppConfig::load("notifier").unwrap_or_else(|e| {
        eprintln!("加载配置失败，使用默认配置: {e}");
        AppConfig::default()
    });

    // 2. 初始化日志与指标
    let _guard = observability::init(&config.service_name, &config.effective_observability()).await?;
    info!(
        environment = %config.environment,
        production = config.is_production(),
        enabled = ?config.enabled_channels(),
        "Configuration loaded"
    );

    // 3. 读取请求
    let json = match std::env::args().nth(1) {
        Some(path) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("读取请求文件失败: {path}"))?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("读取标准输入失败")?;
            buf
        }
    };
    let request = NotificationFile::from_json(&json)?.into_request()?;

    // 4. 装配注册表并发送
    let registry = wiring::build_registry(&config)?;
    info!(channels = ?registry.available_channels(), "可用通知渠道");

    registry.send(&request).await?;
    info!(
        channel = %request.channel(),
        recipients = request.recipients().len(),
        "通知发送完成"
    );

    Ok(())
}
