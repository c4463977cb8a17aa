//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。
//! 各渠道配置只描述凭据与连接参数，传输实例由 `notifier-service` 按配置构建。

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::observability::ObservabilityConfig;

/// SMTP 连接安全模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    /// 明文连接，仅用于本地中继或测试
    None,
    /// 明文连接后通过 STARTTLS 升级（587 端口）
    #[default]
    StartTls,
    /// 连接建立即握手 TLS（465 端口）
    Tls,
}

/// 邮件（SMTP）渠道配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmailSettings {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// 发件人地址
    pub from: String,
    pub auth_enabled: bool,
    pub security: SmtpSecurity,
    /// EHLO 时使用的主机名
    pub helo_name: String,
    pub timeout_seconds: u64,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "smtp.gmail.com".to_string(),
            port: 587,
            username: String::new(),
            password: String::new(),
            from: String::new(),
            auth_enabled: true,
            security: SmtpSecurity::StartTls,
            helo_name: "localhost".to_string(),
            timeout_seconds: 10,
        }
    }
}

/// Twilio 渠道配置（短信与 WhatsApp 共用结构）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TwilioSettings {
    pub enabled: bool,
    pub account_sid: String,
    pub auth_token: String,
    /// 发送方号码（E.164）
    pub from_phone: String,
    pub api_base: String,
    pub timeout_seconds: u64,
}

impl Default for TwilioSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            account_sid: String::new(),
            auth_token: String::new(),
            from_phone: String::new(),
            api_base: "https://api.twilio.com".to_string(),
            timeout_seconds: 10,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub email: EmailSettings,
    pub sms: TwilioSettings,
    pub whatsapp: TwilioSettings,
    pub observability: ObservabilityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: "notifier".to_string(),
            environment: "development".to_string(),
            email: EmailSettings::default(),
            sms: TwilioSettings::default(),
            whatsapp: TwilioSettings::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. config/{service_name}.toml（服务特定配置）
    /// 4. 环境变量（NOTIFIER_ 前缀，层级以 `__` 分隔，如 NOTIFIER_EMAIL__HOST -> email.host）
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("NOTIFIER_ENV").unwrap_or_else(|_| "development".to_string());
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        Self::load_from(Path::new(&config_dir), &env, service_name)
    }

    pub fn load_from(config_dir: &Path, env: &str, service_name: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", env))).required(false))
            .add_source(
                File::from(config_dir.join(format!("{}.toml", service_name))).required(false),
            )
            .add_source(
                Environment::with_prefix("NOTIFIER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// 已启用的渠道名称，用于启动日志
    pub fn enabled_channels(&self) -> Vec<&'static str> {
        let mut channels = Vec::new();
        if self.email.enabled {
            channels.push("EMAIL");
        }
        if self.sms.enabled {
            channels.push("SMS");
        }
        if self.whatsapp.enabled {
            channels.push("WHATSAPP");
        }
        channels
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 实际生效的可观测性配置，生产环境始终输出 JSON 日志
    pub fn effective_observability(&self) -> ObservabilityConfig {
        let mut observability = self.observability.clone();
        if self.is_production() {
            observability.json_logs = true;
        }
        observability
    }
}
