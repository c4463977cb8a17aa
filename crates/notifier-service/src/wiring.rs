//! 按配置装配传输与分发注册表

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use notifier_core::{DispatchRegistry, Transport};
use notifier_shared::config::{AppConfig, EmailSettings, TwilioSettings};

use crate::transports::{
    EmailConfig, EmailTransport, SmsTransport, TwilioConfig, WhatsAppTransport,
};

/// 依次为启用的邮件、短信、WhatsApp 配置构建传输
pub fn build_transports(config: &AppConfig) -> anyhow::Result<Vec<Arc<dyn Transport>>> {
    let mut transports: Vec<Arc<dyn Transport>> = Vec::new();

    if config.email.enabled {
        let email = EmailTransport::new(email_config(&config.email).context("邮件配置无效")?)?;
        info!(host = %config.email.host, port = config.email.port, "邮件传输已启用");
        transports.push(Arc::new(email));
    }

    if config.sms.enabled {
        let sms = SmsTransport::new(twilio_config(&config.sms).context("短信配置无效")?)?;
        info!(from = %config.sms.from_phone, "短信传输已启用");
        transports.push(Arc::new(sms));
    }

    if config.whatsapp.enabled {
        let whatsapp =
            WhatsAppTransport::new(twilio_config(&config.whatsapp).context("WhatsApp 配置无效")?)?;
        info!(from = %config.whatsapp.from_phone, "WhatsApp 传输已启用");
        transports.push(Arc::new(whatsapp));
    }

    Ok(transports)
}

pub fn build_registry(config: &AppConfig) -> anyhow::Result<Arc<DispatchRegistry>> {
    let transports = build_transports(config)?;
    Ok(Arc::new(DispatchRegistry::new(transports)))
}

fn email_config(settings: &EmailSettings) -> notifier_core::Result<EmailConfig> {
    EmailConfig::builder()
        .host(&settings.host)
        .port(settings.port)
        .username(&settings.username)
        .password(&settings.password)
        .from_email(&settings.from)
        .auth_enabled(settings.auth_enabled)
        .security(settings.security)
        .helo_name(&settings.helo_name)
        .timeout(Duration::from_secs(settings.timeout_seconds))
        .build()
}

fn twilio_config(settings: &TwilioSettings) -> notifier_core::Result<TwilioConfig> {
    TwilioConfig::builder()
        .account_sid(&settings.account_sid)
        .auth_token(&settings.auth_token)
        .from_phone(&settings.from_phone)
        .api_base(&settings.api_base)
        .timeout(Duration::from_secs(settings.timeout_seconds))
        .build()
}
