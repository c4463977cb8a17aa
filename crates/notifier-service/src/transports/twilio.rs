//! Twilio Messages API 客户端
//!
//! 短信与 WhatsApp 共用同一接口，区别仅在于地址是否带 `whatsapp:` 前缀。

use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, info, warn};

use notifier_core::validators::{is_not_empty, is_valid_phone_number};
use notifier_core::{Channel, NotificationRequest, NotifierError, Result};
use notifier_shared::observability::metrics::record_transport_send;

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// 发送方号码（E.164）
    pub from_phone: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl TwilioConfig {
    pub fn builder() -> TwilioConfigBuilder {
        TwilioConfigBuilder::default()
    }
}

pub struct TwilioConfigBuilder {
    account_sid: String,
    auth_token: String,
    from_phone: String,
    api_base: String,
    timeout: Duration,
}

impl Default for TwilioConfigBuilder {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            from_phone: String::new(),
            api_base: "https://api.twilio.com".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl TwilioConfigBuilder {
    pub fn account_sid(mut self, account_sid: impl Into<String>) -> Self {
        self.account_sid = account_sid.into();
        self
    }

    pub fn auth_token(mut self, auth_token: impl Into<String>) -> Self {
        self.auth_token = auth_token.into();
        self
    }

    pub fn from_phone(mut self, from_phone: impl Into<String>) -> Self {
        self.from_phone = from_phone.into();
        self
    }

    /// 覆盖 API 地址，测试时指向本地模拟服务
    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<TwilioConfig> {
        if !is_not_empty(&self.account_sid) {
            return Err(NotifierError::invalid("account_sid", "必填"));
        }
        if !is_not_empty(&self.auth_token) {
            return Err(NotifierError::invalid("auth_token", "必填"));
        }
        if !is_valid_phone_number(&self.from_phone) {
            return Err(NotifierError::invalid(
                "from_phone",
                format!("无效的发送方号码: {}", self.from_phone),
            ));
        }
        if !is_not_empty(&self.api_base) {
            return Err(NotifierError::invalid("api_base", "必填"));
        }

        Ok(TwilioConfig {
            account_sid: self.account_sid,
            auth_token: self.auth_token,
            from_phone: self.from_phone,
            api_base: self.api_base.trim_end_matches('/').to_string(),
            timeout: self.timeout,
        })
    }
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    code: Option<i64>,
    message: String,
}

pub struct TwilioClient {
    config: TwilioConfig,
    http: reqwest::Client,
}

impl TwilioClient {
    pub fn new(config: TwilioConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NotifierError::invalid("twilio", format!("HTTP 客户端初始化失败: {e}")))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &TwilioConfig {
        &self.config
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base, self.config.account_sid
        )
    }

    /// 创建一条消息，成功时返回消息 SID
    ///
    /// `channel` 仅用于错误归属，地址前缀由调用方负责。
    pub async fn create_message(
        &self,
        channel: Channel,
        from: &str,
        to: &str,
        body: &str,
    ) -> Result<String> {
        let response = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[("To", to), ("From", from), ("Body", body)])
            .send()
            .await
            .map_err(|e| NotifierError::send_failed(channel, format!("请求 Twilio 失败: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let reason = match response.json::<ErrorResponse>().await {
                Ok(ErrorResponse {
                    code: Some(code),
                    message,
                }) => format!("HTTP {status}, Twilio 错误 {code}: {message}"),
                Ok(ErrorResponse { message, .. }) => format!("HTTP {status}: {message}"),
                Err(_) => format!("HTTP {status}"),
            };
            return Err(NotifierError::send_failed(channel, reason));
        }

        let message: MessageResponse = response
            .json()
            .await
            .map_err(|e| NotifierError::send_failed(channel, format!("无法解析 Twilio 响应: {e}")))?;

        debug!(channel = %channel, sid = %message.sid, "Twilio 消息已创建");
        Ok(message.sid)
    }

    /// 逐个收件人发送正文，遇到第一个失败即返回
    ///
    /// `address` 把 E.164 号码映射为该渠道的 Twilio 地址，发送方号码同样经过映射。
    /// 已发送成功的收件人不会回滚。
    pub async fn send_each(
        &self,
        channel: Channel,
        request: &NotificationRequest,
        address: fn(&str) -> String,
    ) -> Result<()> {
        if request.has_attachments() {
            warn!(
                channel = %channel,
                attachments = request.attachments().len(),
                "该渠道不支持附件，已忽略"
            );
        }

        let body = request.content().as_str();
        let from = address(&self.config.from_phone);

        for recipient in request.recipients() {
            let to = address(recipient);
            let start = Instant::now();
            let result = self.create_message(channel, &from, &to, body).await;
            let elapsed = start.elapsed().as_secs_f64();

            match result {
                Ok(sid) => {
                    record_transport_send(channel.as_str(), "success", elapsed);
                    info!(channel = %channel, to = %recipient, sid = %sid, "消息发送成功");
                }
                Err(e) => {
                    record_transport_send(channel.as_str(), "failed", elapsed);
                    return Err(e);
                }
            }
        }

        Ok(())
    }
}
