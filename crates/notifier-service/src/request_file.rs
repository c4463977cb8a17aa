//! JSON 通知请求文件
//!
//! 文件结构与 `NotificationRequest` 字段一一对应（camelCase）。
//! 解析后先做 DTO 层的结构校验，转换时再走构建器，因此所有业务规则同样适用。

use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use validator::Validate;

use notifier_core::{
    AttachmentPayload, Channel, NotificationRequest, NotifierError, Priority, Result,
};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFile {
    pub channel: Channel,
    #[validate(length(min = 1, message = "至少需要一个收件人"))]
    pub recipients: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    #[serde(default)]
    pub bcc: Vec<String>,
    pub subject: String,
    pub body: Option<String>,
    pub html_content: Option<String>,
    pub organization_name: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    pub reply_to: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub attachments: Vec<AttachmentFile>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentFile {
    #[validate(length(min = 1, max = 255, message = "文件名长度必须在1-255个字符之间"))]
    pub filename: String,
    #[validate(length(min = 1, message = "必须指定内容类型"))]
    pub content_type: String,
    pub description: Option<String>,
    /// 附件文件路径
    pub path: Option<PathBuf>,
    /// base64 编码的附件内容
    pub content_base64: Option<String>,
}

impl NotificationFile {
    pub fn from_json(json: &str) -> Result<Self> {
        let file: Self = serde_json::from_str(json)
            .map_err(|e| NotifierError::invalid("request", format!("JSON 解析失败: {e}")))?;
        file.validate()
            .map_err(|e| NotifierError::invalid("request", e.to_string()))?;
        Ok(file)
    }

    pub fn into_request(self) -> Result<NotificationRequest> {
        let mut builder = NotificationRequest::builder()
            .channel(self.channel)
            .add_recipients(self.recipients)?
            .add_ccs(self.cc)?
            .add_bccs(self.bcc)?
            .subject(self.subject)?
            .priority(self.priority);

        if let Some(body) = self.body {
            builder = builder.body(body)?;
        }
        if let Some(html) = self.html_content {
            builder = builder.html_content(html)?;
        }
        if let Some(name) = self.organization_name {
            builder = builder.organization_name(name)?;
        }
        if let Some(reply_to) = self.reply_to {
            builder = builder.reply_to(reply_to)?;
        }

        for attachment in self.attachments {
            builder = builder.add_attachment(attachment.into_payload()?);
        }

        builder.build()
    }
}

impl AttachmentFile {
    pub fn into_payload(self) -> Result<AttachmentPayload> {
        let mut builder = AttachmentPayload::builder()
            .filename(self.filename)?
            .content_type(self.content_type)?;

        if let Some(description) = self.description {
            builder = builder.description(description)?;
        }
        if let Some(path) = self.path {
            builder = builder.file(path)?;
        }
        if let Some(encoded) = self.content_base64 {
            let content = STANDARD
                .decode(encoded.trim())
                .map_err(|e| NotifierError::invalid("contentBase64", format!("base64 解码失败: {e}")))?;
            builder = builder.content(content);
        }

        builder.build()
    }
}
