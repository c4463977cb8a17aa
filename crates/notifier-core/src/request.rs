//! 通知请求模型
//!
//! `NotificationRequest` 是一次通知的不可变描述。构建器在 setter 上做单字段校验，
//! `build()` 按固定顺序做跨字段校验：渠道 → 收件人 → 主题 → 正文/HTML 二选一，
//! 最后按渠道校验所有地址格式。

use crate::attachment::AttachmentPayload;
use crate::channel::{Channel, Priority};
use crate::error::{NotifierError, Result};
use crate::validators::{AddressKind, is_not_blank, is_not_empty, is_single_line, is_valid_email};

/// 通知正文
///
/// 纯文本与 HTML 互斥，构建成功的请求必定持有其中之一。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Content<'a> {
    Text(&'a str),
    Html(&'a str),
}

impl<'a> Content<'a> {
    pub fn as_str(&self) -> &'a str {
        match *self {
            Self::Text(s) | Self::Html(s) => s,
        }
    }

    pub fn is_html(&self) -> bool {
        matches!(self, Self::Html(_))
    }
}

#[derive(Debug, Clone)]
pub struct NotificationRequest {
    channel: Channel,
    recipients: Vec<String>,
    cc: Vec<String>,
    bcc: Vec<String>,
    subject: String,
    body: Option<String>,
    html_content: Option<String>,
    organization_name: Option<String>,
    priority: Priority,
    reply_to: Option<String>,
    attachments: Vec<AttachmentPayload>,
}

impl NotificationRequest {
    pub fn builder() -> NotificationRequestBuilder {
        NotificationRequestBuilder::default()
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    pub fn cc(&self) -> &[String] {
        &self.cc
    }

    pub fn bcc(&self) -> &[String] {
        &self.bcc
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn html_content(&self) -> Option<&str> {
        self.html_content.as_deref()
    }

    pub fn content(&self) -> Content<'_> {
        match (&self.body, &self.html_content) {
            (_, Some(html)) => Content::Html(html),
            (Some(body), None) => Content::Text(body),
            // build() 保证二者恰有其一
            (None, None) => Content::Text(""),
        }
    }

    pub fn organization_name(&self) -> Option<&str> {
        self.organization_name.as_deref()
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn reply_to(&self) -> Option<&str> {
        self.reply_to.as_deref()
    }

    pub fn attachments(&self) -> &[AttachmentPayload] {
        &self.attachments
    }

    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }
}

/// 通知请求构建器
///
/// 建议先设置渠道：渠道已知时地址 setter 会立即按渠道校验格式，
/// 否则格式校验推迟到 `build()`。
#[derive(Default)]
pub struct NotificationRequestBuilder {
    channel: Option<Channel>,
    recipients: Vec<String>,
    cc: Vec<String>,
    bcc: Vec<String>,
    subject: Option<String>,
    body: Option<String>,
    html_content: Option<String>,
    organization_name: Option<String>,
    priority: Priority,
    reply_to: Option<String>,
    attachments: Vec<AttachmentPayload>,
}

impl NotificationRequestBuilder {
    pub fn channel(mut self, channel: Channel) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn add_recipient(mut self, recipient: impl Into<String>) -> Result<Self> {
        let recipient = self.check_address("recipients", recipient.into())?;
        self.recipients.push(recipient);
        Ok(self)
    }

    pub fn add_recipients<I, S>(self, recipients: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        recipients
            .into_iter()
            .try_fold(self, |builder, r| builder.add_recipient(r))
    }

    pub fn add_cc(mut self, cc: impl Into<String>) -> Result<Self> {
        let cc = self.check_address("cc", cc.into())?;
        self.cc.push(cc);
        Ok(self)
    }

    pub fn add_ccs<I, S>(self, ccs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ccs.into_iter().try_fold(self, |builder, cc| builder.add_cc(cc))
    }

    pub fn add_bcc(mut self, bcc: impl Into<String>) -> Result<Self> {
        let bcc = self.check_address("bcc", bcc.into())?;
        self.bcc.push(bcc);
        Ok(self)
    }

    pub fn add_bccs<I, S>(self, bccs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        bccs.into_iter().try_fold(self, |builder, bcc| builder.add_bcc(bcc))
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Result<Self> {
        let subject = subject.into();
        if !is_not_blank(&subject) {
            return Err(NotifierError::invalid("subject", "不能为空白"));
        }
        self.subject = Some(single_line("subject", subject)?);
        Ok(self)
    }

    pub fn body(mut self, body: impl Into<String>) -> Result<Self> {
        self.body = Some(non_empty("body", body.into())?);
        Ok(self)
    }

    pub fn html_content(mut self, html_content: impl Into<String>) -> Result<Self> {
        self.html_content = Some(non_empty("html_content", html_content.into())?);
        Ok(self)
    }

    pub fn organization_name(mut self, organization_name: impl Into<String>) -> Result<Self> {
        let organization_name = non_empty("organization_name", organization_name.into())?;
        self.organization_name = Some(single_line("organization_name", organization_name)?);
        Ok(self)
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn reply_to(mut self, reply_to: impl Into<String>) -> Result<Self> {
        let reply_to = reply_to.into();
        if !is_valid_email(&reply_to) {
            return Err(NotifierError::invalid(
                "reply_to",
                format!("无效的邮箱地址: {reply_to}"),
            ));
        }
        self.reply_to = Some(reply_to);
        Ok(self)
    }

    pub fn add_attachment(mut self, attachment: AttachmentPayload) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn add_attachments(mut self, attachments: impl IntoIterator<Item = AttachmentPayload>) -> Self {
        self.attachments.extend(attachments);
        self
    }

    pub fn build(self) -> Result<NotificationRequest> {
        let channel = self
            .channel
            .ok_or_else(|| NotifierError::invalid("channel", "必填"))?;

        if self.recipients.is_empty() {
            return Err(NotifierError::invalid("recipients", "至少需要一个收件人"));
        }

        let subject = match self.subject {
            Some(subject) if is_not_blank(&subject) => subject,
            _ => return Err(NotifierError::invalid("subject", "必填")),
        };

        match (&self.body, &self.html_content) {
            (None, None) => {
                return Err(NotifierError::invalid("content", "body 与 html_content 不能同时为空"));
            }
            (Some(_), Some(_)) => {
                return Err(NotifierError::invalid("content", "不能同时指定 body 与 html_content"));
            }
            _ => {}
        }

        let kind = AddressKind::for_channel(channel);
        for (field, addresses) in [
            ("recipients", &self.recipients),
            ("cc", &self.cc),
            ("bcc", &self.bcc),
        ] {
            if let Some(bad) = addresses.iter().find(|a| !kind.matches(a)) {
                return Err(NotifierError::invalid(
                    field,
                    format!("{channel} 渠道需要{}: {bad}", kind.describe()),
                ));
            }
        }

        Ok(NotificationRequest {
            channel,
            recipients: self.recipients,
            cc: self.cc,
            bcc: self.bcc,
            subject,
            body: self.body,
            html_content: self.html_content,
            organization_name: self.organization_name,
            priority: self.priority,
            reply_to: self.reply_to,
            attachments: self.attachments,
        })
    }

    fn check_address(&self, field: &'static str, address: String) -> Result<String> {
        if !is_not_blank(&address) {
            return Err(NotifierError::invalid(field, "地址不能为空白"));
        }
        if let Some(channel) = self.channel {
            let kind = AddressKind::for_channel(channel);
            if !kind.matches(&address) {
                return Err(NotifierError::invalid(
                    field,
                    format!("{channel} 渠道需要{}: {address}", kind.describe()),
                ));
            }
        }
        Ok(address)
    }
}

fn non_empty(field: &'static str, value: String) -> Result<String> {
    if is_not_empty(&value) {
        Ok(value)
    } else {
        Err(NotifierError::invalid(field, "不能为空"))
    }
}

/// 写入报文头的字段不允许换行
fn single_line(field: &'static str, value: String) -> Result<String> {
    if is_single_line(&value) {
        Ok(value)
    } else {
        Err(NotifierError::invalid(field, "不能包含换行或控制字符"))
    }
}
