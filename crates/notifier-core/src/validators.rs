//! 字符串校验工具
//!
//! 纯函数谓词：非空、单行文本、邮箱格式、E.164 手机号格式。
//! `AddressKind` 按渠道选择收件地址应满足的格式。

use std::sync::LazyLock;

use regex::Regex;

use crate::channel::Channel;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("邮箱正则无效")
});

static PHONE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+[1-9]\d{1,14}$").expect("手机号正则无效"));

pub fn is_not_empty(s: &str) -> bool {
    !s.is_empty()
}

pub fn is_not_blank(s: &str) -> bool {
    !s.trim().is_empty()
}

/// 可以安全写入一行报文头：不含换行及除制表符外的控制字符
pub fn is_single_line(s: &str) -> bool {
    !s.chars().any(|c| c.is_control() && c != '\t')
}

pub fn is_valid_email(s: &str) -> bool {
    EMAIL_REGEX.is_match(s)
}

/// E.164 格式：`+` 开头，首位非 0，总计 2-15 位数字
pub fn is_valid_phone_number(s: &str) -> bool {
    PHONE_REGEX.is_match(s)
}

/// 收件地址格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    Email,
    Phone,
}

impl AddressKind {
    /// 邮件渠道使用邮箱地址，短信与 WhatsApp 使用 E.164 手机号
    pub fn for_channel(channel: Channel) -> Self {
        match channel {
            Channel::Email => Self::Email,
            Channel::Sms | Channel::WhatsApp => Self::Phone,
        }
    }

    pub fn matches(&self, address: &str) -> bool {
        match self {
            Self::Email => is_valid_email(address),
            Self::Phone => is_valid_phone_number(address),
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::Email => "邮箱地址",
            Self::Phone => "E.164 手机号",
        }
    }
}
