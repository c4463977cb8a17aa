//! 通知错误类型
//!
//! 区分构建期的校验错误、分发期的渠道不支持错误以及传输层的发送失败，
//! 传输层错误由注册表原样透传给调用方。

use thiserror::Error;

use crate::channel::Channel;

#[derive(Debug, Error)]
pub enum NotifierError {
    // ==================== 构建校验错误 ====================
    #[error("参数验证失败: {field} - {message}")]
    Validation { field: &'static str, message: String },

    // ==================== 分发错误 ====================
    #[error("渠道不支持: {0}")]
    ChannelNotSupported(Channel),

    // ==================== 传输错误 ====================
    #[error("通知发送失败: 渠道={channel}, 原因={reason}")]
    SendFailed { channel: Channel, reason: String },

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, NotifierError>;

impl NotifierError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn send_failed(channel: Channel, reason: impl Into<String>) -> Self {
        Self::SendFailed {
            channel,
            reason: reason.into(),
        }
    }

    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::ChannelNotSupported(_) => "CHANNEL_NOT_SUPPORTED",
            Self::SendFailed { .. } => "SEND_FAILED",
            Self::Io(_) => "IO_ERROR",
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NotifierError::invalid("filename", "不能为空");
        assert_eq!(err.to_string(), "参数验证失败: filename - 不能为空");
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(err.is_validation());

        let err = NotifierError::ChannelNotSupported(Channel::WhatsApp);
        assert_eq!(err.to_string(), "渠道不支持: WHATSAPP");
        assert_eq!(err.code(), "CHANNEL_NOT_SUPPORTED");

        let err = NotifierError::send_failed(Channel::Sms, "网络超时");
        assert_eq!(err.to_string(), "通知发送失败: 渠道=SMS, 原因=网络超时");
        assert!(!err.is_validation());
    }
}
