//! 渠道传输 trait
//!
//! 每个传输实现负责一个渠道的实际投递（SMTP、短信、WhatsApp 等）。
//! 注册表只依赖 `channel()` 建立路由，`supports()` 供外部直接探测使用。

use async_trait::async_trait;

use crate::channel::Channel;
use crate::error::Result;
use crate::request::NotificationRequest;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// 投递通知，失败时返回的错误由注册表原样透传
    async fn send(&self, request: &NotificationRequest) -> Result<()>;

    /// 该传输负责的渠道
    fn channel(&self) -> Channel;

    /// 必须与 `channel()` 保持一致
    fn supports(&self, channel: Channel) -> bool {
        channel == self.channel()
    }
}
