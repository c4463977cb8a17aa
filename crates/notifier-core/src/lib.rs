//! 通知核心库
//!
//! 定义经过校验的通知请求与附件模型、渠道传输 trait，以及按渠道路由的
//! 分发注册表。具体的邮件、短信、WhatsApp 传输实现位于 `notifier-service`。

pub mod attachment;
pub mod channel;
pub mod error;
pub mod registry;
pub mod request;
pub mod transport;
pub mod validators;

pub use attachment::{AttachmentPayload, AttachmentSource, AttachmentStream};
pub use channel::{Channel, Priority};
pub use error::{NotifierError, Result};
pub use registry::DispatchRegistry;
pub use request::{Content, NotificationRequest};
pub use transport::Transport;
