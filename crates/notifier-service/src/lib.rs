//! 通知服务
//!
//! 提供邮件（SMTP）、短信与 WhatsApp（Twilio）传输实现，按配置装配分发注册表，
//! 并支持从 JSON 文件读取通知请求。

pub mod request_file;
pub mod transports;
pub mod wiring;
