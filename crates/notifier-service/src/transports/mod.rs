//! 渠道传输实现
//!
//! ## 支持的渠道
//!
//! - **Email**: SMTP 提交，支持抄送、密送与附件
//! - **SMS**: Twilio Messages API
//! - **WhatsApp**: Twilio Messages API（`whatsapp:` 地址前缀）

pub mod email;
pub mod sms;
pub mod twilio;
pub mod whatsapp;

pub use email::{EmailConfig, EmailTransport};
pub use sms::SmsTransport;
pub use twilio::{TwilioClient, TwilioConfig};
pub use whatsapp::WhatsAppTransport;
