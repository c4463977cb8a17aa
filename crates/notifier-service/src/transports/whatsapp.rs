//! WhatsApp 消息传输
//!
//! 同样基于 Twilio Messages API，收发双方地址均加 `whatsapp:` 前缀。

use async_trait::async_trait;

use notifier_core::{Channel, NotificationRequest, Result, Transport};

use super::twilio::{TwilioClient, TwilioConfig};

const ADDRESS_PREFIX: &str = "whatsapp:";

pub struct WhatsAppTransport {
    client: TwilioClient,
}

impl WhatsAppTransport {
    pub fn new(config: TwilioConfig) -> Result<Self> {
        Ok(Self {
            client: TwilioClient::new(config)?,
        })
    }
}

fn address(phone: &str) -> String {
    format!("{ADDRESS_PREFIX}{phone}")
}

#[async_trait]
impl Transport for WhatsAppTransport {
    async fn send(&self, request: &NotificationRequest) -> Result<()> {
        self.client.send_each(Channel::WhatsApp, request, address).await
    }

    fn channel(&self) -> Channel {
        Channel::WhatsApp
    }
}
