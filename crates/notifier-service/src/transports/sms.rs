//! SMS 短信传输
//!
//! 每个收件人单独调用一次 Twilio；短信没有主题、抄送与附件，只发送正文。

use async_trait::async_trait;

use notifier_core::{Channel, NotificationRequest, Result, Transport};

use super::twilio::{TwilioClient, TwilioConfig};

pub struct SmsTransport {
    client: TwilioClient,
}

impl SmsTransport {
    pub fn new(config: TwilioConfig) -> Result<Self> {
        Ok(Self {
            client: TwilioClient::new(config)?,
        })
    }
}

#[async_trait]
impl Transport for SmsTransport {
    async fn send(&self, request: &NotificationRequest) -> Result<()> {
        self.client
            .send_each(Channel::Sms, request, |phone| phone.to_string())
            .await
    }

    fn channel(&self) -> Channel {
        Channel::Sms
    }
}
