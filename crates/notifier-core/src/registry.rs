//! 分发注册表
//!
//! 启动时从传输列表构建一次 `渠道 → 传输` 映射，之后只读。
//! 通过 `Arc<DispatchRegistry>` 显式注入到需要发送通知的组件中。

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::channel::Channel;
use crate::error::{NotifierError, Result};
use crate::request::NotificationRequest;
use crate::transport::Transport;

pub struct DispatchRegistry {
    transports: BTreeMap<Channel, Arc<dyn Transport>>,
}

impl DispatchRegistry {
    /// 按输入顺序注册传输；同一渠道出现多次时后者覆盖前者
    pub fn new<I>(transports: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Transport>>,
    {
        let mut map: BTreeMap<Channel, Arc<dyn Transport>> = BTreeMap::new();
        for transport in transports {
            let channel = transport.channel();
            if map.insert(channel, transport).is_some() {
                warn!(channel = %channel, "渠道重复注册，后注册的传输覆盖先前的传输");
            }
        }

        info!(
            channels = ?map.keys().collect::<Vec<_>>(),
            "通知分发注册表已初始化"
        );

        Self { transports: map }
    }

    /// 将请求转发给对应渠道的传输
    ///
    /// 渠道未注册时返回 `ChannelNotSupported`，不调用任何传输；
    /// 传输返回的错误不做包装直接返回。
    pub async fn send(&self, request: &NotificationRequest) -> Result<()> {
        let channel = request.channel();
        let Some(transport) = self.transports.get(&channel) else {
            warn!(channel = %channel, "未找到该渠道的传输");
            record_dispatch(channel, "unsupported");
            return Err(NotifierError::ChannelNotSupported(channel));
        };

        match transport.send(request).await {
            Ok(()) => {
                info!(
                    channel = %channel,
                    recipients = request.recipients().len(),
                    "通知已投递"
                );
                record_dispatch(channel, "success");
                Ok(())
            }
            Err(e) => {
                error!(channel = %channel, error = %e, "通知投递失败");
                record_dispatch(channel, "failed");
                Err(e)
            }
        }
    }

    pub fn is_channel_available(&self, channel: Channel) -> bool {
        self.transports.contains_key(&channel)
    }

    /// 已注册渠道的快照（按渠道枚举顺序）
    pub fn available_channels(&self) -> Vec<Channel> {
        self.transports.keys().copied().collect()
    }
}

fn record_dispatch(channel: Channel, status: &'static str) {
    metrics::counter!(
        "notifications_dispatched_total",
        "channel" => channel.as_str(),
        "status" => status
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    fn request(channel: Channel, recipient: &str) -> NotificationRequest {
        NotificationRequest::builder()
            .channel(channel)
            .add_recipient(recipient)
            .unwrap()
            .subject("测试")
            .unwrap()
            .body("内容")
            .unwrap()
            .build()
            .unwrap()
    }

    fn mock_for(channel: Channel) -> MockTransport {
        let mut mock = MockTransport::new();
        mock.expect_channel().return_const(channel);
        mock
    }

    #[test]
    fn test_available_channels() {
        let email = mock_for(Channel::Email);
        let sms = mock_for(Channel::Sms);

        let registry = DispatchRegistry::new([
            Arc::new(sms) as Arc<dyn Transport>,
            Arc::new(email) as Arc<dyn Transport>,
        ]);

        assert_eq!(registry.available_channels(), vec![Channel::Email, Channel::Sms]);
        assert!(registry.is_channel_available(Channel::Email));
        assert!(registry.is_channel_available(Channel::Sms));
        assert!(!registry.is_channel_available(Channel::WhatsApp));
    }

    #[test]
    fn test_empty_registry() {
        let registry = DispatchRegistry::new(Vec::<Arc<dyn Transport>>::new());
        assert!(registry.available_channels().is_empty());
    }

    #[tokio::test]
    async fn test_send_routes_to_matching_transport() {
        let mut email = mock_for(Channel::Email);
        email
            .expect_send()
            .withf(|req| req.channel() == Channel::Email && req.subject() == "测试")
            .times(1)
            .returning(|_| Ok(()));

        let mut sms = mock_for(Channel::Sms);
        sms.expect_send().never();

        let registry = DispatchRegistry::new([
            Arc::new(email) as Arc<dyn Transport>,
            Arc::new(sms) as Arc<dyn Transport>,
        ]);

        registry
            .send(&request(Channel::Email, "user@example.com"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_send_unsupported_channel() {
        let mut email = mock_for(Channel::Email);
        email.expect_send().never();

        let registry = DispatchRegistry::new([Arc::new(email) as Arc<dyn Transport>]);

        let err = registry
            .send(&request(Channel::WhatsApp, "+14155550100"))
            .await
            .unwrap_err();
        assert!(matches!(err, NotifierError::ChannelNotSupported(Channel::WhatsApp)));
    }

    #[tokio::test]
    async fn test_duplicate_channel_last_wins() {
        let mut first = mock_for(Channel::Email);
        first.expect_send().never();

        let mut second = mock_for(Channel::Email);
        second.expect_send().times(1).returning(|_| Ok(()));

        let registry = DispatchRegistry::new([
            Arc::new(first) as Arc<dyn Transport>,
            Arc::new(second) as Arc<dyn Transport>,
        ]);

        assert_eq!(registry.available_channels(), vec![Channel::Email]);
        registry
            .send(&request(Channel::Email, "user@example.com"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_transport_error_propagates_unchanged() {
        let mut sms = mock_for(Channel::Sms);
        sms.expect_send()
            .times(1)
            .returning(|_| Err(NotifierError::send_failed(Channel::Sms, "号码无效")));

        let registry = DispatchRegistry::new([Arc::new(sms) as Arc<dyn Transport>]);

        let err = registry
            .send(&request(Channel::Sms, "+14155550100"))
            .await
            .unwrap_err();
        match err {
            NotifierError::SendFailed { channel, reason } => {
                assert_eq!(channel, Channel::Sms);
                assert_eq!(reason, "号码无效");
            }
            other => panic!("应透传传输错误, 实际: {other:?}"),
        }
    }

    #[test]
    fn test_supports_follows_channel() {
        struct FixedSms;

        #[async_trait::async_trait]
        impl Transport for FixedSms {
            async fn send(&self, _request: &NotificationRequest) -> Result<()> {
                Ok(())
            }

            fn channel(&self) -> Channel {
                Channel::Sms
            }
        }

        assert!(FixedSms.supports(Channel::Sms));
        assert!(!FixedSms.supports(Channel::Email));
        assert!(!FixedSms.supports(Channel::WhatsApp));
    }

    #[test]
    fn test_registry_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DispatchRegistry>();
    }
}
