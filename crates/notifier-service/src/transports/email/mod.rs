//! Email 邮件传输
//!
//! 通过 SMTP 提交邮件。收件人与抄送写入报文头，密送只进入信封；
//! 附件在发送前一次性读取（数据流类附件只能发送一次）。

mod config;
pub mod mime;
pub mod smtp;

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{self, ClientConfig, RootCertStore};
use tracing::{debug, info, warn};

use notifier_core::{Channel, NotificationRequest, NotifierError, Result, Transport};
use notifier_shared::observability::metrics::record_transport_send;

pub use config::{EmailConfig, EmailConfigBuilder, SmtpSecurity};
use mime::{MessageMeta, ResolvedAttachment};
use smtp::{Envelope, SmtpClient, SmtpError};

pub struct EmailTransport {
    config: EmailConfig,
    tls: TlsConnector,
}

impl EmailTransport {
    pub fn new(config: EmailConfig) -> Result<Self> {
        let tls = tls_connector()
            .map_err(|e| NotifierError::send_failed(Channel::Email, format!("TLS 初始化失败: {e}")))?;
        Ok(Self { config, tls })
    }

    pub fn config(&self) -> &EmailConfig {
        &self.config
    }

    async fn render(&self, request: &NotificationRequest) -> Result<String> {
        let mut attachments = Vec::with_capacity(request.attachments().len());
        for attachment in request.attachments() {
            let data = attachment.read_data().await.map_err(|e| {
                NotifierError::send_failed(
                    Channel::Email,
                    format!("读取附件 {} 失败: {e}", attachment.filename()),
                )
            })?;
            attachments.push(ResolvedAttachment { attachment, data });
        }

        let meta = MessageMeta::generate(&self.config.from_email);
        debug!(message_id = %meta.message_id, attachments = attachments.len(), "邮件报文已生成");
        Ok(mime::render(&self.config.from_email, request, &attachments, &meta))
    }

    async fn deliver(&self, envelope: &Envelope, message: &str) -> std::result::Result<(), SmtpError> {
        let tcp = TcpStream::connect((self.config.host.as_str(), self.config.port)).await?;

        match self.config.security {
            SmtpSecurity::None => {
                let client = SmtpClient::connect(tcp).await?;
                self.transact(client, envelope, message).await
            }
            SmtpSecurity::Tls => {
                let stream = self.handshake(tcp).await?;
                let client = SmtpClient::connect(stream).await?;
                self.transact(client, envelope, message).await
            }
            SmtpSecurity::StartTls => {
                let mut client = SmtpClient::connect(tcp).await?;
                client.ehlo(&self.config.helo_name).await?;
                client.starttls().await?;
                let stream = self.handshake(client.into_inner()).await?;
                self.transact(SmtpClient::wrap(stream), envelope, message).await
            }
        }
    }

    async fn handshake<S>(
        &self,
        stream: S,
    ) -> std::result::Result<tokio_rustls::client::TlsStream<S>, SmtpError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let name = ServerName::try_from(self.config.host.clone())
            .map_err(|e| SmtpError::Tls(e.to_string()))?;
        self.tls
            .connect(name, stream)
            .await
            .map_err(|e| SmtpError::Tls(e.to_string()))
    }

    async fn transact<S>(
        &self,
        mut client: SmtpClient<S>,
        envelope: &Envelope,
        message: &str,
    ) -> std::result::Result<(), SmtpError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        client.ehlo(&self.config.helo_name).await?;
        if self.config.auth_enabled {
            client
                .auth_plain(&self.config.username, &self.config.password)
                .await?;
        }
        client.send_mail(envelope, message).await?;

        // 邮件已被接受，QUIT 失败不影响结果
        if let Err(e) = client.quit().await {
            warn!(error = %e, "SMTP QUIT 失败");
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for EmailTransport {
    async fn send(&self, request: &NotificationRequest) -> Result<()> {
        let start = Instant::now();
        let message = self.render(request).await?;

        let envelope = Envelope {
            from: self.config.from_email.clone(),
            recipients: request
                .recipients()
                .iter()
                .chain(request.cc())
                .chain(request.bcc())
                .cloned()
                .collect(),
        };

        let outcome = tokio::time::timeout(self.config.timeout, self.deliver(&envelope, &message))
            .await
            .unwrap_or_else(|_| {
                Err(SmtpError::Io(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "SMTP 会话超时",
                )))
            });

        let elapsed = start.elapsed().as_secs_f64();
        match outcome {
            Ok(()) => {
                record_transport_send(Channel::Email.as_str(), "success", elapsed);
                info!(
                    host = %self.config.host,
                    recipients = envelope.recipients.len(),
                    subject = %request.subject(),
                    "邮件发送成功"
                );
                Ok(())
            }
            Err(e) => {
                record_transport_send(Channel::Email.as_str(), "failed", elapsed);
                Err(NotifierError::send_failed(Channel::Email, e.to_string()))
            }
        }
    }

    fn channel(&self) -> Channel {
        Channel::Email
    }
}

fn tls_connector() -> std::result::Result<TlsConnector, rustls::Error> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
        .with_safe_default_protocol_versions()?
        .with_root_certificates(roots)
        .with_no_client_auth();

    Ok(TlsConnector::from(Arc::new(config)))
}
