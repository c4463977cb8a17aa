//! SMTP 连接配置

use std::time::Duration;

use notifier_core::NotifierError;
use notifier_core::validators::{is_not_empty, is_valid_email};
pub use notifier_shared::config::SmtpSecurity;

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub auth_enabled: bool,
    pub security: SmtpSecurity,
    pub helo_name: String,
    pub timeout: Duration,
}

impl EmailConfig {
    pub fn builder() -> EmailConfigBuilder {
        EmailConfigBuilder::default()
    }
}

pub struct EmailConfigBuilder {
    host: String,
    port: u16,
    username: String,
    password: String,
    from_email: String,
    auth_enabled: bool,
    security: SmtpSecurity,
    helo_name: String,
    timeout: Duration,
}

impl Default for EmailConfigBuilder {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            username: String::new(),
            password: String::new(),
            from_email: String::new(),
            auth_enabled: true,
            security: SmtpSecurity::StartTls,
            helo_name: "localhost".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl EmailConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn from_email(mut self, from_email: impl Into<String>) -> Self {
        self.from_email = from_email.into();
        self
    }

    pub fn auth_enabled(mut self, auth_enabled: bool) -> Self {
        self.auth_enabled = auth_enabled;
        self
    }

    pub fn security(mut self, security: SmtpSecurity) -> Self {
        self.security = security;
        self
    }

    pub fn helo_name(mut self, helo_name: impl Into<String>) -> Self {
        self.helo_name = helo_name.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<EmailConfig, NotifierError> {
        if !is_not_empty(&self.host) {
            return Err(NotifierError::invalid("host", "必填"));
        }
        if self.port == 0 {
            return Err(NotifierError::invalid("port", "端口无效"));
        }
        if self.auth_enabled {
            if !is_not_empty(&self.username) {
                return Err(NotifierError::invalid("username", "启用认证时必填"));
            }
            if !is_not_empty(&self.password) {
                return Err(NotifierError::invalid("password", "启用认证时必填"));
            }
        }
        if !is_valid_email(&self.from_email) {
            return Err(NotifierError::invalid(
                "from_email",
                format!("无效的发件人地址: {}", self.from_email),
            ));
        }
        if !is_not_empty(&self.helo_name) {
            return Err(NotifierError::invalid("helo_name", "必填"));
        }

        Ok(EmailConfig {
            host: self.host,
            port: self.port,
            username: self.username,
            password: self.password,
            from_email: self.from_email,
            auth_enabled: self.auth_enabled,
            security: self.security,
            helo_name: self.helo_name,
            timeout: self.timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: Result<EmailConfig, NotifierError>) -> &'static str {
        match result {
            Err(NotifierError::Validation { field, .. }) => field,
            other => panic!("应返回校验错误, 实际: {other:?}"),
        }
    }

    #[test]
    fn test_defaults() {
        let config = EmailConfig::builder()
            .username("mailer")
            .password("secret")
            .from_email("noreply@example.com")
            .build()
            .unwrap();

        assert_eq!(config.host, "smtp.gmail.com");
        assert_eq!(config.port, 587);
        assert!(config.auth_enabled);
        assert_eq!(config.security, SmtpSecurity::StartTls);
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_auth_requires_credentials() {
        let result = EmailConfig::builder()
            .password("secret")
            .from_email("noreply@example.com")
            .build();
        assert_eq!(field_of(result), "username");

        let result = EmailConfig::builder()
            .username("mailer")
            .from_email("noreply@example.com")
            .build();
        assert_eq!(field_of(result), "password");
    }

    #[test]
    fn test_without_auth_credentials_optional() {
        let config = EmailConfig::builder()
            .host("127.0.0.1")
            .port(2525)
            .auth_enabled(false)
            .from_email("noreply@example.com")
            .build()
            .unwrap();
        assert!(!config.auth_enabled);
    }

    #[test]
    fn test_security_mode_is_carried() {
        let config = EmailConfig::builder()
            .port(465)
            .security(SmtpSecurity::Tls)
            .auth_enabled(false)
            .from_email("noreply@example.com")
            .build()
            .unwrap();
        assert_eq!(config.security, SmtpSecurity::Tls);
        assert_eq!(config.port, 465);
    }

    #[test]
    fn test_invalid_from_and_host() {
        let result = EmailConfig::builder().auth_enabled(false).from_email("nope").build();
        assert_eq!(field_of(result), "from_email");

        let result = EmailConfig::builder()
            .host("")
            .auth_enabled(false)
            .from_email("noreply@example.com")
            .build();
        assert_eq!(field_of(result), "host");
    }
}
