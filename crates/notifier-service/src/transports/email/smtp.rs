//! 最小 SMTP 客户端
//!
//! 只实现提交邮件所需的命令：EHLO、STARTTLS、AUTH PLAIN、MAIL、RCPT、DATA、QUIT。
//! 底层流为泛型，便于在明文 TCP、TLS 流与测试用的模拟流之间切换。

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::debug;

/// 单行回复的最大长度（RFC 5321 规定 512，留出余量）
const MAX_REPLY_LINE: usize = 4096;

#[derive(Debug, Error)]
pub enum SmtpError {
    #[error("连接错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("服务器在 {stage} 阶段拒绝: {code} {message}")]
    Rejected {
        stage: &'static str,
        code: u16,
        message: String,
    },

    #[error("无法解析服务器回复: {0}")]
    Protocol(String),

    #[error("服务器不支持 STARTTLS")]
    StartTlsUnavailable,

    #[error("TLS 握手失败: {0}")]
    Tls(String),
}

/// 服务器回复，多行回复的文本按行保存
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl Reply {
    pub fn message(&self) -> String {
        self.lines.join(" ")
    }
}

/// 邮件信封：实际投递地址，包括不出现在报文头中的密送地址
#[derive(Debug, Clone)]
pub struct Envelope {
    pub from: String,
    pub recipients: Vec<String>,
}

pub struct SmtpClient<S> {
    stream: BufReader<S>,
    extensions: Vec<String>,
}

impl<S> SmtpClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// 包装已建立的连接并读取 220 欢迎语
    pub async fn connect(stream: S) -> Result<Self, SmtpError> {
        let mut client = Self::wrap(stream);
        client.read_expected("greeting", &[220]).await?;
        Ok(client)
    }

    /// 包装已完成欢迎阶段的连接（STARTTLS 升级后使用）
    pub fn wrap(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
            extensions: Vec::new(),
        }
    }

    pub fn into_inner(self) -> S {
        self.stream.into_inner()
    }

    pub fn supports(&self, extension: &str) -> bool {
        self.extensions.iter().any(|ext| {
            ext.split_whitespace()
                .next()
                .is_some_and(|keyword| keyword.eq_ignore_ascii_case(extension))
        })
    }

    pub async fn ehlo(&mut self, helo_name: &str) -> Result<(), SmtpError> {
        let reply = self.command(&format!("EHLO {helo_name}"), "EHLO", &[250]).await?;
        // 第一行是服务器问候，其余为扩展声明
        self.extensions = reply.lines.into_iter().skip(1).collect();
        debug!(extensions = ?self.extensions, "SMTP EHLO 完成");
        Ok(())
    }

    /// 发送 STARTTLS，成功后调用方应取出底层流完成握手
    pub async fn starttls(&mut self) -> Result<(), SmtpError> {
        if !self.supports("STARTTLS") {
            return Err(SmtpError::StartTlsUnavailable);
        }
        self.command("STARTTLS", "STARTTLS", &[220]).await?;
        Ok(())
    }

    pub async fn auth_plain(&mut self, username: &str, password: &str) -> Result<(), SmtpError> {
        let token = STANDARD.encode(format!("\0{username}\0{password}"));
        self.command(&format!("AUTH PLAIN {token}"), "AUTH", &[235])
            .await?;
        Ok(())
    }

    /// 完成一次邮件事务：MAIL FROM、逐个 RCPT TO、DATA
    pub async fn send_mail(&mut self, envelope: &Envelope, message: &str) -> Result<(), SmtpError> {
        self.command(&format!("MAIL FROM:<{}>", envelope.from), "MAIL FROM", &[250])
            .await?;

        for recipient in &envelope.recipients {
            self.command(&format!("RCPT TO:<{recipient}>"), "RCPT TO", &[250, 251])
                .await?;
        }

        self.command("DATA", "DATA", &[354]).await?;

        let mut payload = dot_stuff(message);
        payload.push_str(".\r\n");
        self.stream.write_all(payload.as_bytes()).await?;
        self.stream.flush().await?;
        self.read_expected("DATA", &[250]).await?;

        Ok(())
    }

    pub async fn quit(&mut self) -> Result<(), SmtpError> {
        self.command("QUIT", "QUIT", &[221]).await?;
        Ok(())
    }

    async fn command(
        &mut self,
        line: &str,
        stage: &'static str,
        expected: &[u16],
    ) -> Result<Reply, SmtpError> {
        self.stream.write_all(format!("{line}\r\n").as_bytes()).await?;
        self.stream.flush().await?;
        self.read_expected(stage, expected).await
    }

    async fn read_expected(&mut self, stage: &'static str, expected: &[u16]) -> Result<Reply, SmtpError> {
        let reply = self.read_reply().await?;
        if expected.contains(&reply.code) {
            Ok(reply)
        } else {
            Err(SmtpError::Rejected {
                stage,
                code: reply.code,
                message: reply.message(),
            })
        }
    }

    async fn read_reply(&mut self) -> Result<Reply, SmtpError> {
        let mut lines = Vec::new();
        loop {
            let mut line = String::new();
            // 限制单次读取的长度，避免服务器不发送换行时无限缓冲
            let read = (&mut self.stream)
                .take(MAX_REPLY_LINE as u64)
                .read_line(&mut line)
                .await?;
            if !line.ends_with('\n') {
                let reason = if read >= MAX_REPLY_LINE {
                    "回复行过长"
                } else {
                    "连接被服务器关闭"
                };
                return Err(SmtpError::Protocol(reason.to_string()));
            }

            let line = line.trim_end_matches(['\r', '\n']);
            let (code, more, text) = parse_reply_line(line)?;
            lines.push(text.to_string());

            if !more {
                return Ok(Reply { code, lines });
            }
        }
    }
}

/// 解析 `250-text` / `250 text` 形式的回复行，返回（状态码，是否还有后续行，文本）
fn parse_reply_line(line: &str) -> Result<(u16, bool, &str), SmtpError> {
    let code = match line.as_bytes().get(..3) {
        Some(digits) if digits.iter().all(u8::is_ascii_digit) => digits
            .iter()
            .fold(0u16, |code, digit| code * 10 + u16::from(digit - b'0')),
        _ => return Err(SmtpError::Protocol(line.to_string())),
    };

    match line.as_bytes().get(3) {
        None => Ok((code, false, "")),
        Some(b' ') => Ok((code, false, &line[4..])),
        Some(b'-') => Ok((code, true, &line[4..])),
        Some(_) => Err(SmtpError::Protocol(line.to_string())),
    }
}

/// 统一换行为 CRLF，并对以 `.` 开头的行做 dot-stuffing
pub fn dot_stuff(message: &str) -> String {
    let mut out = String::with_capacity(message.len() + 16);
    for line in message.split_inclusive('\n') {
        let content = line.trim_end_matches(['\r', '\n']);
        if content.starts_with('.') {
            out.push('.');
        }
        out.push_str(content);
        out.push_str("\r\n");
    }
    out
}
