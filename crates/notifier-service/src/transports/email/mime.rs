//! MIME 邮件组装
//!
//! 将 `NotificationRequest` 渲染为 RFC 5322 报文。正文与附件统一使用 base64
//! 传输编码，非 ASCII 头部使用 RFC 2047 encoded-word。密送地址只出现在信封中，
//! 不写入报文头。

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use notifier_core::{AttachmentPayload, Content, NotificationRequest};

const CRLF: &str = "\r\n";
const LINE_WIDTH: usize = 76;
/// 单个 encoded-word 中原文的最大字节数，编码后不超过 75 字符
const ENCODED_WORD_CHUNK: usize = 45;

/// 附件及其已读取的数据
pub struct ResolvedAttachment<'a> {
    pub attachment: &'a AttachmentPayload,
    pub data: Vec<u8>,
}

/// 报文元信息，测试中可固定以获得确定的输出
#[derive(Debug, Clone)]
pub struct MessageMeta {
    pub date: DateTime<Utc>,
    pub message_id: String,
    pub boundary: String,
}

impl MessageMeta {
    pub fn generate(from_email: &str) -> Self {
        let domain = from_email.rsplit('@').next().unwrap_or("localhost");
        Self {
            date: Utc::now(),
            message_id: format!("<{}@{}>", Uuid::now_v7(), domain),
            boundary: format!("----=_Part_{}", Uuid::new_v4().simple()),
        }
    }
}

/// 渲染完整报文（不含 SMTP 的 dot-stuffing）
pub fn render(
    from_email: &str,
    request: &NotificationRequest,
    attachments: &[ResolvedAttachment<'_>],
    meta: &MessageMeta,
) -> String {
    let mut out = String::new();

    let from = match request.organization_name() {
        Some(name) => format!("{} <{}>", display_name(name), from_email),
        None => from_email.to_string(),
    };
    header(&mut out, "From", &from);
    header(&mut out, "To", &request.recipients().join(", "));
    if !request.cc().is_empty() {
        header(&mut out, "Cc", &request.cc().join(", "));
    }
    if let Some(reply_to) = request.reply_to() {
        header(&mut out, "Reply-To", reply_to);
    }
    header(&mut out, "Subject", &encode_header(request.subject()));
    header(&mut out, "Date", &meta.date.to_rfc2822());
    header(&mut out, "Message-ID", &meta.message_id);
    header(&mut out, "MIME-Version", "1.0");
    header(&mut out, "X-Priority", &request.priority().weight().to_string());

    let content = request.content();
    if attachments.is_empty() {
        body_part(&mut out, content);
        return out;
    }

    header(
        &mut out,
        "Content-Type",
        &format!("multipart/mixed; boundary=\"{}\"", meta.boundary),
    );
    out.push_str(CRLF);
    out.push_str("This is a multi-part message in MIME format.");
    out.push_str(CRLF);

    out.push_str(&format!("--{}{CRLF}", meta.boundary));
    body_part(&mut out, content);

    for resolved in attachments {
        out.push_str(&format!("--{}{CRLF}", meta.boundary));
        attachment_part(&mut out, resolved);
    }
    out.push_str(&format!("--{}--{CRLF}", meta.boundary));

    out
}

fn header(out: &mut String, name: &str, value: &str) {
    out.push_str(name);
    out.push_str(": ");
    out.push_str(value);
    out.push_str(CRLF);
}

fn body_part(out: &mut String, content: Content<'_>) {
    let mime_type = if content.is_html() { "text/html" } else { "text/plain" };
    header(out, "Content-Type", &format!("{mime_type}; charset=utf-8"));
    header(out, "Content-Transfer-Encoding", "base64");
    out.push_str(CRLF);
    push_base64(out, content.as_str().as_bytes());
}

fn attachment_part(out: &mut String, resolved: &ResolvedAttachment<'_>) {
    let attachment = resolved.attachment;
    let filename = quoted(&encode_header(attachment.filename()));

    header(
        out,
        "Content-Type",
        &format!("{}; name={}", attachment.content_type(), filename),
    );
    header(out, "Content-Disposition", &format!("attachment; filename={filename}"));
    header(out, "Content-Description", &encode_header(attachment.description()));
    header(out, "Content-Transfer-Encoding", "base64");
    out.push_str(CRLF);
    push_base64(out, &resolved.data);
}

fn push_base64(out: &mut String, data: &[u8]) {
    let encoded = STANDARD.encode(data);
    // base64 输出只含 ASCII，可按字节切分
    for line in encoded.as_bytes().chunks(LINE_WIDTH) {
        out.push_str(std::str::from_utf8(line).unwrap_or_default());
        out.push_str(CRLF);
    }
}

/// 非 ASCII 或含控制字符的文本编码为一个或多个 `=?UTF-8?B?...?=`，多个 encoded-word 之间折行
pub fn encode_header(value: &str) -> String {
    if is_plain(value) {
        return value.to_string();
    }

    let mut words = Vec::new();
    let mut start = 0;
    let mut end = 0;
    for (idx, ch) in value.char_indices() {
        let next = idx + ch.len_utf8();
        if next - start > ENCODED_WORD_CHUNK && end > start {
            words.push(encoded_word(&value[start..end]));
            start = end;
        }
        end = next;
    }
    if end > start {
        words.push(encoded_word(&value[start..end]));
    }

    words.join(&format!("{CRLF} "))
}

fn encoded_word(chunk: &str) -> String {
    format!("=?UTF-8?B?{}?=", STANDARD.encode(chunk.as_bytes()))
}

/// 可原样写入报文头的文本
fn is_plain(value: &str) -> bool {
    value.is_ascii() && !value.bytes().any(|b| b.is_ascii_control())
}

fn display_name(name: &str) -> String {
    if is_plain(name) {
        quoted(name)
    } else {
        encode_header(name)
    }
}

fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use notifier_core::{Channel, Priority};

    fn meta() -> MessageMeta {
        MessageMeta {
            date: Utc.with_ymd_and_hms(2026, 1, 16, 8, 30, 0).unwrap(),
            message_id: "<fixed@example.com>".to_string(),
            boundary: "BOUNDARY".to_string(),
        }
    }

    fn decode_lines(lines: &[&str]) -> String {
        let joined: String = lines.concat();
        String::from_utf8(STANDARD.decode(joined).unwrap()).unwrap()
    }

    #[test]
    fn test_render_plain_message() {
        let request = NotificationRequest::builder()
            .channel(Channel::Email)
            .add_recipients(["a@example.com", "b@example.com"])
            .unwrap()
            .add_cc("c@example.com")
            .unwrap()
            .add_bcc("hidden@example.com")
            .unwrap()
            .subject("Weekly report")
            .unwrap()
            .body("hello")
            .unwrap()
            .organization_name("Acme")
            .unwrap()
            .reply_to("support@example.com")
            .unwrap()
            .priority(Priority::High)
            .build()
            .unwrap();

        let message = render("noreply@example.com", &request, &[], &meta());

        assert!(message.contains("From: \"Acme\" <noreply@example.com>\r\n"));
        assert!(message.contains("To: a@example.com, b@example.com\r\n"));
        assert!(message.contains("Cc: c@example.com\r\n"));
        assert!(message.contains("Reply-To: support@example.com\r\n"));
        assert!(message.contains("Subject: Weekly report\r\n"));
        assert!(message.contains("Message-ID: <fixed@example.com>\r\n"));
        assert!(message.contains("X-Priority: 1\r\n"));
        assert!(message.contains("Content-Type: text/plain; charset=utf-8\r\n"));
        assert!(!message.contains("hidden@example.com"));
        assert!(!message.contains("multipart"));

        let (_, body) = message.split_once("\r\n\r\n").unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(decode_lines(&lines), "hello");
    }

    #[test]
    fn test_render_multipart_message() {
        let csv = AttachmentPayload::builder()
            .filename("report.csv")
            .unwrap()
            .content_type("text/csv")
            .unwrap()
            .description("月度报表")
            .unwrap()
            .content(b"a,b".to_vec())
            .build()
            .unwrap();

        let request = NotificationRequest::builder()
            .channel(Channel::Email)
            .add_recipient("a@example.com")
            .unwrap()
            .subject("报表")
            .unwrap()
            .html_content("<p>见附件</p>")
            .unwrap()
            .add_attachment(csv)
            .build()
            .unwrap();

        let attachments = [ResolvedAttachment {
            attachment: &request.attachments()[0],
            data: b"a,b".to_vec(),
        }];
        let message = render("noreply@example.com", &request, &attachments, &meta());

        assert!(message.contains("Content-Type: multipart/mixed; boundary=\"BOUNDARY\"\r\n"));
        assert!(message.contains("X-Priority: 3\r\n"));
        assert_eq!(message.matches("--BOUNDARY\r\n").count(), 2);
        assert!(message.ends_with("--BOUNDARY--\r\n"));
        assert!(message.contains("Content-Type: text/html; charset=utf-8\r\n"));
        assert!(message.contains("Content-Type: text/csv; name=\"report.csv\"\r\n"));
        assert!(message.contains("Content-Disposition: attachment; filename=\"report.csv\"\r\n"));
        assert!(message.contains(&format!(
            "Content-Description: {}\r\n",
            encode_header("月度报表")
        )));
        assert!(message.contains(&format!("{}\r\n", STANDARD.encode(b"a,b"))));
    }

    #[test]
    fn test_encode_header() {
        assert_eq!(encode_header("plain"), "plain");

        let encoded = encode_header("你好");
        assert_eq!(encoded, format!("=?UTF-8?B?{}?=", STANDARD.encode("你好")));

        // 长文本被拆分为多个 encoded-word，且不截断多字节字符
        let long = "通知".repeat(20);
        let encoded = encode_header(&long);
        let words: Vec<&str> = encoded.split("\r\n ").collect();
        assert!(words.len() > 1);
        let decoded: String = words
            .iter()
            .map(|w| {
                let inner = w.trim_start_matches("=?UTF-8?B?").trim_end_matches("?=");
                String::from_utf8(STANDARD.decode(inner).unwrap()).unwrap()
            })
            .collect();
        assert_eq!(decoded, long);
        assert!(words.iter().all(|w| w.len() <= 75));
    }

    #[test]
    fn test_line_breaks_never_reach_raw_headers() {
        let encoded = encode_header("Hello\r\nBcc: leak@evil.com");
        assert!(!encoded.contains("\r\nBcc:"));
        assert!(encoded.starts_with("=?UTF-8?B?"));

        let name = display_name("Acme\r\nX-Evil: 1");
        assert!(!name.contains("\r\nX-Evil"));
        assert_eq!(display_name("Acme"), "\"Acme\"");
    }

    #[test]
    fn test_message_meta_uses_sender_domain() {
        let meta = MessageMeta::generate("noreply@example.com");
        assert!(meta.message_id.ends_with("@example.com>"));
        assert!(meta.boundary.starts_with("----=_Part_"));
    }
}
