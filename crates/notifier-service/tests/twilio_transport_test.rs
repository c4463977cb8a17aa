//! 短信 / WhatsApp 传输集成测试
//!
//! 用 axum 启动模拟的 Twilio Messages API，记录每次请求的表单与认证头。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Form, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use axum::routing::post;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::json;

use notifier_core::{Channel, DispatchRegistry, NotificationRequest, NotifierError, Transport};
use notifier_service::transports::{SmsTransport, TwilioConfig, WhatsAppTransport};

const INVALID_NUMBER: &str = "+15005550001";

#[derive(Debug, Clone)]
struct Captured {
    account: String,
    authorization: String,
    form: HashMap<String, String>,
}

type Log = Arc<Mutex<Vec<Captured>>>;

async fn create_message(
    State(log): State<Log>,
    Path(account): Path<String>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let invalid = form.get("To").is_some_and(|to| to.ends_with(INVALID_NUMBER));
    let index = {
        let mut log = log.lock().unwrap();
        log.push(Captured {
            account,
            authorization,
            form,
        });
        log.len()
    };

    if invalid {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"code": 21211, "message": "The 'To' number is not a valid phone number.", "status": 400})),
        );
    }

    (
        StatusCode::CREATED,
        Json(json!({"sid": format!("SM{index:032}"), "status": "queued"})),
    )
}

async fn start_server() -> (String, Log) {
    let log: Log = Arc::default();
    let app = Router::new()
        .route("/2010-04-01/Accounts/{account}/Messages.json", post(create_message))
        .with_state(log.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), log)
}

fn config(api_base: &str) -> TwilioConfig {
    TwilioConfig::builder()
        .account_sid("AC123")
        .auth_token("token")
        .from_phone("+14155550100")
        .api_base(api_base)
        .build()
        .unwrap()
}

fn request(channel: Channel, recipients: &[&str]) -> NotificationRequest {
    NotificationRequest::builder()
        .channel(channel)
        .add_recipients(recipients.iter().copied())
        .unwrap()
        .subject("发货提醒")
        .unwrap()
        .html_content("<b>您的订单已发货</b>")
        .unwrap()
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_sms_one_message_per_recipient() {
    let (api_base, log) = start_server().await;
    let sms = SmsTransport::new(config(&api_base)).unwrap();

    sms.send(&request(Channel::Sms, &["+14155550101", "+14155550102"]))
        .await
        .unwrap();

    let captured = log.lock().unwrap().clone();
    assert_eq!(captured.len(), 2);

    let expected_auth = format!("Basic {}", STANDARD.encode("AC123:token"));
    for (entry, to) in captured.iter().zip(["+14155550101", "+14155550102"]) {
        assert_eq!(entry.account, "AC123");
        assert_eq!(entry.authorization, expected_auth);
        assert_eq!(entry.form["To"], to);
        assert_eq!(entry.form["From"], "+14155550100");
        // 短信直接发送正文，不含主题
        assert_eq!(entry.form["Body"], "<b>您的订单已发货</b>");
    }
}

#[tokio::test]
async fn test_whatsapp_addresses_are_prefixed() {
    let (api_base, log) = start_server().await;
    let whatsapp = WhatsAppTransport::new(config(&api_base)).unwrap();

    whatsapp
        .send(&request(Channel::WhatsApp, &["+14155550101"]))
        .await
        .unwrap();

    let captured = log.lock().unwrap().clone();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].form["To"], "whatsapp:+14155550101");
    assert_eq!(captured[0].form["From"], "whatsapp:+14155550100");
}

#[tokio::test]
async fn test_first_failure_stops_remaining_recipients() {
    let (api_base, log) = start_server().await;
    let sms = SmsTransport::new(config(&api_base)).unwrap();

    let err = sms
        .send(&request(Channel::Sms, &["+14155550101", INVALID_NUMBER, "+14155550103"]))
        .await
        .unwrap_err();

    match err {
        NotifierError::SendFailed { channel, reason } => {
            assert_eq!(channel, Channel::Sms);
            assert!(reason.contains("21211"));
            assert!(reason.contains("not a valid phone number"));
        }
        other => panic!("应返回发送失败, 实际: {other:?}"),
    }

    assert_eq!(log.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_whatsapp_stops_at_first_failure() {
    let (api_base, log) = start_server().await;
    let whatsapp = WhatsAppTransport::new(config(&api_base)).unwrap();

    let err = whatsapp
        .send(&request(Channel::WhatsApp, &[INVALID_NUMBER, "+14155550102"]))
        .await
        .unwrap_err();
    assert!(matches!(err, NotifierError::SendFailed { channel: Channel::WhatsApp, .. }));

    let captured = log.lock().unwrap().clone();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].form["To"], format!("whatsapp:{INVALID_NUMBER}"));
}

#[tokio::test]
async fn test_registry_routes_to_twilio_transports() {
    let (api_base, log) = start_server().await;
    let registry = DispatchRegistry::new([
        Arc::new(SmsTransport::new(config(&api_base)).unwrap()) as Arc<dyn Transport>,
        Arc::new(WhatsAppTransport::new(config(&api_base)).unwrap()) as Arc<dyn Transport>,
    ]);

    registry
        .send(&request(Channel::WhatsApp, &["+14155550101"]))
        .await
        .unwrap();

    let err = registry
        .send(&NotificationRequest::builder()
            .channel(Channel::Email)
            .add_recipient("user@example.com")
            .unwrap()
            .subject("x")
            .unwrap()
            .body("y")
            .unwrap()
            .build()
            .unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, NotifierError::ChannelNotSupported(Channel::Email)));

    let captured = log.lock().unwrap().clone();
    assert_eq!(captured.len(), 1);
    assert!(captured[0].form["To"].starts_with("whatsapp:"));
}

#[tokio::test]
async fn test_unreachable_api_fails() {
    // 绑定后立即释放端口，确保连接被拒绝
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let sms = SmsTransport::new(config(&format!("http://{addr}"))).unwrap();
    let err = sms
        .send(&request(Channel::Sms, &["+14155550101"]))
        .await
        .unwrap_err();
    assert!(matches!(err, NotifierError::SendFailed { channel: Channel::Sms, .. }));
}
