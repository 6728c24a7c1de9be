#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::time::sleep;

pub const BAD_TOKEN: &str = "0:bad";

/// 模拟 Bot API 服务器，记录收到的每个请求
#[derive(Clone, Default)]
pub struct MockApi {
    calls: Arc<Mutex<Vec<(String, String)>>>,
    block_send: bool,
}

impl MockApi {
    pub async fn start(block_send: bool) -> (Self, SocketAddr) {
        let api = MockApi { block_send, ..Default::default() };
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().fallback(handle).with_state(api.clone());
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (api, addr)
    }

    pub fn calls_to(&self, method: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, body)| body.clone())
            .collect()
    }
}

async fn handle(State(api): State<MockApi>, uri: Uri, body: Bytes) -> (StatusCode, Json<Value>) {
    let path = uri.path().to_string();
    let method = path.rsplit('/').next().unwrap_or_default().to_lowercase();
    api.calls
        .lock()
        .unwrap()
        .push((method.clone(), String::from_utf8_lossy(&body).into_owned()));

    if path.contains(BAD_TOKEN) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"ok": false, "error_code": 401, "description": "Unauthorized"})),
        );
    }

    match method.as_str() {
        "getme" => ok(json!({
            "id": 1,
            "is_bot": true,
            "first_name": "Link",
            "username": "link_bot",
            "can_join_groups": true,
            "can_read_all_group_messages": false,
            "supports_inline_queries": false
        })),
        "sendmessage" if api.block_send => (
            StatusCode::FORBIDDEN,
            Json(json!({
                "ok": false,
                "error_code": 403,
                "description": "Forbidden: bot was blocked by the user"
            })),
        ),
        "sendmessage" => ok(json!({
            "message_id": 1,
            "date": 0,
            "from": {"id": 1, "is_bot": true, "first_name": "Link", "username": "link_bot"},
            "chat": {"id": 42, "type": "private", "first_name": "Owner"},
            "text": "Bot Restarted"
        })),
        "getwebhookinfo" => ok(json!({
            "url": "",
            "has_custom_certificate": false,
            "pending_update_count": 0
        })),
        // 与真实服务器一样长时间挂起，bot 只能靠超时退出长轮询
        "getupdates" => {
            sleep(Duration::from_secs(30)).await;
            ok(json!([]))
        }
        _ => ok(json!(true)),
    }
}

fn ok(result: Value) -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({"ok": true, "result": result})))
}

pub fn config_toml(api: SocketAddr, token: &str, port: u16, max_attempts: u32) -> String {
    format!(
        r#"
        [telegram]
        token = "{}"
        owner_id = 42
        api_url = "http://{}/"

        [web]
        bind_address = "127.0.0.1"
        port = {}

        [restart]
        max_attempts = {}
        delay = "10ms"
        shutdown_grace = "1s"
        "#,
        token, api, port, max_attempts
    )
}
