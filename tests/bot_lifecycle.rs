mod common;

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use common::{config_toml, MockApi, BAD_TOKEN};
use linkshare_bot::bot::{LinkBot, RESTART_NOTICE};
use linkshare_bot::config::Config;
use linkshare_bot::daemon::{supervise, Exit, RestartPolicy};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

fn config(api: SocketAddr, token: &str, port: u16) -> Config {
    let config = Config::from_toml(&config_toml(api, token, port, 2)).unwrap();
    config.validate().unwrap();
    config
}

async fn http_get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let req = format!("GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n", path);
    stream.write_all(req.as_bytes()).await.unwrap();
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    String::from_utf8_lossy(&buf).into_owned()
}

#[tokio::test]
async fn start_notifies_owner_and_serves_health() {
    let (api, addr) = MockApi::start(false).await;
    let bot = LinkBot::new(config(addr, "123:abc", 0)).unwrap();

    let running = bot.start().await.unwrap();
    assert_eq!(running.status.username, "link_bot");

    let sent = api.calls_to("sendmessage");
    assert_eq!(sent.len(), 1);
    let body: Value = serde_json::from_str(&sent[0]).unwrap();
    assert_eq!(body["chat_id"], 42);
    assert_eq!(body["text"], RESTART_NOTICE);
    assert_eq!(body["parse_mode"], "HTML");

    let web = running.web_addr().unwrap();
    let resp = http_get(web, "/").await;
    assert!(resp.starts_with("HTTP/1.1 200 OK"), "{}", resp);
    assert!(resp.contains("@link_bot"));

    bot.stop(running).await;
    assert!(TcpStream::connect(web).await.is_err());
}

#[tokio::test]
async fn failed_owner_notification_is_not_fatal() {
    let (api, addr) = MockApi::start(true).await;
    let bot = LinkBot::new(config(addr, "123:abc", 0)).unwrap();

    let running = bot.start().await.unwrap();
    assert_eq!(api.calls_to("sendmessage").len(), 1);
    assert!(running.web_addr().is_some());

    bot.stop(running).await;
}

#[tokio::test]
async fn web_server_failure_is_not_fatal() {
    let (_api, addr) = MockApi::start(false).await;
    let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = taken.local_addr().unwrap().port();
    let bot = LinkBot::new(config(addr, "123:abc", port)).unwrap();

    let running = bot.start().await.unwrap();
    assert!(running.web_addr().is_none());

    bot.stop(running).await;
}

#[tokio::test]
async fn rejected_token_fails_start() {
    let (api, addr) = MockApi::start(false).await;
    let bot = LinkBot::new(config(addr, BAD_TOKEN, 0)).unwrap();

    assert!(bot.start().await.is_err());
    assert!(api.calls_to("sendmessage").is_empty());
}

#[tokio::test]
async fn run_stops_within_grace_while_long_polling() {
    let (api, addr) = MockApi::start(false).await;
    let config = config(addr, "123:abc", 0);
    let grace = config.restart.shutdown_grace;
    let bot = LinkBot::new(config).unwrap();
    let shutdown = CancellationToken::new();

    let canceller = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(500)).await;
            shutdown.cancel();
            Instant::now()
        })
    };

    timeout(Duration::from_secs(10), bot.run(shutdown)).await.unwrap().unwrap();
    let cancelled_at = canceller.await.unwrap();

    // dispatcher 与 Web 服务各自最多等待一个 grace
    assert!(cancelled_at.elapsed() < grace * 2 + Duration::from_millis(500));
    assert!(!api.calls_to("getupdates").is_empty());
}

#[tokio::test]
async fn shutdown_during_start_returns_immediately() {
    // 不响应的 Bot API：只接受连接，从不回复
    let silent = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = silent.local_addr().unwrap();
    let bot = LinkBot::new(config(addr, "123:abc", 0)).unwrap();
    let shutdown = CancellationToken::new();

    let canceller = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(200)).await;
            shutdown.cancel();
        })
    };

    timeout(Duration::from_secs(5), bot.run(shutdown)).await.unwrap().unwrap();
    canceller.await.unwrap();
    drop(silent);
}

#[tokio::test]
async fn supervisor_restarts_crashing_bot_until_exhausted() {
    let (api, addr) = MockApi::start(false).await;
    let config = config(addr, BAD_TOKEN, 0);
    let policy = RestartPolicy::from(&config.restart);
    let shutdown = CancellationToken::new();

    let exit = supervise(&policy, &shutdown, |_| {
        let config = config.clone();
        let shutdown = shutdown.clone();
        async move { LinkBot::new(config)?.run(shutdown).await }
    })
    .await;

    assert_eq!(exit, Exit::Exhausted { attempts: 2 });
    assert_eq!(api.calls_to("getme").len(), 2);
}
