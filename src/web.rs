use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Web;
use crate::status::{format_uptime, Status};

/// 健康检查路由，托管平台通过它判断进程是否存活
pub fn router(status: Arc<Status>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .with_state(status)
}

async fn index(State(status): State<Arc<Status>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "bot": format!("@{}", status.username),
        "uptime": format_uptime(status.uptime()),
        "started_at": status.started_at.to_rfc3339(),
    }))
}

async fn health() -> &'static str {
    "OK"
}

pub struct WebServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

impl WebServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// 停止接受新连接并等待服务退出，超过 `grace` 仍有连接未结束则直接中止
    pub async fn shutdown(mut self, grace: Duration) {
        self.shutdown.cancel();
        match timeout(grace, &mut self.handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Web 服务任务异常退出: {}", e),
            Err(_) => {
                warn!("Web 服务未能在 {:?} 内停止，强制关闭", grace);
                self.handle.abort();
                let _ = self.handle.await;
            }
        }
        info!("Web 服务已停止");
    }
}

pub async fn start_web_server(config: &Web, status: Arc<Status>) -> Result<WebServer> {
    let listener = TcpListener::bind((config.bind_address.as_str(), config.port))
        .await
        .with_context(|| format!("无法监听 {}:{}", config.bind_address, config.port))?;
    let addr = listener.local_addr()?;

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    let app = router(status);
    let handle = tokio::spawn(async move {
        let serve = axum::serve(listener, app)
            .with_graceful_shutdown(async move { signal.cancelled().await });
        if let Err(e) = serve.await {
            error!("Web 服务出错: {}", e);
        }
    });

    Ok(WebServer { addr, shutdown, handle })
}
