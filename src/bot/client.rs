use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use teloxide::adaptors::throttle::Limits;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::bot::dispatcher::build_dispatcher;
use crate::bot::Bot;
use crate::config::Config;
use crate::status::Status;
use crate::web::{start_web_server, WebServer};

/// 每次启动时发送给所有者的通知
pub const RESTART_NOTICE: &str = "<b><blockquote>🤖 Bot Restarted ♻️</blockquote></b>";

const BANNER: &str = "Links Sharing Started";

pub struct LinkBot {
    config: Config,
    bot: Bot,
}

/// `start` 之后才存在的资源，交给 `stop` 释放
pub struct Running {
    pub status: Arc<Status>,
    web: Option<WebServer>,
}

impl Running {
    /// 健康检查服务的实际监听地址，启动失败时为 `None`
    pub fn web_addr(&self) -> Option<SocketAddr> {
        self.web.as_ref().map(WebServer::local_addr)
    }
}

impl LinkBot {
    pub fn new(config: Config) -> Result<Self> {
        let mut bot = teloxide::Bot::new(&config.telegram.token);
        if let Some(url) = config.telegram.api_url()? {
            bot = bot.set_api_url(url);
        }
        let bot = bot.throttle(Limits::default()).parse_mode(ParseMode::Html).cache_me();
        Ok(Self { config, bot })
    }

    pub async fn start(&self) -> Result<Running> {
        let me = self.bot.get_me().await.context("获取 bot 信息失败")?;
        let status = Arc::new(Status::new(me.user.username.clone().unwrap_or_default()));

        self.notify_owner().await;

        info!("Bot 正在运行: @{}", status.username);
        info!("{}", BANNER);

        let web = match start_web_server(&self.config.web, status.clone()).await {
            Ok(server) => {
                info!("Web 服务已启动: {}", server.local_addr());
                Some(server)
            }
            Err(e) => {
                error!("Web 服务启动失败: {:?}", e);
                None
            }
        };

        Ok(Running { status, web })
    }

    /// 通知失败只记录日志，不影响启动
    async fn notify_owner(&self) {
        let owner = self.config.telegram.owner_id;
        if let Err(e) = self.bot.send_message(owner, RESTART_NOTICE).await {
            warn!("无法通知所有者 ({}) bot 已启动: {}", owner, e);
        }
    }

    pub async fn stop(&self, running: Running) {
        if let Some(web) = running.web {
            web.shutdown(self.config.restart.shutdown_grace).await;
        }
        info!("Bot 已停止");
    }

    /// 启动 bot 并处理消息，直到 `shutdown` 被取消。
    ///
    /// 取消后 dispatcher 最多再等待 `restart.shutdown_grace`，长轮询未结束则直接丢弃。
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let running = tokio::select! {
            running = self.start() => running?,
            _ = shutdown.cancelled() => {
                info!("启动过程中收到退出信号");
                return Ok(());
            }
        };

        let grace = self.config.restart.shutdown_grace;
        let mut dispatcher =
            build_dispatcher(self.bot.clone(), self.config.clone(), running.status.clone());
        let token = dispatcher.shutdown_token();
        let dispatch = dispatcher.dispatch();
        tokio::pin!(dispatch);

        tokio::select! {
            _ = &mut dispatch => {}
            _ = shutdown.cancelled() => {
                // dispatcher 尚未进入运行状态时无法关闭，稍后重试
                let request_stop = async {
                    while token.shutdown().is_err() {
                        sleep(Duration::from_millis(100)).await;
                    }
                    std::future::pending::<()>().await
                };
                let drained = timeout(grace, async {
                    tokio::select! {
                        _ = &mut dispatch => {}
                        _ = request_stop => {}
                    }
                })
                .await;
                if drained.is_err() {
                    warn!("dispatcher 未能在 {:?} 内停止，放弃正在进行的长轮询", grace);
                }
            }
        }

        self.stop(running).await;
        Ok(())
    }
}
