use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use anyhow::Result;
use futures::FutureExt;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Restart;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPolicy {
    /// 最大启动次数，包含第一次启动
    pub max_attempts: u32,
    pub delay: Duration,
}

impl From<&Restart> for RestartPolicy {
    fn from(restart: &Restart) -> Self {
        Self { max_attempts: restart.max_attempts, delay: restart.delay }
    }
}

/// 守护循环结束的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// 收到了退出信号
    Shutdown { attempts: u32 },
    /// 启动次数已用完
    Exhausted { attempts: u32 },
}

/// 反复启动 `start` 返回的任务，直到收到退出信号或者达到最大启动次数。
///
/// 任务无论是返回错误、panic 还是正常返回，都视为 bot 已经停止。
pub async fn supervise<F, Fut>(
    policy: &RestartPolicy,
    shutdown: &CancellationToken,
    mut start: F,
) -> Exit
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut attempt = 0;

    loop {
        if shutdown.is_cancelled() {
            return Exit::Shutdown { attempts: attempt };
        }

        attempt += 1;
        info!("启动 bot（第 {}/{} 次）", attempt, policy.max_attempts);

        match AssertUnwindSafe(start(attempt)).catch_unwind().await {
            Ok(Ok(())) => info!("bot 已停止"),
            Ok(Err(e)) => error!("bot 运行出错: {:?}", e),
            Err(e) => error!("bot 发生严重错误（panic）: {:?}", e),
        }

        if shutdown.is_cancelled() {
            info!("bot 已被主动停止");
            return Exit::Shutdown { attempts: attempt };
        }

        if attempt >= policy.max_attempts {
            error!("已达到最大启动次数 {}，不再重启", policy.max_attempts);
            return Exit::Exhausted { attempts: attempt };
        }

        warn!(
            "将在 {} 秒后进行第 {} 次启动...",
            policy.delay.as_secs(),
            attempt + 1
        );
        tokio::select! {
            _ = sleep(policy.delay) => {}
            _ = shutdown.cancelled() => {
                info!("等待重启期间收到退出信号");
                return Exit::Shutdown { attempts: attempt };
            }
        }
    }
}

/// 等待 SIGTERM 或 SIGINT，收到后取消 `shutdown`。
///
/// 之后再次收到信号，或者 `grace` 内进程仍未退出，直接以 0 退出进程。
pub async fn listen_for_shutdown(shutdown: CancellationToken, grace: Duration) {
    watch_signals(wait_for_signal, &shutdown, grace).await;
    std::process::exit(0);
}

/// 第一次信号取消 `shutdown`，再次收到信号或等待超过 `grace` 后返回
pub async fn watch_signals<S, Fut>(mut next_signal: S, shutdown: &CancellationToken, grace: Duration)
where
    S: FnMut() -> Fut,
    Fut: Future<Output = &'static str>,
{
    let signal = next_signal().await;
    info!("收到信号 {}，正在优雅退出...", signal);
    shutdown.cancel();

    tokio::select! {
        signal = next_signal() => warn!("再次收到信号 {}，立即退出", signal),
        _ = sleep(grace) => warn!("{} 秒内未能完成退出，强制退出", grace.as_secs_f32()),
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!("无法监听 SIGTERM: {}", e);
            return match tokio::signal::ctrl_c().await {
                Ok(()) => "SIGINT",
                Err(_) => std::future::pending().await,
            };
        }
    };

    tokio::select! {
        _ = terminate.recv() => "SIGTERM",
        r = tokio::signal::ctrl_c() => match r {
            Ok(()) => "SIGINT",
            Err(e) => {
                error!("无法监听 SIGINT: {}", e);
                terminate.recv().await;
                "SIGTERM"
            }
        },
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    match tokio::signal::ctrl_c().await {
        Ok(()) => "Ctrl-C",
        Err(e) => {
            error!("无法监听 Ctrl-C: {}", e);
            std::future::pending().await
        }
    }
}
