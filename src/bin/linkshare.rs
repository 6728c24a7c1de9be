use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use linkshare_bot::bot::LinkBot;
use linkshare_bot::config::Config;
use linkshare_bot::daemon::{listen_for_shutdown, supervise, Exit, RestartPolicy};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Links sharing Telegram bot")]
struct Args {
    /// 配置文件路径
    #[arg(short, long, default_value = "./config.toml")]
    config: PathBuf,
}

fn main() {
    // 总是以 0 退出，交给托管平台重启容器
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return;
        }
    };
    if let Err(e) = run(args) {
        error!("启动失败: {:?}", e);
    }
}

fn run(args: Args) -> Result<()> {
    let config = match Config::new(&args.config) {
        Ok(config) => config,
        Err(e) => {
            init_logging("info");
            return Err(e);
        }
    };
    init_logging(&config.log_level);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.telegram.workers)
        .enable_all()
        .build()?;
    runtime.block_on(run_app(config));
    Ok(())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::FmtSubscriber::builder().with_env_filter(filter).try_init();
}

async fn run_app(config: Config) {
    let shutdown = CancellationToken::new();
    tokio::spawn(listen_for_shutdown(shutdown.clone(), config.restart.shutdown_grace));

    let policy = RestartPolicy::from(&config.restart);
    let exit = supervise(&policy, &shutdown, |_| {
        let config = config.clone();
        let shutdown = shutdown.clone();
        async move { LinkBot::new(config)?.run(shutdown).await }
    })
    .await;

    if let Exit::Exhausted { attempts } = exit {
        error!("bot 已启动 {} 次均失败，不再重启", attempts);
    }
    info!("bot 已完全停止");
}
