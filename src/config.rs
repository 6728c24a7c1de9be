use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use duration_str::deserialize_duration;
use reqwest::Url;
use serde::Deserialize;
use teloxide::types::ChatId;

fn default_log_level() -> String {
    "info".to_string()
}

fn default_workers() -> usize {
    4
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_attempts() -> u32 {
    3
}

fn default_restart_delay() -> Duration {
    Duration::from_secs(180)
}

fn default_shutdown_grace() -> Duration {
    Duration::from_secs(5)
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// 日志等级
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub telegram: Telegram,
    #[serde(default)]
    pub web: Web,
    #[serde(default)]
    pub restart: Restart,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Telegram {
    /// bot token
    pub token: String,
    /// 所有者 ID，bot 每次启动都会通知该用户
    pub owner_id: ChatId,
    /// 处理更新的工作线程数量
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// 自建 Bot API 服务器地址，留空则使用 api.telegram.org
    #[serde(default)]
    pub api_url: Option<String>,
}

impl Telegram {
    pub fn api_url(&self) -> Result<Option<Url>> {
        self.api_url
            .as_deref()
            .map(|url| Url::parse(url).with_context(|| format!("telegram.api_url 无效: {}", url)))
            .transpose()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Web {
    /// 健康检查服务监听地址
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// 健康检查服务端口
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for Web {
    fn default() -> Self {
        Self { bind_address: default_bind_address(), port: default_port() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Restart {
    /// 最大启动次数（包含第一次启动）
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// 两次启动之间的等待时间
    #[serde(default = "default_restart_delay", deserialize_with = "deserialize_duration")]
    pub delay: Duration,
    /// 收到退出信号后等待各组件停止的最长时间，超时则强制退出
    #[serde(default = "default_shutdown_grace", deserialize_with = "deserialize_duration")]
    pub shutdown_grace: Duration,
}

impl Default for Restart {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay: default_restart_delay(),
            shutdown_grace: default_shutdown_grace(),
        }
    }
}

impl Config {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件 {}", path.display()))?;
        let mut config = Self::from_toml(&s)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(s: &str) -> Result<Self> {
        toml::from_str(s).context("配置文件格式错误")
    }

    /// 使用环境变量覆盖配置，托管平台（如 Render）会通过环境变量注入端口等参数
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.web.port = parse_var("PORT", &port)?;
        }
        if let Some(token) = lookup("TG_BOT_TOKEN") {
            self.telegram.token = token;
        }
        if let Some(owner) = lookup("OWNER_ID") {
            self.telegram.owner_id = ChatId(parse_var("OWNER_ID", &owner)?);
        }
        if let Some(workers) = lookup("TG_BOT_WORKERS") {
            self.telegram.workers = parse_var("TG_BOT_WORKERS", &workers)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.telegram.token.trim().is_empty() {
            bail!("telegram.token 不能为空");
        }
        if self.telegram.workers == 0 {
            bail!("telegram.workers 必须大于 0");
        }
        if self.restart.max_attempts == 0 {
            bail!("restart.max_attempts 必须大于 0");
        }
        self.telegram.api_url()?;
        Ok(())
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| anyhow!("环境变量 {} 的值 {:?} 无效: {}", key, value, e))
}
