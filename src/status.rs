use chrono::{DateTime, Local, TimeDelta};

/// 一次启动过程中不会改变的运行信息
#[derive(Debug, Clone)]
pub struct Status {
    /// bot 用户名（不含 @）
    pub username: String,
    pub started_at: DateTime<Local>,
}

impl Status {
    pub fn new(username: impl Into<String>) -> Self {
        Self { username: username.into(), started_at: Local::now() }
    }

    pub fn uptime(&self) -> TimeDelta {
        Local::now() - self.started_at
    }
}

/// 将时长格式化为 `1d 2h 3m 4s`，省略为零的高位
pub fn format_uptime(delta: TimeDelta) -> String {
    let total = delta.num_seconds().max(0);
    let (days, hours, minutes, seconds) =
        (total / 86400, total % 86400 / 3600, total % 3600 / 60, total % 60);

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if days > 0 || hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if days > 0 || hours > 0 || minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    parts.push(format!("{}s", seconds));
    parts.join(" ")
}
