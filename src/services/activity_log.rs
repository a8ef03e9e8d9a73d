//! 活动日志服务 - 业务能力层
//!
//! 页面代理这一侧的用户可见日志：写 tracing，同时以 LOG_UPDATE 发给协调器，
//! 由协调器写入持久化的日志环。

use tracing::{error, info, warn};

use crate::infrastructure::Outbox;
use crate::models::{CoordinatorRequest, LogEntry, LogLevel};

#[derive(Clone, Debug, Default)]
pub struct ActivityLog {
    outbox: Option<Outbox>,
}

impl ActivityLog {
    pub fn new(outbox: Outbox) -> Self {
        Self {
            outbox: Some(outbox),
        }
    }

    /// 只写 tracing，不上报（测试和独立使用）
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn log(&self, message: impl Into<String>, level: LogLevel) {
        let message = message.into();
        let tab = self
            .outbox
            .as_ref()
            .map(|o| o.tab().to_string())
            .unwrap_or_else(|| "-".to_string());

        match level {
            LogLevel::Info => info!("[tab {}] {}", tab, message),
            LogLevel::Success => info!("[tab {}] ✅ {}", tab, message),
            LogLevel::Warning => warn!("[tab {}] ⚠️ {}", tab, message),
            LogLevel::Error => error!("[tab {}] ❌ {}", tab, message),
        }

        if let Some(outbox) = &self.outbox {
            outbox.send(CoordinatorRequest::LogUpdate(LogEntry::new(message, level)));
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(message, LogLevel::Info);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.log(message, LogLevel::Success);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.log(message, LogLevel::Warning);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(message, LogLevel::Error);
    }
}
