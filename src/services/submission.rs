//! 提交与判题监控 - 业务能力层

use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::infrastructure::PageSurface;

/// 提交按钮选择器，按优先级排列
pub const SUBMIT_SELECTORS: &[&str] = &[
    r#"[data-e2e-locator="console-submit-button"]"#,
    "button.bg-green-sd-hover",
    r#"button[data-cy="submit-code-btn"]"#,
];

/// 表示"通过"的元素
pub const ACCEPTED_SELECTORS: &[&str] = &[
    ".text-green-500",
    r#"[data-e2e-locator="submission-result-accepted"]"#,
];

pub const ACCEPTED_TEXT: &str = "Accepted";

/// 表示"被拒绝"的页面文本
pub const REJECTION_MARKERS: &[&str] = &[
    "Wrong Answer",
    "Runtime Error",
    "Compile Error",
    "Time Limit Exceeded",
    "Memory Limit Exceeded",
    "Output Limit Exceeded",
];

/// 点击提交按钮；按选择器都找不到时退而点击文本含 "Submit" 的按钮
pub async fn click_submit(surface: &dyn PageSurface) -> Result<bool> {
    for selector in SUBMIT_SELECTORS {
        if surface.click(selector).await? {
            debug!("点击提交按钮: {}", selector);
            return Ok(true);
        }
    }
    let clicked = surface.click_button_with_text("Submit").await?;
    if !clicked {
        warn!("⚠️ 未找到提交按钮");
    }
    Ok(clicked)
}

/// 单次检查的判定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(&'static str),
}

/// 根据页面文本和"通过"元素是否存在做出判定；都不命中返回 `None`
pub fn classify(page_text: &str, accepted_marker: bool) -> Option<Verdict> {
    if accepted_marker || page_text.contains(ACCEPTED_TEXT) {
        return Some(Verdict::Accepted);
    }
    REJECTION_MARKERS
        .iter()
        .copied()
        .find(|m| page_text.contains(m))
        .map(Verdict::Rejected)
}

/// 监控结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorOutcome {
    Accepted,
    Rejected(&'static str),
    Timeout,
    Cancelled,
}

/// 判题结果轮询
///
/// 固定间隔检查页面，最多 `max_checks` 次。`watch` 消耗自身，每个实例只产出一个结果。
#[derive(Debug, Clone, Copy)]
pub struct SubmissionMonitor {
    interval: Duration,
    max_checks: u32,
}

impl SubmissionMonitor {
    pub fn new(interval: Duration, max_checks: u32) -> Self {
        Self {
            interval,
            max_checks,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.monitor_interval(), config.monitor_max_checks)
    }

    pub async fn watch(self, surface: &dyn PageSurface, cancel: &CancellationToken) -> MonitorOutcome {
        info!("👀 开始监控判题结果 (每 {:?}，最多 {} 次)", self.interval, self.max_checks);

        for check in 1..=self.max_checks {
            tokio::select! {
                _ = cancel.cancelled() => return MonitorOutcome::Cancelled,
                _ = tokio::time::sleep(self.interval) => {}
            }

            match self.check_once(surface).await {
                Some(Verdict::Accepted) => {
                    info!("🎉 判题通过 (第 {} 次检查)", check);
                    return MonitorOutcome::Accepted;
                }
                Some(Verdict::Rejected(marker)) => {
                    warn!("❌ 判题未通过: {}", marker);
                    return MonitorOutcome::Rejected(marker);
                }
                None => debug!("第 {}/{} 次检查: 暂无结果", check, self.max_checks),
            }
        }

        warn!("⏰ 等待判题结果超时");
        MonitorOutcome::Timeout
    }

    async fn check_once(&self, surface: &dyn PageSurface) -> Option<Verdict> {
        // 读取失败按"暂无结果"处理，页面可能正在刷新
        let text = surface.body_text().await.unwrap_or_default();
        let mut marker = false;
        for selector in ACCEPTED_SELECTORS {
            if surface.has_element(selector).await.unwrap_or(false) {
                marker = true;
                break;
            }
        }
        classify(&text, marker)
    }
}
