//! 解题流程 - 流程层
//!
//! 核心职责：定义"一道题"的完整处理流程
//!
//! 流程顺序：
//! 1. 获取解法（社区题解 → slug 仓库 → 题号仓库）
//! 2. 请求协调器注入编辑器
//! 3. 等待片刻后点击提交
//! 4. 轮询判题结果
//!
//! 每个 await 之后都检查取消令牌；取消后不再产生任何结果。

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::FailureReason;
use crate::infrastructure::{Outbox, PageSurface};
use crate::services::{
    click_submit, AcquisitionPipeline, AcquisitionSettings, ActivityLog, LanguageClassifier,
    MonitorOutcome, RemoteApi, SubmissionMonitor,
};
use crate::workflow::solve_ctx::SolveCtx;

/// 解题结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveResult {
    /// 判题通过
    Solved,
    /// 失败，交给协调器延迟重试
    Failed(FailureReason),
    /// 被停止或页面已离开
    Cancelled,
}

/// 解题流程
///
/// - 编排获取、注入、提交、监控四个步骤
/// - 不持有页面，只借用 `PageSurface`
pub struct SolveFlow {
    pipeline: AcquisitionPipeline,
    activity: ActivityLog,
    submit_delay: Duration,
    monitor: SubmissionMonitor,
}

impl SolveFlow {
    pub fn new(
        api: Arc<dyn RemoteApi>,
        classifier: Arc<dyn LanguageClassifier>,
        activity: ActivityLog,
        config: &Config,
    ) -> Self {
        Self {
            pipeline: AcquisitionPipeline::new(
                api,
                classifier,
                activity.clone(),
                AcquisitionSettings::from(config),
            ),
            activity,
            submit_delay: config.submit_delay(),
            monitor: SubmissionMonitor::from_config(config),
        }
    }

    pub async fn run(
        &self,
        surface: &dyn PageSurface,
        outbox: &Outbox,
        ctx: &mut SolveCtx,
        cancel: &CancellationToken,
    ) -> SolveResult {
        info!("{} 🧩 开始解题", ctx);

        // ========== 步骤 1: 获取解法 ==========
        let candidate = match self.pipeline.acquire(&mut ctx.problem, cancel).await {
            Ok(Some(candidate)) => candidate,
            Ok(None) => return SolveResult::Failed(FailureReason::NoSolution),
            Err(_) => return SolveResult::Cancelled,
        };
        if cancel.is_cancelled() {
            return SolveResult::Cancelled;
        }
        info!(
            "{} ✓ 解法来自{} ({} 字符)",
            ctx,
            candidate.source,
            candidate.code.len()
        );

        // ========== 步骤 2: 注入 ==========
        self.activity
            .info("Delegating injection to coordinator...");
        let response = outbox.inject(candidate.code).await;
        if cancel.is_cancelled() {
            return SolveResult::Cancelled;
        }
        if !response.success {
            self.activity.error(format!(
                "Injection failed: {}",
                response.error.as_deref().unwrap_or("Unknown error")
            ));
            return SolveResult::Failed(FailureReason::InjectionFailed);
        }
        self.activity.success("Code injection confirmed");

        // ========== 步骤 3: 提交 ==========
        tokio::select! {
            _ = cancel.cancelled() => return SolveResult::Cancelled,
            _ = tokio::time::sleep(self.submit_delay) => {}
        }
        match click_submit(surface).await {
            Ok(true) => info!("{} 📤 已点击提交", ctx),
            Ok(false) => warn!("{} ⚠️ 未找到提交按钮，继续等待判题结果", ctx),
            Err(e) => warn!("{} ⚠️ 点击提交失败: {}", ctx, e),
        }

        // ========== 步骤 4: 监控 ==========
        match self.monitor.watch(surface, cancel).await {
            MonitorOutcome::Accepted => {
                self.activity.success(format!("Accepted: {}", ctx.problem.slug));
                SolveResult::Solved
            }
            MonitorOutcome::Rejected(marker) => {
                self.activity.warning(format!("Submission rejected: {}", marker));
                SolveResult::Failed(FailureReason::SubmissionRejected)
            }
            MonitorOutcome::Timeout => {
                self.activity.warning("Time out waiting for result.");
                SolveResult::Failed(FailureReason::Timeout)
            }
            MonitorOutcome::Cancelled => SolveResult::Cancelled,
        }
    }
}
