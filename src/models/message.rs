//! 协调器与页面代理之间的消息协议
//!
//! 与浏览器扩展一样：请求可以带可选回复（oneshot），协调器发往页面的
//! 命令是"至多一次"投递，发送失败说明页面已被导航销毁。

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use crate::error::FailureReason;
use crate::models::log_entry::LogEntry;

/// 标签页编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TabId(pub u64);

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 协调器 → 页面代理
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageCommand {
    /// 寻找下一道题（沿用扩展里的 FIND_DAILY 标签）
    FindDaily,
    /// 解当前页面的题
    SolveProblem,
    /// 立即停止
    StopAction,
}

/// 开始 / 停止指令的回复
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Started,
    Stopped,
}

/// 注入指令的回复
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InjectResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// 发往协调器的请求
#[derive(Debug)]
pub enum CoordinatorRequest {
    StartSolving {
        reply: Option<oneshot::Sender<Status>>,
    },
    StopSolving {
        reply: Option<oneshot::Sender<Status>>,
    },
    LogUpdate(LogEntry),
    ProblemSolved,
    InjectSolution {
        code: String,
        reply: oneshot::Sender<InjectResponse>,
    },
    SolveFailed {
        reason: FailureReason,
    },
}

impl CoordinatorRequest {
    /// 协议里的动作标签
    pub fn action(&self) -> &'static str {
        match self {
            CoordinatorRequest::StartSolving { .. } => "START_SOLVING",
            CoordinatorRequest::StopSolving { .. } => "STOP_SOLVING",
            CoordinatorRequest::LogUpdate(_) => "LOG_UPDATE",
            CoordinatorRequest::ProblemSolved => "PROBLEM_SOLVED",
            CoordinatorRequest::InjectSolution { .. } => "INJECT_SOLUTION",
            CoordinatorRequest::SolveFailed { .. } => "SOLVE_FAILED",
        }
    }
}

/// 协调器信箱中的事件
///
/// 除外部请求外，还包括标签页宿主的挂载通知和协调器自己的定时事件。
#[derive(Debug)]
pub enum CoordinatorEvent {
    /// 外部请求；`tab` 为发送方所在的标签页（命令行等外部入口为 `None`）
    Request {
        tab: Option<TabId>,
        request: CoordinatorRequest,
    },
    /// 某个标签页加载了新的页面代理
    AgentAttached {
        tab: TabId,
        commands: mpsc::UnboundedSender<PageCommand>,
    },
    /// 标签页宿主已退出
    TabClosed { tab: TabId },
    /// 失败后的延迟重试到期
    RetryFindNext { tab: TabId },
    /// 周期性的自动运行检查
    AutoRunTick,
    /// 结束协调器
    Shutdown,
}
