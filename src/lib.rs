//! # Auto Solve
//!
//! 一个驱动 Chromium 自动完成 LeetCode 每日配额的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page、状态文件），只暴露能力
//! - `PageSurface` / `JsExecutor` - 页面能力抽象及其 chromiumoxide 实现
//! - `SessionStore` - 带版本号的 JSON 状态文件，事务式读改写
//! - `Outbox` - 页面代理发往协调器的消息总线
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `AcquisitionPipeline` - 社区题解 / slug 仓库 / 题号仓库三级获取
//! - `NextProblemFinder` - 每日一题或随机未做题目
//! - `SubmissionMonitor` - 判题结果轮询
//! - `injector` - Monaco 编辑器注入
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一次页面加载"和"一道题"的处理流程
//! - `PageAgent` - 页面类型判断、命令响应
//! - `SolveFlow` - 获取 → 注入 → 提交 → 监控
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/coordinator` - 配额状态机、命令转发、延迟重试
//! - `orchestrator/app` - 应用生命周期与自动运行
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult, FailureReason};
pub use infrastructure::{JsExecutor, PageSurface, SessionStore, Tab, TabOpener};
pub use models::{LoopState, PageCommand, SessionState};
pub use orchestrator::{App, Coordinator, CoordinatorHandle};
pub use workflow::{AgentDeps, PageAgent, SolveFlow};
