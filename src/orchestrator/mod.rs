//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责解题循环的调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用生命周期
//! - 打开存储、连接浏览器、启动协调器
//! - 周期性自动运行检查，Ctrl-C 停止
//!
//! ### `coordinator` - 协调器
//! - 配额 / 日期状态机的唯一写入者
//! - 转发命令、执行注入、失败后延迟重试
//!
//! ### `quota` - 状态机纯函数
//!
//! ### `tab_host` - 标签页宿主
//! - 每次页面加载创建一个页面代理
//!
//! ## 层次关系
//!
//! ```text
//! app
//!     ↓
//! coordinator ⇄ tab_host (消息总线)
//!                   ↓
//!           workflow::PageAgent (每次页面加载一个)
//!                   ↓
//!           services (能力层：acquisition / finder / monitor / injector)
//!                   ↓
//!           infrastructure (基础设施：PageSurface / SessionStore)
//! ```

pub mod app;
pub mod coordinator;
pub mod quota;
pub mod tab_host;

// 重新导出主要类型
pub use app::App;
pub use coordinator::{Clock, Coordinator, CoordinatorHandle};
pub use quota::{AutoRunDecision, SolvedDecision};
