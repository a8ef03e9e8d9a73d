//! 错误类型
//!
//! 业务流程统一使用 `anyhow::Result`，只有调用方需要按类型分支处理的地方
//! 才定义具体的错误枚举。

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// 远程 API 错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 持久化存储错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),
    /// 注入错误
    #[error("注入错误: {0}")]
    Injection(#[from] InjectionError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 操作已被取消
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {source}")]
    ConnectionFailed {
        port: u16,
        #[source]
        source: chromiumoxide::error::CdpError,
    },
    /// 启动浏览器失败
    #[error("启动浏览器失败: {0}")]
    LaunchFailed(String),
    /// 创建页面失败
    #[error("创建页面失败: {0}")]
    PageCreationFailed(#[source] chromiumoxide::error::CdpError),
    /// 导航失败
    #[error("导航到 {url} 失败: {source}")]
    NavigationFailed {
        url: String,
        #[source]
        source: chromiumoxide::error::CdpError,
    },
    /// 执行脚本失败
    #[error("执行脚本失败: {0}")]
    ScriptExecutionFailed(#[from] chromiumoxide::error::CdpError),
}

/// 远程 API 错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败
    #[error("API请求失败 ({endpoint}): {message}")]
    Transport { endpoint: String, message: String },
    /// HTTP 状态码非 2xx
    #[error("API返回错误状态 ({endpoint}): {status}")]
    Http { endpoint: String, status: u16 },
    /// 返回内容不是 JSON（通常是限流或拦截页面）
    #[error("API请求被限流或拦截 ({endpoint}): 返回了非 JSON 内容")]
    RateLimited { endpoint: String },
    /// GraphQL 返回 errors 字段
    #[error("GraphQL 返回错误: {0}")]
    GraphQl(String),
    /// 响应缺少必需字段
    #[error("API响应缺少字段: {0}")]
    MissingField(&'static str),
}

impl ApiError {
    /// 是否属于"被限流/拦截"这一类
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ApiError::RateLimited { .. })
    }
}

/// 持久化存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 读写文件失败
    #[error("存储文件读写失败 ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 文件内容无法解析
    #[error("存储文件已损坏 ({path}): {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 注入错误
///
/// 三种失败原因都会以 `{success: false, error}` 的形式回复给页面代理。
#[derive(Debug, Error)]
pub enum InjectionError {
    /// 页面上没有任何编辑器 model
    #[error("未找到编辑器 model")]
    NoModels,
    /// 调用特权脚本本身失败
    #[error("特权脚本调用失败: {0}")]
    HostRuntime(String),
    /// 注入函数内部抛出异常
    #[error("注入脚本异常: {0}")]
    ScriptThrew(String),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件读取失败
    #[error("读取配置文件 {path} 失败: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 配置文件解析失败
    #[error("解析配置文件 {path} 失败: {source}")]
    ParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: &'static str,
    },
}

/// 操作被停止指令取消
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("操作已取消")]
pub struct Cancelled;

/// 解题失败原因
///
/// 所有失败最终都汇入同一个 `SOLVE_FAILED` 信号，由协调器决定延迟重试。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// 会员题目，永远不尝试
    PremiumLocked,
    /// 所有来源都没有可用的代码
    NoSolution,
    /// 注入编辑器失败
    InjectionFailed,
    /// 判题结果为拒绝
    SubmissionRejected,
    /// 轮询超时
    Timeout,
    /// 找不到下一道题
    NoProblemsFound,
    /// 其他原因（原样透传）
    Other(String),
}

impl FailureReason {
    /// 人类可读的原因文本
    pub fn as_str(&self) -> &str {
        match self {
            FailureReason::PremiumLocked => "Premium Locked",
            FailureReason::NoSolution => "No solution",
            FailureReason::InjectionFailed => "Injection Failed",
            FailureReason::SubmissionRejected => "Submission rejected",
            FailureReason::Timeout => "Timeout",
            FailureReason::NoProblemsFound => "No problems found",
            FailureReason::Other(reason) => reason,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
