//! 进度徽标与完成通知

use tracing::info;

/// 用户可见的进度展示
pub trait Notifier: Send + Sync {
    /// 更新进度徽标（例如 `2/5`）
    fn set_badge(&self, text: &str);

    /// 弹出一条通知
    fn notify(&self, title: &str, message: &str);
}

/// 只写日志的实现
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn set_badge(&self, text: &str) {
        info!("📊 进度: {}", text);
    }

    fn notify(&self, title: &str, message: &str) {
        info!("🔔 {}: {}", title, message);
    }
}
