//! 页面能力抽象 - 基础设施层
//!
//! `PageSurface` 只描述"能对一个页面做什么"，不认识题目也不认识流程。
//! 浏览器实现见 [`crate::infrastructure::JsExecutor`]。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::models::TabId;

/// 页内 fetch 的原始结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchReply {
    pub status: u16,
    pub body: String,
}

impl FetchReply {
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// 一个页面暴露的全部能力
#[async_trait]
pub trait PageSurface: Send + Sync {
    /// 当前地址
    async fn url(&self) -> Result<String>;

    /// 导航并等待加载完成
    async fn navigate(&self, url: &str) -> Result<()>;

    /// `document.body.innerText`
    async fn body_text(&self) -> Result<String>;

    /// 选择器是否命中任何元素
    async fn has_element(&self, selector: &str) -> Result<bool>;

    /// 填写输入框并派发冒泡的 input 事件；元素不存在时返回 false
    async fn fill_input(&self, selector: &str, value: &str) -> Result<bool>;

    /// 点击元素；元素不存在时返回 false
    async fn click(&self, selector: &str) -> Result<bool>;

    /// 点击第一个文本包含 `text` 的按钮
    async fn click_button_with_text(&self, text: &str) -> Result<bool>;

    /// 尽力停止页面加载
    async fn stop_loading(&self) -> Result<()>;

    /// 在页面上下文中（携带站点 Cookie）发起 POST JSON 请求
    async fn fetch_json(&self, url: &str, body: &JsonValue) -> Result<FetchReply>;

    /// 在页面主世界执行脚本（特权能力，只由协调器使用）
    async fn eval_main_world(&self, script: &str) -> Result<JsonValue>;

    /// 页面每完成一次加载产生一项，包括站点自己发起的跳转和刷新
    ///
    /// 返回 `None` 表示无法观察，此时只有 [`Tab::navigate`] 会被当作新加载。
    async fn page_loads(&self) -> Result<Option<BoxStream<'static, ()>>> {
        Ok(None)
    }
}

/// 打开新标签页的能力
#[async_trait]
pub trait TabOpener: Send + Sync {
    async fn open(&self, url: &str) -> Result<Arc<dyn PageSurface>>;
}

/// 标签页
///
/// 持有页面能力和"加载代数"。每次页面加载代数 +1，当前页面代理随之销毁，
/// 由标签页宿主为新页面重新创建。
pub struct Tab {
    id: TabId,
    surface: Arc<dyn PageSurface>,
    loads: Arc<watch::Sender<u64>>,
    /// 页面加载由 `page_loads` 事件计数，导航成功时不再重复计数
    observed: AtomicBool,
}

impl Tab {
    /// 不观察页面事件的标签页，只有 [`Tab::navigate`] 计为新加载
    pub fn new(id: TabId, surface: Arc<dyn PageSurface>) -> Self {
        let (loads, _) = watch::channel(0);
        Self {
            id,
            surface,
            loads: Arc::new(loads),
            observed: AtomicBool::new(false),
        }
    }

    /// 创建标签页并在后台跟随页面自己完成的加载
    pub async fn open(id: TabId, surface: Arc<dyn PageSurface>) -> Arc<Self> {
        let tab = Arc::new(Self::new(id, surface));
        match tab.surface.page_loads().await {
            Ok(Some(mut events)) => {
                tab.observed.store(true, Ordering::SeqCst);
                let loads = tab.loads.clone();
                tokio::spawn(async move {
                    while events.next().await.is_some() {
                        loads.send_modify(|generation| *generation += 1);
                    }
                    debug!("[tab {}] 页面加载事件流结束", id);
                });
            }
            Ok(None) => debug!("[tab {}] 页面不支持加载事件，只跟随主动导航", id),
            Err(e) => warn!("[tab {}] ⚠️ 订阅页面加载事件失败: {}", id, e),
        }
        tab
    }

    pub fn id(&self) -> TabId {
        self.id
    }

    pub fn surface(&self) -> &Arc<dyn PageSurface> {
        &self.surface
    }

    /// 导航到新地址；失败也视为一次新的页面加载
    pub async fn navigate(&self, url: &str) -> Result<()> {
        let result = self.surface.navigate(url).await;
        if result.is_err() || !self.observed.load(Ordering::SeqCst) {
            self.loads.send_modify(|generation| *generation += 1);
        }
        result
    }

    /// 订阅页面加载代数
    pub fn subscribe_loads(&self) -> watch::Receiver<u64> {
        self.loads.subscribe()
    }

    /// 当前加载代数
    pub fn generation(&self) -> u64 {
        *self.loads.borrow()
    }
}

impl std::fmt::Debug for Tab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tab")
            .field("id", &self.id)
            .field("generation", &self.generation())
            .finish()
    }
}
