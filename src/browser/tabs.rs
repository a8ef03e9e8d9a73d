use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chromiumoxide::Browser;
use tracing::{debug, error};

use crate::error::BrowserError;
use crate::infrastructure::{JsExecutor, PageSurface, TabOpener};

/// 基于 chromiumoxide 的标签页工厂
pub struct ChromiumTabs {
    browser: Arc<Browser>,
}

impl ChromiumTabs {
    pub fn new(browser: Browser) -> Self {
        Self {
            browser: Arc::new(browser),
        }
    }
}

#[async_trait]
impl TabOpener for ChromiumTabs {
    async fn open(&self, url: &str) -> Result<Arc<dyn PageSurface>> {
        debug!("创建新页面并导航到: {}", url);
        let page = self.browser.new_page(url).await.map_err(|e| {
            error!("创建新页面失败: {}", e);
            BrowserError::PageCreationFailed(e)
        })?;
        Ok(Arc::new(JsExecutor::new(page)))
    }
}
