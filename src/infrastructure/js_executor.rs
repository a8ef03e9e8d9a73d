//! JS 执行器 - 基础设施层
//!
//! 持有 chromiumoxide 的 Page，把所有页面能力都实现为一段 JS 执行

use anyhow::{bail, Result};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::EventLoadEventFired;
use chromiumoxide::Page;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::BrowserError;
use crate::infrastructure::page_surface::{FetchReply, PageSurface};

/// JS 执行器
///
/// 职责：
/// - 持有一个 Page 资源
/// - 暴露 eval() 能力，并以此实现 `PageSurface`
/// - 不认识题目，不处理业务流程
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = self
            .page
            .evaluate(js_code.into())
            .await
            .map_err(BrowserError::ScriptExecutionFailed)?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }
}

#[derive(Deserialize)]
struct RawFetch {
    status: u16,
    body: String,
    error: Option<String>,
}

#[async_trait]
impl PageSurface for JsExecutor {
    async fn url(&self) -> Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        debug!("导航到: {}", url);
        self.page
            .goto(url)
            .await
            .map_err(|source| BrowserError::NavigationFailed {
                url: url.to_string(),
                source,
            })?;
        Ok(())
    }

    async fn body_text(&self) -> Result<String> {
        self.eval_as("document.body ? document.body.innerText : ''").await
    }

    async fn has_element(&self, selector: &str) -> Result<bool> {
        let js_code = format!(
            "document.querySelector({}) !== null",
            serde_json::to_string(selector)?
        );
        self.eval_as(js_code).await
    }

    async fn fill_input(&self, selector: &str, value: &str) -> Result<bool> {
        let js_code = format!(
            r#"
            (() => {{
                const el = document.querySelector({});
                if (!el) return false;
                el.value = {};
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                return true;
            }})()
            "#,
            serde_json::to_string(selector)?,
            serde_json::to_string(value)?
        );
        self.eval_as(js_code).await
    }

    async fn click(&self, selector: &str) -> Result<bool> {
        let js_code = format!(
            r#"
            (() => {{
                const el = document.querySelector({});
                if (!el) return false;
                el.click();
                return true;
            }})()
            "#,
            serde_json::to_string(selector)?
        );
        self.eval_as(js_code).await
    }

    async fn click_button_with_text(&self, text: &str) -> Result<bool> {
        let js_code = format!(
            r#"
            (() => {{
                for (const b of document.querySelectorAll('button')) {{
                    if (b.textContent.includes({})) {{
                        b.click();
                        return true;
                    }}
                }}
                return false;
            }})()
            "#,
            serde_json::to_string(text)?
        );
        self.eval_as(js_code).await
    }

    async fn stop_loading(&self) -> Result<()> {
        self.eval("window.stop(); true").await?;
        Ok(())
    }

    async fn fetch_json(&self, url: &str, body: &JsonValue) -> Result<FetchReply> {
        let js_code = format!(
            r#"
            (async () => {{
                try {{
                    const res = await fetch({}, {{
                        method: 'POST',
                        headers: {{
                            'Content-Type': 'application/json',
                            'Accept': 'application/json, text/plain, */*'
                        }},
                        credentials: 'include',
                        body: JSON.stringify({})
                    }});
                    const text = await res.text();
                    return {{ status: res.status, body: text, error: null }};
                }} catch (error) {{
                    return {{ status: 0, body: '', error: error.message }};
                }}
            }})()
            "#,
            serde_json::to_string(url)?,
            serde_json::to_string(body)?
        );

        let raw: RawFetch = self.eval_as(js_code).await?;
        if let Some(error) = raw.error {
            bail!("页内请求失败 ({}): {}", url, error);
        }
        Ok(FetchReply {
            status: raw.status,
            body: raw.body,
        })
    }

    async fn eval_main_world(&self, script: &str) -> Result<JsonValue> {
        self.eval(script).await
    }

    async fn page_loads(&self) -> Result<Option<BoxStream<'static, ()>>> {
        let events = self.page.event_listener::<EventLoadEventFired>().await?;
        Ok(Some(events.map(|_| ()).boxed()))
    }
}
