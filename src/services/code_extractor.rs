//! 代码块提取 - 业务能力层
//!
//! 从题解的 markdown / HTML 正文中取出第一段代码。按顺序尝试：
//! 1. 严格的围栏代码块（开头一行可带语言和多余字符，之后必须换行）
//! 2. 宽松的围栏代码块（不要求换行）
//! 3. `<pre><code>` 元素，解码 `&lt;` `&gt;` `&amp;`
//!
//! 不会把整篇帖子当作代码返回：宁可漏掉，也不要把无关文字注入编辑器。

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

static STRICT_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[ \t]*(\w*)[^\n]*\n(.*?)```").expect("valid strict fence pattern")
});

static LOOSE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(\w*)\s+(.*?)```").expect("valid loose fence pattern"));

static PRE_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<pre>.*?<code>(.*?)</code>.*?</pre>").expect("valid pre/code pattern")
});

/// 提取第一段非空代码，去掉首尾空白
pub fn extract_code_block(markdown: &str) -> Option<String> {
    if markdown.is_empty() {
        return None;
    }

    if let Some(caps) = STRICT_FENCE.captures(markdown) {
        let body = caps.get(2).map_or("", |m| m.as_str()).trim();
        if !body.is_empty() {
            debug!(
                "代码块匹配 (严格围栏): lang={}",
                caps.get(1).map_or("", |m| m.as_str())
            );
            return Some(body.to_string());
        }
    }

    if let Some(caps) = LOOSE_FENCE.captures(markdown) {
        let body = caps.get(2).map_or("", |m| m.as_str()).trim();
        if !body.is_empty() {
            debug!("代码块匹配 (宽松围栏)");
            return Some(body.to_string());
        }
    }

    if let Some(caps) = PRE_CODE.captures(markdown) {
        let body = decode_basic_entities(caps.get(1).map_or("", |m| m.as_str()));
        let body = body.trim();
        if !body.is_empty() {
            debug!("代码块匹配 (HTML pre/code)");
            return Some(body.to_string());
        }
    }

    None
}

fn decode_basic_entities(text: &str) -> String {
    // &amp; 最后替换，避免 "&amp;lt;" 被二次解码
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
