//! 编辑器注入 - 业务能力层
//!
//! 分两步在页面主世界执行：先列出所有 Monaco model，再对选中的 model 调用 `setValue`。
//! 选哪个 model 由 [`select_target_model`] 在 Rust 侧决定。

use phf::phf_set;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::error::InjectionError;
use crate::infrastructure::PageSurface;
use crate::utils::logging::truncate_text;

/// 站点支持的编程语言 id
pub static VALID_LANGUAGES: phf::Set<&'static str> = phf_set! {
    "cpp", "java", "python", "python3", "c", "csharp", "javascript", "typescript",
    "swift", "go", "kotlin", "scala", "rust", "php", "ruby", "dart", "erlang", "elixir",
};

const LIST_MODELS_SCRIPT: &str = r#"
(() => {
    try {
        const editor = window.monaco && window.monaco.editor;
        if (!editor) return { models: [] };
        const models = editor.getModels();
        const editors = editor.getEditors ? editor.getEditors() : [];
        const active = editors.length > 0 ? editors[0].getModel() : null;
        return {
            models: models.map((m, index) => ({
                index,
                language: m.getLanguageId(),
                length: m.getValueLength(),
                active: m === active
            }))
        };
    } catch (e) {
        return { error: String((e && e.message) || e) };
    }
})()
"#;

/// 页面上一个编辑器 model 的描述
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EditorModelInfo {
    pub index: usize,
    pub language: String,
    pub length: usize,
    #[serde(default)]
    pub active: bool,
}

/// 选择依据
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionReason {
    /// 第一个语言在白名单中的 model
    LanguageId,
    /// 活动编辑器绑定的 model
    ActiveEditor,
    /// 兜底：文本最长的 model
    Largest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelChoice {
    pub index: usize,
    pub reason: SelectionReason,
}

/// 选择注入目标
///
/// 依次：第一个白名单语言的 model；活动编辑器的 model（语言在白名单内）；文本最长的 model。
pub fn select_target_model(models: &[EditorModelInfo]) -> Option<ModelChoice> {
    if let Some(m) = models
        .iter()
        .find(|m| VALID_LANGUAGES.contains(m.language.as_str()))
    {
        return Some(ModelChoice {
            index: m.index,
            reason: SelectionReason::LanguageId,
        });
    }

    if let Some(m) = models
        .iter()
        .find(|m| m.active && VALID_LANGUAGES.contains(m.language.as_str()))
    {
        return Some(ModelChoice {
            index: m.index,
            reason: SelectionReason::ActiveEditor,
        });
    }

    // 长度相同时取第一个
    models
        .iter()
        .fold(None::<&EditorModelInfo>, |best, m| match best {
            Some(b) if b.length >= m.length => Some(b),
            _ => Some(m),
        })
        .map(|m| ModelChoice {
            index: m.index,
            reason: SelectionReason::Largest,
        })
}

fn set_value_script(index: usize, code: &str) -> Result<String, InjectionError> {
    let code = serde_json::to_string(code).map_err(|e| InjectionError::HostRuntime(e.to_string()))?;
    Ok(format!(
        r#"
(() => {{
    try {{
        const model = window.monaco.editor.getModels()[{index}];
        if (!model) return {{ error: 'model {index} disappeared' }};
        model.setValue({code});
        return {{ ok: true }};
    }} catch (e) {{
        return {{ error: String((e && e.message) || e) }};
    }}
}})()
"#
    ))
}

fn script_error(value: &JsonValue) -> Option<String> {
    value
        .get("error")
        .filter(|e| !e.is_null())
        .map(|e| e.as_str().map(str::to_string).unwrap_or_else(|| e.to_string()))
}

/// 把代码写入页面编辑器（覆盖原内容）
pub async fn inject(surface: &dyn PageSurface, code: &str) -> Result<ModelChoice, InjectionError> {
    info!("💉 注入代码 ({} 字符): {}", code.len(), truncate_text(code, 50));

    let listing = surface
        .eval_main_world(LIST_MODELS_SCRIPT)
        .await
        .map_err(|e| InjectionError::HostRuntime(e.to_string()))?;
    if let Some(err) = script_error(&listing) {
        return Err(InjectionError::ScriptThrew(err));
    }

    let models: Vec<EditorModelInfo> = listing
        .get("models")
        .cloned()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| InjectionError::HostRuntime(e.to_string()))?
        .unwrap_or_default();
    debug!("找到 {} 个 Monaco model: {:?}", models.len(), models);

    let choice = select_target_model(&models).ok_or(InjectionError::NoModels)?;
    if choice.reason == SelectionReason::Largest {
        warn!("⚠️ 没有可识别语言的 model，退而注入最长的 model #{}", choice.index);
    }

    let result = surface
        .eval_main_world(&set_value_script(choice.index, code)?)
        .await
        .map_err(|e| InjectionError::HostRuntime(e.to_string()))?;
    if let Some(err) = script_error(&result) {
        return Err(InjectionError::ScriptThrew(err));
    }

    info!("✓ 已注入 model #{} ({:?})", choice.index, choice.reason);
    Ok(choice)
}
