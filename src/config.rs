use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// 默认配置文件路径（可通过 `AUTO_SOLVE_CONFIG` 覆盖）
pub const DEFAULT_CONFIG_FILE: &str = "auto_solve.toml";

/// 程序配置
///
/// 加载顺序：默认值 ← TOML 文件 ← 环境变量
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 浏览器调试端口（连接已运行的浏览器时使用）
    pub browser_debug_port: u16,
    /// 是否自行启动浏览器，而不是连接已有浏览器
    pub launch_browser: bool,
    /// 自行启动时是否使用无头模式
    pub headless: bool,
    /// 浏览器可执行文件路径（为空时由 chromiumoxide 自动查找）
    pub chrome_executable: Option<String>,
    /// 目标站点
    pub site_origin: String,
    /// 持久化存储文件
    pub store_path: String,
    /// 输出日志文件
    pub output_log_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,

    // --- 解题来源 ---
    /// 按 slug 索引的代码仓库模板，`{slug}` 会被替换
    pub slug_repo_template: String,
    /// 按题号索引的代码仓库模板，`{id}` 会被替换为 4 位补零题号
    pub id_repo_template: String,
    /// 社区题解拉取数量
    pub community_post_count: u32,
    /// 社区题解代码最短长度（不含）
    pub min_code_length: usize,
    /// 是否优先尝试每日一题
    pub prefer_daily: bool,
    /// 随机偏移上限
    pub catalog_offset_range: u32,
    /// 每次拉取的题目数量
    pub catalog_batch_size: u32,

    // --- 时间参数（毫秒 / 秒） ---
    pub retry_delay_ms: u64,
    pub submit_delay_ms: u64,
    pub login_click_delay_ms: u64,
    pub monitor_interval_ms: u64,
    pub monitor_max_checks: u32,
    pub auto_run_interval_secs: u64,
    pub auto_run_startup_delay_secs: u64,
    pub http_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_debug_port: 9222,
            launch_browser: false,
            headless: false,
            chrome_executable: None,
            site_origin: "https://leetcode.com".to_string(),
            store_path: "auto_solve_state.json".to_string(),
            output_log_file: "auto_solve.log".to_string(),
            verbose_logging: false,
            slug_repo_template:
                "https://raw.githubusercontent.com/kamyu104/LeetCode-Solutions/master/C%2B%2B/{slug}.cpp"
                    .to_string(),
            id_repo_template:
                "https://raw.githubusercontent.com/walkccc/LeetCode/main/solutions/cpp/{id}.cpp"
                    .to_string(),
            community_post_count: 10,
            min_code_length: 30,
            prefer_daily: true,
            catalog_offset_range: 500,
            catalog_batch_size: 20,
            retry_delay_ms: 5000,
            submit_delay_ms: 2000,
            login_click_delay_ms: 500,
            monitor_interval_ms: 1500,
            monitor_max_checks: 40,
            auto_run_interval_secs: 3600,
            auto_run_startup_delay_secs: 5,
            http_timeout_secs: 30,
        }
    }
}

impl Config {
    /// 加载配置：默认值 ← TOML 文件（可选） ← 环境变量
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("AUTO_SOLVE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let base = if Path::new(&path).exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        base.with_env()
    }

    /// 从 TOML 文件读取，缺省字段使用默认值
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::ParseFailed {
            path: path.to_string(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 仅使用默认值和环境变量
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env()
    }

    fn with_env(mut self) -> Result<Self, ConfigError> {
        if let Some(v) = env_parse("BROWSER_DEBUG_PORT", "u16")? {
            self.browser_debug_port = v;
        }
        if let Some(v) = env_parse("LAUNCH_BROWSER", "bool")? {
            self.launch_browser = v;
        }
        if let Some(v) = env_parse("HEADLESS", "bool")? {
            self.headless = v;
        }
        if let Ok(v) = std::env::var("CHROME_EXECUTABLE") {
            self.chrome_executable = Some(v);
        }
        if let Ok(v) = std::env::var("SITE_ORIGIN") {
            self.site_origin = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = std::env::var("STORE_PATH") {
            self.store_path = v;
        }
        if let Ok(v) = std::env::var("OUTPUT_LOG_FILE") {
            self.output_log_file = v;
        }
        if let Some(v) = env_parse("VERBOSE_LOGGING", "bool")? {
            self.verbose_logging = v;
        }
        if let Some(v) = env_parse("RETRY_DELAY_MS", "u64")? {
            self.retry_delay_ms = v;
        }
        if let Some(v) = env_parse("AUTO_RUN_INTERVAL_SECS", "u64")? {
            self.auto_run_interval_secs = v;
        }
        if let Some(v) = env_parse("PREFER_DAILY", "bool")? {
            self.prefer_daily = v;
        }
        Ok(self)
    }

    /// GraphQL 端点
    pub fn graphql_url(&self) -> String {
        format!("{}/graphql", self.site_origin)
    }

    /// 题库列表页（开始解题和直接导航兜底时使用）
    pub fn problemset_url(&self) -> String {
        format!("{}/problemset/all/", self.site_origin)
    }

    /// 将站内路径拼成完整 URL；已是完整 URL 时原样返回
    pub fn site_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}{}", self.site_origin.trim_end_matches('/'), path)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn submit_delay(&self) -> Duration {
        Duration::from_millis(self.submit_delay_ms)
    }

    pub fn login_click_delay(&self) -> Duration {
        Duration::from_millis(self.login_click_delay_ms)
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }

    pub fn auto_run_interval(&self) -> Duration {
        Duration::from_secs(self.auto_run_interval_secs)
    }

    pub fn auto_run_startup_delay(&self) -> Duration {
        Duration::from_secs(self.auto_run_startup_delay_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn env_parse<T: std::str::FromStr>(
    var_name: &str,
    expected_type: &'static str,
) -> Result<Option<T>, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type,
            }),
        Err(_) => Ok(None),
    }
}
