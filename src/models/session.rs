use serde::{Deserialize, Serialize};

/// 会话状态（持久化）
///
/// `solved_count` / `is_solving` / `last_solved_date` 只由协调器写入，
/// `daily_limit` / `auto_run` 只由设置入口写入。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    /// 是否有解题循环正在驱动页面
    pub is_solving: bool,
    /// 今日已通过数量
    pub solved_count: u32,
    /// 每日配额，至少为 1
    #[serde(deserialize_with = "deserialize_limit")]
    pub daily_limit: u32,
    /// 日期标记（`YYYY-MM-DD`）
    pub last_solved_date: String,
    /// 是否开启自动运行
    pub auto_run: bool,
    /// 每日一题已尝试过的日期标记；与 `last_solved_date` 相同时不再优先每日一题
    pub daily_attempted_date: String,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            is_solving: false,
            solved_count: 0,
            daily_limit: 1,
            last_solved_date: String::new(),
            auto_run: false,
            daily_attempted_date: String::new(),
        }
    }
}

impl SessionState {
    /// 进度文本，例如 `2/5`
    pub fn progress(&self) -> String {
        format!("{}/{}", self.solved_count, self.daily_limit)
    }

    /// 当天的每日一题是否还没尝试过
    pub fn daily_pending(&self) -> bool {
        self.daily_attempted_date != self.last_solved_date
    }

    /// 根据持久化字段推导出的循环状态
    pub fn loop_state(&self) -> LoopState {
        if self.is_solving {
            LoopState::Active
        } else if self.solved_count >= self.daily_limit {
            LoopState::QuotaMet
        } else {
            LoopState::Idle
        }
    }
}

/// 配额状态机的三个状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Active,
    QuotaMet,
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LoopState::Idle => "IDLE",
            LoopState::Active => "ACTIVE",
            LoopState::QuotaMet => "QUOTA_MET",
        };
        f.write_str(name)
    }
}

/// 登录凭据（持久化，对编排器不透明）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub leetcode_username: String,
    pub leetcode_password: String,
}

impl Credentials {
    /// 用户名和密码都存在时才返回
    pub fn pair(&self) -> Option<(&str, &str)> {
        if self.leetcode_username.is_empty() || self.leetcode_password.is_empty() {
            None
        } else {
            Some((&self.leetcode_username, &self.leetcode_password))
        }
    }
}

/// 每日配额既可能存为数字，也可能存为字符串；无法解析或为 0 时按 1 处理
fn deserialize_limit<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Visitor;
    use std::fmt;

    struct LimitVisitor;

    impl<'de> Visitor<'de> for LimitVisitor {
        type Value = u32;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or integer daily limit")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.trim().parse::<u32>().unwrap_or(1).max(1))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(u32::try_from(value).unwrap_or(1).max(1))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(u32::try_from(value).unwrap_or(u32::MAX).max(1))
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            if value.is_finite() && value >= 1.0 {
                Ok(value.min(u32::MAX as f64) as u32)
            } else {
                Ok(1)
            }
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(1)
        }
    }

    deserializer.deserialize_any(LimitVisitor)
}
