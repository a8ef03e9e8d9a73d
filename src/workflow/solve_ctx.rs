//! 解题上下文
//!
//! 封装"我正在哪个标签页的第几次加载上解哪道题"这一信息

use std::fmt::Display;

use crate::models::{ProblemRef, TabId};

/// 解题上下文
#[derive(Debug, Clone)]
pub struct SolveCtx {
    /// 标签页编号
    pub tab: TabId,

    /// 页面加载代数（仅用于日志显示）
    pub generation: u64,

    /// 当前题目；按题号兜底时会补上题号
    pub problem: ProblemRef,
}

impl SolveCtx {
    pub fn new(tab: TabId, generation: u64, problem: ProblemRef) -> Self {
        Self {
            tab,
            generation,
            problem,
        }
    }
}

impl Display for SolveCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[标签页#{} 加载#{} 题目#{}]",
            self.tab, self.generation, self.problem.slug
        )?;
        if let Some(id) = &self.problem.frontend_id {
            write!(f, "(#{})", id)?;
        }
        Ok(())
    }
}
