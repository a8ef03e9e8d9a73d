//! 配额 / 日期状态机 - 编排层
//!
//! 纯函数，只修改传入的 `SessionState`；持久化和副作用由协调器负责。

use crate::models::SessionState;

/// 今天的本地日期（`YYYY-MM-DD`）
pub fn local_today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// 跨天时清零计数并更新日期标记；返回是否发生了跨天
fn roll_over(session: &mut SessionState, today: &str) -> bool {
    if session.last_solved_date == today {
        return false;
    }
    session.solved_count = 0;
    session.last_solved_date = today.to_string();
    true
}

/// 手动开始：清零并进入 ACTIVE
pub fn start(session: &mut SessionState, today: &str) {
    session.is_solving = true;
    session.solved_count = 0;
    session.last_solved_date = today.to_string();
}

/// 手动停止：进入 IDLE（或 QUOTA_MET，取决于计数）
pub fn stop(session: &mut SessionState) {
    session.is_solving = false;
}

/// 一次通过之后的决定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolvedDecision {
    /// 未达配额，继续下一题
    Continue { solved: u32, limit: u32 },
    /// 达到配额，停止
    QuotaMet { solved: u32, limit: u32 },
}

impl SolvedDecision {
    /// 徽标文本
    pub fn badge(&self) -> String {
        match self {
            SolvedDecision::Continue { solved, limit } | SolvedDecision::QuotaMet { solved, limit } => {
                format!("{}/{}", solved, limit)
            }
        }
    }
}

/// 本日的第一道题出了结果，之后不再优先每日一题
fn mark_daily_attempted(session: &mut SessionState) {
    session.daily_attempted_date = session.last_solved_date.clone();
}

/// 记录一次失败
pub fn record_failed(session: &mut SessionState) {
    mark_daily_attempted(session);
}

/// 记录一次通过
pub fn record_solved(session: &mut SessionState, today: &str) -> SolvedDecision {
    roll_over(session, today);
    mark_daily_attempted(session);
    session.solved_count = session.solved_count.saturating_add(1);
    let limit = session.daily_limit.max(1);

    if session.solved_count >= limit {
        session.is_solving = false;
        SolvedDecision::QuotaMet {
            solved: session.solved_count,
            limit,
        }
    } else {
        SolvedDecision::Continue {
            solved: session.solved_count,
            limit,
        }
    }
}

/// 自动运行检查的结论
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoRunDecision {
    /// 未开启自动运行
    Disabled,
    /// 新的一天，已清零并进入 ACTIVE
    NewDay,
    /// 配额未满，进入 ACTIVE
    QuotaUnmet,
    /// 今日配额已满
    QuotaMet,
}

impl AutoRunDecision {
    pub fn activates(&self) -> bool {
        matches!(self, AutoRunDecision::NewDay | AutoRunDecision::QuotaUnmet)
    }
}

/// 周期性自动运行检查
pub fn evaluate_auto_run(session: &mut SessionState, today: &str) -> AutoRunDecision {
    if !session.auto_run {
        return AutoRunDecision::Disabled;
    }
    if roll_over(session, today) {
        session.is_solving = true;
        return AutoRunDecision::NewDay;
    }
    if session.solved_count < session.daily_limit.max(1) {
        session.is_solving = true;
        return AutoRunDecision::QuotaUnmet;
    }
    AutoRunDecision::QuotaMet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LoopState;

    const DAY: &str = "2024-03-01";
    const NEXT_DAY: &str = "2024-03-02";

    fn session(limit: u32) -> SessionState {
        SessionState {
            daily_limit: limit,
            ..Default::default()
        }
    }

    #[test]
    fn test_n_solves_counted() {
        let mut s = session(10);
        start(&mut s, DAY);
        for n in 1..=4 {
            let decision = record_solved(&mut s, DAY);
            assert_eq!(decision, SolvedDecision::Continue { solved: n, limit: 10 });
        }
        assert_eq!(s.solved_count, 4);
        assert_eq!(s.loop_state(), LoopState::Active);
    }

    #[test]
    fn test_limit_one_meets_quota_immediately() {
        let mut s = session(1);
        start(&mut s, DAY);
        let decision = record_solved(&mut s, DAY);
        assert_eq!(decision, SolvedDecision::QuotaMet { solved: 1, limit: 1 });
        assert_eq!(decision.badge(), "1/1");
        assert!(!s.is_solving);
        assert_eq!(s.loop_state(), LoopState::QuotaMet);
    }

    #[test]
    fn test_quota_met_exactly_at_limit() {
        let mut s = session(3);
        start(&mut s, DAY);
        assert!(matches!(record_solved(&mut s, DAY), SolvedDecision::Continue { .. }));
        assert!(matches!(record_solved(&mut s, DAY), SolvedDecision::Continue { .. }));
        assert!(matches!(record_solved(&mut s, DAY), SolvedDecision::QuotaMet { .. }));
    }

    #[test]
    fn test_start_resets_and_marks_today() {
        let mut s = session(2);
        s.solved_count = 2;
        s.last_solved_date = "2020-01-01".into();
        start(&mut s, DAY);
        assert_eq!(s.solved_count, 0);
        assert_eq!(s.last_solved_date, DAY);
        assert_eq!(s.loop_state(), LoopState::Active);
    }

    #[test]
    fn test_stop_goes_idle() {
        let mut s = session(2);
        start(&mut s, DAY);
        stop(&mut s);
        assert_eq!(s.loop_state(), LoopState::Idle);
    }

    #[test]
    fn test_auto_run_disabled() {
        let mut s = session(1);
        let before = s.clone();
        assert_eq!(evaluate_auto_run(&mut s, DAY), AutoRunDecision::Disabled);
        assert_eq!(s, before);
    }

    #[test]
    fn test_auto_run_day_boundary_resets() {
        let mut s = session(1);
        s.auto_run = true;
        s.solved_count = 1;
        s.last_solved_date = DAY.into();
        assert_eq!(evaluate_auto_run(&mut s, DAY), AutoRunDecision::QuotaMet);

        assert_eq!(evaluate_auto_run(&mut s, NEXT_DAY), AutoRunDecision::NewDay);
        assert_eq!(s.solved_count, 0);
        assert_eq!(s.last_solved_date, NEXT_DAY);
        assert!(s.is_solving);
    }

    #[test]
    fn test_auto_run_quota_unmet() {
        let mut s = session(3);
        s.auto_run = true;
        s.solved_count = 1;
        s.last_solved_date = DAY.into();
        assert_eq!(evaluate_auto_run(&mut s, DAY), AutoRunDecision::QuotaUnmet);
        assert!(s.is_solving);
        assert_eq!(s.solved_count, 1);
    }

    #[test]
    fn test_solve_marks_daily_attempted() {
        let mut s = session(3);
        start(&mut s, DAY);
        record_solved(&mut s, DAY);
        assert!(!s.daily_pending());
    }

    #[test]
    fn test_solve_on_new_day_rolls_over_first() {
        let mut s = session(5);
        start(&mut s, DAY);
        record_solved(&mut s, DAY);
        record_solved(&mut s, DAY);
        let decision = record_solved(&mut s, NEXT_DAY);
        assert_eq!(decision, SolvedDecision::Continue { solved: 1, limit: 5 });
        assert_eq!(s.last_solved_date, NEXT_DAY);
    }

    #[test]
    fn test_daily_offered_once_per_day() {
        let mut s = session(3);
        start(&mut s, DAY);
        assert!(s.daily_pending());

        record_failed(&mut s);
        assert!(!s.daily_pending());
        assert_eq!(s.daily_attempted_date, DAY);

        // 新的一天，每日一题重新可选
        s.auto_run = true;
        assert_eq!(evaluate_auto_run(&mut s, NEXT_DAY), AutoRunDecision::NewDay);
        assert!(s.daily_pending());
    }
}
