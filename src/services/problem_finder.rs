//! 下一题查找 - 业务能力层
//!
//! 优先今日每日一题（未通过且非会员题），否则在随机偏移处拉取一批未开始的题目，
//! 取第一道免费题；一无所获时在偏移 0 处再试一次。

use std::sync::Arc;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{ApiError, Cancelled};
use crate::models::ProblemRef;
use crate::services::activity_log::ActivityLog;
use crate::services::leetcode_api::RemoteApi;

/// 查找参数
#[derive(Debug, Clone, Copy)]
pub struct FinderSettings {
    pub prefer_daily: bool,
    pub offset_range: u32,
    pub batch_size: u32,
}

impl From<&Config> for FinderSettings {
    fn from(config: &Config) -> Self {
        Self {
            prefer_daily: config.prefer_daily,
            offset_range: config.catalog_offset_range.max(1),
            batch_size: config.catalog_batch_size,
        }
    }
}

pub struct NextProblemFinder {
    api: Arc<dyn RemoteApi>,
    activity: ActivityLog,
    settings: FinderSettings,
}

impl NextProblemFinder {
    pub fn new(api: Arc<dyn RemoteApi>, activity: ActivityLog, settings: FinderSettings) -> Self {
        Self {
            api,
            activity,
            settings,
        }
    }

    /// 查找下一题，返回站内路径（如 `/problems/two-sum/`）
    pub async fn find_next(&self, cancel: &CancellationToken) -> Result<Option<String>, Cancelled> {
        let offset = rand::rng().random_range(0..self.settings.offset_range);
        self.find_next_from(offset, cancel).await
    }

    /// 从指定偏移开始查找
    pub async fn find_next_from(
        &self,
        offset: u32,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, Cancelled> {
        if cancel.is_cancelled() {
            return Err(Cancelled);
        }

        if self.settings.prefer_daily {
            if let Some(link) = self.daily_link().await {
                return Ok(Some(link));
            }
            if cancel.is_cancelled() {
                return Err(Cancelled);
            }
        }

        if let Some(path) = self.fetch_batch(offset).await {
            return Ok(Some(path));
        }
        if cancel.is_cancelled() {
            return Err(Cancelled);
        }
        if offset == 0 {
            return Ok(None);
        }

        Ok(self.fetch_batch(0).await)
    }

    async fn daily_link(&self) -> Option<String> {
        match self.api.daily_challenge().await {
            Ok(Some(daily)) if daily.is_paid_only => {
                self.activity
                    .info(format!("Daily question {} is premium, skipping", daily.title_slug));
                None
            }
            Ok(Some(daily)) if daily.status.as_deref() == Some("ac") => {
                self.activity
                    .info(format!("Daily question {} already accepted", daily.title_slug));
                None
            }
            Ok(Some(daily)) => {
                self.activity
                    .info(format!("Found daily question: {}", daily.title_slug));
                Some(daily.link)
            }
            Ok(None) => None,
            Err(e) => {
                self.report_api_error(&e);
                None
            }
        }
    }

    async fn fetch_batch(&self, skip: u32) -> Option<String> {
        let problems = match self.api.problem_list(skip, self.settings.batch_size).await {
            Ok(problems) => problems,
            Err(e) => {
                self.report_api_error(&e);
                return None;
            }
        };

        if problems.is_empty() {
            self.activity
                .warning(format!("No problems found at skip {}", skip));
            return None;
        }

        match problems.iter().find(|p| !p.is_paid_only) {
            Some(free) => {
                self.activity
                    .info(format!("Found free problem: {}", free.title_slug));
                Some(ProblemRef::new(free.title_slug.as_str()).path())
            }
            None => {
                self.activity.warning(format!(
                    "All {} problems at skip {} were Premium. Retrying...",
                    problems.len(),
                    skip
                ));
                None
            }
        }
    }

    fn report_api_error(&self, e: &ApiError) {
        if e.is_rate_limited() {
            self.activity
                .error("LeetCode API Rate Limit/Block (HTML response). Waiting...");
            return;
        }
        match e {
            ApiError::GraphQl(errors) => self
                .activity
                .error(format!("Problem Search Error: {}", errors)),
            other => self.activity.warning(format!("Network warning: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::services::leetcode_api::{DailyChallenge, ProblemSummary, SolutionPost};

    #[derive(Default)]
    struct CatalogApi {
        daily: Option<DailyChallenge>,
        /// skip → 批次；缺省为空批次
        batches: Vec<(u32, Vec<ProblemSummary>)>,
        rate_limited: bool,
        skips: Mutex<Vec<u32>>,
    }

    #[async_trait]
    impl RemoteApi for CatalogApi {
        async fn community_solutions(&self, _slug: &str, _first: u32) -> Result<Vec<SolutionPost>, ApiError> {
            Ok(Vec::new())
        }

        async fn frontend_id(&self, _slug: &str) -> Result<String, ApiError> {
            Err(ApiError::MissingField("question.questionFrontendId"))
        }

        async fn problem_list(&self, skip: u32, _limit: u32) -> Result<Vec<ProblemSummary>, ApiError> {
            self.skips.lock().unwrap().push(skip);
            if self.rate_limited {
                return Err(ApiError::RateLimited {
                    endpoint: "/graphql".into(),
                });
            }
            Ok(self
                .batches
                .iter()
                .find(|(s, _)| *s == skip)
                .map(|(_, b)| b.clone())
                .unwrap_or_default())
        }

        async fn daily_challenge(&self) -> Result<Option<DailyChallenge>, ApiError> {
            Ok(self.daily.clone())
        }

        async fn fetch_raw(&self, _url: &str) -> Result<Option<String>, ApiError> {
            Ok(None)
        }
    }

    fn summary(slug: &str, paid: bool) -> ProblemSummary {
        ProblemSummary {
            title_slug: slug.into(),
            is_paid_only: paid,
        }
    }

    fn finder(api: Arc<CatalogApi>, prefer_daily: bool) -> NextProblemFinder {
        NextProblemFinder::new(
            api,
            ActivityLog::detached(),
            FinderSettings {
                prefer_daily,
                offset_range: 500,
                batch_size: 20,
            },
        )
    }

    #[tokio::test]
    async fn test_first_free_problem() {
        let api = Arc::new(CatalogApi {
            batches: vec![(42, vec![summary("locked", true), summary("free-one", false)])],
            ..Default::default()
        });
        let path = finder(api, false)
            .find_next_from(42, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(path.as_deref(), Some("/problems/free-one/"));
    }

    #[tokio::test]
    async fn test_all_premium_retries_at_zero() {
        let api = Arc::new(CatalogApi {
            batches: vec![
                (42, vec![summary("a", true), summary("b", true)]),
                (0, vec![summary("two-sum", false)]),
            ],
            ..Default::default()
        });
        let path = finder(api.clone(), false)
            .find_next_from(42, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(path.as_deref(), Some("/problems/two-sum/"));
        assert_eq!(*api.skips.lock().unwrap(), vec![42, 0]);
    }

    #[tokio::test]
    async fn test_exhausted_returns_none() {
        let api = Arc::new(CatalogApi::default());
        let path = finder(api.clone(), false)
            .find_next_from(7, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(path, None);
        assert_eq!(*api.skips.lock().unwrap(), vec![7, 0]);
    }

    #[tokio::test]
    async fn test_rate_limited_ends_attempt() {
        let api = Arc::new(CatalogApi {
            rate_limited: true,
            ..Default::default()
        });
        let path = finder(api, false)
            .find_next_from(3, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(path, None);
    }

    #[tokio::test]
    async fn test_daily_preferred_unless_solved_or_paid() {
        let daily = |status: Option<&str>, paid: bool| DailyChallenge {
            link: "/problems/daily-one/".into(),
            title_slug: "daily-one".into(),
            status: status.map(str::to_string),
            is_paid_only: paid,
        };
        let batches = vec![(0, vec![summary("fallback", false)])];

        let fresh = Arc::new(CatalogApi {
            daily: Some(daily(None, false)),
            batches: batches.clone(),
            ..Default::default()
        });
        let path = finder(fresh, true)
            .find_next_from(0, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(path.as_deref(), Some("/problems/daily-one/"));

        for (status, paid) in [(Some("ac"), false), (None, true)] {
            let api = Arc::new(CatalogApi {
                daily: Some(daily(status, paid)),
                batches: batches.clone(),
                ..Default::default()
            });
            let path = finder(api, true)
                .find_next_from(0, &CancellationToken::new())
                .await
                .unwrap();
            assert_eq!(path.as_deref(), Some("/problems/fallback/"));
        }
    }

    #[tokio::test]
    async fn test_random_offset_is_in_range() {
        let api = Arc::new(CatalogApi::default());
        finder(api.clone(), false)
            .find_next(&CancellationToken::new())
            .await
            .unwrap();
        let skips = api.skips.lock().unwrap();
        assert!(skips[0] < 500);
    }

    #[tokio::test]
    async fn test_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = finder(Arc::new(CatalogApi::default()), false)
            .find_next_from(0, &cancel)
            .await;
        assert_eq!(result, Err(Cancelled));
    }
}
