//! 解法获取流水线 - 业务能力层
//!
//! 按顺序尝试三个来源，前一个失败才尝试下一个：
//! 1. 社区题解（按票数排序，提取代码块 + 语言判定）
//! 2. 按 slug 命名的外部仓库
//! 3. 按题号命名的外部仓库（需要先查题号）

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::Cancelled;
use crate::models::{pad_frontend_id, Candidate, CandidateSource, ProblemRef};
use crate::services::activity_log::ActivityLog;
use crate::services::classifier::LanguageClassifier;
use crate::services::code_extractor::extract_code_block;
use crate::services::leetcode_api::RemoteApi;
use crate::utils::logging::truncate_text;

/// 流水线参数
#[derive(Debug, Clone)]
pub struct AcquisitionSettings {
    pub community_post_count: u32,
    pub min_code_length: usize,
    pub slug_repo_template: String,
    pub id_repo_template: String,
}

impl From<&Config> for AcquisitionSettings {
    fn from(config: &Config) -> Self {
        Self {
            community_post_count: config.community_post_count,
            min_code_length: config.min_code_length,
            slug_repo_template: config.slug_repo_template.clone(),
            id_repo_template: config.id_repo_template.clone(),
        }
    }
}

pub struct AcquisitionPipeline {
    api: Arc<dyn RemoteApi>,
    classifier: Arc<dyn LanguageClassifier>,
    activity: ActivityLog,
    settings: AcquisitionSettings,
}

impl AcquisitionPipeline {
    pub fn new(
        api: Arc<dyn RemoteApi>,
        classifier: Arc<dyn LanguageClassifier>,
        activity: ActivityLog,
        settings: AcquisitionSettings,
    ) -> Self {
        Self {
            api,
            classifier,
            activity,
            settings,
        }
    }

    /// 获取候选解法
    ///
    /// 返回 `Ok(None)` 表示所有来源都失败；停止指令触发时返回 `Err(Cancelled)`。
    /// 按题号兜底时会把解析出的题号写回 `problem`。
    pub async fn acquire(
        &self,
        problem: &mut ProblemRef,
        cancel: &CancellationToken,
    ) -> Result<Option<Candidate>, Cancelled> {
        if problem.slug.is_empty() {
            self.activity.error("Error: Problem Slug is missing!");
            return Ok(None);
        }

        ensure_active(cancel)?;
        if let Some(candidate) = self.from_community(&problem.slug).await {
            return Ok(Some(candidate));
        }

        ensure_active(cancel)?;
        if let Some(candidate) = self.from_slug_repository(&problem.slug).await {
            return Ok(Some(candidate));
        }

        ensure_active(cancel)?;
        if let Some(candidate) = self.from_id_repository(problem, cancel).await? {
            return Ok(Some(candidate));
        }

        self.activity.error("All sources failed. No solution found.");
        Ok(None)
    }

    async fn from_community(&self, slug: &str) -> Option<Candidate> {
        self.activity.info(format!("Fetching solutions for: {}", slug));

        let posts = match self
            .api
            .community_solutions(slug, self.settings.community_post_count)
            .await
        {
            Ok(posts) => posts,
            Err(e) => {
                self.activity.error(format!("Community fetch failed: {}", e));
                return None;
            }
        };
        self.activity
            .info(format!("LeetCode Community found: {}", posts.len()));

        for post in posts {
            let Some(code) = extract_code_block(&post.content) else {
                continue;
            };
            if code.chars().count() <= self.settings.min_code_length {
                continue;
            }
            if self.classifier.accepts(&code) {
                self.activity.success(format!(
                    "Verified {} Content! Preview: {}",
                    self.classifier.language(),
                    truncate_text(&code, 20)
                ));
                return Some(Candidate {
                    code,
                    source: CandidateSource::Community,
                });
            }
            self.activity.info(format!(
                "Skipped non-{} code block.",
                self.classifier.language()
            ));
        }
        None
    }

    async fn from_slug_repository(&self, slug: &str) -> Option<Candidate> {
        self.activity
            .warning("Trying Fallback 1: slug-keyed repository...");
        let url = self.settings.slug_repo_template.replace("{slug}", slug);

        match self.api.fetch_raw(&url).await {
            Ok(Some(body)) if self.classifier.accepts(&body) => {
                self.activity.success("Slug repository fallback successful!");
                Some(Candidate {
                    code: body,
                    source: CandidateSource::SlugRepository,
                })
            }
            Ok(_) => None,
            Err(e) => {
                self.activity
                    .warning(format!("Slug repository failed: {}", e));
                None
            }
        }
    }

    async fn from_id_repository(
        &self,
        problem: &mut ProblemRef,
        cancel: &CancellationToken,
    ) -> Result<Option<Candidate>, Cancelled> {
        self.activity
            .warning("Trying Fallback 2: id-keyed repository...");

        let id = match &problem.frontend_id {
            Some(id) => id.clone(),
            None => match self.api.frontend_id(&problem.slug).await {
                Ok(id) => {
                    self.activity.info(format!("Problem ID found: {}", id));
                    problem.frontend_id = Some(id.clone());
                    id
                }
                Err(e) => {
                    self.activity
                        .error(format!("Failed to get Problem ID: {}", e));
                    self.activity
                        .error("Could not retrieve Problem ID for fallback.");
                    return Ok(None);
                }
            },
        };
        ensure_active(cancel)?;

        let padded = pad_frontend_id(&id);
        let url = self.settings.id_repo_template.replace("{id}", &padded);
        self.activity.info(format!("Trying URL: {}", url));

        match self.api.fetch_raw(&url).await {
            Ok(Some(body)) if self.classifier.accepts(&body) => {
                self.activity.success(format!(
                    "Id repository verified {}! Length: {}",
                    self.classifier.language(),
                    body.len()
                ));
                Ok(Some(Candidate {
                    code: body,
                    source: CandidateSource::IdRepository,
                }))
            }
            Ok(_) => Ok(None),
            Err(e) => {
                self.activity
                    .error(format!("Id repository fetch failed: {}", e));
                Ok(None)
            }
        }
    }
}

fn ensure_active(cancel: &CancellationToken) -> Result<(), Cancelled> {
    if cancel.is_cancelled() {
        Err(Cancelled)
    } else {
        Ok(())
    }
}
