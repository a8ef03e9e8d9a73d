//! LeetCode 远程 API - 业务能力层
//!
//! GraphQL 请求在页面上下文中执行（携带登录 Cookie，`status` 过滤依赖登录态），
//! 外部代码仓库的原始文件用 reqwest 直接拉取。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::debug;

use crate::error::ApiError;
use crate::infrastructure::PageSurface;

const DAILY_QUERY: &str = r#"
query questionOfToday {
    activeDailyCodingChallengeQuestion {
        link
        question {
            titleSlug
            status
            isPaidOnly
        }
    }
}"#;

const COMMUNITY_SOLUTIONS_QUERY: &str = r#"
query communitySolutions($questionSlug: String!, $skip: Int!, $first: Int!, $orderBy: TopicSortingOption, $languageTags: [String!], $topicTags: [String!]) {
    questionSolutions(
        filters: {questionSlug: $questionSlug, skip: $skip, first: $first, orderBy: $orderBy, languageTags: $languageTags, topicTags: $topicTags}
    ) {
        solutions {
            id
            title
            post { content }
        }
    }
}"#;

const QUESTION_ID_QUERY: &str = r#"
query questionTitle($titleSlug: String!) {
    question(titleSlug: $titleSlug) {
        questionFrontendId
    }
}"#;

const PROBLEM_LIST_QUERY: &str = r#"
query problemsetQuestionList($categorySlug: String, $limit: Int, $skip: Int, $filters: QuestionListFilterInput) {
    problemsetQuestionList: questionList(
        categorySlug: $categorySlug
        limit: $limit
        skip: $skip
        filters: $filters
    ) {
        data {
            titleSlug
            isPaidOnly
        }
    }
}"#;

/// 社区题解
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SolutionPost {
    #[serde(default)]
    pub id: JsonValue,
    #[serde(default)]
    pub title: String,
    pub content: String,
}

/// 题库列表中的一项
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemSummary {
    pub title_slug: String,
    #[serde(default)]
    pub is_paid_only: bool,
}

/// 每日一题
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyChallenge {
    pub link: String,
    pub title_slug: String,
    /// `"ac"` 表示已通过
    pub status: Option<String>,
    pub is_paid_only: bool,
}

/// 远程 API 能力
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// 按票数排序的社区题解
    async fn community_solutions(&self, slug: &str, first: u32) -> Result<Vec<SolutionPost>, ApiError>;

    /// slug → 前端题号
    async fn frontend_id(&self, slug: &str) -> Result<String, ApiError>;

    /// 按偏移量拉取未开始的题目
    async fn problem_list(&self, skip: u32, limit: u32) -> Result<Vec<ProblemSummary>, ApiError>;

    /// 今日每日一题
    async fn daily_challenge(&self) -> Result<Option<DailyChallenge>, ApiError>;

    /// GET 原始文本；非 2xx 返回 `Ok(None)`
    async fn fetch_raw(&self, url: &str) -> Result<Option<String>, ApiError>;
}

/// 基于页面上下文 + reqwest 的 API 客户端
pub struct LeetCodeClient {
    surface: Arc<dyn PageSurface>,
    http: reqwest::Client,
    graphql_url: String,
}

impl LeetCodeClient {
    pub fn new(surface: Arc<dyn PageSurface>, http: reqwest::Client, graphql_url: impl Into<String>) -> Self {
        Self {
            surface,
            http,
            graphql_url: graphql_url.into(),
        }
    }

    /// 构建带超时的 HTTP 客户端
    pub fn http_client(timeout: Duration) -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new())
    }

    async fn graphql(&self, query: &str, variables: JsonValue) -> Result<JsonValue, ApiError> {
        let body = json!({ "query": query, "variables": variables });
        let reply = self
            .surface
            .fetch_json(&self.graphql_url, &body)
            .await
            .map_err(|e| ApiError::Transport {
                endpoint: self.graphql_url.clone(),
                message: e.to_string(),
            })?;

        parse_graphql_reply(&self.graphql_url, reply.status, &reply.body)
    }
}

/// 解析 GraphQL 响应，返回 `data` 字段
///
/// 响应体不是 JSON 时（限流页面、拦截页面）归为 `RateLimited`。
pub fn parse_graphql_reply(endpoint: &str, status: u16, body: &str) -> Result<JsonValue, ApiError> {
    let json: JsonValue = serde_json::from_str(body).map_err(|_| ApiError::RateLimited {
        endpoint: endpoint.to_string(),
    })?;

    if let Some(errors) = json.get("errors").filter(|e| !e.is_null()) {
        return Err(ApiError::GraphQl(errors.to_string()));
    }
    if !(200..300).contains(&status) {
        return Err(ApiError::Http {
            endpoint: endpoint.to_string(),
            status,
        });
    }

    json.get("data")
        .filter(|d| !d.is_null())
        .cloned()
        .ok_or(ApiError::MissingField("data"))
}

#[async_trait]
impl RemoteApi for LeetCodeClient {
    async fn community_solutions(&self, slug: &str, first: u32) -> Result<Vec<SolutionPost>, ApiError> {
        let data = self
            .graphql(
                COMMUNITY_SOLUTIONS_QUERY,
                json!({
                    "questionSlug": slug,
                    "skip": 0,
                    "first": first,
                    "orderBy": "most_votes",
                    "languageTags": null,
                    "topicTags": null
                }),
            )
            .await?;

        let solutions = data
            .pointer("/questionSolutions/solutions")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        let posts = solutions
            .into_iter()
            .filter_map(|item| {
                let content = item.pointer("/post/content")?.as_str()?.to_string();
                Some(SolutionPost {
                    id: item.get("id").cloned().unwrap_or(JsonValue::Null),
                    title: item
                        .get("title")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    content,
                })
            })
            .collect();
        Ok(posts)
    }

    async fn frontend_id(&self, slug: &str) -> Result<String, ApiError> {
        let data = self
            .graphql(QUESTION_ID_QUERY, json!({ "titleSlug": slug }))
            .await?;

        match data.pointer("/question/questionFrontendId") {
            Some(JsonValue::String(id)) if !id.is_empty() => Ok(id.clone()),
            Some(JsonValue::Number(n)) => Ok(n.to_string()),
            _ => Err(ApiError::MissingField("question.questionFrontendId")),
        }
    }

    async fn problem_list(&self, skip: u32, limit: u32) -> Result<Vec<ProblemSummary>, ApiError> {
        let data = self
            .graphql(
                PROBLEM_LIST_QUERY,
                json!({
                    "categorySlug": "",
                    "limit": limit,
                    "skip": skip,
                    "filters": { "status": "NOT_STARTED" }
                }),
            )
            .await?;

        let list = data
            .pointer("/problemsetQuestionList/data")
            .cloned()
            .unwrap_or(JsonValue::Array(Vec::new()));
        serde_json::from_value(list).map_err(|_| ApiError::MissingField("problemsetQuestionList.data"))
    }

    async fn daily_challenge(&self) -> Result<Option<DailyChallenge>, ApiError> {
        let data = self.graphql(DAILY_QUERY, json!({})).await?;
        let Some(daily) = data.get("activeDailyCodingChallengeQuestion").filter(|v| !v.is_null()) else {
            return Ok(None);
        };

        let link = daily.get("link").and_then(|v| v.as_str()).unwrap_or_default();
        let question = daily.get("question").cloned().unwrap_or(JsonValue::Null);
        let title_slug = question
            .get("titleSlug")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        if link.is_empty() || title_slug.is_empty() {
            return Ok(None);
        }

        Ok(Some(DailyChallenge {
            link: link.to_string(),
            title_slug: title_slug.to_string(),
            status: question.get("status").and_then(|v| v.as_str()).map(str::to_string),
            is_paid_only: question
                .get("isPaidOnly")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
        }))
    }

    async fn fetch_raw(&self, url: &str) -> Result<Option<String>, ApiError> {
        debug!("GET {}", url);
        let transport = |e: reqwest::Error| ApiError::Transport {
            endpoint: url.to_string(),
            message: e.to_string(),
        };

        let res = self.http.get(url).send().await.map_err(transport)?;
        if !res.status().is_success() {
            debug!("GET {} -> {}", url, res.status());
            return Ok(None);
        }
        let text = res.text().await.map_err(transport)?;
        Ok(Some(text))
    }
}
