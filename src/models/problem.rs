use url::Url;

/// 页面类型，根据 URL 形状判断
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageKind {
    /// 登录页
    Login,
    /// 题目页，附带 slug
    Problem(ProblemRef),
    /// 题库列表或其他页面
    Other,
}

impl PageKind {
    pub fn classify(page_url: &str) -> Self {
        if page_url.contains("/accounts/login") {
            return PageKind::Login;
        }
        if page_url.contains("/problems/") {
            if let Some(problem) = ProblemRef::from_url(page_url) {
                return PageKind::Problem(problem);
            }
        }
        PageKind::Other
    }
}

/// 题目引用
///
/// slug 来自页面路径；数字题号只有按题号兜底时才需要，延迟解析。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemRef {
    pub slug: String,
    pub frontend_id: Option<String>,
}

impl ProblemRef {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            frontend_id: None,
        }
    }

    /// 从 `/problems/<slug>/...` 形式的地址中取出 slug
    pub fn from_url(page_url: &str) -> Option<Self> {
        let parsed = Url::parse(page_url).ok()?;
        let mut segments = parsed.path_segments()?;
        if segments.next()? != "problems" {
            return None;
        }
        let slug = segments.next()?;
        if slug.is_empty() {
            return None;
        }
        Some(Self::new(slug))
    }

    /// 站内路径
    pub fn path(&self) -> String {
        format!("/problems/{}/", self.slug)
    }
}

/// 题号补零到 4 位（`1` → `0001`）
pub fn pad_frontend_id(id: &str) -> String {
    format!("{:0>4}", id.trim())
}

/// 候选代码的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    /// 社区题解
    Community,
    /// 按 slug 的外部仓库
    SlugRepository,
    /// 按题号的外部仓库
    IdRepository,
}

impl std::fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CandidateSource::Community => "社区题解",
            CandidateSource::SlugRepository => "slug 仓库",
            CandidateSource::IdRepository => "题号仓库",
        };
        f.write_str(name)
    }
}

/// 候选代码，只在单次解题尝试中存在
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub code: String,
    pub source: CandidateSource,
}
