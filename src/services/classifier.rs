//! 语言分类器 - 业务能力层
//!
//! 尽力而为的子串打分器，不是语法分析器。误判（两个方向）都是可以接受的代价：
//! 判错的代码最多导致一次判题失败，流程会继续换下一道题。

/// 可替换的语言分类器
pub trait LanguageClassifier: Send + Sync {
    /// 目标语言名称（用于日志）
    fn language(&self) -> &'static str;

    /// 原始得分，命中的关键字越多分越高
    fn score(&self, code: &str) -> usize;

    /// 是否判为目标语言
    fn accepts(&self, code: &str) -> bool;
}

/// C++ 关键字打分器
///
/// 关键字包括类/结构体标记、容器类型、空指针和语句结束符 `;`。
/// 得分 = 关键字集合中以子串形式出现的个数；得分 ≥ 2 判为 C++。
/// 如果文本里有 Python 风格的 `def ` 且没有任何分号，直接判否。
#[derive(Debug, Clone)]
pub struct CppKeywordClassifier {
    keywords: &'static [&'static str],
    threshold: usize,
}

const CPP_KEYWORDS: &[&str] = &[
    "public:",
    "class Solution",
    "struct ",
    "vector<",
    "int ",
    "bool ",
    "string ",
    "auto ",
    "nullptr",
    ";",
];

impl CppKeywordClassifier {
    pub fn new() -> Self {
        Self {
            keywords: CPP_KEYWORDS,
            threshold: 2,
        }
    }

    fn looks_like_python(code: &str) -> bool {
        code.contains("def ") && !code.contains(';')
    }
}

impl Default for CppKeywordClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageClassifier for CppKeywordClassifier {
    fn language(&self) -> &'static str {
        "C++"
    }

    fn score(&self, code: &str) -> usize {
        self.keywords.iter().filter(|k| code.contains(*k)).count()
    }

    fn accepts(&self, code: &str) -> bool {
        if code.is_empty() || Self::looks_like_python(code) {
            return false;
        }
        self.score(code) >= self.threshold
    }
}
