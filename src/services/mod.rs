pub mod acquisition;
pub mod activity_log;
pub mod classifier;
pub mod code_extractor;
pub mod injector;
pub mod leetcode_api;
pub mod login;
pub mod notifier;
pub mod problem_finder;
pub mod submission;

pub use acquisition::{AcquisitionPipeline, AcquisitionSettings};
pub use activity_log::ActivityLog;
pub use classifier::{CppKeywordClassifier, LanguageClassifier};
pub use code_extractor::extract_code_block;
pub use injector::{inject, select_target_model, EditorModelInfo, ModelChoice, SelectionReason};
pub use leetcode_api::{DailyChallenge, LeetCodeClient, ProblemSummary, RemoteApi, SolutionPost};
pub use login::{auto_login, LoginOutcome};
pub use notifier::{Notifier, TracingNotifier};
pub use problem_finder::{FinderSettings, NextProblemFinder};
pub use submission::{click_submit, MonitorOutcome, SubmissionMonitor};
