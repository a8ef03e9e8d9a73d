//! 页面代理 - 流程层
//!
//! 每次页面加载创建一个代理：判断页面类型，在解题循环进行中时自动解题或寻找下一题，
//! 并响应协调器发来的命令。页面导航后代理整体销毁（取消令牌 + 中止进行中的任务），
//! 由标签页宿主为新页面重新创建。
//!
//! 代理只能读取存储；所有状态变化都以消息形式交给协调器。

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::FailureReason;
use crate::infrastructure::{Outbox, PageSurface, StoreReader, Tab};
use crate::models::{CoordinatorRequest, PageCommand, PageKind, ProblemRef};
use crate::services::{
    auto_login, ActivityLog, CppKeywordClassifier, FinderSettings, LanguageClassifier,
    LeetCodeClient, NextProblemFinder, RemoteApi,
};
use crate::workflow::solve_ctx::SolveCtx;
use crate::workflow::solve_flow::{SolveFlow, SolveResult};

/// 会员题标记
const PREMIUM_TEXT: &str = "Subscribe to unlock";
const PREMIUM_SELECTOR: &str = ".premium-lock-icon";

/// 根据页面构建远程 API
pub type ApiFactory = Arc<dyn Fn(Arc<dyn PageSurface>) -> Arc<dyn RemoteApi> + Send + Sync>;

/// 页面代理的依赖
#[derive(Clone)]
pub struct AgentDeps {
    pub config: Arc<Config>,
    pub store: StoreReader,
    pub classifier: Arc<dyn LanguageClassifier>,
    pub api_factory: ApiFactory,
}

impl AgentDeps {
    /// 默认依赖：页内 GraphQL + reqwest，C++ 分类器
    pub fn new(config: Arc<Config>, store: StoreReader) -> Self {
        let http = LeetCodeClient::http_client(config.http_timeout());
        let graphql_url = config.graphql_url();
        let api_factory: ApiFactory = Arc::new(move |surface: Arc<dyn PageSurface>| {
            Arc::new(LeetCodeClient::new(surface, http.clone(), graphql_url.clone())) as Arc<dyn RemoteApi>
        });

        Self {
            config,
            store,
            classifier: Arc::new(CppKeywordClassifier::new()),
            api_factory,
        }
    }

    pub fn with_api_factory(mut self, api_factory: ApiFactory) -> Self {
        self.api_factory = api_factory;
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn LanguageClassifier>) -> Self {
        self.classifier = classifier;
        self
    }
}

/// 代理退出原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentExit {
    /// 页面已导航，需要为新页面创建代理
    Navigated,
    /// 命令通道或标签页已关闭
    Closed,
}

struct AgentCore {
    tab: Arc<Tab>,
    outbox: Outbox,
    activity: ActivityLog,
    cancel: CancellationToken,
    api: Arc<dyn RemoteApi>,
    deps: AgentDeps,
    generation: u64,
}

/// 页面代理
pub struct PageAgent {
    core: Arc<AgentCore>,
    tasks: JoinSet<()>,
    stopped: bool,
}

impl PageAgent {
    pub fn new(tab: Arc<Tab>, outbox: Outbox, deps: AgentDeps) -> Self {
        let api = (deps.api_factory)(tab.surface().clone());
        let generation = tab.generation();
        let core = AgentCore {
            activity: ActivityLog::new(outbox.clone()),
            tab,
            outbox,
            cancel: CancellationToken::new(),
            api,
            deps,
            generation,
        };
        Self {
            core: Arc::new(core),
            tasks: JoinSet::new(),
            stopped: false,
        }
    }

    /// 运行直到页面导航或通道关闭
    pub async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<PageCommand>,
        loads: &mut watch::Receiver<u64>,
    ) -> AgentExit {
        let tab = self.core.outbox.tab();
        let url = match self.core.tab.surface().url().await {
            Ok(url) => url,
            Err(e) => {
                warn!("[tab {}] ⚠️ 读取页面地址失败: {}", tab, e);
                String::new()
            }
        };
        let kind = PageKind::classify(&url);
        debug!("[tab {}] 页面加载 #{}: {} ({:?})", tab, self.core.generation, url, kind);

        let core = self.core.clone();
        let on_load_kind = kind.clone();
        self.tasks.spawn(async move { core.on_load(on_load_kind).await });

        let exit = loop {
            tokio::select! {
                changed = loads.changed() => {
                    break if changed.is_ok() { AgentExit::Navigated } else { AgentExit::Closed };
                }
                command = commands.recv() => match command {
                    Some(command) => self.handle(command, &kind).await,
                    None => break AgentExit::Closed,
                },
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            error!("[tab {}] ❌ 页面任务崩溃: {}", tab, e);
                        }
                    }
                }
            }
        };

        self.core.cancel.cancel();
        self.tasks.abort_all();
        debug!("[tab {}] 页面代理 #{} 退出: {:?}", tab, self.core.generation, exit);
        exit
    }

    async fn handle(&mut self, command: PageCommand, kind: &PageKind) {
        let tab = self.core.outbox.tab();
        match command {
            PageCommand::StopAction => {
                if self.stopped {
                    return;
                }
                self.stopped = true;
                self.core.cancel.cancel();
                info!("[tab {}] 🛑 收到停止指令，立即停止当前页面的所有操作", tab);
                if let Err(e) = self.core.tab.surface().stop_loading().await {
                    debug!("[tab {}] 停止页面加载失败: {}", tab, e);
                }
            }
            _ if self.stopped || *kind == PageKind::Login => {
                debug!("[tab {}] 忽略命令 {:?}", tab, command);
            }
            PageCommand::FindDaily => {
                let core = self.core.clone();
                self.tasks.spawn(async move { core.find_next().await });
            }
            PageCommand::SolveProblem => {
                let core = self.core.clone();
                let problem = match kind {
                    PageKind::Problem(problem) => problem.clone(),
                    _ => ProblemRef::new(""),
                };
                self.tasks.spawn(async move { core.solve(problem).await });
            }
        }
    }
}

impl AgentCore {
    async fn on_load(self: Arc<Self>, kind: PageKind) {
        if kind == PageKind::Login {
            self.login().await;
            return;
        }

        let solving = match self.deps.store.session().await {
            Ok(session) => session.is_solving,
            Err(e) => {
                warn!("[tab {}] ⚠️ 读取会话状态失败: {}", self.outbox.tab(), e);
                false
            }
        };
        if !solving || self.cancel.is_cancelled() {
            return;
        }

        match kind {
            PageKind::Problem(problem) => {
                if self.is_premium_locked().await {
                    self.activity
                        .warning("Detected Premium Question (Locked). Skipping...");
                    self.report(SolveResult::Failed(FailureReason::PremiumLocked));
                } else {
                    self.solve(problem).await;
                }
            }
            _ => self.find_next().await,
        }
    }

    async fn login(&self) {
        let credentials = match self.deps.store.credentials().await {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!("[tab {}] ⚠️ 读取登录凭据失败: {}", self.outbox.tab(), e);
                return;
            }
        };
        if let Err(e) = auto_login(
            self.tab.surface().as_ref(),
            &credentials,
            self.deps.config.login_click_delay(),
        )
        .await
        {
            warn!("[tab {}] ⚠️ 自动登录失败: {}", self.outbox.tab(), e);
        }
    }

    async fn is_premium_locked(&self) -> bool {
        let surface = self.tab.surface();
        let text = surface.body_text().await.unwrap_or_default();
        text.contains(PREMIUM_TEXT) || surface.has_element(PREMIUM_SELECTOR).await.unwrap_or(false)
    }

    async fn solve(&self, problem: ProblemRef) {
        if self.cancel.is_cancelled() {
            return;
        }
        let mut ctx = SolveCtx::new(self.outbox.tab(), self.generation, problem);
        let flow = SolveFlow::new(
            self.api.clone(),
            self.deps.classifier.clone(),
            self.activity.clone(),
            &self.deps.config,
        );
        let result = flow
            .run(self.tab.surface().as_ref(), &self.outbox, &mut ctx, &self.cancel)
            .await;
        info!("{} 解题结束: {:?}", ctx, result);
        self.report(result);
    }

    async fn find_next(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        let mut settings = FinderSettings::from(self.deps.config.as_ref());
        match self.deps.store.session().await {
            // 每日一题每天只尝试一次，失败后改走随机题目
            Ok(session) => settings.prefer_daily &= session.daily_pending(),
            Err(e) => warn!("[tab {}] ⚠️ 读取会话状态失败: {}", self.outbox.tab(), e),
        }
        let finder = NextProblemFinder::new(self.api.clone(), self.activity.clone(), settings);

        match finder.find_next(&self.cancel).await {
            Ok(Some(path)) => {
                if self.cancel.is_cancelled() {
                    return;
                }
                let url = self.deps.config.site_url(&path);
                info!("[tab {}] ➡️ 前往 {}", self.outbox.tab(), url);
                // 导航失败也算一次新加载，新代理会重新判断页面
                if let Err(e) = self.tab.navigate(&url).await {
                    self.activity.error(format!("Navigation failed: {}", e));
                }
            }
            Ok(None) => {
                self.activity.warning("No problems found!");
                self.report(SolveResult::Failed(FailureReason::NoProblemsFound));
            }
            Err(_) => debug!("[tab {}] 查找下一题已取消", self.outbox.tab()),
        }
    }

    fn report(&self, result: SolveResult) {
        if self.cancel.is_cancelled() {
            return;
        }
        match result {
            SolveResult::Solved => {
                self.outbox.send(CoordinatorRequest::ProblemSolved);
            }
            SolveResult::Failed(reason) => {
                self.outbox.send(CoordinatorRequest::SolveFailed { reason });
            }
            SolveResult::Cancelled => {}
        }
    }
}
