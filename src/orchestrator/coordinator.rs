//! 协调器 - 编排层
//!
//! 进程内唯一、跨页面导航存活的 actor：
//! - 持有配额 / 日期状态机，所有会话字段和日志环只由这里写入
//! - 转发"找下一题"命令；页面代理已销毁时直接把标签页导航到题库列表
//! - 在页面主世界执行注入
//! - 失败一律延迟重试，只有停止和配额完成会结束循环

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::FailureReason;
use crate::infrastructure::{SessionStore, Tab, TabOpener};
use crate::models::{
    CoordinatorEvent, CoordinatorRequest, InjectResponse, LogEntry, LogLevel, PageCommand, Status,
    TabId,
};
use crate::orchestrator::quota::{self, AutoRunDecision, SolvedDecision};
use crate::orchestrator::tab_host::host_tab;
use crate::services::{injector, Notifier, TracingNotifier};
use crate::workflow::AgentDeps;

/// 日期来源（`YYYY-MM-DD`）
pub type Clock = Arc<dyn Fn() -> String + Send + Sync>;

struct TabEntry {
    tab: Arc<Tab>,
    /// 当前页面代理的命令通道；代理尚未挂载或已销毁时为 `None`
    commands: Option<mpsc::UnboundedSender<PageCommand>>,
}

/// 协调器的发送端
#[derive(Clone, Debug)]
pub struct CoordinatorHandle {
    events: mpsc::UnboundedSender<CoordinatorEvent>,
}

impl CoordinatorHandle {
    /// START_SOLVING
    pub async fn start(&self) -> Result<Status> {
        let (reply, status) = oneshot::channel();
        self.request(CoordinatorRequest::StartSolving { reply: Some(reply) })?;
        status.await.context("协调器未回复 START_SOLVING")
    }

    /// STOP_SOLVING
    pub async fn stop(&self) -> Result<Status> {
        let (reply, status) = oneshot::channel();
        self.request(CoordinatorRequest::StopSolving { reply: Some(reply) })?;
        status.await.context("协调器未回复 STOP_SOLVING")
    }

    /// 触发一次自动运行检查
    pub fn auto_run_tick(&self) -> bool {
        self.events.send(CoordinatorEvent::AutoRunTick).is_ok()
    }

    pub fn shutdown(&self) -> bool {
        self.events.send(CoordinatorEvent::Shutdown).is_ok()
    }

    fn request(&self, request: CoordinatorRequest) -> Result<()> {
        self.events
            .send(CoordinatorEvent::Request { tab: None, request })
            .map_err(|_| anyhow!("协调器已退出"))
    }
}

pub struct Coordinator {
    config: Arc<Config>,
    store: SessionStore,
    opener: Arc<dyn TabOpener>,
    notifier: Arc<dyn Notifier>,
    agent_deps: AgentDeps,
    clock: Clock,
    events_tx: mpsc::UnboundedSender<CoordinatorEvent>,
    events_rx: mpsc::UnboundedReceiver<CoordinatorEvent>,
    tabs: BTreeMap<TabId, TabEntry>,
    next_tab: u64,
}

impl Coordinator {
    pub fn new(
        config: Arc<Config>,
        store: SessionStore,
        opener: Arc<dyn TabOpener>,
        agent_deps: AgentDeps,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            config,
            store,
            opener,
            notifier: Arc::new(TracingNotifier),
            agent_deps,
            clock: Arc::new(quota::local_today),
            events_tx,
            events_rx,
            tabs: BTreeMap::new(),
            next_tab: 1,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn handle(&self) -> CoordinatorHandle {
        CoordinatorHandle {
            events: self.events_tx.clone(),
        }
    }

    /// 在后台运行
    pub fn spawn(self) -> (CoordinatorHandle, JoinHandle<()>) {
        let handle = self.handle();
        (handle, tokio::spawn(self.run()))
    }

    pub async fn run(mut self) {
        info!("🧭 协调器启动");
        while let Some(event) = self.events_rx.recv().await {
            if matches!(event, CoordinatorEvent::Shutdown) {
                break;
            }
            if let Err(e) = self.handle_event(event).await {
                error!("❌ 协调器处理事件失败: {:#}", e);
            }
        }
        info!("🧭 协调器退出");
    }

    async fn handle_event(&mut self, event: CoordinatorEvent) -> Result<()> {
        match event {
            CoordinatorEvent::Request { tab, request } => {
                debug!("收到请求 {} (tab {:?})", request.action(), tab);
                self.handle_request(tab, request).await
            }
            CoordinatorEvent::AgentAttached { tab, commands } => {
                match self.tabs.get_mut(&tab) {
                    Some(entry) => entry.commands = Some(commands),
                    None => debug!("[tab {}] 未登记的标签页挂载了代理", tab),
                }
                Ok(())
            }
            CoordinatorEvent::TabClosed { tab } => {
                self.tabs.remove(&tab);
                Ok(())
            }
            CoordinatorEvent::RetryFindNext { tab } => self.on_retry(tab).await,
            CoordinatorEvent::AutoRunTick => self.on_auto_run().await,
            CoordinatorEvent::Shutdown => Ok(()),
        }
    }

    async fn handle_request(&mut self, tab: Option<TabId>, request: CoordinatorRequest) -> Result<()> {
        match request {
            CoordinatorRequest::StartSolving { reply } => self.on_start(reply).await,
            CoordinatorRequest::StopSolving { reply } => self.on_stop(reply).await,
            CoordinatorRequest::LogUpdate(entry) => {
                self.store.append_log(entry).await?;
                Ok(())
            }
            CoordinatorRequest::ProblemSolved => self.on_solved(tab).await,
            CoordinatorRequest::InjectSolution { code, reply } => {
                self.on_inject(tab, code, reply);
                Ok(())
            }
            CoordinatorRequest::SolveFailed { reason } => self.on_failed(tab, reason).await,
        }
    }

    // ========== 状态机 ==========

    async fn on_start(&mut self, reply: Option<oneshot::Sender<Status>>) -> Result<()> {
        let today = (self.clock)();
        let session = self
            .store
            .update_session(|s| {
                quota::start(s, &today);
                s.clone()
            })
            .await?;
        if let Some(reply) = reply {
            let _ = reply.send(Status::Started);
        }

        self.notifier.set_badge(&session.progress());
        self.log("Auto solve started", LogLevel::Info).await;
        self.open_listing().await
    }

    async fn on_stop(&mut self, reply: Option<oneshot::Sender<Status>>) -> Result<()> {
        self.store.update_session(quota::stop).await?;
        if let Some(reply) = reply {
            let _ = reply.send(Status::Stopped);
        }

        for (id, entry) in &self.tabs {
            if let Some(commands) = &entry.commands {
                if commands.send(PageCommand::StopAction).is_err() {
                    debug!("[tab {}] 代理已销毁，跳过停止指令", id);
                }
            }
        }
        self.log("Stop requested by user.", LogLevel::Warning).await;
        Ok(())
    }

    async fn on_solved(&mut self, tab: Option<TabId>) -> Result<()> {
        let today = (self.clock)();
        let (was_active, decision) = self
            .store
            .update_session(|s| {
                let was_active = s.is_solving;
                (was_active, quota::record_solved(s, &today))
            })
            .await?;
        self.notifier.set_badge(&decision.badge());

        match decision {
            SolvedDecision::QuotaMet { solved, .. } => {
                self.log("Daily Quota Completed! Stopping...", LogLevel::Success)
                    .await;
                self.notifier.notify(
                    "Auto Solve Complete",
                    &format!("Successfully solved {} LeetCode problems today.", solved),
                );
            }
            SolvedDecision::Continue { solved, limit } if was_active => {
                info!("✅ 已完成 {}/{}，继续下一题", solved, limit);
                self.find_next_on(tab);
            }
            SolvedDecision::Continue { solved, limit } => {
                info!("✅ 已完成 {}/{}，循环已停止，不再导航", solved, limit);
            }
        }
        Ok(())
    }

    async fn on_failed(&mut self, tab: Option<TabId>, reason: FailureReason) -> Result<()> {
        self.store.update_session(quota::record_failed).await?;
        let delay = self.config.retry_delay();
        self.log(
            format!("Failed: {}. Retry in {}s...", reason, delay.as_secs()),
            LogLevel::Error,
        )
        .await;

        let Some(tab) = tab else {
            return Ok(());
        };
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(CoordinatorEvent::RetryFindNext { tab });
        });
        Ok(())
    }

    async fn on_retry(&mut self, tab: TabId) -> Result<()> {
        let session = self.store.snapshot().await?.session;
        if !session.is_solving {
            debug!("[tab {}] 循环已停止，丢弃重试", tab);
            return Ok(());
        }
        self.find_next_on(Some(tab));
        Ok(())
    }

    async fn on_auto_run(&mut self) -> Result<()> {
        let today = (self.clock)();
        let (was_active, decision, session) = self
            .store
            .update_session(|s| {
                let was_active = s.is_solving;
                let decision = quota::evaluate_auto_run(s, &today);
                (was_active, decision, s.clone())
            })
            .await?;

        match decision {
            AutoRunDecision::Disabled => {
                debug!("Auto-Run is disabled.");
                return Ok(());
            }
            AutoRunDecision::QuotaMet => {
                info!("😴 今日配额已完成 ({})，等待下一次检查", session.progress());
                return Ok(());
            }
            AutoRunDecision::NewDay => {
                self.log("New Day Detected! Resetting count.", LogLevel::Info)
                    .await;
            }
            AutoRunDecision::QuotaUnmet => {
                self.log(
                    format!("Quota Unmet ({}). Auto-starting...", session.progress()),
                    LogLevel::Info,
                )
                .await;
            }
        }
        self.notifier.set_badge(&session.progress());

        if was_active && !self.tabs.is_empty() {
            debug!("循环已在运行，不再打开新标签页");
            return Ok(());
        }
        self.open_listing().await
    }

    // ========== 页面操作 ==========

    /// 让页面代理寻找下一题；代理已销毁时直接导航到题库列表
    fn find_next_on(&mut self, tab: Option<TabId>) {
        let Some(id) = tab else {
            warn!("⚠️ 请求没有来源标签页，无法继续");
            return;
        };
        let listing = self.config.problemset_url();
        let Some(entry) = self.tabs.get_mut(&id) else {
            warn!("[tab {}] ⚠️ 标签页已关闭，无法继续", id);
            return;
        };

        let delivered = entry
            .commands
            .as_ref()
            .is_some_and(|commands| commands.send(PageCommand::FindDaily).is_ok());
        if delivered {
            return;
        }

        entry.commands = None;
        info!("[tab {}] 页面代理不可达，直接导航到题库列表", id);
        Self::navigate_in_background(entry.tab.clone(), listing);
    }

    /// 复用已有标签页，没有时新开一个，导航到题库列表
    async fn open_listing(&mut self) -> Result<()> {
        let url = self.config.problemset_url();
        if let Some(entry) = self.tabs.values().next() {
            Self::navigate_in_background(entry.tab.clone(), url);
            return Ok(());
        }

        let surface = self
            .opener
            .open(&url)
            .await
            .with_context(|| format!("打开标签页失败: {}", url))?;
        let id = TabId(self.next_tab);
        self.next_tab += 1;

        let tab = Tab::open(id, surface).await;
        self.tabs.insert(
            id,
            TabEntry {
                tab: tab.clone(),
                commands: None,
            },
        );
        info!("[tab {}] 🆕 打开标签页 {}", id, url);
        tokio::spawn(host_tab(tab, self.events_tx.clone(), self.agent_deps.clone()));
        Ok(())
    }

    fn navigate_in_background(tab: Arc<Tab>, url: String) {
        tokio::spawn(async move {
            if let Err(e) = tab.navigate(&url).await {
                warn!("[tab {}] ⚠️ 导航到 {} 失败: {}", tab.id(), url, e);
            }
        });
    }

    fn on_inject(&self, tab: Option<TabId>, code: String, reply: oneshot::Sender<InjectResponse>) {
        let Some(entry) = tab.and_then(|id| self.tabs.get(&id)) else {
            let _ = reply.send(InjectResponse::failed("No tab"));
            return;
        };

        let surface = entry.tab.surface().clone();
        tokio::spawn(async move {
            let response = match injector::inject(surface.as_ref(), &code).await {
                Ok(_) => InjectResponse::ok(),
                Err(e) => {
                    warn!("⚠️ 注入失败: {}", e);
                    InjectResponse::failed(e.to_string())
                }
            };
            let _ = reply.send(response);
        });
    }

    /// 写 tracing 并追加到持久化日志环
    async fn log(&self, message: impl Into<String>, level: LogLevel) {
        let message = message.into();
        match level {
            LogLevel::Info => info!("{}", message),
            LogLevel::Success => info!("✅ {}", message),
            LogLevel::Warning => warn!("⚠️ {}", message),
            LogLevel::Error => error!("❌ {}", message),
        }
        if let Err(e) = self.store.append_log(LogEntry::new(message, level)).await {
            warn!("⚠️ 写入日志环失败: {}", e);
        }
    }
}
