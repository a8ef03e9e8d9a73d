//! 应用生命周期 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：打开存储、连接（或启动）浏览器、启动协调器
//! 2. **自动运行**：启动后稍等片刻检查一次，之后按固定周期检查
//! 3. **退出**：Ctrl-C 时发出停止指令，等待协调器退出
//!
//! ## 设计特点
//!
//! - **资源所有者**：唯一持有 Browser 的模块（经由 `ChromiumTabs`）
//! - **向下委托**：解题循环全部由协调器和页面代理完成

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::browser::{self, ChromiumTabs};
use crate::config::Config;
use crate::infrastructure::SessionStore;
use crate::orchestrator::coordinator::{Coordinator, CoordinatorHandle};
use crate::utils::logging;
use crate::workflow::AgentDeps;

/// 应用主结构
pub struct App {
    config: Arc<Config>,
    store: SessionStore,
    coordinator: CoordinatorHandle,
    coordinator_task: JoinHandle<()>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        let config = Arc::new(config);
        let store = SessionStore::open(&config.store_path);
        let session = store
            .snapshot()
            .await
            .context("读取会话状态失败")?
            .session;
        logging::log_startup(&config, &session);

        // 连接浏览器
        let browser = if config.launch_browser {
            browser::launch_browser(config.chrome_executable.as_deref(), config.headless).await?
        } else {
            browser::connect_to_browser(config.browser_debug_port).await?
        };
        let opener = Arc::new(ChromiumTabs::new(browser));

        let deps = AgentDeps::new(config.clone(), store.reader());
        let (coordinator, coordinator_task) =
            Coordinator::new(config.clone(), store.clone(), opener, deps).spawn();

        Ok(Self {
            config,
            store,
            coordinator,
            coordinator_task,
        })
    }

    /// 运行直到 Ctrl-C
    pub async fn run(self, start: bool) -> Result<()> {
        if start {
            let status = self.coordinator.start().await?;
            info!("▶️ 解题循环: {:?}", status);
        }

        let ticker = self.spawn_auto_run_ticker();

        tokio::signal::ctrl_c()
            .await
            .context("监听 Ctrl-C 失败")?;
        info!("\n🛑 收到 Ctrl-C，正在停止...");

        if let Err(e) = self.coordinator.stop().await {
            warn!("⚠️ 停止指令未送达: {}", e);
        }
        ticker.abort();
        self.coordinator.shutdown();
        if let Err(e) = self.coordinator_task.await {
            warn!("⚠️ 协调器任务异常结束: {}", e);
        }

        let session = self.store.snapshot().await?.session;
        logging::log_shutdown(&session, &self.config.output_log_file);
        Ok(())
    }

    fn spawn_auto_run_ticker(&self) -> JoinHandle<()> {
        let coordinator = self.coordinator.clone();
        let startup_delay = self.config.auto_run_startup_delay();
        let period = self.config.auto_run_interval();

        tokio::spawn(async move {
            tokio::time::sleep(startup_delay).await;
            let mut interval = tokio::time::interval(period);
            loop {
                // 第一次 tick 立即返回
                interval.tick().await;
                if !coordinator.auto_run_tick() {
                    break;
                }
            }
        })
    }
}
