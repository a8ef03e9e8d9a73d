//! 标签页宿主 - 编排层
//!
//! 一个标签页一个宿主任务：每次页面加载创建新的页面代理，把它的命令通道交给协调器，
//! 代理因导航退出后再为新页面创建下一个。

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::infrastructure::{Outbox, Tab};
use crate::models::CoordinatorEvent;
use crate::workflow::{AgentDeps, AgentExit, PageAgent};

pub async fn host_tab(
    tab: Arc<Tab>,
    events: mpsc::UnboundedSender<CoordinatorEvent>,
    deps: AgentDeps,
) {
    let id = tab.id();
    info!("[tab {}] 🗂️ 标签页宿主启动", id);

    loop {
        let mut loads = tab.subscribe_loads();
        let (commands, inbox) = mpsc::unbounded_channel();
        let attached = CoordinatorEvent::AgentAttached { tab: id, commands };
        if events.send(attached).is_err() {
            debug!("[tab {}] 协调器已退出", id);
            break;
        }

        let agent = PageAgent::new(tab.clone(), Outbox::new(id, events.clone()), deps.clone());
        match agent.run(inbox, &mut loads).await {
            AgentExit::Navigated => continue,
            AgentExit::Closed => break,
        }
    }

    let _ = events.send(CoordinatorEvent::TabClosed { tab: id });
    info!("[tab {}] 标签页宿主退出", id);
}
