//! 消息总线 - 基础设施层
//!
//! 页面代理这一侧的发件箱：所有请求都带上所在标签页编号，投递到协调器信箱。

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::models::{CoordinatorEvent, CoordinatorRequest, InjectResponse, TabId};

/// 页面代理的发件箱
#[derive(Clone, Debug)]
pub struct Outbox {
    tab: TabId,
    events: mpsc::UnboundedSender<CoordinatorEvent>,
}

impl Outbox {
    pub fn new(tab: TabId, events: mpsc::UnboundedSender<CoordinatorEvent>) -> Self {
        Self { tab, events }
    }

    pub fn tab(&self) -> TabId {
        self.tab
    }

    /// 发送请求；协调器已退出时返回 false
    pub fn send(&self, request: CoordinatorRequest) -> bool {
        let action = request.action();
        let delivered = self
            .events
            .send(CoordinatorEvent::Request {
                tab: Some(self.tab),
                request,
            })
            .is_ok();
        if !delivered {
            debug!("[tab {}] {} 投递失败：协调器已退出", self.tab, action);
        }
        delivered
    }

    /// 请求注入并等待回复；回复通道断开时视为失败
    pub async fn inject(&self, code: String) -> InjectResponse {
        let (reply, response) = oneshot::channel();
        if !self.send(CoordinatorRequest::InjectSolution { code, reply }) {
            return InjectResponse::failed("Unknown error");
        }
        response
            .await
            .unwrap_or_else(|_| InjectResponse::failed("Unknown error"))
    }
}
