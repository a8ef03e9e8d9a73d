//! 持久化键值存储 - 基础设施层
//!
//! 一个 JSON 文档，键名与浏览器扩展的 storage 保持一致。
//!
//! 写入纪律（按字段单一写者）：
//! - 会话字段 `is_solving` / `solved_count` / `last_solved_date` 和 `logs`：只有协调器写
//! - 凭据、`daily_limit`、`auto_run`：只有设置入口写
//! - 页面代理只拿到只读的 [`StoreReader`]
//!
//! 每次写入都是一次事务：持锁 → 重新读盘 → 修改 → `version + 1` → 临时文件 + rename。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::StoreError;
use crate::models::{Credentials, LogEntry, LogRing, SessionState};

/// 存储文档
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreDocument {
    #[serde(flatten)]
    pub session: SessionState,
    #[serde(flatten)]
    pub credentials: Credentials,
    pub logs: LogRing,
    /// 每次事务提交 +1
    pub version: u64,
}

/// 设置入口的修改集合，`None` 表示不修改
#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    pub username: Option<String>,
    pub password: Option<String>,
    pub daily_limit: Option<u32>,
    pub auto_run: Option<bool>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.password.is_none()
            && self.daily_limit.is_none()
            && self.auto_run.is_none()
    }
}

/// 会话存储（可读写）
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl SessionStore {
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                path: path.as_ref().to_path_buf(),
                write_lock: Mutex::new(()),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// 只读视图（交给页面代理）
    pub fn reader(&self) -> StoreReader {
        StoreReader {
            store: self.clone(),
        }
    }

    /// 读取当前文档，文件不存在时返回默认值
    pub async fn snapshot(&self) -> Result<StoreDocument, StoreError> {
        let path = &self.inner.path;
        match fs::read(path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(StoreDocument::default()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
                path: path.display().to_string(),
                source,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoreDocument::default()),
            Err(source) => Err(StoreError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    /// 修改会话字段（协调器专用）
    pub async fn update_session<R>(
        &self,
        f: impl FnOnce(&mut SessionState) -> R,
    ) -> Result<R, StoreError> {
        self.transact(|doc| f(&mut doc.session)).await
    }

    /// 追加一条日志（协调器专用）
    pub async fn append_log(&self, entry: LogEntry) -> Result<(), StoreError> {
        self.transact(|doc| doc.logs.push(entry)).await
    }

    /// 应用设置修改（设置入口专用）
    pub async fn apply_settings(&self, patch: SettingsPatch) -> Result<StoreDocument, StoreError> {
        self.transact(|doc| {
            if let Some(username) = patch.username {
                doc.credentials.leetcode_username = username;
            }
            if let Some(password) = patch.password {
                doc.credentials.leetcode_password = password;
            }
            if let Some(limit) = patch.daily_limit {
                doc.session.daily_limit = limit.max(1);
            }
            if let Some(auto_run) = patch.auto_run {
                doc.session.auto_run = auto_run;
            }
            doc.clone()
        })
        .await
    }

    async fn transact<R>(&self, f: impl FnOnce(&mut StoreDocument) -> R) -> Result<R, StoreError> {
        let _guard = self.inner.write_lock.lock().await;
        let mut doc = self.snapshot().await?;
        let result = f(&mut doc);
        doc.version += 1;
        self.write(&doc).await?;
        debug!("存储已提交 version={}", doc.version);
        Ok(result)
    }

    async fn write(&self, doc: &StoreDocument) -> Result<(), StoreError> {
        let path = &self.inner.path;
        let io_err = |source| StoreError::Io {
            path: path.display().to_string(),
            source,
        };

        let bytes = serde_json::to_vec_pretty(doc).map_err(|source| StoreError::Corrupt {
            path: path.display().to_string(),
            source,
        })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, bytes).await.map_err(io_err)?;
        fs::rename(&tmp, path).await.map_err(io_err)?;
        Ok(())
    }
}

/// 只读存储视图
#[derive(Clone)]
pub struct StoreReader {
    store: SessionStore,
}

impl StoreReader {
    pub async fn snapshot(&self) -> Result<StoreDocument, StoreError> {
        self.store.snapshot().await
    }

    pub async fn session(&self) -> Result<SessionState, StoreError> {
        Ok(self.store.snapshot().await?.session)
    }

    pub async fn credentials(&self) -> Result<Credentials, StoreError> {
        Ok(self.store.snapshot().await?.credentials)
    }
}
