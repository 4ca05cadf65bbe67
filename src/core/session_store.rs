//! 会话关闭状态存储
//!
//! 进程级 session_id -> 关闭状态：不在关闭集合中即视为 open，只允许 open -> closed，不过期、不删除。
//! 每个会话一把 tokio Mutex，一轮对话从「检查是否关闭」到「写入关闭」全程持有，
//! 保证同一会话上的读改写是原子的；不同会话之间只在索引锁上短暂竞争。
//! 锁表只保存正在使用的会话：最后一个守卫释放时移除条目，长期占用内存的只有关闭集合。

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// 会话状态
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionStatus {
    #[default]
    Open,
    Closed,
}

type LockTable = HashMap<String, Arc<AsyncMutex<()>>>;

fn lock_sync<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 会话关闭状态存储（可 Clone，内部共享）
#[derive(Clone, Default)]
pub struct SessionStateStore {
    closed: Arc<Mutex<HashSet<String>>>,
    locks: Arc<Mutex<LockTable>>,
}

impl SessionStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, session_id: &str) -> Arc<AsyncMutex<()>> {
        lock_sync(&self.locks)
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }

    /// 获取会话独占守卫；同一会话的后续调用会等待前一个守卫释放
    pub async fn lock(&self, session_id: &str) -> SessionGuard {
        let lock = self.slot(session_id).lock_owned().await;
        SessionGuard {
            session_id: session_id.to_string(),
            store: self.clone(),
            lock,
        }
    }

    pub async fn is_closed(&self, session_id: &str) -> bool {
        self.lock(session_id).await.is_closed()
    }

    /// 关闭会话；返回 true 表示本次调用完成了 open -> closed 迁移
    pub async fn close(&self, session_id: &str) -> bool {
        self.lock(session_id).await.close()
    }

    /// 已关闭的会话数
    pub fn closed_count(&self) -> usize {
        lock_sync(&self.closed).len()
    }

    /// 当前被持有或等待中的会话锁数量
    pub fn active_locks(&self) -> usize {
        lock_sync(&self.locks).len()
    }
}

/// 单个会话的独占访问守卫
pub struct SessionGuard {
    session_id: String,
    store: SessionStateStore,
    lock: OwnedMutexGuard<()>,
}

impl SessionGuard {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn status(&self) -> SessionStatus {
        if self.is_closed() {
            SessionStatus::Closed
        } else {
            SessionStatus::Open
        }
    }

    pub fn is_closed(&self) -> bool {
        lock_sync(&self.store.closed).contains(&self.session_id)
    }

    /// 幂等关闭：已关闭时不做任何事并返回 false
    pub fn close(&mut self) -> bool {
        if !lock_sync(&self.store.closed).insert(self.session_id.clone()) {
            return false;
        }
        tracing::warn!(session_id = %self.session_id, "Session closed");
        true
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        // 锁表与本守卫之外没有其他持有者（无人等待）时移除条目
        let mut locks = lock_sync(&self.store.locks);
        let idle = locks.get(&self.session_id).is_some_and(|slot| {
            Arc::ptr_eq(slot, OwnedMutexGuard::mutex(&self.lock)) && Arc::strong_count(slot) == 2
        });
        if idle {
            locks.remove(&self.session_id);
        }
    }
}
