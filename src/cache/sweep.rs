use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// 可被后台任务定期清扫的存储
pub trait Sweep: Send + Sync + 'static {
    /// 日志中使用的名称
    fn name(&self) -> &'static str;

    /// 删除过期条目，返回删除数量
    fn sweep(&self) -> usize;
}

/// 后台清扫任务句柄，停机时调用 `shutdown`；句柄被丢弃时任务同样会被取消
pub struct SweepHandle {
    name: &'static str,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SweepHandle {
    /// 取消清扫任务并等待其退出
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(store = self.name, error = %e, "Sweeper task ended abnormally");
            }
        }
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// 启动定期清扫任务，清扫间隔与 TTL / 窗口长度无关
pub fn spawn_sweeper<S: Sweep>(store: Arc<S>, every: Duration) -> SweepHandle {
    let name = store.name();
    let token = CancellationToken::new();
    let cancelled = token.clone();

    let task = tokio::spawn(async move {
        info!(store = name, interval_secs = every.as_secs(), "Sweeper started");

        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // 第一次 tick 立即触发，跳过
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let removed = store.sweep();
                    if removed > 0 {
                        debug!(store = name, removed, "Swept expired entries");
                    }
                }
                _ = cancelled.cancelled() => {
                    info!(store = name, "Sweeper shutting down");
                    break;
                }
            }
        }
    });

    SweepHandle {
        name,
        token,
        task: Some(task),
    }
}
