//! 倒计时服务 - 业务能力层
//!
//! 每秒递减一次剩余时间，降到 0（含）时自行停止并发出一次到期事件。

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant};
use tracing::debug;

const TICK: Duration = Duration::from_secs(1);

/// 倒计时事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Tick { remaining: i64 },
    Expired,
}

/// 倒计时句柄
///
/// 会话内至多一个；`stop()` 或析构之后不会再产生任何事件。
pub struct CountdownTimer {
    task: Option<JoinHandle<()>>,
    stopped: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
}

impl CountdownTimer {
    /// 从 `total_seconds` 开始倒计时
    pub fn start<F>(total_seconds: i64, on_event: F) -> Self
    where
        F: Fn(TimerEvent) + Send + Sync + 'static,
    {
        let stopped = Arc::new(AtomicBool::new(false));
        let ticks = Arc::new(AtomicU64::new(0));

        let task = {
            let stopped = Arc::clone(&stopped);
            let ticks = Arc::clone(&ticks);
            tokio::spawn(async move {
                let mut interval = interval_at(Instant::now() + TICK, TICK);
                let mut remaining = total_seconds;
                loop {
                    interval.tick().await;
                    if stopped.load(Ordering::SeqCst) {
                        break;
                    }
                    remaining -= 1;
                    ticks.fetch_add(1, Ordering::SeqCst);
                    on_event(TimerEvent::Tick { remaining });

                    if remaining <= 0 {
                        stopped.store(true, Ordering::SeqCst);
                        debug!("倒计时结束");
                        on_event(TimerEvent::Expired);
                        break;
                    }
                }
            })
        };

        Self {
            task: Some(task),
            stopped,
            ticks,
        }
    }

    /// 停止并取消尚未触发的下一次计时，可重复调用
    pub fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst)
    }

    /// 已经发生的计时次数
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
