//! 提示服务 - 业务能力层
//!
//! 只负责"给考生看提示"能力：临时警告（自动消失）、阻断式提醒、跳转成绩页。
//! 具体怎么显示由 [`NoticeSink`] 的实现决定。

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// 提示
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// 临时警告
    Warning(String),
    /// 临时警告消失
    WarningDismissed,
    /// 阻断式提醒（需要考生确认）
    Alert(String),
    /// 跳转到成绩页
    NavigateToResult { exam_id: String },
}

/// 提示的展示端
pub trait NoticeSink: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// 输出到日志的展示端（终端模式使用）
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NoticeSink for TracingSink {
    fn notify(&self, notice: Notice) {
        match notice {
            Notice::Warning(msg) => warn!("⚠️ {}", msg),
            Notice::WarningDismissed => debug!("警告已消失"),
            Notice::Alert(msg) => error!("🚨 {}", msg),
            Notice::NavigateToResult { exam_id } => info!("➡️ 跳转到成绩页: {}", exam_id),
        }
    }
}

/// 记录所有提示的展示端
#[derive(Debug, Default)]
pub struct RecordingSink {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Notice>> {
        self.notices.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.lock().clone()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|n| match n {
                Notice::Alert(msg) => Some(msg.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|n| match n {
                Notice::Warning(msg) => Some(msg.clone()),
                _ => None,
            })
            .collect()
    }
}

impl NoticeSink for RecordingSink {
    fn notify(&self, notice: Notice) {
        self.lock().push(notice);
    }
}

/// 警告横幅
///
/// 同一时间只显示一条临时警告，新警告会重置消失计时。
pub struct WarningBanner {
    sink: Arc<dyn NoticeSink>,
    dismiss_after: Duration,
    pending_dismiss: Mutex<Option<JoinHandle<()>>>,
}

impl WarningBanner {
    pub fn new(sink: Arc<dyn NoticeSink>, dismiss_after: Duration) -> Self {
        Self {
            sink,
            dismiss_after,
            pending_dismiss: Mutex::new(None),
        }
    }

    fn pending(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending_dismiss.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 显示临时警告
    pub fn show(&self, message: impl Into<String>) {
        self.sink.notify(Notice::Warning(message.into()));

        let mut pending = self.pending();
        if let Some(previous) = pending.take() {
            previous.abort();
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("没有运行时，警告不会自动消失");
            return;
        };
        let sink = Arc::clone(&self.sink);
        let delay = self.dismiss_after;
        *pending = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            sink.notify(Notice::WarningDismissed);
        }));
    }

    /// 阻断式提醒
    pub fn alert(&self, message: impl Into<String>) {
        self.sink.notify(Notice::Alert(message.into()));
    }

    pub fn navigate_to_result(&self, exam_id: &str) {
        self.sink.notify(Notice::NavigateToResult {
            exam_id: exam_id.to_string(),
        });
    }

    /// 取消尚未触发的自动消失
    pub fn clear(&self) {
        if let Some(task) = self.pending().take() {
            task.abort();
        }
    }
}

impl Drop for WarningBanner {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn warning_dismisses_after_delay() {
        let sink = Arc::new(RecordingSink::new());
        let banner = WarningBanner::new(sink.clone(), Duration::from_secs(5));

        banner.show("Copy/Paste is disabled during the exam.");
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(sink.notices().len(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(sink.notices().last(), Some(&Notice::WarningDismissed));
    }

    #[tokio::test(start_paused = true)]
    async fn newer_warning_resets_dismiss_timer() {
        let sink = Arc::new(RecordingSink::new());
        let banner = WarningBanner::new(sink.clone(), Duration::from_secs(5));

        banner.show("first");
        tokio::time::sleep(Duration::from_secs(3)).await;
        banner.show("second");
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!sink.notices().contains(&Notice::WarningDismissed));

        tokio::time::sleep(Duration::from_secs(3)).await;
        let dismissed = sink
            .notices()
            .iter()
            .filter(|n| **n == Notice::WarningDismissed)
            .count();
        assert_eq!(dismissed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_cancels_pending_dismiss() {
        let sink = Arc::new(RecordingSink::new());
        let banner = WarningBanner::new(sink.clone(), Duration::from_secs(5));
        banner.show("gone soon");
        banner.clear();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(sink.warnings(), vec!["gone soon".to_string()]);
        assert!(!sink.notices().contains(&Notice::WarningDismissed));
    }
}
