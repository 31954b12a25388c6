//! 完整性监控 - 业务能力层
//!
//! 把平台信号归类为违规并转交给上层。检测器本身不计数，
//! 也不决定是否自动交卷；计数只以后端账本为准。
//!
//! 剪贴板和右键菜单的处理完全在本地同步完成：取消默认行为、显示警告，
//! 不等待也不依赖任何网络往返。

use crate::models::ViolationKind;
use crate::platform::{Disposition, EventSource, SignalKind, SubscriptionId};
use crate::services::notifier::WarningBanner;
use std::sync::Arc;
use tracing::{debug, info};

pub const RIGHT_CLICK_WARNING: &str = "Right-click is disabled during the exam.";
pub const CLIPBOARD_WARNING: &str = "Copy/Paste is disabled during the exam.";

/// 单个信号的检测结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// 需要上报给账本的违规
    Violation(ViolationKind),
    /// 本地拦截并提示
    Suppress(&'static str),
}

/// 信号归类
pub fn classify(kind: SignalKind) -> Detection {
    match kind {
        SignalKind::VisibilityHidden => Detection::Violation(ViolationKind::TabSwitch),
        SignalKind::WindowBlur => Detection::Violation(ViolationKind::WindowBlur),
        SignalKind::CameraTrackEnded => Detection::Violation(ViolationKind::WebcamDisconnected),
        SignalKind::ContextMenu => Detection::Suppress(RIGHT_CLICK_WARNING),
        SignalKind::Copy | SignalKind::Paste | SignalKind::Cut => {
            Detection::Suppress(CLIPBOARD_WARNING)
        }
    }
}

type ViolationCallback = Arc<dyn Fn(ViolationKind) + Send + Sync>;

/// 完整性监控
pub struct IntegrityMonitor {
    source: Arc<dyn EventSource>,
    subscriptions: Vec<SubscriptionId>,
    on_violation: ViolationCallback,
}

impl IntegrityMonitor {
    /// 为所有信号注册检测器
    pub fn attach<F>(source: Arc<dyn EventSource>, banner: Arc<WarningBanner>, on_violation: F) -> Self
    where
        F: Fn(ViolationKind) + Send + Sync + 'static,
    {
        let on_violation: ViolationCallback = Arc::new(on_violation);
        let subscriptions = SignalKind::ALL
            .into_iter()
            .map(|kind| {
                let banner = Arc::clone(&banner);
                let forward = Arc::clone(&on_violation);
                source.subscribe(
                    kind,
                    Arc::new(move |signal| match classify(signal) {
                        Detection::Violation(violation) => {
                            debug!("检测到违规: {}", violation);
                            forward(violation);
                            Disposition::Allow
                        }
                        Detection::Suppress(message) => {
                            banner.show(message);
                            Disposition::PreventDefault
                        }
                    }),
                )
            })
            .collect();

        info!("🛡️ 完整性监控已启动");
        Self {
            source,
            subscriptions,
            on_violation,
        }
    }

    /// 摄像头获取失败
    pub fn report_camera_denied(&self) {
        if self.is_attached() {
            (self.on_violation)(ViolationKind::WebcamDenied);
        }
    }

    /// 注销所有检测器，可重复调用
    pub fn detach(&mut self) {
        if self.subscriptions.is_empty() {
            return;
        }
        for id in self.subscriptions.drain(..) {
            self.source.unsubscribe(id);
        }
        info!("🛡️ 完整性监控已停止");
    }

    pub fn is_attached(&self) -> bool {
        !self.subscriptions.is_empty()
    }
}

impl Drop for IntegrityMonitor {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::simulated::SimulatedPlatform;
    use crate::services::notifier::RecordingSink;
    use std::sync::Mutex;
    use std::time::Duration;

    fn setup() -> (
        Arc<SimulatedPlatform>,
        Arc<RecordingSink>,
        Arc<Mutex<Vec<ViolationKind>>>,
        IntegrityMonitor,
    ) {
        let platform = Arc::new(SimulatedPlatform::new());
        let sink = Arc::new(RecordingSink::new());
        let banner = Arc::new(WarningBanner::new(sink.clone(), Duration::from_secs(5)));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = Arc::clone(&seen);
        let monitor = IntegrityMonitor::attach(platform.clone(), banner, move |kind| {
            record.lock().unwrap().push(kind)
        });
        (platform, sink, seen, monitor)
    }

    #[tokio::test]
    async fn visibility_and_focus_become_violations() {
        let (platform, sink, seen, _monitor) = setup();
        assert_eq!(platform.emit(SignalKind::VisibilityHidden), Disposition::Allow);
        assert_eq!(platform.emit(SignalKind::WindowBlur), Disposition::Allow);
        assert_eq!(platform.emit(SignalKind::CameraTrackEnded), Disposition::Allow);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ViolationKind::TabSwitch,
                ViolationKind::WindowBlur,
                ViolationKind::WebcamDisconnected
            ]
        );
        assert!(sink.warnings().is_empty());
    }

    #[tokio::test]
    async fn clipboard_and_context_menu_are_cancelled_locally() {
        let (platform, sink, seen, _monitor) = setup();
        for kind in [SignalKind::Copy, SignalKind::Paste, SignalKind::Cut] {
            assert_eq!(platform.emit(kind), Disposition::PreventDefault);
        }
        assert_eq!(platform.emit(SignalKind::ContextMenu), Disposition::PreventDefault);

        assert!(seen.lock().unwrap().is_empty());
        let warnings = sink.warnings();
        assert_eq!(warnings.len(), 4);
        assert_eq!(warnings[0], CLIPBOARD_WARNING);
        assert_eq!(warnings[3], RIGHT_CLICK_WARNING);
    }

    #[tokio::test]
    async fn detach_unregisters_everything() {
        let (platform, _sink, seen, mut monitor) = setup();
        assert_eq!(platform.subscription_count(), SignalKind::ALL.len());
        monitor.detach();
        monitor.detach();
        assert_eq!(platform.subscription_count(), 0);

        assert_eq!(platform.emit(SignalKind::Copy), Disposition::Allow);
        platform.emit(SignalKind::VisibilityHidden);
        monitor.report_camera_denied();
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn camera_denial_is_forwarded_while_attached() {
        let (_platform, _sink, seen, monitor) = setup();
        monitor.report_camera_denied();
        assert_eq!(*seen.lock().unwrap(), vec![ViolationKind::WebcamDenied]);
    }
}
