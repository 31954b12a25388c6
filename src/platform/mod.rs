//! 宿主平台能力（Platform）
//!
//! 考试页面依赖的平台信号和设备，全部抽象为可注入的接口：
//!
//! - [`EventSource`] - 订阅页面信号（可见性、焦点、剪贴板、右键菜单），
//!   处理函数可以取消平台的默认行为
//! - [`CameraDevice`] / [`CaptureStream`] - 获取和释放视频采集流
//!
//! 实现：
//! - [`simulated`] - 确定性的模拟平台，测试和离线演示使用
//! - [`browser_page`] - 通过 DevTools 协议驱动真实考试页面

pub mod browser_page;
pub mod simulated;

use crate::error::CameraError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// 平台原始信号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    /// 页面变为不可见
    VisibilityHidden,
    /// 窗口失去焦点
    WindowBlur,
    ContextMenu,
    Copy,
    Paste,
    Cut,
    /// 采集轨道自行结束（设备被拔出或被其他程序占用）
    CameraTrackEnded,
}

impl SignalKind {
    pub const ALL: [SignalKind; 7] = [
        SignalKind::VisibilityHidden,
        SignalKind::WindowBlur,
        SignalKind::ContextMenu,
        SignalKind::Copy,
        SignalKind::Paste,
        SignalKind::Cut,
        SignalKind::CameraTrackEnded,
    ];

    /// 页面脚本中使用的名称
    pub fn as_str(self) -> &'static str {
        match self {
            SignalKind::VisibilityHidden => "visibility_hidden",
            SignalKind::WindowBlur => "window_blur",
            SignalKind::ContextMenu => "contextmenu",
            SignalKind::Copy => "copy",
            SignalKind::Paste => "paste",
            SignalKind::Cut => "cut",
            SignalKind::CameraTrackEnded => "camera_track_ended",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }

    /// 是否带有可取消的默认行为
    pub fn is_cancelable(self) -> bool {
        matches!(
            self,
            SignalKind::ContextMenu | SignalKind::Copy | SignalKind::Paste | SignalKind::Cut
        )
    }
}

/// 处理函数对默认行为的决定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Allow,
    PreventDefault,
}

/// 信号处理函数，同步执行
pub type SignalHandler = Arc<dyn Fn(SignalKind) -> Disposition + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// 页面信号源
pub trait EventSource: Send + Sync {
    fn subscribe(&self, kind: SignalKind, handler: SignalHandler) -> SubscriptionId;

    /// 取消订阅，重复取消无副作用
    fn unsubscribe(&self, id: SubscriptionId);
}

/// 视频采集设备
#[async_trait]
pub trait CameraDevice: Send + Sync {
    /// 请求仅视频的采集流
    async fn open_video_stream(&self) -> Result<Box<dyn CaptureStream>, CameraError>;
}

/// 已获取的采集流
pub trait CaptureStream: Send + Sync {
    /// 仍在采集的轨道数
    fn live_tracks(&self) -> usize;

    /// 停止所有轨道
    fn stop_all_tracks(&mut self);
}

/// 订阅表，各平台实现共用
#[derive(Default)]
pub struct SignalRegistry {
    next_id: AtomicU64,
    handlers: Mutex<Vec<(SubscriptionId, SignalKind, SignalHandler)>>,
}

impl SignalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(SubscriptionId, SignalKind, SignalHandler)>> {
        self.handlers.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn subscribe(&self, kind: SignalKind, handler: SignalHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, kind, handler));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.lock().retain(|(sub, _, _)| *sub != id);
    }

    /// 派发信号；任一处理函数要求取消即取消
    pub fn dispatch(&self, kind: SignalKind) -> Disposition {
        // 先复制处理函数再调用，处理函数内可以再订阅/取消订阅
        let handlers: Vec<SignalHandler> = self
            .lock()
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(_, _, h)| Arc::clone(h))
            .collect();

        let mut disposition = Disposition::Allow;
        for handler in handlers {
            if handler(kind) == Disposition::PreventDefault {
                disposition = Disposition::PreventDefault;
            }
        }
        disposition
    }

    pub fn subscription_count(&self) -> usize {
        self.lock().len()
    }

    pub fn has_subscribers(&self, kind: SignalKind) -> bool {
        self.lock().iter().any(|(_, k, _)| *k == kind)
    }
}
