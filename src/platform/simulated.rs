//! 模拟平台
//!
//! 信号由调用方手动触发，摄像头可以配置为拒绝授权，便于确定性地重放考试场景。

use crate::error::CameraError;
use crate::platform::{
    CameraDevice, CaptureStream, Disposition, EventSource, SignalHandler, SignalKind,
    SignalRegistry, SubscriptionId,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// 模拟页面信号源
#[derive(Default)]
pub struct SimulatedPlatform {
    registry: SignalRegistry,
}

impl SimulatedPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// 触发一次平台信号，返回默认行为是否被取消
    pub fn emit(&self, kind: SignalKind) -> Disposition {
        self.registry.dispatch(kind)
    }

    pub fn subscription_count(&self) -> usize {
        self.registry.subscription_count()
    }
}

impl EventSource for SimulatedPlatform {
    fn subscribe(&self, kind: SignalKind, handler: SignalHandler) -> SubscriptionId {
        self.registry.subscribe(kind, handler)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.registry.unsubscribe(id)
    }
}

/// 模拟摄像头
pub struct SimulatedCamera {
    denial: Option<CameraError>,
    delay: Duration,
    live_tracks: Arc<AtomicUsize>,
    opened: AtomicUsize,
}

impl SimulatedCamera {
    /// 授权成功的摄像头
    pub fn granted() -> Self {
        Self {
            denial: None,
            delay: Duration::ZERO,
            live_tracks: Arc::new(AtomicUsize::new(0)),
            opened: AtomicUsize::new(0),
        }
    }

    /// 拒绝授权的摄像头
    pub fn denied() -> Self {
        Self {
            denial: Some(CameraError::Denied("NotAllowedError".to_string())),
            ..Self::granted()
        }
    }

    /// 考生迟迟不处理授权弹窗，结果在 `delay` 之后才返回
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// 所有已打开流中仍在采集的轨道总数
    pub fn live_tracks(&self) -> usize {
        self.live_tracks.load(Ordering::SeqCst)
    }

    /// 成功打开的次数
    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CameraDevice for SimulatedCamera {
    async fn open_video_stream(&self) -> Result<Box<dyn CaptureStream>, CameraError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(err) = &self.denial {
            return Err(err.clone());
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.live_tracks.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SimulatedStream {
            tracks: 1,
            live_tracks: Arc::clone(&self.live_tracks),
        }))
    }
}

struct SimulatedStream {
    tracks: usize,
    live_tracks: Arc<AtomicUsize>,
}

impl CaptureStream for SimulatedStream {
    fn live_tracks(&self) -> usize {
        self.tracks
    }

    fn stop_all_tracks(&mut self) {
        if self.tracks > 0 {
            self.live_tracks.fetch_sub(self.tracks, Ordering::SeqCst);
            self.tracks = 0;
        }
    }
}

impl Drop for SimulatedStream {
    fn drop(&mut self) {
        self.stop_all_tracks();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stopping_a_stream_updates_device_counter() {
        let camera = SimulatedCamera::granted();
        let mut stream = camera.open_video_stream().await.unwrap();
        assert_eq!(camera.live_tracks(), 1);
        stream.stop_all_tracks();
        stream.stop_all_tracks();
        assert_eq!(camera.live_tracks(), 0);
        assert_eq!(stream.live_tracks(), 0);
    }

    #[tokio::test]
    async fn denied_camera_never_opens() {
        let camera = SimulatedCamera::denied();
        assert!(matches!(
            camera.open_video_stream().await,
            Err(CameraError::Denied(_))
        ));
        assert_eq!(camera.open_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_camera_answers_after_the_delay() {
        let camera = SimulatedCamera::granted().with_delay(Duration::from_secs(90));
        let started = tokio::time::Instant::now();
        let _stream = camera.open_video_stream().await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(90));
        assert_eq!(camera.live_tracks(), 1);
    }
}
