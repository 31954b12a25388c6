//! 摄像头会话 - 业务能力层
//!
//! 持有唯一的采集流。获取失败只返回错误，是否算违规由上层决定。

use crate::error::CameraError;
use crate::platform::{CameraDevice, CaptureStream};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct CameraSession {
    device: Arc<dyn CameraDevice>,
    stream: Option<Box<dyn CaptureStream>>,
}

impl CameraSession {
    pub fn new(device: Arc<dyn CameraDevice>) -> Self {
        Self {
            device,
            stream: None,
        }
    }

    /// 获取采集流；已经持有时直接返回
    pub async fn acquire(&mut self) -> Result<(), CameraError> {
        if self.is_active() {
            debug!("摄像头已在采集，跳过重复获取");
            return Ok(());
        }
        match self.device.open_video_stream().await {
            Ok(stream) => {
                self.adopt(stream);
                Ok(())
            }
            Err(e) => {
                warn!("摄像头获取失败: {}", e);
                Err(e)
            }
        }
    }

    /// 打开采集流所用的设备（在会话之外发起获取时使用）
    pub fn device(&self) -> Arc<dyn CameraDevice> {
        Arc::clone(&self.device)
    }

    /// 接管在别处打开的采集流；已经持有时直接停止新流
    pub fn adopt(&mut self, mut stream: Box<dyn CaptureStream>) {
        if self.is_active() {
            debug!("摄像头已在采集，停止多余的采集流");
            stream.stop_all_tracks();
            return;
        }
        info!("📷 摄像头已开启 ({} 条轨道)", stream.live_tracks());
        self.stream = Some(stream);
    }

    /// 停止所有轨道并丢弃句柄，可重复调用
    pub fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop_all_tracks();
            info!("📷 摄像头已关闭");
        }
    }

    pub fn is_active(&self) -> bool {
        self.stream
            .as_ref()
            .map(|s| s.live_tracks() > 0)
            .unwrap_or(false)
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.release();
    }
}
