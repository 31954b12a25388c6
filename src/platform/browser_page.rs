//! 真实考试页面上的平台实现
//!
//! 页面内注入一段监听脚本：信号先写入 `window.__proctor.queue`，
//! 再由后台任务按固定间隔取出并派发给订阅者。
//!
//! 剪贴板和右键菜单的默认行为必须在页面事件回调内同步取消，
//! 等不到一次轮询往返，所以页面脚本根据 `block` 表自行调用 `preventDefault()`；
//! `block` 表在每次轮询时与当前订阅同步。

use crate::error::{BrowserError, CameraError};
use crate::infrastructure::JsExecutor;
use crate::platform::{
    CameraDevice, CaptureStream, EventSource, SignalHandler, SignalKind, SignalRegistry,
    SubscriptionId,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const INSTALL_SCRIPT: &str = r#"
(() => {
    if (window.__proctor) {
        window.__proctor.queue = [];
        return true;
    }
    const p = { queue: [], block: {} };
    window.__proctor = p;
    document.addEventListener('visibilitychange', () => {
        if (document.hidden) p.queue.push('visibility_hidden');
    });
    window.addEventListener('blur', () => p.queue.push('window_blur'));
    for (const name of ['contextmenu', 'copy', 'paste', 'cut']) {
        document.addEventListener(name, (e) => {
            if (p.block[name]) e.preventDefault();
            p.queue.push(name);
        }, true);
    }
    return true;
})()
"#;

const OPEN_CAMERA_SCRIPT: &str = r#"
(async () => {
    window.__proctorCameraAbandoned = false;
    try {
        const stream = await navigator.mediaDevices.getUserMedia({ video: true, audio: false });
        if (window.__proctorCameraAbandoned) {
            stream.getTracks().forEach(t => t.stop());
            return { ok: false, name: 'AbortError', message: 'camera request abandoned' };
        }
        window.__proctorStream = stream;
        for (const track of stream.getTracks()) {
            track.addEventListener('ended', () => {
                if (window.__proctor) window.__proctor.queue.push('camera_track_ended');
            });
        }
        const video = document.getElementById('webcam');
        if (video) video.srcObject = stream;
        return { ok: true, tracks: stream.getTracks().length };
    } catch (err) {
        return { ok: false, name: String(err && err.name), message: String(err && err.message) };
    }
})()
"#;

// 协议层请求失败后，授权弹窗可能仍在等待；之后才拿到的流由页面自己停止
const ABANDON_CAMERA_SCRIPT: &str = r#"
(() => {
    window.__proctorCameraAbandoned = true;
    const stream = window.__proctorStream;
    if (stream) stream.getTracks().forEach(t => t.stop());
    window.__proctorStream = null;
    return true;
})()
"#;

const STOP_CAMERA_SCRIPT: &str = r#"
(() => {
    const stream = window.__proctorStream;
    if (!stream) return 0;
    const tracks = stream.getTracks();
    tracks.forEach(t => t.stop());
    window.__proctorStream = null;
    const video = document.getElementById('webcam');
    if (video) video.srcObject = null;
    return tracks.length;
})()
"#;

/// 基于浏览器页面的信号源
pub struct BrowserPlatform {
    registry: Arc<SignalRegistry>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl BrowserPlatform {
    /// 注入监听脚本并开始轮询
    pub async fn install(
        executor: Arc<JsExecutor>,
        poll_interval: Duration,
    ) -> Result<Self, BrowserError> {
        executor.eval(INSTALL_SCRIPT).await?;
        info!("✓ 页面监听脚本已注入");

        let registry = Arc::new(SignalRegistry::new());
        let poller = tokio::spawn(poll_loop(
            Arc::clone(&executor),
            Arc::clone(&registry),
            poll_interval,
        ));

        Ok(Self {
            registry,
            poller: Mutex::new(Some(poller)),
        })
    }

    /// 停止轮询
    pub fn shutdown(&self) {
        let mut poller = self.poller.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(task) = poller.take() {
            task.abort();
            debug!("页面信号轮询已停止");
        }
    }
}

impl EventSource for BrowserPlatform {
    fn subscribe(&self, kind: SignalKind, handler: SignalHandler) -> SubscriptionId {
        self.registry.subscribe(kind, handler)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.registry.unsubscribe(id)
    }
}

impl Drop for BrowserPlatform {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn poll_loop(executor: Arc<JsExecutor>, registry: Arc<SignalRegistry>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        if let Err(e) = poll_once(&executor, &registry).await {
            warn!("页面信号轮询失败: {}", e);
        }
    }
}

/// 同步取消表并取出积压的信号
async fn poll_once(executor: &JsExecutor, registry: &SignalRegistry) -> Result<(), BrowserError> {
    let block: HashMap<&str, bool> = SignalKind::ALL
        .into_iter()
        .filter(|k| k.is_cancelable())
        .map(|k| (k.as_str(), registry.has_subscribers(k)))
        .collect();
    let block_json =
        serde_json::to_string(&block).map_err(|e| BrowserError::ScriptFailed(e.to_string()))?;

    let script = format!(
        r#"
        (() => {{
            const p = window.__proctor;
            if (!p) return [];
            p.block = {};
            const drained = p.queue;
            p.queue = [];
            return drained;
        }})()
        "#,
        block_json
    );

    let drained: Vec<String> = executor.eval_as(script).await?;
    for name in drained {
        match SignalKind::from_name(&name) {
            Some(kind) => {
                let disposition = registry.dispatch(kind);
                debug!("页面信号: {} -> {:?}", name, disposition);
            }
            None => debug!("忽略未知页面信号: {}", name),
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct CameraProbe {
    ok: bool,
    #[serde(default)]
    tracks: usize,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// 页面内的摄像头（getUserMedia）
pub struct BrowserCamera {
    executor: Arc<JsExecutor>,
}

impl BrowserCamera {
    pub fn new(executor: Arc<JsExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl CameraDevice for BrowserCamera {
    async fn open_video_stream(&self) -> Result<Box<dyn CaptureStream>, CameraError> {
        let probe: CameraProbe = match self.executor.eval_as(OPEN_CAMERA_SCRIPT).await {
            Ok(probe) => probe,
            Err(e) => {
                if let Err(abandon) = self.executor.eval(ABANDON_CAMERA_SCRIPT).await {
                    warn!("无法通知页面放弃摄像头请求: {}", abandon);
                }
                return Err(CameraError::Unavailable(e.to_string()));
            }
        };

        if !probe.ok {
            let name = probe.name.unwrap_or_default();
            let detail = format!("{}: {}", name, probe.message.unwrap_or_default());
            return Err(if name == "NotAllowedError" || name == "SecurityError" {
                CameraError::Denied(detail)
            } else {
                CameraError::Unavailable(detail)
            });
        }

        Ok(Box::new(BrowserStream {
            executor: Arc::clone(&self.executor),
            tracks: probe.tracks,
        }))
    }
}

struct BrowserStream {
    executor: Arc<JsExecutor>,
    tracks: usize,
}

impl CaptureStream for BrowserStream {
    fn live_tracks(&self) -> usize {
        self.tracks
    }

    fn stop_all_tracks(&mut self) {
        if self.tracks == 0 {
            return;
        }
        self.tracks = 0;
        // 本地状态立即清零，页面内的停止脚本异步执行
        let executor = Arc::clone(&self.executor);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    match executor.eval(STOP_CAMERA_SCRIPT).await {
                        Ok(stopped) => debug!("已停止 {} 条采集轨道", stopped),
                        Err(e) => warn!("停止摄像头失败: {}", e),
                    }
                });
            }
            Err(_) => warn!("运行时已关闭，无法停止页面摄像头"),
        }
    }
}

impl Drop for BrowserStream {
    fn drop(&mut self) {
        self.stop_all_tracks();
    }
}
