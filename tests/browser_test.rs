//! 需要真实浏览器的测试
//!
//! 先以 `--remote-debugging-port=9222` 启动 Chrome 并打开考试页面，然后运行：
//! `cargo test -- --ignored`

use exam_proctor::browser::connect_to_exam_page;
use exam_proctor::config::Config;
use exam_proctor::infrastructure::JsExecutor;
use exam_proctor::platform::browser_page::{BrowserCamera, BrowserPlatform};
use exam_proctor::platform::{CameraDevice, CaptureStream, EventSource, SignalKind};
use exam_proctor::utils::logging;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_browser_connection() {
    logging::init("debug");
    let config = Config::from_env();

    let result = connect_to_exam_page(config.browser_debug_port, &config.target_url).await;

    assert!(result.is_ok(), "应该能够成功连接浏览器");
}

#[tokio::test]
#[ignore]
async fn test_page_signals_reach_subscribers() {
    logging::init("debug");
    let config = Config::from_env();

    let (_browser, page) = connect_to_exam_page(config.browser_debug_port, &config.target_url)
        .await
        .expect("连接浏览器失败");
    let executor = Arc::new(JsExecutor::new(page));
    let platform = BrowserPlatform::install(Arc::clone(&executor), config.poll_interval())
        .await
        .expect("注入监听脚本失败");

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    platform.subscribe(
        SignalKind::WindowBlur,
        Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            exam_proctor::platform::Disposition::Allow
        }),
    );

    executor
        .eval("window.dispatchEvent(new Event('blur'))")
        .await
        .expect("触发 blur 失败");
    tokio::time::sleep(config.poll_interval() * 4).await;

    assert!(seen.load(Ordering::SeqCst) >= 1, "blur 信号应该被轮询到");
    platform.shutdown();
}

#[tokio::test]
#[ignore]
async fn test_camera_stream_can_be_released() {
    logging::init("debug");
    let config = Config::from_env();

    let (_browser, page) = connect_to_exam_page(config.browser_debug_port, &config.target_url)
        .await
        .expect("连接浏览器失败");
    let camera = BrowserCamera::new(Arc::new(JsExecutor::new(page)));

    match camera.open_video_stream().await {
        Ok(mut stream) => {
            assert!(stream.live_tracks() > 0);
            stream.stop_all_tracks();
            assert_eq!(stream.live_tracks(), 0);
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        Err(e) => println!("摄像头不可用: {}", e),
    }
}
