use crate::error::BrowserError;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info};

/// 连接到浏览器并找到考试页面
///
/// 优先复用 URL 以 `exam_url` 开头的已打开页面，找不到时新建页面并导航过去。
pub async fn connect_to_exam_page(port: u16, exam_url: &str) -> Result<(Browser, Page), BrowserError> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        BrowserError::ConnectionFailed {
            port,
            message: e.to_string(),
        }
    })?;
    debug!("浏览器连接成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 等待浏览器状态同步
    sleep(Duration::from_millis(300)).await;

    let pages = browser.pages().await?;
    debug!("获取到 {} 个页面", pages.len());

    for p in pages.iter() {
        if let Ok(Some(url)) = p.url().await {
            if url.starts_with(exam_url) {
                info!("✓ 找到考试页面: {}", url);
                return Ok((browser, p.clone()));
            }
        }
    }

    debug!("未找到考试页面，创建新页面并导航到: {}", exam_url);
    let page = browser.new_page(exam_url).await.map_err(|e| {
        error!("打开考试页面失败: {}", e);
        BrowserError::from(e)
    })?;
    info!("已导航到: {}", exam_url);

    Ok((browser, page))
}
