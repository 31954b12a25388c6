/// 日志工具模块
///
/// 提供日志初始化和会话横幅输出的辅助函数
use crate::workflow::{SessionCtx, SessionReport};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// `RUST_LOG` 优先，否则使用传入的过滤规则。重复调用不会报错。
pub fn init(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录考试会话启动信息
pub fn log_session_start(ctx: &SessionCtx, duration_minutes: u32, question_count: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 考试会话启动 {}", ctx);
    info!(
        "⏱️ 时长: {} 分钟 | 题目数: {}",
        duration_minutes, question_count
    );
    info!(
        "开始时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
}

/// 打印会话最终报告
pub fn print_session_report(report: &SessionReport) {
    info!("\n{}", "=".repeat(60));
    info!("📊 考试会话结束 {}", report.ctx);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("最终状态: {:?}", report.phase);
    match report.trigger {
        Some(trigger) if trigger.is_auto() => info!("提交触发: {} (自动交卷)", trigger),
        Some(trigger) => info!("提交触发: {}", trigger),
        None => info!("提交触发: 无 (页面退出)"),
    }
    info!("已提交答案: {}", report.answers_submitted);
    info!(
        "违规次数: {}/{}{}",
        report.violations,
        report.max_violations,
        if report.limit_reached { " (已达上限)" } else { "" }
    );
    if let Some(err) = &report.flush_error {
        info!("❌ 答案上传失败: {}", err);
    }
    info!("{}", "=".repeat(60));
}

/// 把剩余秒数格式化为 m:ss
pub fn format_remaining(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_time_is_minutes_and_padded_seconds() {
        assert_eq!(format_remaining(3600), "60:00");
        assert_eq!(format_remaining(65), "1:05");
        assert_eq!(format_remaining(0), "0:00");
        assert_eq!(format_remaining(-4), "0:00");
    }
}
