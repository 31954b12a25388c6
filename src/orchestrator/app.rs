//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：连接浏览器、注入页面监听、构建后端客户端
//! 2. **会话调度**：启动考试会话控制器，把终端命令转交给会话句柄
//! 3. **资源管理**：持有 Browser 和页面信号源，确保生命周期正确
//! 4. **结果展示**：交卷后拉取成绩并输出
//!
//! 本模块不做任何考试业务判断，判断全部在 workflow 层完成。

use crate::browser;
use crate::clients::{ExamBackend, ExamClient, ProctorClient};
use crate::config::Config;
use crate::infrastructure::JsExecutor;
use crate::models::{OptionLabel, Question, SessionPhase};
use crate::orchestrator::console::{ConsoleCommand, ConsoleParser};
use crate::platform::browser_page::{BrowserCamera, BrowserPlatform};
use crate::services::TracingSink;
use crate::utils::format_remaining;
use crate::workflow::{
    ExamSessionController, SessionCtx, SessionDeps, SessionHandle, SessionOptions, SessionReport,
};
use anyhow::{Context, Result};
use chromiumoxide::Browser;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    _browser: Browser,
    platform: Arc<BrowserPlatform>,
    camera: Arc<BrowserCamera>,
    exam_backend: Arc<ExamClient>,
    ledger: Arc<ProctorClient>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate()?;
        log_startup(&config);

        let (browser, page) =
            browser::connect_to_exam_page(config.browser_debug_port, &config.target_url)
                .await
                .with_context(|| format!("无法打开考试页面: {}", config.target_url))?;

        // 页面信号源和摄像头共享同一个 JsExecutor
        let executor = Arc::new(JsExecutor::new(page));
        let platform =
            BrowserPlatform::install(Arc::clone(&executor), config.poll_interval())
                .await
                .context("页面监听脚本注入失败")?;
        let camera = BrowserCamera::new(executor);

        Ok(Self {
            exam_backend: Arc::new(ExamClient::new(&config)),
            ledger: Arc::new(ProctorClient::new(&config)),
            platform: Arc::new(platform),
            camera: Arc::new(camera),
            _browser: browser,
            config,
        })
    }

    /// 运行一场考试，直到交卷完成或考生离开
    pub async fn run(&self) -> Result<SessionReport> {
        let ctx = SessionCtx::new(self.config.exam_id.clone(), self.config.user_id.clone());
        let deps = SessionDeps {
            exam_backend: self.exam_backend.clone(),
            ledger: self.ledger.clone(),
            events: self.platform.clone(),
            camera: self.camera.clone(),
            notices: Arc::new(TracingSink),
        };

        let (controller, handle) =
            ExamSessionController::start(ctx.clone(), deps, SessionOptions::from_config(&self.config))
                .await?;
        print_questions(handle.questions());

        let parser = ConsoleParser::new()?;
        let mut session = tokio::spawn(controller.run());
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        let report = loop {
            tokio::select! {
                finished = &mut session => break finished?,
                line = lines.next_line() => match line {
                    Ok(Some(line)) => dispatch(&parser, &handle, &line),
                    Ok(None) => {
                        info!("输入已关闭，离开考试页面");
                        handle.teardown();
                        break (&mut session).await?;
                    }
                    Err(e) => {
                        warn!("读取输入失败，离开考试页面: {}", e);
                        handle.teardown();
                        break (&mut session).await?;
                    }
                },
            }
        };

        if report.phase == SessionPhase::Submitted && report.flush_error.is_none() {
            self.show_result(&ctx).await;
        }

        Ok(report)
    }

    /// 拉取并展示成绩，失败只记录日志
    async fn show_result(&self, ctx: &SessionCtx) {
        match self.exam_backend.fetch_result(&ctx.exam_id, &ctx.user_id).await {
            Ok(result) => info!(
                "{} 🎯 成绩: {}/{} ({:.1}%)",
                ctx,
                result.score,
                result.total_questions,
                result.percentage()
            ),
            Err(e) => warn!("{} ⚠️ 成绩获取失败: {}", ctx, e),
        }
    }
}

fn dispatch(parser: &ConsoleParser, handle: &SessionHandle, line: &str) {
    match parser.parse(line) {
        Ok(ConsoleCommand::Answer {
            question_id,
            option,
        }) => handle.record_answer(question_id, option),
        Ok(ConsoleCommand::Submit) => handle.submit(),
        Ok(ConsoleCommand::Status) => {
            let snapshot = handle.snapshot();
            info!(
                "⏱️ 剩余 {} | 违规 {}/{} | 已作答 {} | 摄像头 {}",
                format_remaining(snapshot.remaining_seconds),
                snapshot.violations,
                snapshot.max_violations,
                snapshot.answered,
                if snapshot.camera_active { "开启" } else { "关闭" }
            );
        }
        Ok(ConsoleCommand::Questions) => print_questions(handle.questions()),
        Ok(ConsoleCommand::Quit) => handle.teardown(),
        Ok(ConsoleCommand::Empty) => {}
        Err(msg) => warn!("{}", msg),
    }
}

fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 监考考试客户端");
    info!("🌐 考试页面: {}", config.target_url);
    info!("🔌 调试端口: {}", config.browser_debug_port);
    info!("{}", "=".repeat(60));
}

fn print_questions(questions: &[Question]) {
    if questions.is_empty() {
        warn!("⚠️ 本场考试没有题目");
        return;
    }
    for (index, question) in questions.iter().enumerate() {
        info!("{}. [{}] {}", index + 1, question.id, question.question_text);
        for label in OptionLabel::ALL {
            info!("    {}. {}", label, question.option(label));
        }
    }
}
