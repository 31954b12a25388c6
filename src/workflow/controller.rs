//! 考试会话控制器 - 流程层
//!
//! 核心职责：编排一场监考考试的完整生命周期
//!
//! ```text
//! Initializing ──start()──► Active ──(计时到期 | 账本判定超限 | 手动交卷)──► Submitting ──上传完成──► Submitted
//! ```
//!
//! - 所有事件（计时、页面信号、摄像头结果、账本响应、上传结果、考生操作）
//!   都写入同一条事件通道，按到达顺序逐个处理，没有并行修改
//! - 三种交卷触发共用一道闸门，先到者生效，其余都是空操作
//! - 摄像头获取和网络调用放到独立任务中执行，结果以事件形式送回；
//!   循环结束后通道随控制器一起关闭，之后送回的结果全部被丢弃
//!   （迟到的采集流会被立即停止）
//! - 无论怎样退出，计时器、摄像头、页面监听都会被释放

use crate::clients::{ExamBackend, LogEventResponse, SubmitAck, ViolationLedger};
use crate::config::Config;
use crate::error::{ApiError, AppResult, CameraError, SessionError};
use crate::models::{
    OptionLabel, Question, QuestionId, Session, SessionPhase, ViolationKind, ViolationRecord,
};
use crate::platform::{CameraDevice, CaptureStream, EventSource};
use crate::services::{
    CameraSession, CountdownTimer, IntegrityMonitor, NoticeSink, TimerEvent, WarningBanner,
};
use crate::utils::logging;
use crate::workflow::session_ctx::SessionCtx;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::SendError;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

pub const BREACH_ALERT: &str =
    "Maximum violations exceeded. Your exam has been automatically submitted.";
pub const CAMERA_REQUIRED_ALERT: &str =
    "Webcam access is required for this exam. Please enable your webcam.";
pub const SUBMIT_FAILED_ALERT: &str =
    "Your answers could not be uploaded. Please contact the exam administrator.";

/// 交卷触发原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    Manual,
    TimerExpired,
    ViolationLimit,
}

impl SubmitTrigger {
    /// 是否为自动交卷
    pub fn is_auto(self) -> bool {
        !matches!(self, SubmitTrigger::Manual)
    }
}

impl fmt::Display for SubmitTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubmitTrigger::Manual => "手动交卷",
            SubmitTrigger::TimerExpired => "时间到",
            SubmitTrigger::ViolationLimit => "违规超限",
        };
        f.write_str(name)
    }
}

/// 控制器依赖的外部协作方
pub struct SessionDeps {
    pub exam_backend: Arc<dyn ExamBackend>,
    pub ledger: Arc<dyn ViolationLedger>,
    pub events: Arc<dyn EventSource>,
    pub camera: Arc<dyn CameraDevice>,
    pub notices: Arc<dyn NoticeSink>,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub warning_dismiss_after: Duration,
    pub default_max_violations: u32,
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            warning_dismiss_after: config.warning_dismiss_after(),
            default_max_violations: config.default_max_violations,
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// 会话状态快照（供展示层只读观察）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub remaining_seconds: i64,
    pub violations: u32,
    pub max_violations: u32,
    pub answered: usize,
    pub camera_active: bool,
}

/// 会话结束报告
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub ctx: SessionCtx,
    pub phase: SessionPhase,
    pub trigger: Option<SubmitTrigger>,
    /// 交卷时发送的答案条数
    pub answers_submitted: usize,
    /// 上传失败原因；有值表示交卷未被后端持久化
    pub flush_error: Option<String>,
    pub violations: u32,
    pub max_violations: u32,
    /// 结束时账本镜像是否已达上限
    pub limit_reached: bool,
    pub remaining_seconds: i64,
}

/// 会话事件，考生操作和内部结果共用一条通道
enum SessionEvent {
    Answer {
        question_id: QuestionId,
        option: OptionLabel,
    },
    Submit,
    Violation(ViolationKind),
    Teardown,
    Timer(TimerEvent),
    Camera(Result<Box<dyn CaptureStream>, CameraError>),
    LedgerReply {
        kind: ViolationKind,
        result: Result<LogEventResponse, ApiError>,
    },
    FlushDone {
        result: Result<SubmitAck, ApiError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// 最后一个句柄被丢弃时通知控制器离开页面
struct Presence {
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl Drop for Presence {
    fn drop(&mut self) {
        let _ = self.events.send(SessionEvent::Teardown);
    }
}

/// 展示层持有的会话句柄
///
/// 所有句柄都被丢弃等同于离开考试页面。
#[derive(Clone)]
pub struct SessionHandle {
    presence: Arc<Presence>,
    state: watch::Receiver<SessionSnapshot>,
    questions: Arc<Vec<Question>>,
}

impl SessionHandle {
    pub fn record_answer(&self, question_id: impl Into<QuestionId>, option: OptionLabel) {
        self.send(SessionEvent::Answer {
            question_id: question_id.into(),
            option,
        });
    }

    /// 手动交卷
    pub fn submit(&self) {
        self.send(SessionEvent::Submit);
    }

    pub fn report_violation(&self, kind: ViolationKind) {
        self.send(SessionEvent::Violation(kind));
    }

    /// 离开考试页面
    pub fn teardown(&self) {
        self.send(SessionEvent::Teardown);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// 等待快照满足条件
    pub async fn wait_for<F>(&mut self, predicate: F) -> Result<SessionSnapshot, SessionError>
    where
        F: FnMut(&SessionSnapshot) -> bool,
    {
        self.state
            .wait_for(predicate)
            .await
            .map(|snapshot| snapshot.clone())
            .map_err(|_| SessionError::Closed)
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    fn send(&self, event: SessionEvent) {
        if self.presence.events.send(event).is_err() {
            debug!("会话已关闭，忽略操作");
        }
    }
}

/// 考试会话控制器
///
/// 独占 Session、计时器和摄像头；违规计数只是账本的镜像。
pub struct ExamSessionController {
    ctx: SessionCtx,
    session: Session,
    violations: ViolationRecord,
    exam_backend: Arc<dyn ExamBackend>,
    ledger: Arc<dyn ViolationLedger>,
    banner: Arc<WarningBanner>,
    timer: Option<CountdownTimer>,
    camera: CameraSession,
    monitor: Option<IntegrityMonitor>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    state: watch::Sender<SessionSnapshot>,
    trigger: Option<SubmitTrigger>,
    answers_submitted: usize,
    flush_error: Option<String>,
}

impl ExamSessionController {
    /// 开始考试
    ///
    /// 后端拒绝开始时返回错误；题目或违规记录拉取失败只记录日志并降级继续。
    /// 摄像头在后台获取，不等待授权结果就返回。
    pub async fn start(
        ctx: SessionCtx,
        deps: SessionDeps,
        options: SessionOptions,
    ) -> AppResult<(Self, SessionHandle)> {
        info!("{} 正在开始考试...", ctx);

        let started = deps
            .exam_backend
            .start_exam(&ctx.exam_id, &ctx.user_id)
            .await
            .map_err(|source| SessionError::StartRefused {
                exam_id: ctx.exam_id.clone(),
                source,
            })?;

        let questions = match deps
            .exam_backend
            .fetch_questions(&ctx.exam_id, &ctx.user_id)
            .await
        {
            Ok(questions) => questions,
            Err(e) => {
                warn!("{} ⚠️ 题目拉取失败，以空题目列表继续: {}", ctx, e);
                Vec::new()
            }
        };

        let mut violations = ViolationRecord::new(
            ctx.user_id.clone(),
            ctx.exam_id.clone(),
            options.default_max_violations,
        );
        match deps.ledger.fetch_violations(&ctx.user_id, &ctx.exam_id).await {
            Ok(snapshot) => violations.sync(snapshot.count, snapshot.max_allowed),
            Err(e) => warn!("{} ⚠️ 违规记录获取失败，按 0 次处理: {}", ctx, e),
        }

        let mut session = Session::new(ctx.exam_id.clone(), ctx.user_id.clone());
        session.activate(started.duration_minutes);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let banner = Arc::new(WarningBanner::new(
            deps.notices,
            options.warning_dismiss_after,
        ));

        let timer = {
            let tx = events_tx.clone();
            CountdownTimer::start(session.remaining_seconds(), move |event| {
                let _ = tx.send(SessionEvent::Timer(event));
            })
        };

        let monitor = {
            let tx = events_tx.clone();
            IntegrityMonitor::attach(deps.events, Arc::clone(&banner), move |kind| {
                let _ = tx.send(SessionEvent::Violation(kind));
            })
        };

        let camera = CameraSession::new(deps.camera);
        request_camera(camera.device(), events_tx.clone());

        let questions = Arc::new(questions);
        logging::log_session_start(&ctx, started.duration_minutes, questions.len());

        let (state, state_rx) = watch::channel(SessionSnapshot {
            phase: session.phase(),
            remaining_seconds: session.remaining_seconds(),
            violations: violations.count,
            max_violations: violations.max_allowed,
            answered: 0,
            camera_active: false,
        });

        let controller = Self {
            ctx,
            session,
            violations,
            exam_backend: deps.exam_backend,
            ledger: deps.ledger,
            banner,
            timer: Some(timer),
            camera,
            monitor: Some(monitor),
            events_tx: events_tx.clone(),
            events_rx,
            state,
            trigger: None,
            answers_submitted: 0,
            flush_error: None,
        };

        let handle = SessionHandle {
            presence: Arc::new(Presence { events: events_tx }),
            state: state_rx,
            questions,
        };

        Ok((controller, handle))
    }

    /// 事件循环，交卷完成或页面退出时返回
    pub async fn run(mut self) -> SessionReport {
        while let Some(event) = self.events_rx.recv().await {
            if self.on_event(event) == Flow::Stop {
                break;
            }
        }

        self.teardown();
        let report = self.report();
        logging::print_session_report(&report);
        report
    }

    fn on_event(&mut self, event: SessionEvent) -> Flow {
        match event {
            SessionEvent::Answer {
                question_id,
                option,
            } => {
                if self.session.record_answer(question_id.clone(), option) {
                    debug!("{} 作答: {} -> {}", self.ctx, question_id, option);
                    self.publish();
                } else {
                    debug!("{} 已不在作答阶段，忽略答案 {}", self.ctx, question_id);
                }
            }
            SessionEvent::Submit => self.begin_submit(SubmitTrigger::Manual),
            SessionEvent::Violation(kind) => self.forward_violation(kind),
            SessionEvent::Teardown => {
                info!("{} 页面已退出", self.ctx);
                return Flow::Stop;
            }
            SessionEvent::Timer(TimerEvent::Tick { remaining }) => {
                self.session.set_remaining(remaining);
                self.publish();
            }
            SessionEvent::Timer(TimerEvent::Expired) => {
                if self.session.is_active() {
                    info!("{} ⏰ 考试时间到", self.ctx);
                }
                self.begin_submit(SubmitTrigger::TimerExpired);
            }
            SessionEvent::Camera(result) => self.apply_camera_result(result),
            SessionEvent::LedgerReply { kind, result } => self.apply_ledger_reply(kind, result),
            SessionEvent::FlushDone { result } => return self.finish_submit(result),
        }
        Flow::Continue
    }

    /// 摄像头授权结果；只在作答阶段接管采集流
    fn apply_camera_result(&mut self, result: Result<Box<dyn CaptureStream>, CameraError>) {
        match result {
            Ok(mut stream) => {
                if self.session.is_active() {
                    self.camera.adopt(stream);
                    self.publish();
                } else {
                    debug!("{} 交卷后才拿到采集流，立即停止", self.ctx);
                    stream.stop_all_tracks();
                }
            }
            Err(e) => {
                if !self.session.is_active() {
                    debug!("{} 已不在作答阶段，忽略摄像头错误: {}", self.ctx, e);
                    return;
                }
                warn!("{} 📷 摄像头不可用，继续考试: {}", self.ctx, e);
                self.banner.alert(CAMERA_REQUIRED_ALERT);
                if let Some(monitor) = &self.monitor {
                    monitor.report_camera_denied();
                }
            }
        }
    }

    /// 把违规交给账本裁决，不在本地计数
    fn forward_violation(&mut self, kind: ViolationKind) {
        if !self.session.is_active() {
            debug!("{} 已不在作答阶段，不再上报违规 {}", self.ctx, kind);
            return;
        }
        warn!("{} 🚩 检测到违规: {} ({})", self.ctx, kind, kind.description());

        let ledger = Arc::clone(&self.ledger);
        let tx = self.events_tx.clone();
        let user_id = self.ctx.user_id.clone();
        let exam_id = self.ctx.exam_id.clone();
        tokio::spawn(async move {
            let result = ledger.log_event(&user_id, &exam_id, kind).await;
            if tx.send(SessionEvent::LedgerReply { kind, result }).is_err() {
                debug!("会话已拆除，丢弃过期的账本响应 ({})", kind);
            }
        });
    }

    fn apply_ledger_reply(
        &mut self,
        kind: ViolationKind,
        result: Result<LogEventResponse, ApiError>,
    ) {
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!("{} 违规上报失败: {}", self.ctx, e);
                return;
            }
        };

        let decision = response.into_decision(self.violations.max_allowed);
        self.violations.apply(kind, &decision);
        self.publish();

        if decision.auto_submitted {
            if self.session.is_active() {
                warn!(
                    "{} 违规次数达到上限 ({}/{})，自动交卷",
                    self.ctx, self.violations.count, self.violations.max_allowed
                );
                self.banner.alert(BREACH_ALERT);
                self.begin_submit(SubmitTrigger::ViolationLimit);
            } else {
                debug!("{} 账本再次确认超限，交卷已在进行", self.ctx);
            }
        } else if self.session.is_active() {
            self.banner.show(format!(
                "Warning! Violation detected: {}. {} warning(s) remaining before auto-submission.",
                kind, decision.remaining_allowance
            ));
        }
    }

    /// 交卷闸门
    fn begin_submit(&mut self, trigger: SubmitTrigger) {
        let Some(answers) = self.session.begin_submission() else {
            debug!("{} 交卷已在进行，忽略触发: {}", self.ctx, trigger);
            return;
        };

        info!(
            "{} 📤 正在交卷 (触发: {}, 答案 {} 条)",
            self.ctx,
            trigger,
            answers.len()
        );
        self.trigger = Some(trigger);
        if let Some(mut timer) = self.timer.take() {
            timer.stop();
        }
        self.camera.release();
        self.answers_submitted = answers.len();
        self.publish();

        let backend = Arc::clone(&self.exam_backend);
        let tx = self.events_tx.clone();
        let user_id = self.ctx.user_id.clone();
        let exam_id = self.ctx.exam_id.clone();
        tokio::spawn(async move {
            let result = backend.submit_answers(&exam_id, &user_id, &answers).await;
            if tx.send(SessionEvent::FlushDone { result }).is_err() {
                debug!("会话已拆除，丢弃交卷结果");
            }
        });
    }

    /// 上传结束（成功或失败）后进入终态
    fn finish_submit(&mut self, result: Result<SubmitAck, ApiError>) -> Flow {
        match result {
            Ok(ack) => info!(
                "{} ✓ 答案已提交 {}",
                self.ctx,
                ack.message.unwrap_or_default()
            ),
            Err(e)
                if self.trigger == Some(SubmitTrigger::ViolationLimit)
                    && e.is_already_submitted() =>
            {
                info!("{} ✓ 账本已在服务端完成自动交卷", self.ctx);
            }
            Err(e) => {
                error!("{} ❌ 答案上传失败，交卷未被后端确认: {}", self.ctx, e);
                self.flush_error = Some(e.to_string());
                self.banner.alert(SUBMIT_FAILED_ALERT);
            }
        }

        self.session.mark_submitted();
        self.publish();
        self.banner.navigate_to_result(&self.ctx.exam_id);
        Flow::Stop
    }

    /// 释放计时器、摄像头和页面监听
    fn teardown(&mut self) {
        if let Some(mut timer) = self.timer.take() {
            timer.stop();
        }
        self.camera.release();
        if let Some(mut monitor) = self.monitor.take() {
            monitor.detach();
        }
        self.banner.clear();
        self.publish();
        info!("{} 会话资源已释放", self.ctx);
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.session.phase(),
            remaining_seconds: self.session.remaining_seconds(),
            violations: self.violations.count,
            max_violations: self.violations.max_allowed,
            answered: self.session.answers().len(),
            camera_active: self.camera.is_active(),
        }
    }

    fn publish(&self) {
        self.state.send_replace(self.snapshot());
    }

    fn report(&self) -> SessionReport {
        SessionReport {
            ctx: self.ctx.clone(),
            phase: self.session.phase(),
            trigger: self.trigger,
            answers_submitted: self.answers_submitted,
            flush_error: self.flush_error.clone(),
            violations: self.violations.count,
            max_violations: self.violations.max_allowed,
            limit_reached: self.violations.is_exhausted(),
            remaining_seconds: self.session.remaining_seconds(),
        }
    }
}

/// 在后台请求摄像头，结果作为事件送回
///
/// 会话已经结束时事件送不出去，拿到的采集流在这里直接停止。
fn request_camera(device: Arc<dyn CameraDevice>, events: mpsc::UnboundedSender<SessionEvent>) {
    tokio::spawn(async move {
        let result = device.open_video_stream().await;
        if let Err(SendError(SessionEvent::Camera(Ok(mut stream)))) =
            events.send(SessionEvent::Camera(result))
        {
            debug!("会话已拆除，停止迟到的采集流");
            stream.stop_all_tracks();
        }
    });
}
