//! 集成测试共用的假后端
//!
//! `FakeLedger` 按 (考生, 考试) 维护真实的计数和上限语义，
//! `FakeExamBackend` 记录每一次交卷内容。

#![allow(dead_code)]

use async_trait::async_trait;
use exam_proctor::clients::{
    ExamBackend, ExamResult, LogEventResponse, StartExamResponse, SubmitAck, ViolationLedger,
    ViolationSnapshot,
};
use exam_proctor::error::{ApiError, AppResult};
use exam_proctor::models::{AnswerEntry, OptionLabel, Question, ViolationKind};
use exam_proctor::platform::simulated::{SimulatedCamera, SimulatedPlatform};
use exam_proctor::services::RecordingSink;
use exam_proctor::workflow::{
    ExamSessionController, SessionCtx, SessionDeps, SessionHandle, SessionOptions,
};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const EXAM_ID: &str = "1";
pub const USER_ID: &str = "7";

pub fn question(id: &str) -> Question {
    serde_json::from_value(json!({
        "id": id,
        "question_text": format!("Question {}", id),
        "option_a": "alpha",
        "option_b": "beta",
        "option_c": "gamma",
        "option_d": "delta",
    }))
    .unwrap()
}

pub fn entry(question_id: &str, option: OptionLabel) -> AnswerEntry {
    AnswerEntry {
        question_id: question_id.to_string(),
        selected_option: option,
    }
}

fn bad_status(endpoint: &str) -> ApiError {
    ApiError::BadStatus {
        endpoint: endpoint.to_string(),
        status: 500,
        body: "internal error".to_string(),
    }
}

/// 假考试后端
pub struct FakeExamBackend {
    duration_minutes: u32,
    questions: Vec<Question>,
    refuse_start: bool,
    fail_questions: bool,
    fail_submit: bool,
    already_submitted: bool,
    submit_delay: Duration,
    submits: Mutex<Vec<Vec<AnswerEntry>>>,
}

impl FakeExamBackend {
    pub fn new(duration_minutes: u32) -> Self {
        Self {
            duration_minutes,
            questions: vec![question("Q1"), question("Q2")],
            refuse_start: false,
            fail_questions: false,
            fail_submit: false,
            already_submitted: false,
            submit_delay: Duration::ZERO,
            submits: Mutex::new(Vec::new()),
        }
    }

    pub fn refusing_start(mut self) -> Self {
        self.refuse_start = true;
        self
    }

    pub fn failing_questions(mut self) -> Self {
        self.fail_questions = true;
        self
    }

    pub fn failing_submit(mut self) -> Self {
        self.fail_submit = true;
        self
    }

    /// 交卷返回 400 "Already submitted"，如同账本已在服务端完成交卷
    pub fn already_submitted(mut self) -> Self {
        self.already_submitted = true;
        self
    }

    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = delay;
        self
    }

    pub fn submits(&self) -> Vec<Vec<AnswerEntry>> {
        self.submits.lock().unwrap().clone()
    }

    pub fn submit_count(&self) -> usize {
        self.submits.lock().unwrap().len()
    }
}

#[async_trait]
impl ExamBackend for FakeExamBackend {
    async fn start_exam(&self, _exam_id: &str, _user_id: &str) -> Result<StartExamResponse, ApiError> {
        if self.refuse_start {
            return Err(bad_status("start"));
        }
        Ok(StartExamResponse {
            duration_minutes: self.duration_minutes,
        })
    }

    async fn fetch_questions(&self, _exam_id: &str, _user_id: &str) -> Result<Vec<Question>, ApiError> {
        if self.fail_questions {
            return Err(bad_status("questions"));
        }
        Ok(self.questions.clone())
    }

    async fn submit_answers(
        &self,
        _exam_id: &str,
        _user_id: &str,
        answers: &[AnswerEntry],
    ) -> Result<SubmitAck, ApiError> {
        self.submits.lock().unwrap().push(answers.to_vec());
        if !self.submit_delay.is_zero() {
            tokio::time::sleep(self.submit_delay).await;
        }
        if self.fail_submit {
            return Err(bad_status("submit"));
        }
        if self.already_submitted {
            return Err(ApiError::BadStatus {
                endpoint: "submit".to_string(),
                status: 400,
                body: r#"{"error": "Already submitted"}"#.to_string(),
            });
        }
        Ok(SubmitAck {
            message: Some("Exam submitted successfully".to_string()),
            score: None,
        })
    }

    async fn fetch_result(&self, _exam_id: &str, _user_id: &str) -> Result<ExamResult, ApiError> {
        Ok(ExamResult {
            score: 1,
            total_questions: self.questions.len() as u32,
            submitted: self.submit_count() > 0,
        })
    }
}

/// 假违规账本
pub struct FakeLedger {
    max: u32,
    delay: Duration,
    fail_fetch: bool,
    counts: Mutex<HashMap<(String, String), u32>>,
    scripted: Mutex<VecDeque<LogEventResponse>>,
    calls: Mutex<Vec<ViolationKind>>,
}

impl FakeLedger {
    pub fn new(max: u32) -> Self {
        Self {
            max,
            delay: Duration::ZERO,
            fail_fetch: false,
            counts: Mutex::new(HashMap::new()),
            scripted: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    /// 预置已有的违规次数
    pub fn with_existing(self, user_id: &str, exam_id: &str, count: u32) -> Self {
        self.counts
            .lock()
            .unwrap()
            .insert((user_id.to_string(), exam_id.to_string()), count);
        self
    }

    /// 下一次上报直接返回给定响应
    pub fn script(self, response: LogEventResponse) -> Self {
        self.scripted.lock().unwrap().push_back(response);
        self
    }

    pub fn calls(&self) -> Vec<ViolationKind> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn count_for(&self, user_id: &str, exam_id: &str) -> u32 {
        self.counts
            .lock()
            .unwrap()
            .get(&(user_id.to_string(), exam_id.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl ViolationLedger for FakeLedger {
    async fn log_event(
        &self,
        user_id: &str,
        exam_id: &str,
        kind: ViolationKind,
    ) -> Result<LogEventResponse, ApiError> {
        self.calls.lock().unwrap().push(kind);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if let Some(response) = self.scripted.lock().unwrap().pop_front() {
            return Ok(response);
        }

        let mut counts = self.counts.lock().unwrap();
        let count = counts
            .entry((user_id.to_string(), exam_id.to_string()))
            .or_insert(0);
        if *count >= self.max {
            return Ok(LogEventResponse {
                message: Some("Exam already submitted".to_string()),
                ..Default::default()
            });
        }
        *count += 1;
        let auto_submitted = *count >= self.max;
        Ok(LogEventResponse {
            message: None,
            violations: Some(*count),
            max_violations: Some(self.max),
            auto_submitted: Some(auto_submitted),
            remaining: Some(self.max - *count),
        })
    }

    async fn fetch_violations(
        &self,
        user_id: &str,
        exam_id: &str,
    ) -> Result<ViolationSnapshot, ApiError> {
        if self.fail_fetch {
            return Err(bad_status("violations"));
        }
        Ok(ViolationSnapshot {
            count: self.count_for(user_id, exam_id),
            max_allowed: self.max,
        })
    }
}

/// 一场考试所需的全部假依赖
pub struct Harness {
    pub backend: Arc<FakeExamBackend>,
    pub ledger: Arc<FakeLedger>,
    pub platform: Arc<SimulatedPlatform>,
    pub camera: Arc<SimulatedCamera>,
    pub sink: Arc<RecordingSink>,
}

impl Harness {
    pub fn new(backend: FakeExamBackend, ledger: FakeLedger) -> Self {
        Self::with_camera(backend, ledger, SimulatedCamera::granted())
    }

    pub fn with_camera(backend: FakeExamBackend, ledger: FakeLedger, camera: SimulatedCamera) -> Self {
        Self {
            backend: Arc::new(backend),
            ledger: Arc::new(ledger),
            platform: Arc::new(SimulatedPlatform::new()),
            camera: Arc::new(camera),
            sink: Arc::new(RecordingSink::new()),
        }
    }

    pub async fn start(&self) -> AppResult<(ExamSessionController, SessionHandle)> {
        let deps = SessionDeps {
            exam_backend: self.backend.clone(),
            ledger: self.ledger.clone(),
            events: self.platform.clone(),
            camera: self.camera.clone(),
            notices: self.sink.clone(),
        };
        ExamSessionController::start(
            SessionCtx::new(EXAM_ID, USER_ID),
            deps,
            SessionOptions::default(),
        )
        .await
    }
}

/// 轮询等待条件成立，最多 2 秒
pub async fn eventually<F: Fn() -> bool>(condition: F) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("条件在 2 秒内未成立");
}
