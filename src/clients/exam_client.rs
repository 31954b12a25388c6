/// 考试后端客户端
///
/// 封装开始考试、拉取题目、提交答案、查询成绩的调用
use crate::clients::{build_http_client, send_json};
use crate::config::Config;
use crate::error::ApiError;
use crate::models::{AnswerEntry, Question};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

/// 开始考试的响应
#[derive(Debug, Clone, Deserialize)]
pub struct StartExamResponse {
    #[serde(alias = "duration")]
    pub duration_minutes: u32,
}

/// 提交确认
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitAck {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub score: Option<u32>,
}

/// 成绩
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExamResult {
    pub score: u32,
    pub total_questions: u32,
    pub submitted: bool,
}

impl ExamResult {
    /// 得分百分比，总题数为 0 时为 0
    pub fn percentage(&self) -> f64 {
        if self.total_questions == 0 {
            0.0
        } else {
            f64::from(self.score) / f64::from(self.total_questions) * 100.0
        }
    }
}

/// 考试后端接口
#[async_trait]
pub trait ExamBackend: Send + Sync {
    async fn start_exam(&self, exam_id: &str, user_id: &str) -> Result<StartExamResponse, ApiError>;

    async fn fetch_questions(&self, exam_id: &str, user_id: &str)
        -> Result<Vec<Question>, ApiError>;

    async fn submit_answers(
        &self,
        exam_id: &str,
        user_id: &str,
        answers: &[AnswerEntry],
    ) -> Result<SubmitAck, ApiError>;

    async fn fetch_result(&self, exam_id: &str, user_id: &str) -> Result<ExamResult, ApiError>;
}

/// 基于 HTTP 的考试后端客户端
pub struct ExamClient {
    http: reqwest::Client,
    base_url: String,
}

impl ExamClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: build_http_client(config.request_timeout()),
            base_url: config.exam_api_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, exam_id: &str, action: &str) -> String {
        format!("{}/{}/{}/", self.base_url, exam_id, action)
    }
}

#[async_trait]
impl ExamBackend for ExamClient {
    async fn start_exam(&self, exam_id: &str, user_id: &str) -> Result<StartExamResponse, ApiError> {
        let url = self.url(exam_id, "start");
        debug!("开始考试: {}", url);
        send_json(self.http.post(&url).json(&json!({ "user_id": user_id })), &url).await
    }

    async fn fetch_questions(
        &self,
        exam_id: &str,
        user_id: &str,
    ) -> Result<Vec<Question>, ApiError> {
        let url = self.url(exam_id, "questions");
        debug!("拉取题目: {}", url);
        send_json(self.http.get(&url).query(&[("user_id", user_id)]), &url).await
    }

    async fn submit_answers(
        &self,
        exam_id: &str,
        user_id: &str,
        answers: &[AnswerEntry],
    ) -> Result<SubmitAck, ApiError> {
        let url = self.url(exam_id, "submit");
        let payload = json!({ "user_id": user_id, "answers": answers });
        debug!("提交答案 Payload: {}", payload);
        send_json(self.http.post(&url).json(&payload), &url).await
    }

    async fn fetch_result(&self, exam_id: &str, user_id: &str) -> Result<ExamResult, ApiError> {
        let url = self.url(exam_id, "result");
        send_json(self.http.get(&url).query(&[("user_id", user_id)]), &url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_response_accepts_legacy_duration_key() {
        let res: StartExamResponse =
            serde_json::from_str(r#"{"message": "Exam started", "duration": 45}"#).unwrap();
        assert_eq!(res.duration_minutes, 45);
        let res: StartExamResponse = serde_json::from_str(r#"{"duration_minutes": 60}"#).unwrap();
        assert_eq!(res.duration_minutes, 60);
    }

    #[test]
    fn percentage_handles_empty_exam() {
        let result = ExamResult {
            score: 3,
            total_questions: 4,
            submitted: true,
        };
        assert!((result.percentage() - 75.0).abs() < f64::EPSILON);
        let empty = ExamResult {
            score: 0,
            total_questions: 0,
            submitted: true,
        };
        assert_eq!(empty.percentage(), 0.0);
    }

    #[test]
    fn urls_follow_trailing_slash_convention() {
        let config = Config {
            exam_api_base_url: "http://localhost:8000/api/exams/".to_string(),
            ..Config::default()
        };
        let client = ExamClient::new(&config);
        assert_eq!(
            client.url("5", "submit"),
            "http://localhost:8000/api/exams/5/submit/"
        );
    }
}
