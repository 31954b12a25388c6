/// 监考账本客户端
///
/// 违规计数和上限由后端账本持有，客户端只上报事件、接收裁决
use crate::clients::{build_http_client, send_json};
use crate::config::Config;
use crate::error::ApiError;
use crate::models::{LedgerDecision, ViolationKind};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// 账本的当前计数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ViolationSnapshot {
    #[serde(rename = "violations")]
    pub count: u32,
    #[serde(rename = "max_violations")]
    pub max_allowed: u32,
}

/// `POST /proctor/log/` 的响应
///
/// 字段都可能缺失：超过上限时后端可能只返回 `message`。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogEventResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub violations: Option<u32>,
    #[serde(default)]
    pub max_violations: Option<u32>,
    #[serde(default)]
    pub auto_submitted: Option<bool>,
    #[serde(default)]
    pub remaining: Option<u32>,
}

impl LogEventResponse {
    /// 转换为裁决；`fallback_max` 用于补全缺失的上限
    pub fn into_decision(self, fallback_max: u32) -> LedgerDecision {
        let max_allowed = self.max_violations.unwrap_or(fallback_max);
        let message_says_submitted = self
            .message
            .as_deref()
            .map(|m| {
                let m = m.to_ascii_lowercase();
                m.contains("auto-submitted") || m.contains("already submitted")
            })
            .unwrap_or(false);
        let count_reached = match (self.violations, self.max_violations) {
            (Some(count), Some(max)) => count >= max,
            _ => false,
        };
        let auto_submitted =
            self.auto_submitted.unwrap_or(false) || count_reached || message_says_submitted;

        let count = match self.violations {
            Some(count) => count,
            None if auto_submitted => max_allowed,
            None => 0,
        };
        let remaining_allowance = self
            .remaining
            .unwrap_or_else(|| max_allowed.saturating_sub(count));

        LedgerDecision {
            count,
            max_allowed,
            auto_submitted,
            remaining_allowance: if auto_submitted { 0 } else { remaining_allowance },
        }
    }
}

/// 违规账本接口
#[async_trait]
pub trait ViolationLedger: Send + Sync {
    async fn log_event(
        &self,
        user_id: &str,
        exam_id: &str,
        kind: ViolationKind,
    ) -> Result<LogEventResponse, ApiError>;

    async fn fetch_violations(
        &self,
        user_id: &str,
        exam_id: &str,
    ) -> Result<ViolationSnapshot, ApiError>;
}

/// 基于 HTTP 的账本客户端
pub struct ProctorClient {
    http: reqwest::Client,
    base_url: String,
}

impl ProctorClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: build_http_client(config.request_timeout()),
            base_url: config.proctor_api_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ViolationLedger for ProctorClient {
    async fn log_event(
        &self,
        user_id: &str,
        exam_id: &str,
        kind: ViolationKind,
    ) -> Result<LogEventResponse, ApiError> {
        let url = format!("{}/log/", self.base_url);
        debug!("上报违规: {} ({})", kind, kind.description());
        let body = json!({
            "user_id": user_id,
            "exam_id": exam_id,
            "event": kind.as_str(),
        });
        send_json(self.http.post(&url).json(&body), &url).await
    }

    async fn fetch_violations(
        &self,
        user_id: &str,
        exam_id: &str,
    ) -> Result<ViolationSnapshot, ApiError> {
        let url = format!("{}/violations/", self.base_url);
        send_json(
            self.http
                .get(&url)
                .query(&[("user_id", user_id), ("exam_id", exam_id)]),
            &url,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> LedgerDecision {
        serde_json::from_str::<LogEventResponse>(json)
            .unwrap()
            .into_decision(3)
    }

    #[test]
    fn full_breach_response() {
        let decision = parse(
            r#"{"violations": 3, "max_violations": 3, "auto_submitted": true, "remaining": 0}"#,
        );
        assert!(decision.auto_submitted);
        assert_eq!(decision.count, 3);
        assert_eq!(decision.remaining_allowance, 0);
    }

    #[test]
    fn warning_response_keeps_remaining() {
        let decision = parse(r#"{"message": "Violation logged", "violations": 1, "remaining": 2}"#);
        assert!(!decision.auto_submitted);
        assert_eq!(decision.count, 1);
        assert_eq!(decision.max_allowed, 3);
        assert_eq!(decision.remaining_allowance, 2);
    }

    #[test]
    fn message_only_breach_is_treated_as_auto_submit() {
        let decision = parse(r#"{"message": "Violation limit exceeded. Exam auto-submitted."}"#);
        assert!(decision.auto_submitted);
        assert_eq!(decision.count, 3);

        let decision = parse(r#"{"message": "Exam already submitted"}"#);
        assert!(decision.auto_submitted);
    }

    #[test]
    fn count_at_threshold_forces_breach_even_without_flag() {
        let decision = parse(r#"{"violations": 4, "max_violations": 3, "auto_submitted": false}"#);
        assert!(decision.auto_submitted);
    }

    #[test]
    fn missing_remaining_is_derived() {
        let decision = parse(r#"{"violations": 1, "max_violations": 5}"#);
        assert_eq!(decision.remaining_allowance, 4);
    }
}
