pub mod exam_client;
pub mod proctor_client;

pub use exam_client::{ExamBackend, ExamClient, ExamResult, StartExamResponse, SubmitAck};
pub use proctor_client::{LogEventResponse, ProctorClient, ViolationLedger, ViolationSnapshot};

use crate::error::ApiError;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// 构建带超时的 HTTP 客户端
pub(crate) fn build_http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("HTTP 客户端构建失败，使用默认客户端: {}", e);
            reqwest::Client::new()
        })
}

/// 发送请求并把 2xx 响应解析为 JSON
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    endpoint: &str,
) -> Result<T, ApiError> {
    let response = request
        .send()
        .await
        .map_err(|e| ApiError::from_reqwest(endpoint, e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::BadStatus {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::from_reqwest(endpoint, e))
}
