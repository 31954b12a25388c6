//! JS 执行器 - 基础设施层
//!
//! 持有唯一的考试页面资源，只暴露"执行 JS"的能力

use crate::error::BrowserError;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

/// JS 执行器
///
/// 职责：
/// - 持有考试页面（Page）
/// - 暴露 eval() 能力
/// - 不认识会话、违规或答案
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 执行 JS 表达式（Promise 会被等待）并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue, BrowserError> {
        let result = self.page.evaluate(js_code.into()).await?;
        // 脚本返回 undefined 时没有值
        Ok(result.into_value().unwrap_or(JsonValue::Null))
    }

    /// 执行 JS 并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(
        &self,
        js_code: impl Into<String>,
    ) -> Result<T, BrowserError> {
        let json_value = self.eval(js_code).await?;
        serde_json::from_value(json_value).map_err(|e| BrowserError::ScriptFailed(e.to_string()))
    }
}
