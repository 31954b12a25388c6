use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- 后端 API 配置 ---
    /// 考试后端地址
    pub exam_api_base_url: String,
    /// 监考（违规账本）后端地址
    pub proctor_api_base_url: String,
    /// 请求超时（秒）
    pub request_timeout_secs: u64,
    // --- 考试会话 ---
    pub user_id: String,
    pub exam_id: String,
    /// 临时警告自动消失的延迟（秒）
    pub warning_dismiss_secs: u64,
    /// 账本初始状态获取失败时使用的违规上限
    pub default_max_violations: u32,
    // --- 浏览器配置 ---
    /// 浏览器调试端口
    pub browser_debug_port: u16,
    /// 考试页面 URL
    pub target_url: String,
    /// 页面信号轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    // --- 日志 ---
    /// 是否显示详细日志
    pub verbose_logging: bool,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exam_api_base_url: "http://127.0.0.1:8000/api/exams".to_string(),
            proctor_api_base_url: "http://127.0.0.1:8000/api/proctor".to_string(),
            request_timeout_secs: 10,
            user_id: String::new(),
            exam_id: String::new(),
            warning_dismiss_secs: 5,
            default_max_violations: 3,
            browser_debug_port: 9222,
            target_url: "http://127.0.0.1:4200/".to_string(),
            poll_interval_ms: 250,
            verbose_logging: false,
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件加载，缺失的字段使用默认值，环境变量优先
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::TomlParseFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(config.with_env_overrides())
    }

    fn with_env_overrides(self) -> Self {
        Self {
            exam_api_base_url: env_or("EXAM_API_BASE_URL", self.exam_api_base_url),
            proctor_api_base_url: env_or("PROCTOR_API_BASE_URL", self.proctor_api_base_url),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", self.request_timeout_secs),
            user_id: env_or("EXAM_USER_ID", self.user_id),
            exam_id: env_or("EXAM_ID", self.exam_id),
            warning_dismiss_secs: env_parse("WARNING_DISMISS_SECS", self.warning_dismiss_secs),
            default_max_violations: env_parse("DEFAULT_MAX_VIOLATIONS", self.default_max_violations),
            browser_debug_port: env_parse("BROWSER_DEBUG_PORT", self.browser_debug_port),
            target_url: env_or("TARGET_URL", self.target_url),
            poll_interval_ms: env_parse("POLL_INTERVAL_MS", self.poll_interval_ms),
            verbose_logging: env_parse("VERBOSE_LOGGING", self.verbose_logging),
            log_filter: env_or("RUST_LOG", self.log_filter),
        }
    }

    /// 检查开始考试所需的字段
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.user_id.trim().is_empty() {
            return Err(ConfigError::Missing("user_id (EXAM_USER_ID)"));
        }
        if self.exam_id.trim().is_empty() {
            return Err(ConfigError::Missing("exam_id (EXAM_ID)"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn warning_dismiss_after(&self) -> Duration {
        Duration::from_secs(self.warning_dismiss_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
