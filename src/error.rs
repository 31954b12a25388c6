use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 后端 API 调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 摄像头相关错误
    #[error("摄像头错误: {0}")]
    Camera(#[from] CameraError),
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 考试会话错误
    #[error("会话错误: {0}")]
    Session(#[from] SessionError),
}

/// API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败
    #[error("API请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 请求超时
    #[error("API请求超时: {endpoint}")]
    Timeout { endpoint: String },
    /// API 返回错误状态码
    #[error("API返回错误响应 ({endpoint}): status={status}, body={body}")]
    BadStatus {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// 响应解析失败
    #[error("响应解析失败 ({endpoint}): {message}")]
    DecodeFailed { endpoint: String, message: String },
}

impl ApiError {
    /// 从 reqwest 错误构造，超时单独归类
    pub fn from_reqwest(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        let endpoint = endpoint.into();
        if source.is_timeout() {
            ApiError::Timeout { endpoint }
        } else if source.is_decode() {
            ApiError::DecodeFailed {
                endpoint,
                message: source.to_string(),
            }
        } else {
            ApiError::RequestFailed { endpoint, source }
        }
    }

    /// 后端以 400 拒绝交卷，因为这场考试已经在服务端结束
    pub fn is_already_submitted(&self) -> bool {
        match self {
            ApiError::BadStatus { status, body, .. } => {
                *status == 400 && body.to_ascii_lowercase().contains("already submitted")
            }
            _ => false,
        }
    }
}

/// 摄像头错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CameraError {
    /// 用户拒绝授权
    #[error("摄像头访问被拒绝: {0}")]
    Denied(String),
    /// 设备不可用
    #[error("摄像头不可用: {0}")]
    Unavailable(String),
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {message}")]
    ConnectionFailed { port: u16, message: String },
    /// 执行脚本失败
    #[error("执行脚本失败: {0}")]
    ScriptFailed(String),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件读取失败
    #[error("读取配置文件失败 ({path}): {message}")]
    ReadFailed { path: String, message: String },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {message}")]
    TomlParseFailed { path: String, message: String },
    /// 必填项缺失
    #[error("缺少配置项: {0}")]
    Missing(&'static str),
}

/// 考试会话错误
#[derive(Debug, Error)]
pub enum SessionError {
    /// 后端拒绝开始考试
    #[error("无法开始考试 {exam_id}: {source}")]
    StartRefused {
        exam_id: String,
        #[source]
        source: ApiError,
    },
    /// 会话已经结束（控制器已拆除）
    #[error("考试会话已关闭")]
    Closed,
}

impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        BrowserError::ScriptFailed(err.to_string())
    }
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
