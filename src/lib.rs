//! # Exam Proctor
//!
//! 一个带监考功能的在线考试客户端
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure / Platform / Clients）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露 eval() 能力
//! - `platform/` - 页面信号源与摄像头设备的抽象，以及浏览器实现和模拟实现
//! - `clients/` - 考试后端与违规账本的 HTTP 客户端
//!
//! ### ② 业务能力层（Services）
//! - `CountdownTimer` - 每秒倒计时，到期只触发一次
//! - `CameraSession` - 摄像头的获取与释放
//! - `IntegrityMonitor` - 把页面信号归类为违规或本地拦截
//! - `WarningBanner` - 临时警告、阻断式提醒、跳转成绩页
//!
//! ### ③ 流程层（Workflow）
//! - `SessionCtx` - 上下文封装（exam_id + user_id）
//! - `ExamSessionController` - 一场考试的状态机（开始 → 作答 → 交卷 → 结束）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 连接浏览器，启动会话，转交终端命令
//!
//! ## 模块结构

pub mod browser;
pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod platform;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::connect_to_exam_page;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::JsExecutor;
pub use models::{OptionLabel, Question, SessionPhase, ViolationKind};
pub use orchestrator::App;
pub use workflow::{
    ExamSessionController, SessionCtx, SessionDeps, SessionHandle, SessionOptions, SessionReport,
    SubmitTrigger,
};
