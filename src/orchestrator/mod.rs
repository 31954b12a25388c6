//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层是整个系统的"指挥中心"：持有浏览器资源，启动考试会话，
//! 把考生在终端的操作转交给会话。
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 管理应用生命周期（初始化、运行）
//! - 管理浏览器资源（Browser、JsExecutor、页面信号源）
//! - 交卷后拉取并展示成绩
//!
//! ### `console` - 终端命令
//! - 把一行输入解析为作答 / 交卷 / 查看状态 / 退出
//!
//! ## 层次关系
//!
//! ```text
//! app (持有 Browser，读取终端输入)
//!     ↓
//! workflow::ExamSessionController (一场考试的完整生命周期)
//!     ↓
//! services (能力层：计时 / 摄像头 / 完整性监控 / 提示)
//!     ↓
//! platform + clients (页面信号、摄像头设备、考试与监考后端)
//!     ↓
//! infrastructure (基础设施：JsExecutor)
//! ```

pub mod app;
pub mod console;

pub use app::App;
pub use console::{ConsoleCommand, ConsoleParser};
