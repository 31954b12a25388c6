use phf::phf_map;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 违规事件的描述（按上报时使用的事件名索引）
static EVENT_DESCRIPTIONS: phf::Map<&'static str, &'static str> = phf_map! {
    "tab_switch" => "Student switched browser tab",
    "window_blur" => "Student clicked outside browser window",
    "webcam_denied" => "Student denied webcam access",
    "webcam_disconnected" => "Webcam disconnected during exam",
};

/// 违规类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// 页面不可见（切换标签页）
    TabSwitch,
    /// 窗口失去焦点
    WindowBlur,
    /// 摄像头获取失败
    WebcamDenied,
    /// 摄像头在考试中断开
    WebcamDisconnected,
}

impl ViolationKind {
    /// 上报给账本的事件名
    pub fn as_str(self) -> &'static str {
        match self {
            ViolationKind::TabSwitch => "tab_switch",
            ViolationKind::WindowBlur => "window_blur",
            ViolationKind::WebcamDenied => "webcam_denied",
            ViolationKind::WebcamDisconnected => "webcam_disconnected",
        }
    }

    pub fn description(self) -> &'static str {
        EVENT_DESCRIPTIONS
            .get(self.as_str())
            .copied()
            .unwrap_or("Unknown violation")
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 账本对一次上报的裁决
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerDecision {
    pub count: u32,
    pub max_allowed: u32,
    pub auto_submitted: bool,
    pub remaining_allowance: u32,
}

/// 账本违规记录的本地镜像
///
/// 只是账本返回值的拷贝，从不在本地自增，也不会变小。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViolationRecord {
    pub user_id: String,
    pub exam_id: String,
    pub count: u32,
    pub max_allowed: u32,
    pub last_event_kind: Option<ViolationKind>,
}

impl ViolationRecord {
    pub fn new(user_id: impl Into<String>, exam_id: impl Into<String>, max_allowed: u32) -> Self {
        Self {
            user_id: user_id.into(),
            exam_id: exam_id.into(),
            count: 0,
            max_allowed,
            last_event_kind: None,
        }
    }

    /// 用账本的初始状态覆盖镜像
    pub fn sync(&mut self, count: u32, max_allowed: u32) {
        self.count = self.count.max(count);
        self.max_allowed = max_allowed;
    }

    /// 应用一次上报的裁决
    pub fn apply(&mut self, kind: ViolationKind, decision: &LedgerDecision) {
        self.count = self.count.max(decision.count);
        if decision.max_allowed > 0 {
            self.max_allowed = decision.max_allowed;
        }
        self.last_event_kind = Some(kind);
    }

    pub fn is_exhausted(&self) -> bool {
        self.max_allowed > 0 && self.count >= self.max_allowed
    }
}
