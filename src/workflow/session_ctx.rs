//! 考试会话上下文
//!
//! 封装"哪位考生在考哪场考试"这一信息

use std::fmt::Display;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCtx {
    pub exam_id: String,
    pub user_id: String,
}

impl SessionCtx {
    pub fn new(exam_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            exam_id: exam_id.into(),
            user_id: user_id.into(),
        }
    }
}

impl Display for SessionCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[考试 ID#{} 考生#{}]", self.exam_id, self.user_id)
    }
}
