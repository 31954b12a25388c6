//! 考试会话数据
//!
//! 会话状态机：
//!
//! ```text
//! Initializing ──► Active ──► Submitting ──► Submitted
//! ```
//!
//! `Active → Submitting` 只会发生一次；之后答案和剩余时间都不再变化。

use crate::models::question::{OptionLabel, QuestionId};
use serde::Serialize;
use std::collections::HashMap;

/// 会话阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    Initializing,
    Active,
    Submitting,
    Submitted,
}

/// 上传给后端的一条答案
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerEntry {
    pub question_id: QuestionId,
    pub selected_option: OptionLabel,
}

/// 作答记录
///
/// 每个题目只保留最后一次选择，输出顺序为首次作答的顺序。
#[derive(Debug, Clone, Default)]
pub struct AnswerStore {
    index: HashMap<QuestionId, usize>,
    entries: Vec<AnswerEntry>,
}

impl AnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, question_id: QuestionId, option: OptionLabel) {
        match self.index.get(&question_id) {
            Some(&pos) => self.entries[pos].selected_option = option,
            None => {
                self.index.insert(question_id.clone(), self.entries.len());
                self.entries.push(AnswerEntry {
                    question_id,
                    selected_option: option,
                });
            }
        }
    }

    pub fn get(&self, question_id: &str) -> Option<OptionLabel> {
        self.index
            .get(question_id)
            .map(|&pos| self.entries[pos].selected_option)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_entries(&self) -> Vec<AnswerEntry> {
        self.entries.clone()
    }
}

/// 一名学生对一场考试的作答会话
#[derive(Debug, Clone)]
pub struct Session {
    pub exam_id: String,
    pub user_id: String,
    pub duration_seconds: i64,
    remaining_seconds: i64,
    answers: AnswerStore,
    phase: SessionPhase,
}

impl Session {
    pub fn new(exam_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            exam_id: exam_id.into(),
            user_id: user_id.into(),
            duration_seconds: 0,
            remaining_seconds: 0,
            answers: AnswerStore::new(),
            phase: SessionPhase::Initializing,
        }
    }

    /// 进入作答阶段，时长单位为分钟
    pub fn activate(&mut self, duration_minutes: u32) {
        if self.phase != SessionPhase::Initializing {
            return;
        }
        self.duration_seconds = i64::from(duration_minutes) * 60;
        self.remaining_seconds = self.duration_seconds;
        self.phase = SessionPhase::Active;
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::Active
    }

    pub fn is_submitted(&self) -> bool {
        self.phase == SessionPhase::Submitted
    }

    pub fn remaining_seconds(&self) -> i64 {
        self.remaining_seconds
    }

    pub fn answers(&self) -> &AnswerStore {
        &self.answers
    }

    /// 记录答案；非作答阶段静默忽略，返回是否生效
    pub fn record_answer(&mut self, question_id: QuestionId, option: OptionLabel) -> bool {
        if !self.is_active() {
            return false;
        }
        self.answers.upsert(question_id, option);
        true
    }

    /// 同步计时器的剩余秒数
    pub fn set_remaining(&mut self, remaining: i64) {
        if self.is_active() {
            self.remaining_seconds = remaining;
        }
    }

    /// 提交闸门：只有第一次调用会拿到答案快照
    pub fn begin_submission(&mut self) -> Option<Vec<AnswerEntry>> {
        if self.phase != SessionPhase::Active {
            return None;
        }
        self.phase = SessionPhase::Submitting;
        Some(self.answers.to_entries())
    }

    pub fn mark_submitted(&mut self) {
        if self.phase == SessionPhase::Submitting {
            self.phase = SessionPhase::Submitted;
        }
    }
}
