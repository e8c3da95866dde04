//! 竞猜相关实体定义
//!
//! 竞猜在时间窗口内接受付费提交，管理员公布答案时一次性批量发奖并锁定。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::ContestStatus;

/// 竞猜活动
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Contest {
    pub id: i64,
    pub title: String,
    /// 题目
    pub question: String,
    /// 正确答案，公布前为空
    #[sqlx(default)]
    pub answer: Option<String>,
    /// 单次提交的报名费（积分）
    pub points_per_answer: i32,
    /// 答对的奖励积分
    pub reward_points: i32,
    /// 答案是否已公布（公布即锁定，不再接受提交与重复结算）
    pub is_answer_published: bool,
    pub status: ContestStatus,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contest {
    /// 当前是否接受提交
    ///
    /// 要求状态为进行中、处于时间窗口内、且答案未公布
    pub fn accepts_submissions(&self, now: DateTime<Utc>) -> bool {
        self.status == ContestStatus::Open
            && !self.is_answer_published
            && now >= self.start_at
            && now <= self.end_at
    }

    /// 判定提交答案是否正确
    ///
    /// 大小写不敏感、忽略首尾空白
    pub fn is_correct_answer(correct: &str, submitted: &str) -> bool {
        correct.trim().eq_ignore_ascii_case(submitted.trim())
    }
}

/// 竞猜提交记录
///
/// 同一用户允许多次提交，每次提交独立扣费、独立判定
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ContestSubmission {
    pub id: i64,
    pub contest_id: i64,
    pub user_id: String,
    pub answer: String,
    /// 提交时扣减的报名费（固化，后续活动改价不影响）
    pub points_spent: i32,
    /// 是否答对，公布答案前为空
    #[sqlx(default)]
    pub is_correct: Option<bool>,
    /// 获得的奖励积分，公布答案时填写
    #[sqlx(default)]
    pub reward_points_earned: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl ContestSubmission {
    /// 报名扣费的幂等键
    pub fn entry_fee_key(&self) -> String {
        format!("contest-submission:{}:entry", self.id)
    }

    /// 获奖入账的幂等键
    pub fn win_key(&self) -> String {
        format!("contest-submission:{}:win", self.id)
    }
}
