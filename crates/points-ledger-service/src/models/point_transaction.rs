//! 积分账户与流水实体定义
//!
//! 账本采用复式记账思想：余额的每一次变动都对应一条不可变流水，
//! 流水携带变动后余额与结构化幂等键，确保可追溯、可冲正、至多入账一次。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::PointReason;

/// 积分账户
///
/// `points` 为当前可用余额，非负约束由存储层 CHECK 与账本条件更新共同保证
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    /// 当前积分余额
    pub points: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 积分流水
///
/// 一次余额变动的不可变审计记录，创建后永不更新或删除。
/// 冲正以新流水入账（金额取负、原因带 reversal 标记），保留完整历史。
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PointTransaction {
    pub id: i64,
    /// 余额归属用户
    pub user_id: String,
    /// 触发变动的管理员（运营发放、竞猜发奖时记录）
    #[sqlx(default)]
    pub admin_id: Option<String>,
    /// 带符号变动值：正数加分，负数扣分，永不为零
    pub amount: i32,
    /// 变动原因
    pub reason: PointReason,
    /// 结构化幂等键，唯一标识触发事件（如 `order:SO20250801:completion`）
    pub idempotency_key: String,
    /// 备注
    #[sqlx(default)]
    pub notes: Option<String>,
    /// 变动后的余额
    pub balance_after: i32,
    pub created_at: DateTime<Utc>,
}

impl PointTransaction {
    /// 是否为加分流水
    pub fn is_credit(&self) -> bool {
        self.amount > 0
    }

    /// 冲正时应入账的金额
    pub fn reversal_amount(&self) -> i32 {
        -self.amount
    }

    /// 冲正流水的幂等键
    ///
    /// 以原流水 ID 为键，同一笔流水的冲正天然幂等
    pub fn reversal_key(&self) -> String {
        format!("reversal:{}", self.id)
    }
}

/// 待入账的账本条目
///
/// [`crate::service::LedgerService::apply`] 的输入，入账成功后物化为一条
/// [`PointTransaction`]
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub user_id: String,
    /// 带符号变动值，正数加分负数扣分
    pub amount: i32,
    pub reason: PointReason,
    /// 触发事件的唯一标识
    pub idempotency_key: String,
    pub admin_id: Option<String>,
    pub notes: Option<String>,
}

impl LedgerEntry {
    pub fn new(
        user_id: impl Into<String>,
        amount: i32,
        reason: PointReason,
        idempotency_key: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            amount,
            reason,
            idempotency_key: idempotency_key.into(),
            admin_id: None,
            notes: None,
        }
    }

    pub fn with_admin(mut self, admin_id: impl Into<String>) -> Self {
        self.admin_id = Some(admin_id.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}
