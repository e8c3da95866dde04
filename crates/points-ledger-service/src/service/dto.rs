//! 服务层数据传输对象
//!
//! 定义服务层与外部交互使用的 DTO，与内部领域模型解耦

use serde::{Deserialize, Serialize};

use crate::models::{OrderStatus, PointReason};

/// 账本入账结果
///
/// `applied = false` 表示命中幂等键，返回的是历史入账结果，余额未再变动
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerOutcome {
    pub transaction_id: i64,
    pub new_balance: i32,
    pub applied: bool,
}

impl LedgerOutcome {
    /// 本次真正入账
    pub fn applied(transaction_id: i64, new_balance: i32) -> Self {
        Self {
            transaction_id,
            new_balance,
            applied: true,
        }
    }

    /// 幂等命中，返回历史结果
    pub fn replayed(transaction_id: i64, new_balance: i32) -> Self {
        Self {
            transaction_id,
            new_balance,
            applied: false,
        }
    }
}

/// 订单行请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub product_id: i64,
    pub quantity: i32,
}

/// 创建订单请求
#[derive(Debug, Clone)]
pub struct CreateOrderRequest {
    pub user_id: String,
    pub items: Vec<OrderLineRequest>,
    pub coupon_id: Option<i64>,
    /// 下单时抵扣的积分
    pub points_used: i32,
    /// 运费（分），免运费券会将其清零
    pub shipping_fee: i64,
}

impl CreateOrderRequest {
    pub fn new(user_id: impl Into<String>, items: Vec<OrderLineRequest>) -> Self {
        Self {
            user_id: user_id.into(),
            items,
            coupon_id: None,
            points_used: 0,
            shipping_fee: 0,
        }
    }

    pub fn with_coupon(mut self, coupon_id: i64) -> Self {
        self.coupon_id = Some(coupon_id);
        self
    }

    pub fn with_points_used(mut self, points_used: i32) -> Self {
        self.points_used = points_used;
        self
    }

    pub fn with_shipping_fee(mut self, shipping_fee: i64) -> Self {
        self.shipping_fee = shipping_fee;
        self
    }
}

/// 创建订单响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub order_id: i64,
    pub order_no: String,
    pub total_amount: i64,
    pub discount_amount: i64,
    pub shipping_fee: i64,
    pub payable_amount: i64,
    pub points_earned: i32,
    pub points_used: i32,
}

/// 订单状态变更响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusChangeResponse {
    pub order_id: i64,
    pub order_no: String,
    pub from_status: OrderStatus,
    pub to_status: OrderStatus,
}

/// 竞猜提交响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerResponse {
    pub submission_id: i64,
    pub points_spent: i32,
    pub new_balance: i32,
}

/// 竞猜公布答案响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishAnswerResponse {
    pub contest_id: i64,
    pub total_submissions: i64,
    pub correct_count: i64,
    /// 本次批量发放的奖励积分总数
    pub points_awarded: i64,
}

/// 投票响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub vote_id: i64,
    pub entry_id: i64,
    pub new_balance: i32,
}

/// 撤票响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveVoteResponse {
    pub entry_id: i64,
    pub new_balance: i32,
}

/// 折扣试算结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountPreview {
    pub coupon_id: i64,
    pub discount_amount: i64,
    pub free_shipping: bool,
}

/// 积分流水 DTO
///
/// 对外展示用户流水时使用，隐藏内部幂等键
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDto {
    pub id: i64,
    pub amount: i32,
    pub reason: PointReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub balance_after: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<crate::models::PointTransaction> for TransactionDto {
    fn from(tx: crate::models::PointTransaction) -> Self {
        Self {
            id: tx.id,
            amount: tx.amount,
            reason: tx.reason,
            notes: tx.notes,
            balance_after: tx.balance_after,
            created_at: tx.created_at,
        }
    }
}
