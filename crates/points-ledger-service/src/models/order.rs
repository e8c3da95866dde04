//! 订单相关实体定义
//!
//! 订单是积分结算的主要触发源：完成时加分，取消时退还或撤销。
//! 金额字段统一以分为单位。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{OrderStatus, PaymentStatus};

/// 订单
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    /// 订单号（对外展示，幂等键以此为锚点）
    pub order_no: String,
    pub user_id: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    /// 商品总金额（分）
    pub total_amount: i64,
    /// 优惠券折扣金额（分）
    pub discount_amount: i64,
    /// 运费（分）
    pub shipping_fee: i64,
    /// 使用的优惠券
    #[sqlx(default)]
    pub coupon_id: Option<i64>,
    /// 完成时应奖励的积分（创建时按商品快照计算并固化）
    pub points_earned: i32,
    /// 下单时抵扣消耗的积分
    pub points_used: i32,
    /// 抵扣积分是否已退还（防止重复退还）
    pub points_refunded: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// 应付金额（分）：商品总额 - 折扣 + 运费
    pub fn payable_amount(&self) -> i64 {
        (self.total_amount - self.discount_amount).max(0) + self.shipping_fee
    }

    /// 取消时是否需要退还抵扣积分
    pub fn needs_points_refund(&self) -> bool {
        self.points_used > 0 && !self.points_refunded
    }

    /// 订单完成结算的幂等键
    pub fn completion_key(&self) -> String {
        format!("order:{}:completion", self.order_no)
    }

    /// 完成后取消的撤销幂等键
    pub fn completion_reversal_key(&self) -> String {
        format!("order:{}:completion-reversal", self.order_no)
    }

    /// 抵扣积分退还的幂等键
    pub fn points_refund_key(&self) -> String {
        format!("order:{}:points-refund", self.order_no)
    }

    /// 下单抵扣扣分的幂等键
    pub fn points_spent_key(&self) -> String {
        format!("order:{}:points-spent", self.order_no)
    }
}

/// 订单明细
///
/// 单价与积分奖励在创建时从商品快照，后续商品变价不影响已有订单
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    /// 商品名称快照
    pub product_name: String,
    pub quantity: i32,
    /// 成交单价快照（分）
    pub unit_price: i64,
    /// 单件积分奖励快照
    pub points_reward: i32,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    /// 该明细行的小计金额（分）
    pub fn subtotal(&self) -> i64 {
        self.unit_price * self.quantity as i64
    }

    /// 该明细行贡献的积分奖励
    pub fn points_subtotal(&self) -> i32 {
        self.points_reward * self.quantity
    }
}

/// 按明细快照汇总订单积分奖励
///
/// 主路径使用创建时固化的 `points_earned`；当历史订单未固化（取值非正）时
/// 以此函数从明细快照恢复，快照值不受商品后续变更影响
pub fn sum_points_earned(items: &[OrderItem]) -> i32 {
    items.iter().map(OrderItem::points_subtotal).sum()
}
