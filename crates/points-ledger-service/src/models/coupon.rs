//! 优惠券实体与折扣计算
//!
//! 折扣计算是纯函数：百分比折扣、固定金额、免运费三种类型。
//! 使用资格校验包含有效期、用户白名单、订单门槛与商品适用范围。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use super::enums::CouponType;
use crate::error::{LedgerError, Result};

/// 优惠券
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: i64,
    /// 券码，唯一
    pub code: String,
    pub coupon_type: CouponType,
    /// 折扣值：百分比类型为 0-100 的百分数，固定金额类型为分，
    /// 免运费类型不参与金额计算
    pub discount_value: i64,
    pub is_active: bool,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    /// 总使用次数上限，空为不限
    #[sqlx(default)]
    pub usage_limit: Option<i32>,
    /// 已使用次数
    pub used_count: i32,
    /// 最低订单金额（分）
    #[sqlx(default)]
    pub min_order_amount: Option<i64>,
    /// 最低商品总件数
    #[sqlx(default)]
    pub min_quantity: Option<i32>,
    /// 用户白名单，空为全员可用
    #[sqlx(default)]
    pub allowed_user_ids: Option<Json<Vec<String>>>,
    /// 适用商品列表，空为全部商品
    #[sqlx(default)]
    pub applicable_product_ids: Option<Json<Vec<i64>>>,
    /// 排除商品列表
    #[sqlx(default)]
    pub excluded_product_ids: Option<Json<Vec<i64>>>,
    /// 累计让利金额（分），与订单创建同事务更新
    pub total_discount_given: i64,
    /// 累计影响订单数
    pub total_orders_affected: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 折扣计算所需的最小订单行视图
#[derive(Debug, Clone, Copy)]
pub struct CartLine {
    pub product_id: i64,
    pub quantity: i32,
}

impl Coupon {
    /// 优惠券当前是否有效
    ///
    /// 启用、处于有效期内、且未达使用上限
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && now >= self.valid_from
            && now <= self.valid_until
            && self
                .usage_limit
                .map(|limit| self.used_count < limit)
                .unwrap_or(true)
    }

    /// 校验指定用户与购物车是否可以使用本券
    ///
    /// 任一条件不满足即返回 [`LedgerError::CouponNotApplicable`]，
    /// 错误消息说明具体原因
    pub fn can_be_used_by(
        &self,
        user_id: &str,
        order_amount: i64,
        lines: &[CartLine],
        now: DateTime<Utc>,
    ) -> Result<()> {
        if !self.is_valid(now) {
            return Err(LedgerError::CouponNotApplicable(format!(
                "优惠券 {} 未启用、不在有效期内或已达使用上限",
                self.code
            )));
        }

        if let Some(Json(allowed)) = &self.allowed_user_ids
            && !allowed.is_empty()
            && !allowed.iter().any(|id| id == user_id)
        {
            return Err(LedgerError::CouponNotApplicable(format!(
                "优惠券 {} 仅限指定用户使用",
                self.code
            )));
        }

        if let Some(min_amount) = self.min_order_amount
            && order_amount < min_amount
        {
            return Err(LedgerError::CouponNotApplicable(format!(
                "订单金额未达到优惠券 {} 的最低门槛",
                self.code
            )));
        }

        if let Some(min_quantity) = self.min_quantity {
            let total_quantity: i32 = lines.iter().map(|l| l.quantity).sum();
            if total_quantity < min_quantity {
                return Err(LedgerError::CouponNotApplicable(format!(
                    "商品件数未达到优惠券 {} 的最低门槛",
                    self.code
                )));
            }
        }

        if let Some(Json(applicable)) = &self.applicable_product_ids
            && !applicable.is_empty()
            && !lines.iter().any(|l| applicable.contains(&l.product_id))
        {
            return Err(LedgerError::CouponNotApplicable(format!(
                "购物车中没有优惠券 {} 适用的商品",
                self.code
            )));
        }

        if let Some(Json(excluded)) = &self.excluded_product_ids
            && !excluded.is_empty()
            && lines.iter().all(|l| excluded.contains(&l.product_id))
        {
            return Err(LedgerError::CouponNotApplicable(format!(
                "购物车商品均被优惠券 {} 排除",
                self.code
            )));
        }

        Ok(())
    }

    /// 计算折扣金额（分）
    ///
    /// - 百分比：`order_amount * discount_value / 100`，整数向下取整
    /// - 固定金额：不超过订单金额
    /// - 免运费：金额折扣为 0，运费由订单构建方单独清零
    pub fn compute_discount(&self, order_amount: i64) -> i64 {
        match self.coupon_type {
            CouponType::Percentage => order_amount * self.discount_value / 100,
            CouponType::FixedAmount => self.discount_value.min(order_amount),
            CouponType::FreeShipping => 0,
        }
    }

    /// 是否免运费券
    pub fn is_free_shipping(&self) -> bool {
        self.coupon_type == CouponType::FreeShipping
    }
}
