//! 优惠券仓储
//!
//! 提供优惠券查询与用量统计更新。用量统计必须与订单创建同事务提交，
//! 避免中途崩溃造成统计与订单不一致。

use sqlx::{PgConnection, PgPool};

use crate::error::Result;
use crate::models::Coupon;

/// 优惠券仓储
pub struct CouponRepository {
    pool: PgPool,
}

const COUPON_COLUMNS: &str = r#"
    SELECT id, code, coupon_type, discount_value, is_active, valid_from, valid_until,
           usage_limit, used_count, min_order_amount, min_quantity, allowed_user_ids,
           applicable_product_ids, excluded_product_ids, total_discount_given,
           total_orders_affected, created_at, updated_at
    FROM coupons
"#;

impl CouponRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 按 ID 查询优惠券
    pub async fn get_coupon(&self, id: i64) -> Result<Option<Coupon>> {
        let coupon = sqlx::query_as::<_, Coupon>(&format!("{COUPON_COLUMNS} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(coupon)
    }

    /// 按券码查询优惠券
    pub async fn get_by_code(&self, code: &str) -> Result<Option<Coupon>> {
        let coupon = sqlx::query_as::<_, Coupon>(&format!("{COUPON_COLUMNS} WHERE code = $1"))
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(coupon)
    }

    /// 在事务中登记一次使用
    ///
    /// 条件更新：用量上限在谓词中二次校验，并发用尽时返回 false，
    /// 由调用方回滚整单
    pub async fn record_usage_in_tx(
        tx: &mut PgConnection,
        coupon_id: i64,
        discount_amount: i64,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE coupons
            SET used_count = used_count + 1,
                total_discount_given = total_discount_given + $2,
                total_orders_affected = total_orders_affected + 1,
                updated_at = NOW()
            WHERE id = $1
              AND is_active = true
              AND (usage_limit IS NULL OR used_count < usage_limit)
            "#,
        )
        .bind(coupon_id)
        .bind(discount_amount)
        .execute(tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
