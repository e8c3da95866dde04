//! 订单仓储
//!
//! 提供订单与订单明细的数据访问，支持事务和行级锁

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Row};

use super::traits::OrderRepositoryTrait;
use crate::error::Result;
use crate::models::{Order, OrderItem, OrderStatus};

/// 订单仓储
pub struct OrderRepository {
    pool: PgPool,
}

const ORDER_COLUMNS: &str = r#"
    SELECT id, order_no, user_id, status, payment_status, total_amount,
           discount_amount, shipping_fee, coupon_id, points_earned,
           points_used, points_refunded, created_at, updated_at
    FROM orders
"#;

const ITEM_COLUMNS: &str = r#"
    SELECT id, order_id, product_id, product_name, quantity, unit_price,
           points_reward, created_at
    FROM order_items
"#;

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 查询操作 ====================

    /// 按 ID 查询订单
    pub async fn get_order(&self, id: i64) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!("{ORDER_COLUMNS} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    /// 列出用户订单
    ///
    /// 按创建时间倒序，返回最近 limit 条
    pub async fn list_by_user(&self, user_id: &str, limit: i64) -> Result<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            r#"
            {ORDER_COLUMNS}
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// 查询订单明细
    pub async fn list_items(&self, order_id: i64) -> Result<Vec<OrderItem>> {
        let items =
            sqlx::query_as::<_, OrderItem>(&format!("{ITEM_COLUMNS} WHERE order_id = $1 ORDER BY id"))
                .bind(order_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(items)
    }

    // ==================== 事务操作 ====================

    /// 在事务中按 ID 查询订单（带行级锁）
    ///
    /// 使用 FOR UPDATE 锁定行，串行化同一订单的并发状态变更
    pub async fn get_order_for_update(tx: &mut PgConnection, id: i64) -> Result<Option<Order>> {
        let order =
            sqlx::query_as::<_, Order>(&format!("{ORDER_COLUMNS} WHERE id = $1 FOR UPDATE"))
                .bind(id)
                .fetch_optional(tx)
                .await?;

        Ok(order)
    }

    /// 在事务中创建订单
    ///
    /// 返回新订单 ID
    pub async fn create_order_in_tx(tx: &mut PgConnection, order: &Order) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO orders
                (order_no, user_id, status, payment_status, total_amount, discount_amount,
                 shipping_fee, coupon_id, points_earned, points_used, points_refunded,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
            RETURNING id
            "#,
        )
        .bind(&order.order_no)
        .bind(&order.user_id)
        .bind(order.status)
        .bind(order.payment_status)
        .bind(order.total_amount)
        .bind(order.discount_amount)
        .bind(order.shipping_fee)
        .bind(order.coupon_id)
        .bind(order.points_earned)
        .bind(order.points_used)
        .bind(order.points_refunded)
        .bind(order.created_at)
        .fetch_one(tx)
        .await?;

        Ok(row.get("id"))
    }

    /// 在事务中创建订单明细
    pub async fn create_item_in_tx(tx: &mut PgConnection, item: &OrderItem) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO order_items
                (order_id, product_id, product_name, quantity, unit_price, points_reward, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(item.order_id)
        .bind(item.product_id)
        .bind(&item.product_name)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.points_reward)
        .bind(item.created_at)
        .fetch_one(tx)
        .await?;

        Ok(row.get("id"))
    }

    /// 在事务中查询订单明细
    pub async fn list_items_in_tx(tx: &mut PgConnection, order_id: i64) -> Result<Vec<OrderItem>> {
        let items =
            sqlx::query_as::<_, OrderItem>(&format!("{ITEM_COLUMNS} WHERE order_id = $1 ORDER BY id"))
                .bind(order_id)
                .fetch_all(tx)
                .await?;

        Ok(items)
    }

    /// 在事务中更新订单状态
    pub async fn update_status_in_tx(
        tx: &mut PgConnection,
        id: i64,
        status: OrderStatus,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .execute(tx)
        .await?;

        Ok(())
    }

    /// 在事务中标记抵扣积分已退还
    pub async fn mark_points_refunded_in_tx(tx: &mut PgConnection, id: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE orders
            SET points_refunded = true, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(tx)
        .await?;

        Ok(())
    }

    /// 在事务中固化完成时的奖励积分
    ///
    /// 仅用于历史订单缺失快照时的恢复路径
    pub async fn update_points_earned_in_tx(
        tx: &mut PgConnection,
        id: i64,
        points_earned: i32,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE orders
            SET points_earned = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(points_earned)
        .execute(tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl OrderRepositoryTrait for OrderRepository {
    async fn get_order(&self, id: i64) -> Result<Option<Order>> {
        self.get_order(id).await
    }

    async fn list_by_user(&self, user_id: &str, limit: i64) -> Result<Vec<Order>> {
        self.list_by_user(user_id, limit).await
    }

    async fn list_items(&self, order_id: i64) -> Result<Vec<OrderItem>> {
        self.list_items(order_id).await
    }
}
