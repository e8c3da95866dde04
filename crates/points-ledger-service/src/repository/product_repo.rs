//! 商品仓储
//!
//! 下单时条件扣减库存（`stock >= quantity` 谓词），取消时回补。

use sqlx::{PgConnection, PgPool};

use crate::error::Result;
use crate::models::Product;

/// 商品仓储
pub struct ProductRepository {
    pool: PgPool,
}

const PRODUCT_COLUMNS: &str = r#"
    SELECT id, name, price, stock, purchase_count, points_reward, is_active,
           created_at, updated_at
    FROM products
"#;

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 按 ID 查询商品
    pub async fn get_product(&self, id: i64) -> Result<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!("{PRODUCT_COLUMNS} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// 在事务中按 ID 查询商品
    pub async fn get_product_in_tx(tx: &mut PgConnection, id: i64) -> Result<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!("{PRODUCT_COLUMNS} WHERE id = $1"))
            .bind(id)
            .fetch_optional(tx)
            .await?;

        Ok(product)
    }

    /// 在事务中条件扣减库存并累计销量
    ///
    /// 库存充足性在谓词中校验，并发售罄时返回 false，由调用方回滚整单
    pub async fn reserve_stock_in_tx(
        tx: &mut PgConnection,
        product_id: i64,
        quantity: i32,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - $2,
                purchase_count = purchase_count + $2,
                updated_at = NOW()
            WHERE id = $1 AND stock >= $2
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .execute(tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 在事务中回补库存并回退销量（销量下限为 0）
    pub async fn restock_in_tx(
        tx: &mut PgConnection,
        product_id: i64,
        quantity: i32,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + $2,
                purchase_count = GREATEST(purchase_count - $2, 0),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .execute(tx)
        .await?;

        Ok(())
    }
}
