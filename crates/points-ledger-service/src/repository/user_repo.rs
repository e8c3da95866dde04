//! 积分账户仓储
//!
//! 余额变更只提供条件更新：`points + amount >= 0` 写入谓词，
//! 并发扣减在数据库层被拦截，不存在读改写竞态。

use sqlx::{PgConnection, PgPool, Row};

use crate::error::Result;
use crate::models::User;

/// 积分账户仓储
pub struct UserRepository {
    pool: PgPool,
}

const USER_COLUMNS: &str = r#"
    SELECT id, points, created_at, updated_at
    FROM users
"#;

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 按 ID 查询账户
    pub async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("{USER_COLUMNS} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// 查询账户当前余额
    pub async fn get_points(&self, id: &str) -> Result<Option<i32>> {
        let row = sqlx::query("SELECT points FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get("points")))
    }

    /// 在事务中查询账户当前余额
    pub async fn get_points_in_tx(tx: &mut PgConnection, id: &str) -> Result<Option<i32>> {
        let row = sqlx::query("SELECT points FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(tx)
            .await?;

        Ok(row.map(|r| r.get("points")))
    }

    /// 在事务中条件调整余额
    ///
    /// 单条 UPDATE 携带非负谓词，返回调整后的余额；
    /// 账户不存在或扣减后会为负时无行命中，返回 None，由调用方区分原因。
    pub async fn adjust_points_in_tx(
        tx: &mut PgConnection,
        id: &str,
        amount: i32,
    ) -> Result<Option<i32>> {
        let row = sqlx::query(
            r#"
            UPDATE users
            SET points = points + $2, updated_at = NOW()
            WHERE id = $1 AND points + $2 >= 0
            RETURNING points
            "#,
        )
        .bind(id)
        .bind(amount)
        .fetch_optional(tx)
        .await?;

        Ok(row.map(|r| r.get("points")))
    }
}
