//! 积分流水仓储
//!
//! 提供积分流水的数据访问。流水表只插入、只查询，永不更新或删除。

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Row};

use super::traits::PointTransactionRepositoryTrait;
use crate::error::Result;
use crate::models::{PointReason, PointTransaction};

/// 积分流水仓储
///
/// 幂等键由数据库唯一索引兜底，查询接口供幂等预检与历史追溯使用
pub struct PointTransactionRepository {
    pool: PgPool,
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, user_id, admin_id, amount, reason, idempotency_key,
           notes, balance_after, created_at
    FROM point_transactions
"#;

impl PointTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 在事务中插入一条流水
    ///
    /// 返回新流水 ID。幂等键冲突会触发唯一约束错误，由错误转换层
    /// 识别为 `AlreadyProcessed`。
    pub async fn create_in_tx(tx: &mut PgConnection, record: &PointTransaction) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO point_transactions
                (user_id, admin_id, amount, reason, idempotency_key, notes, balance_after, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&record.user_id)
        .bind(&record.admin_id)
        .bind(record.amount)
        .bind(record.reason)
        .bind(&record.idempotency_key)
        .bind(&record.notes)
        .bind(record.balance_after)
        .bind(record.created_at)
        .fetch_one(tx)
        .await?;

        Ok(row.get("id"))
    }

    /// 按幂等键查询流水
    pub async fn get_by_idempotency_key(&self, key: &str) -> Result<Option<PointTransaction>> {
        let record = sqlx::query_as::<_, PointTransaction>(&format!(
            "{SELECT_COLUMNS} WHERE idempotency_key = $1"
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// 在事务中按幂等键查询流水
    pub async fn get_by_idempotency_key_in_tx(
        tx: &mut PgConnection,
        key: &str,
    ) -> Result<Option<PointTransaction>> {
        let record = sqlx::query_as::<_, PointTransaction>(&format!(
            "{SELECT_COLUMNS} WHERE idempotency_key = $1"
        ))
        .bind(key)
        .fetch_optional(tx)
        .await?;

        Ok(record)
    }

    /// 按 ID 查询流水
    pub async fn get_by_id(&self, id: i64) -> Result<Option<PointTransaction>> {
        let record =
            sqlx::query_as::<_, PointTransaction>(&format!("{SELECT_COLUMNS} WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(record)
    }

    /// 列出用户的流水记录
    ///
    /// 按时间倒序排列，可按原因过滤，返回最近的 limit 条记录
    pub async fn list_by_user(
        &self,
        user_id: &str,
        reason: Option<PointReason>,
        limit: i64,
    ) -> Result<Vec<PointTransaction>> {
        let records = sqlx::query_as::<_, PointTransaction>(&format!(
            r#"
            {SELECT_COLUMNS}
            WHERE user_id = $1
              AND ($2::varchar IS NULL OR reason = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3
            "#
        ))
        .bind(user_id)
        .bind(reason)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

#[async_trait]
impl PointTransactionRepositoryTrait for PointTransactionRepository {
    async fn get_by_idempotency_key(&self, key: &str) -> Result<Option<PointTransaction>> {
        self.get_by_idempotency_key(key).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<PointTransaction>> {
        self.get_by_id(id).await
    }

    async fn list_by_user(
        &self,
        user_id: &str,
        reason: Option<PointReason>,
        limit: i64,
    ) -> Result<Vec<PointTransaction>> {
        self.list_by_user(user_id, reason, limit).await
    }
}
