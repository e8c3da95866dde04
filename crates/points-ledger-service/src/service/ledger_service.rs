//! 积分账本服务
//!
//! `users.points` 的唯一变更入口。所有结算路径（订单、竞猜、投票、行为奖励）
//! 都通过这里入账，替代各调用点各自"查余额、改内存、存库、补日志"的分散写法。
//!
//! ## 入账流程
//!
//! 1. 参数校验 -> 2. 幂等键查询（命中即返回历史结果）
//!    -> 3. 条件更新余额（`points + amount >= 0` 谓词）
//!    -> 4. 插入流水 -> 5. 提交事务 -> 6. 缓存失效
//!
//! ## 并发保证
//!
//! - 余额更新是单条带谓词的 UPDATE，扣减不会把余额打负，也不存在丢失更新；
//! - 幂等键上的唯一索引兜底并发重复请求：后到者在插入流水时触发唯一冲突，
//!   整个事务回滚，表现为 `AlreadyProcessed`；
//! - 余额永远与流水同事务落库，不存在只改余额不留痕的路径。

use std::sync::Arc;
use std::time::Duration;

use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument, warn};

use loyalty_shared::cache::Cache;

use crate::error::{LedgerError, Result};
use crate::models::{LedgerEntry, PointReason, PointTransaction};
use crate::repository::{PointTransactionRepository, UserRepository};
use crate::service::dto::LedgerOutcome;

/// 缓存键生成
mod cache_keys {
    pub fn user_points(user_id: &str) -> String {
        format!("user:points:{}", user_id)
    }
}

/// 余额缓存 TTL
const BALANCE_CACHE_TTL: Duration = Duration::from_secs(60);

/// 积分账本服务
///
/// 持有连接池与缓存；跨服务组合时使用静态方法 [`LedgerService::apply_in_tx`]
/// 参与调用方事务，缓存失效由调用方在提交后完成。
pub struct LedgerService {
    tx_repo: Arc<PointTransactionRepository>,
    user_repo: Arc<UserRepository>,
    cache: Arc<Cache>,
    pool: PgPool,
}

impl LedgerService {
    pub fn new(
        tx_repo: Arc<PointTransactionRepository>,
        user_repo: Arc<UserRepository>,
        cache: Arc<Cache>,
        pool: PgPool,
    ) -> Self {
        Self {
            tx_repo,
            user_repo,
            cache,
            pool,
        }
    }

    /// 入账一条账本条目（独立事务）
    ///
    /// 幂等：同一幂等键重复调用返回首次入账结果（`applied = false`），
    /// 余额不再变动。扣减不足时返回 `InsufficientBalance`，不产生部分扣减。
    #[instrument(skip(self, entry), fields(user_id = %entry.user_id, amount = entry.amount, key = %entry.idempotency_key))]
    pub async fn apply(&self, entry: LedgerEntry) -> Result<LedgerOutcome> {
        let mut tx = self.pool.begin().await?;
        let outcome = Self::apply_in_tx(&mut tx, &entry).await?;
        tx.commit().await?;

        if outcome.applied {
            self.invalidate_balance_cache(&entry.user_id).await;
            info!(
                transaction_id = outcome.transaction_id,
                new_balance = outcome.new_balance,
                reason = ?entry.reason,
                "积分入账成功"
            );
        } else {
            info!(
                transaction_id = outcome.transaction_id,
                "幂等请求，返回已存在的流水"
            );
        }

        Ok(outcome)
    }

    /// 在调用方事务中入账一条账本条目
    ///
    /// 供订单/竞猜/投票结算在同一事务内组合多表变更使用。
    /// 调用方负责提交事务并在提交后失效余额缓存。
    pub async fn apply_in_tx(tx: &mut PgConnection, entry: &LedgerEntry) -> Result<LedgerOutcome> {
        Self::validate_entry(entry)?;

        // 1. 幂等检查：已有同键流水直接返回历史结果
        if let Some(existing) =
            PointTransactionRepository::get_by_idempotency_key_in_tx(tx, &entry.idempotency_key)
                .await?
        {
            return Ok(LedgerOutcome::replayed(
                existing.id,
                existing.balance_after,
            ));
        }

        // 2. 条件更新余额：谓词保证扣减不会为负
        let new_balance = match UserRepository::adjust_points_in_tx(
            tx,
            &entry.user_id,
            entry.amount,
        )
        .await?
        {
            Some(balance) => balance,
            None => {
                // 无行命中：区分账户不存在与余额不足
                let actual = UserRepository::get_points_in_tx(tx, &entry.user_id)
                    .await?
                    .ok_or_else(|| LedgerError::UserNotFound(entry.user_id.clone()))?;
                return Err(LedgerError::InsufficientBalance {
                    required: -entry.amount,
                    actual,
                });
            }
        };

        // 3. 插入流水：幂等键唯一索引兜底并发重复，冲突时整个事务回滚
        let record = PointTransaction {
            id: 0,
            user_id: entry.user_id.clone(),
            admin_id: entry.admin_id.clone(),
            amount: entry.amount,
            reason: entry.reason,
            idempotency_key: entry.idempotency_key.clone(),
            notes: entry.notes.clone(),
            balance_after: new_balance,
            created_at: chrono::Utc::now(),
        };
        let transaction_id = PointTransactionRepository::create_in_tx(tx, &record).await?;

        Ok(LedgerOutcome::applied(transaction_id, new_balance))
    }

    /// 冲正一条流水
    ///
    /// 以负向新流水入账，原流水不修改不删除；幂等键取
    /// `reversal:{原流水ID}`，同一笔流水重复冲正天然幂等。
    /// 原因未定义冲正映射时返回 `NotReversible`。
    #[instrument(skip(self))]
    pub async fn reverse(
        &self,
        transaction_id: i64,
        admin_id: Option<String>,
        notes: Option<String>,
    ) -> Result<LedgerOutcome> {
        let original = self
            .tx_repo
            .get_by_id(transaction_id)
            .await?
            .ok_or(LedgerError::TransactionNotFound(transaction_id))?;

        let reason = original
            .reason
            .reversal()
            .ok_or(LedgerError::NotReversible(transaction_id))?;

        let mut entry = LedgerEntry::new(
            original.user_id.clone(),
            original.reversal_amount(),
            reason,
            original.reversal_key(),
        );
        entry.admin_id = admin_id;
        entry.notes = notes;

        self.apply(entry).await
    }

    /// 查询用户余额（带缓存）
    ///
    /// 缓存故障降级为直查数据库，只记录告警不影响主流程
    #[instrument(skip(self))]
    pub async fn balance(&self, user_id: &str) -> Result<i32> {
        let cache_key = cache_keys::user_points(user_id);

        match self.cache.get::<i32>(&cache_key).await {
            Ok(Some(points)) => return Ok(points),
            Ok(None) => {}
            Err(e) => warn!(user_id = %user_id, error = %e, "余额缓存读取失败，回退数据库"),
        }

        let points = self
            .user_repo
            .get_points(user_id)
            .await?
            .ok_or_else(|| LedgerError::UserNotFound(user_id.to_string()))?;

        if let Err(e) = self.cache.set(&cache_key, &points, BALANCE_CACHE_TTL).await {
            warn!(user_id = %user_id, error = %e, "余额缓存写入失败");
        }

        Ok(points)
    }

    /// 查询用户流水（按时间倒序）
    pub async fn history(
        &self,
        user_id: &str,
        reason: Option<PointReason>,
        limit: i64,
    ) -> Result<Vec<PointTransaction>> {
        self.tx_repo.list_by_user(user_id, reason, limit).await
    }

    /// 按 ID 查询单条流水
    pub async fn get_transaction(&self, transaction_id: i64) -> Result<Option<PointTransaction>> {
        self.tx_repo.get_by_id(transaction_id).await
    }

    /// 使用户余额缓存失效
    ///
    /// 结算提交后调用；失败只记录告警，不影响已提交的入账
    pub async fn invalidate_balance_cache(&self, user_id: &str) {
        let key = cache_keys::user_points(user_id);
        if let Err(e) = self.cache.delete(&key).await {
            warn!(key = %key, error = %e, "余额缓存失效失败");
        }
    }

    /// 入账条目参数校验
    fn validate_entry(entry: &LedgerEntry) -> Result<()> {
        if entry.amount == 0 {
            return Err(LedgerError::Validation("入账金额不能为零".to_string()));
        }
        if entry.idempotency_key.trim().is_empty() {
            return Err(LedgerError::Validation("幂等键不能为空".to_string()));
        }
        if entry.user_id.trim().is_empty() {
            return Err(LedgerError::Validation("用户 ID 不能为空".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_entry_rejects_zero_amount() {
        let entry = LedgerEntry::new("user-1", 0, PointReason::CheckIn, "check-in:user-1:d");
        let err = LedgerService::validate_entry(&entry).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn test_validate_entry_rejects_blank_key() {
        let entry = LedgerEntry::new("user-1", 10, PointReason::CheckIn, "  ");
        let err = LedgerService::validate_entry(&entry).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn test_validate_entry_rejects_blank_user() {
        let entry = LedgerEntry::new("", 10, PointReason::CheckIn, "check-in:x:d");
        let err = LedgerService::validate_entry(&entry).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn test_validate_entry_accepts_debit_and_credit() {
        let credit = LedgerEntry::new("user-1", 10, PointReason::Vote, "vote:1");
        assert!(LedgerService::validate_entry(&credit).is_ok());

        let debit = LedgerEntry::new("user-1", -10, PointReason::VoteRemoval, "vote:1:removal");
        assert!(LedgerService::validate_entry(&debit).is_ok());
    }

    #[test]
    fn test_cache_key_format() {
        assert_eq!(cache_keys::user_points("u-9"), "user:points:u-9");
    }
}
