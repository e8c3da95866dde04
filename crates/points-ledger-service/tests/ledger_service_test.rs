//! LedgerService 集成测试
//!
//! 使用真实 PostgreSQL 和 Redis 验证账本核心不变量：
//! 幂等入账、余额非负、冲正补偿、并发扣减。
//!
//! ## 运行方式
//!
//! ```bash
//! DATABASE_URL=postgres://... REDIS_URL=redis://... \
//!   cargo test --test ledger_service_test -- --ignored
//! ```

use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use loyalty_shared::cache::Cache;
use loyalty_shared::config::RedisConfig;
use points_ledger::error::LedgerError;
use points_ledger::models::{LedgerEntry, PointReason};
use points_ledger::repository::{PointTransactionRepository, UserRepository};
use points_ledger::service::LedgerService;

// ==================== 辅助函数 ====================

fn database_url() -> String {
    std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests")
}

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
}

async fn connect() -> PgPool {
    PgPool::connect(&database_url())
        .await
        .expect("数据库连接失败")
}

fn setup_ledger_service(pool: &PgPool) -> LedgerService {
    let tx_repo = Arc::new(PointTransactionRepository::new(pool.clone()));
    let user_repo = Arc::new(UserRepository::new(pool.clone()));
    let redis_config = RedisConfig {
        url: redis_url(),
        pool_size: 2,
    };
    let cache = Arc::new(Cache::new(&redis_config).expect("Redis connection failed"));
    LedgerService::new(tx_repo, user_repo, cache, pool.clone())
}

/// 插入一个本轮测试独占的账户，返回其 ID
///
/// 每轮用随机 ID 隔离，避免历史流水干扰断言
async fn seed_user(pool: &PgPool, points: i32) -> String {
    let user_id = format!("it-ledger-{}", Uuid::new_v4());
    sqlx::query("INSERT INTO users (id, points) VALUES ($1, $2)")
        .bind(&user_id)
        .bind(points)
        .execute(pool)
        .await
        .expect("插入测试账户失败");
    user_id
}

fn unique_key(prefix: &str) -> String {
    format!("{}:{}", prefix, Uuid::new_v4())
}

// ==================== 入账 ====================

#[tokio::test]
#[ignore] // 需要数据库和 Redis
async fn test_apply_credit_records_transaction() {
    let pool = connect().await;
    let service = setup_ledger_service(&pool);
    let user_id = seed_user(&pool, 0).await;

    let key = unique_key("test:credit");
    let entry = LedgerEntry::new(&user_id, 50, PointReason::AdminGrant, &key)
        .with_admin("it-admin")
        .with_notes("集成测试发放");
    let outcome = service.apply(entry).await.unwrap();

    assert!(outcome.applied);
    assert_eq!(outcome.new_balance, 50);
    assert_eq!(service.balance(&user_id).await.unwrap(), 50);

    // 余额变动必须留痕
    let history = service.history(&user_id, None, 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].amount, 50);
    assert_eq!(history[0].balance_after, 50);
    assert_eq!(history[0].idempotency_key, key);
    assert_eq!(history[0].admin_id.as_deref(), Some("it-admin"));
}

#[tokio::test]
#[ignore]
async fn test_apply_same_key_is_idempotent() {
    let pool = connect().await;
    let service = setup_ledger_service(&pool);
    let user_id = seed_user(&pool, 0).await;

    let key = unique_key("test:idem");
    let entry = LedgerEntry::new(&user_id, 30, PointReason::AdminGrant, &key);

    let first = service.apply(entry.clone()).await.unwrap();
    let second = service.apply(entry).await.unwrap();

    assert!(first.applied);
    // 重放返回首次结果，余额不再变动
    assert!(!second.applied);
    assert_eq!(second.transaction_id, first.transaction_id);
    assert_eq!(second.new_balance, 30);
    assert_eq!(service.balance(&user_id).await.unwrap(), 30);

    let history = service.history(&user_id, None, 10).await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
#[ignore]
async fn test_debit_insufficient_balance_rejected() {
    let pool = connect().await;
    let service = setup_ledger_service(&pool);
    let user_id = seed_user(&pool, 5).await;

    let entry = LedgerEntry::new(
        &user_id,
        -10,
        PointReason::ContestParticipation,
        unique_key("test:debit"),
    );
    let err = service.apply(entry).await.unwrap_err();

    assert!(matches!(
        err,
        LedgerError::InsufficientBalance {
            required: 10,
            actual: 5
        }
    ));
    // 无部分扣减，也无流水残留
    assert_eq!(service.balance(&user_id).await.unwrap(), 5);
    assert!(service.history(&user_id, None, 10).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore]
async fn test_apply_unknown_user_rejected() {
    let pool = connect().await;
    let service = setup_ledger_service(&pool);

    let entry = LedgerEntry::new(
        "it-no-such-user",
        10,
        PointReason::AdminGrant,
        unique_key("test:nouser"),
    );
    let err = service.apply(entry).await.unwrap_err();
    assert!(matches!(err, LedgerError::UserNotFound(_)));
}

// ==================== 冲正 ====================

#[tokio::test]
#[ignore]
async fn test_reverse_creates_compensating_entry() {
    let pool = connect().await;
    let service = setup_ledger_service(&pool);
    let user_id = seed_user(&pool, 0).await;

    let outcome = service
        .apply(LedgerEntry::new(
            &user_id,
            80,
            PointReason::AdminGrant,
            unique_key("test:rev"),
        ))
        .await
        .unwrap();
    assert_eq!(outcome.new_balance, 80);

    let reversed = service
        .reverse(outcome.transaction_id, Some("it-admin".to_string()), None)
        .await
        .unwrap();
    assert!(reversed.applied);
    assert_eq!(reversed.new_balance, 0);

    // 原流水保留，补偿流水为负向新记录
    let history = service.history(&user_id, None, 10).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].amount, -80);
    assert_eq!(history[0].reason, PointReason::AdminGrantReversal);
    assert_eq!(history[1].amount, 80);

    // 同一笔流水重复冲正幂等
    let again = service
        .reverse(outcome.transaction_id, None, None)
        .await
        .unwrap();
    assert!(!again.applied);
    assert_eq!(service.balance(&user_id).await.unwrap(), 0);
}

#[tokio::test]
#[ignore]
async fn test_reverse_unmapped_reason_rejected() {
    let pool = connect().await;
    let service = setup_ledger_service(&pool);
    let user_id = seed_user(&pool, 0).await;

    let outcome = service
        .apply(LedgerEntry::new(
            &user_id,
            5,
            PointReason::CheckIn,
            unique_key("test:norev"),
        ))
        .await
        .unwrap();

    let err = service
        .reverse(outcome.transaction_id, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotReversible(_)));
    assert_eq!(service.balance(&user_id).await.unwrap(), 5);
}

// ==================== 并发 ====================

#[tokio::test]
#[ignore]
async fn test_concurrent_debits_never_go_negative() {
    let pool = connect().await;
    let service = Arc::new(setup_ledger_service(&pool));
    let user_id = seed_user(&pool, 10).await;

    // 5 个并发扣减，每次 10 分，余额只够一次
    let mut handles = Vec::new();
    for i in 0..5 {
        let service = service.clone();
        let user_id = user_id.clone();
        handles.push(tokio::spawn(async move {
            service
                .apply(LedgerEntry::new(
                    &user_id,
                    -10,
                    PointReason::ContestParticipation,
                    format!("test:race:{}:{}", user_id, i),
                ))
                .await
        }));
    }

    let mut success = 0;
    let mut insufficient = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(outcome) => {
                assert!(outcome.applied);
                success += 1;
            }
            Err(LedgerError::InsufficientBalance { .. }) => insufficient += 1,
            Err(e) => panic!("意外错误: {:?}", e),
        }
    }

    assert_eq!(success, 1, "只应有一次扣减成功");
    assert_eq!(insufficient, 4);
    assert_eq!(service.balance(&user_id).await.unwrap(), 0);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_same_key_applies_once() {
    let pool = connect().await;
    let service = Arc::new(setup_ledger_service(&pool));
    let user_id = seed_user(&pool, 0).await;

    let key = unique_key("test:samekey");
    let mut handles = Vec::new();
    for _ in 0..5 {
        let service = service.clone();
        let user_id = user_id.clone();
        let key = key.clone();
        handles.push(tokio::spawn(async move {
            service
                .apply(LedgerEntry::new(&user_id, 25, PointReason::AdminGrant, key))
                .await
        }));
    }

    let mut applied = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(outcome) if outcome.applied => applied += 1,
            // 重放命中或唯一索引拦截都是合法结果
            Ok(_) | Err(LedgerError::AlreadyProcessed(_)) => {}
            Err(e) => panic!("意外错误: {:?}", e),
        }
    }

    assert_eq!(applied, 1, "同一幂等键只应入账一次");
    assert_eq!(service.balance(&user_id).await.unwrap(), 25);

    let history = service.history(&user_id, None, 10).await.unwrap();
    assert_eq!(history.len(), 1);
}
