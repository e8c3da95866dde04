//! 结算链路集成测试
//!
//! 端到端验证订单、竞猜、投票三条结算路径对账本的影响：
//! 完成加分幂等、取消对称回退、抵扣退还至多一次、票数与积分同步、
//! 公布答案全有或全无。
//!
//! ## 运行方式
//!
//! ```bash
//! DATABASE_URL=postgres://... REDIS_URL=redis://... \
//!   cargo test --test settlement_flow_test -- --ignored
//! ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use loyalty_shared::cache::Cache;
use loyalty_shared::config::RedisConfig;
use points_ledger::error::LedgerError;
use points_ledger::models::{LedgerEntry, OrderStatus, PointReason};
use points_ledger::repository::{
    ContestRepository, CouponRepository, OrderRepository, PointTransactionRepository,
    UserRepository, VotingRepository,
};
use points_ledger::service::dto::{CreateOrderRequest, OrderLineRequest};
use points_ledger::service::{ContestService, LedgerService, OrderService, VotingService};

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

struct Services {
    ledger: Arc<LedgerService>,
    orders: OrderService,
    contests: ContestService,
    voting: VotingService,
}

fn setup_services(pool: &PgPool) -> Services {
    let redis_config = RedisConfig {
        url: redis_url(),
        pool_size: 2,
    };
    let cache = Arc::new(Cache::new(&redis_config).expect("Redis connection failed"));

    let ledger = Arc::new(LedgerService::new(
        Arc::new(PointTransactionRepository::new(pool.clone())),
        Arc::new(UserRepository::new(pool.clone())),
        cache,
        pool.clone(),
    ));
    let orders = OrderService::new(
        Arc::new(OrderRepository::new(pool.clone())),
        Arc::new(CouponRepository::new(pool.clone())),
        ledger.clone(),
        pool.clone(),
    );
    let contests = ContestService::new(
        Arc::new(ContestRepository::new(pool.clone())),
        ledger.clone(),
        pool.clone(),
    );
    let voting = VotingService::new(
        Arc::new(VotingRepository::new(pool.clone())),
        ledger.clone(),
        pool.clone(),
    );

    Services {
        ledger,
        orders,
        contests,
        voting,
    }
}

/// 插入本轮独占账户
async fn seed_user(pool: &PgPool, points: i32) -> String {
    let user_id = format!("it-flow-{}", Uuid::new_v4());
    sqlx::query("INSERT INTO users (id, points) VALUES ($1, $2)")
        .bind(&user_id)
        .bind(points)
        .execute(pool)
        .await
        .expect("插入测试账户失败");
    user_id
}

/// 插入商品，返回 ID
async fn seed_product(pool: &PgPool, price: i64, stock: i32, points_reward: i32) -> i64 {
    sqlx::query_scalar(
        r#"
        INSERT INTO products (name, price, stock, purchase_count, points_reward, is_active)
        VALUES ('IntegTest 商品', $1, $2, 0, $3, true)
        RETURNING id
        "#,
    )
    .bind(price)
    .bind(stock)
    .bind(points_reward)
    .fetch_one(pool)
    .await
    .expect("插入测试商品失败")
}

async fn product_stock(pool: &PgPool, product_id: i64) -> i32 {
    sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_one(pool)
        .await
        .expect("查询库存失败")
}

/// 标记订单已支付（支付回调属外部协作方，测试直接落库）
async fn mark_paid(pool: &PgPool, order_id: i64) {
    sqlx::query("UPDATE orders SET payment_status = 'paid' WHERE id = $1")
        .bind(order_id)
        .execute(pool)
        .await
        .expect("更新支付状态失败");
}

/// 沿状态机把已支付订单推进到 completed
async fn drive_to_completed(services: &Services, order_id: i64) {
    for status in [
        OrderStatus::Processing,
        OrderStatus::WaitingConfirmation,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Completed,
    ] {
        services
            .orders
            .update_status(order_id, status, None)
            .await
            .expect("状态推进失败");
    }
}

/// 插入进行中的竞猜，返回 ID
async fn seed_open_contest(pool: &PgPool, points_per_answer: i32, reward_points: i32) -> i64 {
    let now = Utc::now();
    sqlx::query_scalar(
        r#"
        INSERT INTO contests
            (title, question, points_per_answer, reward_points, is_answer_published,
             status, start_at, end_at)
        VALUES ('IntegTest 竞猜', '比分？', $1, $2, false, 'open', $3, $4)
        RETURNING id
        "#,
    )
    .bind(points_per_answer)
    .bind(reward_points)
    .bind(now - Duration::hours(1))
    .bind(now + Duration::hours(1))
    .fetch_one(pool)
    .await
    .expect("插入测试竞猜失败")
}

/// 插入进行中的投票活动与一个已审核选项，返回 (campaign_id, entry_id)
async fn seed_campaign_with_entry(
    pool: &PgPool,
    points_per_vote: i32,
    max_votes_per_user: i32,
) -> (i64, i64) {
    let now = Utc::now();
    let campaign_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO voting_campaigns
            (title, status, points_per_vote, max_votes_per_user, voting_frequency,
             start_at, end_at)
        VALUES ('IntegTest 投票', 'active', $1, $2, 'unlimited', $3, $4)
        RETURNING id
        "#,
    )
    .bind(points_per_vote)
    .bind(max_votes_per_user)
    .bind(now - Duration::days(1))
    .bind(now + Duration::days(1))
    .fetch_one(pool)
    .await
    .expect("插入测试活动失败");

    let entry_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO vote_entries (campaign_id, title, status, vote_count)
        VALUES ($1, '选手 A', 'approved', 0)
        RETURNING id
        "#,
    )
    .bind(campaign_id)
    .fetch_one(pool)
    .await
    .expect("插入测试选项失败");

    (campaign_id, entry_id)
}

async fn entry_vote_count(pool: &PgPool, entry_id: i64) -> i32 {
    sqlx::query_scalar("SELECT vote_count FROM vote_entries WHERE id = $1")
        .bind(entry_id)
        .fetch_one(pool)
        .await
        .expect("查询票数失败")
}

// ==================== 订单结算 ====================

#[tokio::test]
#[ignore] // 需要数据库和 Redis
async fn test_order_completion_awards_points_exactly_once() {
    let pool = connect().await;
    let services = setup_services(&pool);
    let user_id = seed_user(&pool, 0).await;
    let product_id = seed_product(&pool, 10000, 10, 7).await;

    let response = services
        .orders
        .create_order(CreateOrderRequest::new(
            &user_id,
            vec![OrderLineRequest {
                product_id,
                quantity: 2,
            }],
        ))
        .await
        .unwrap();
    // points_earned 在创建时固化
    assert_eq!(response.points_earned, 14);
    assert_eq!(product_stock(&pool, product_id).await, 8);

    mark_paid(&pool, response.order_id).await;
    drive_to_completed(&services, response.order_id).await;
    assert_eq!(services.ledger.balance(&user_id).await.unwrap(), 14);

    // 同一完成事件重放：幂等键命中，余额不变
    let (order, _) = services.orders.get_order(response.order_id).await.unwrap();
    let replay = services
        .ledger
        .apply(LedgerEntry::new(
            &user_id,
            14,
            PointReason::OrderCompletion,
            order.completion_key(),
        ))
        .await
        .unwrap();
    assert!(!replay.applied);
    assert_eq!(services.ledger.balance(&user_id).await.unwrap(), 14);
}

#[tokio::test]
#[ignore]
async fn test_cancel_after_complete_revokes_exact_amount() {
    let pool = connect().await;
    let services = setup_services(&pool);
    let user_id = seed_user(&pool, 0).await;
    let product_id = seed_product(&pool, 5000, 5, 10).await;

    let response = services
        .orders
        .create_order(CreateOrderRequest::new(
            &user_id,
            vec![OrderLineRequest {
                product_id,
                quantity: 1,
            }],
        ))
        .await
        .unwrap();
    mark_paid(&pool, response.order_id).await;
    drive_to_completed(&services, response.order_id).await;
    assert_eq!(services.ledger.balance(&user_id).await.unwrap(), 10);

    // 完成后取消：撤销量 == 发放量，余额回到基线，库存回补
    services
        .orders
        .update_status(response.order_id, OrderStatus::Cancelled, None)
        .await
        .unwrap();
    assert_eq!(services.ledger.balance(&user_id).await.unwrap(), 0);
    assert_eq!(product_stock(&pool, product_id).await, 5);

    let history = services.ledger.history(&user_id, None, 10).await.unwrap();
    assert_eq!(history[0].reason, PointReason::OrderCompletionReversal);
    assert_eq!(history[0].amount, -10);
}

#[tokio::test]
#[ignore]
async fn test_cancel_pending_refunds_points_used_once() {
    let pool = connect().await;
    let services = setup_services(&pool);
    let user_id = seed_user(&pool, 100).await;
    let product_id = seed_product(&pool, 3000, 5, 0).await;

    let response = services
        .orders
        .create_order(
            CreateOrderRequest::new(
                &user_id,
                vec![OrderLineRequest {
                    product_id,
                    quantity: 1,
                }],
            )
            .with_points_used(20),
        )
        .await
        .unwrap();
    // 下单即扣抵扣积分
    assert_eq!(services.ledger.balance(&user_id).await.unwrap(), 80);

    // 待处理状态取消：退还抵扣，标记已退还
    services
        .orders
        .update_status(response.order_id, OrderStatus::Cancelled, None)
        .await
        .unwrap();
    assert_eq!(services.ledger.balance(&user_id).await.unwrap(), 100);

    let (order, _) = services.orders.get_order(response.order_id).await.unwrap();
    assert!(order.points_refunded);
    assert_eq!(product_stock(&pool, product_id).await, 5);

    // 重复退还被幂等键挡住
    let replay = services
        .ledger
        .apply(LedgerEntry::new(
            &user_id,
            20,
            PointReason::OrderPointsRefund,
            order.points_refund_key(),
        ))
        .await
        .unwrap();
    assert!(!replay.applied);
    assert_eq!(services.ledger.balance(&user_id).await.unwrap(), 100);
}

#[tokio::test]
#[ignore]
async fn test_unpaid_order_cannot_enter_fulfillment() {
    let pool = connect().await;
    let services = setup_services(&pool);
    let user_id = seed_user(&pool, 0).await;
    let product_id = seed_product(&pool, 1000, 5, 1).await;

    let response = services
        .orders
        .create_order(CreateOrderRequest::new(
            &user_id,
            vec![OrderLineRequest {
                product_id,
                quantity: 1,
            }],
        ))
        .await
        .unwrap();

    let err = services
        .orders
        .update_status(response.order_id, OrderStatus::Processing, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::PaymentRequired(_)));

    // 跳级流转同样被拒绝
    let err = services
        .orders
        .update_status(response.order_id, OrderStatus::Shipped, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidTransition { .. }));
}

#[tokio::test]
#[ignore]
async fn test_order_rejects_when_stock_insufficient() {
    let pool = connect().await;
    let services = setup_services(&pool);
    let user_id = seed_user(&pool, 0).await;
    let product_id = seed_product(&pool, 1000, 1, 0).await;

    let err = services
        .orders
        .create_order(CreateOrderRequest::new(
            &user_id,
            vec![OrderLineRequest {
                product_id,
                quantity: 2,
            }],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::OutOfStock(_)));
    // 整单回滚，库存未被占用
    assert_eq!(product_stock(&pool, product_id).await, 1);
}

// ==================== 优惠券 ====================

#[tokio::test]
#[ignore]
async fn test_coupon_usage_updates_with_order_atomically() {
    let pool = connect().await;
    let services = setup_services(&pool);
    let user_id = seed_user(&pool, 0).await;
    let product_id = seed_product(&pool, 10000, 10, 0).await;

    let now = Utc::now();
    let coupon_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO coupons
            (code, coupon_type, discount_value, is_active, valid_from, valid_until, usage_limit)
        VALUES ($1, 'fixed_amount', 3000, true, $2, $3, 1)
        RETURNING id
        "#,
    )
    .bind(format!("IT-{}", Uuid::new_v4()))
    .bind(now - Duration::days(1))
    .bind(now + Duration::days(1))
    .fetch_one(&pool)
    .await
    .unwrap();

    let response = services
        .orders
        .create_order(
            CreateOrderRequest::new(
                &user_id,
                vec![OrderLineRequest {
                    product_id,
                    quantity: 1,
                }],
            )
            .with_coupon(coupon_id),
        )
        .await
        .unwrap();
    assert_eq!(response.discount_amount, 3000);
    assert_eq!(response.payable_amount, 7000);

    // 用量统计与订单同事务落库
    let (used_count, total_discount): (i32, i64) = sqlx::query_as(
        "SELECT used_count, total_discount_given FROM coupons WHERE id = $1",
    )
    .bind(coupon_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(used_count, 1);
    assert_eq!(total_discount, 3000);

    // 用量上限已到，第二单被拒绝
    let err = services
        .orders
        .create_order(
            CreateOrderRequest::new(
                &user_id,
                vec![OrderLineRequest {
                    product_id,
                    quantity: 1,
                }],
            )
            .with_coupon(coupon_id),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::CouponNotApplicable(_)));
}

// ==================== 竞猜结算 ====================

/// 典型场景：0 分提交被拒 -> 发 10 分提交成功 -> 公布答案得 50 分
#[tokio::test]
#[ignore]
async fn test_contest_entry_fee_and_reward_scenario() {
    let pool = connect().await;
    let services = setup_services(&pool);
    let user_id = seed_user(&pool, 0).await;
    let contest_id = seed_open_contest(&pool, 10, 50).await;

    // 余额不足，提交被拒，余额保持 0
    let err = services
        .contests
        .submit_answer(contest_id, &user_id, "2:1")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
    assert_eq!(services.ledger.balance(&user_id).await.unwrap(), 0);

    // 发 10 分后重新提交成功，报名费被扣光
    services
        .ledger
        .apply(LedgerEntry::new(
            &user_id,
            10,
            PointReason::AdminGrant,
            format!("test:grant:{}", Uuid::new_v4()),
        ))
        .await
        .unwrap();
    let submission = services
        .contests
        .submit_answer(contest_id, &user_id, "2:1")
        .await
        .unwrap();
    assert_eq!(submission.points_spent, 10);
    assert_eq!(submission.new_balance, 0);

    // 公布正确答案：答对者入账奖励，提交被标记
    let publish = services
        .contests
        .publish_answer(contest_id, " 2:1 ", "it-admin")
        .await
        .unwrap();
    assert_eq!(publish.total_submissions, 1);
    assert_eq!(publish.correct_count, 1);
    assert_eq!(publish.points_awarded, 50);
    assert_eq!(services.ledger.balance(&user_id).await.unwrap(), 50);

    let submissions = services.contests.list_submissions(contest_id).await.unwrap();
    assert_eq!(submissions[0].is_correct, Some(true));
    assert_eq!(submissions[0].reward_points_earned, Some(50));

    // 公布后竞猜锁定：不再接受提交，也不能重复结算
    let err = services
        .contests
        .submit_answer(contest_id, &user_id, "2:1")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::ContestClosed(_)));

    let err = services
        .contests
        .publish_answer(contest_id, "2:1", "it-admin")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyProcessed(_)));
    assert_eq!(services.ledger.balance(&user_id).await.unwrap(), 50);
}

#[tokio::test]
#[ignore]
async fn test_contest_wrong_answers_not_awarded() {
    let pool = connect().await;
    let services = setup_services(&pool);
    let winner = seed_user(&pool, 10).await;
    let loser = seed_user(&pool, 10).await;
    let contest_id = seed_open_contest(&pool, 10, 30).await;

    services
        .contests
        .submit_answer(contest_id, &winner, "YES")
        .await
        .unwrap();
    services
        .contests
        .submit_answer(contest_id, &loser, "no")
        .await
        .unwrap();

    let publish = services
        .contests
        .publish_answer(contest_id, "yes", "it-admin")
        .await
        .unwrap();
    assert_eq!(publish.total_submissions, 2);
    assert_eq!(publish.correct_count, 1);

    // 大小写不敏感判定：答对者得奖，答错者只损失报名费
    assert_eq!(services.ledger.balance(&winner).await.unwrap(), 30);
    assert_eq!(services.ledger.balance(&loser).await.unwrap(), 0);
}

// ==================== 投票结算 ====================

#[tokio::test]
#[ignore]
async fn test_vote_and_remove_keep_count_and_points_in_lockstep() {
    let pool = connect().await;
    let services = setup_services(&pool);
    let user_id = seed_user(&pool, 0).await;
    let (campaign_id, entry_id) = seed_campaign_with_entry(&pool, 2, 5).await;

    // 投票：票数与积分同增
    let vote = services
        .voting
        .vote(campaign_id, entry_id, &user_id)
        .await
        .unwrap();
    assert_eq!(vote.new_balance, 2);
    assert_eq!(entry_vote_count(&pool, entry_id).await, 1);

    // 重复投票被拒，两边都不变
    let err = services
        .voting
        .vote(campaign_id, entry_id, &user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyVoted { .. }));
    assert_eq!(entry_vote_count(&pool, entry_id).await, 1);
    assert_eq!(services.ledger.balance(&user_id).await.unwrap(), 2);

    // 撤票：票数与积分同减
    let removed = services
        .voting
        .remove_vote(campaign_id, entry_id, &user_id)
        .await
        .unwrap();
    assert_eq!(removed.new_balance, 0);
    assert_eq!(entry_vote_count(&pool, entry_id).await, 0);

    // 再撤一次：记录已不存在
    let err = services
        .voting
        .remove_vote(campaign_id, entry_id, &user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::VoteNotFound { .. }));
}

#[tokio::test]
#[ignore]
async fn test_vote_limit_across_entries() {
    let pool = connect().await;
    let services = setup_services(&pool);
    let user_id = seed_user(&pool, 0).await;
    let (campaign_id, entry_a) = seed_campaign_with_entry(&pool, 1, 1).await;

    let entry_b: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO vote_entries (campaign_id, title, status, vote_count)
        VALUES ($1, '选手 B', 'approved', 0)
        RETURNING id
        "#,
    )
    .bind(campaign_id)
    .fetch_one(&pool)
    .await
    .unwrap();

    services
        .voting
        .vote(campaign_id, entry_a, &user_id)
        .await
        .unwrap();

    // 活动内总票数上限跨选项生效
    let err = services
        .voting
        .vote(campaign_id, entry_b, &user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::VoteLimitReached { .. }));
    assert_eq!(entry_vote_count(&pool, entry_b).await, 0);
    assert_eq!(services.ledger.balance(&user_id).await.unwrap(), 1);
}
