//! 应用状态定义
//!
//! 包含 Axum 路由共享的应用状态

use std::sync::Arc;

use sqlx::PgPool;

use loyalty_shared::cache::Cache;
use points_ledger::repository::{
    ContestRepository, CouponRepository, OrderRepository, PointTransactionRepository,
    UserRepository, VotingRepository,
};
use points_ledger::service::{
    ContestService, LedgerService, OrderService, RewardService, VotingService,
};

use crate::auth::{JwtConfig, JwtManager};

/// Axum 应用共享状态
///
/// 仓储与服务在启动时装配一次，通过 Arc 在 handler 间共享
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL 连接池
    pub pool: PgPool,
    /// Redis 缓存客户端
    pub cache: Arc<Cache>,
    /// JWT 管理器
    pub jwt_manager: Arc<JwtManager>,
    /// 积分账本服务
    pub ledger: Arc<LedgerService>,
    /// 订单服务
    pub orders: Arc<OrderService>,
    /// 竞猜服务
    pub contests: Arc<ContestService>,
    /// 投票服务
    pub voting: Arc<VotingService>,
    /// 行为奖励服务
    pub rewards: Arc<RewardService>,
    /// 优惠券仓储（折扣试算直接读取）
    pub coupon_repo: Arc<CouponRepository>,
}

impl AppState {
    /// 创建应用状态并装配全部服务
    pub fn new(pool: PgPool, cache: Arc<Cache>, jwt_config: JwtConfig) -> Self {
        let tx_repo = Arc::new(PointTransactionRepository::new(pool.clone()));
        let user_repo = Arc::new(UserRepository::new(pool.clone()));
        let order_repo = Arc::new(OrderRepository::new(pool.clone()));
        let coupon_repo = Arc::new(CouponRepository::new(pool.clone()));
        let contest_repo = Arc::new(ContestRepository::new(pool.clone()));
        let voting_repo = Arc::new(VotingRepository::new(pool.clone()));

        let ledger = Arc::new(LedgerService::new(
            tx_repo,
            user_repo,
            cache.clone(),
            pool.clone(),
        ));
        let orders = Arc::new(OrderService::new(
            order_repo,
            coupon_repo.clone(),
            ledger.clone(),
            pool.clone(),
        ));
        let contests = Arc::new(ContestService::new(
            contest_repo,
            ledger.clone(),
            pool.clone(),
        ));
        let voting = Arc::new(VotingService::new(
            voting_repo,
            ledger.clone(),
            pool.clone(),
        ));
        let rewards = Arc::new(RewardService::new(ledger.clone()));

        Self {
            pool,
            cache,
            jwt_manager: Arc::new(JwtManager::new(jwt_config)),
            ledger,
            orders,
            contests,
            voting,
            rewards,
            coupon_repo,
        }
    }
}
