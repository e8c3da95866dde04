//! 仓储 Trait 定义
//!
//! 定义仓储接口，便于服务层依赖抽象而非具体实现，支持 mock 测试

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Order, OrderItem, PointReason, PointTransaction};

/// 积分流水仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PointTransactionRepositoryTrait: Send + Sync {
    async fn get_by_idempotency_key(&self, key: &str) -> Result<Option<PointTransaction>>;
    async fn get_by_id(&self, id: i64) -> Result<Option<PointTransaction>>;
    async fn list_by_user(
        &self,
        user_id: &str,
        reason: Option<PointReason>,
        limit: i64,
    ) -> Result<Vec<PointTransaction>>;
}

/// 订单仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepositoryTrait: Send + Sync {
    async fn get_order(&self, id: i64) -> Result<Option<Order>>;
    async fn list_by_user(&self, user_id: &str, limit: i64) -> Result<Vec<Order>>;
    async fn list_items(&self, order_id: i64) -> Result<Vec<OrderItem>>;
}
