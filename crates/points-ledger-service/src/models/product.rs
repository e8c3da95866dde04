//! 商品实体定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 商品
///
/// 订单创建时从这里快照单价与积分奖励；取消时库存与销量在此回补
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    /// 单价（分）
    pub price: i64,
    /// 可售库存
    pub stock: i32,
    /// 累计销量
    pub purchase_count: i32,
    /// 单件购买奖励积分
    pub points_reward: i32,
    /// 是否在售
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// 是否有足够库存
    pub fn has_stock(&self, quantity: i32) -> bool {
        self.stock >= quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_stock() {
        let product = Product {
            id: 1,
            name: "测试商品".to_string(),
            price: 9900,
            stock: 5,
            purchase_count: 0,
            points_reward: 10,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(product.has_stock(5));
        assert!(!product.has_stock(6));
    }
}
