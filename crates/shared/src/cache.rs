//! Redis 缓存管理模块
//!
//! 提供 Redis 连接管理和常用缓存操作封装。

use crate::config::RedisConfig;
use crate::error::{LoyaltyError, Result};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::{info, instrument};

/// Redis 缓存客户端
#[derive(Clone)]
pub struct Cache {
    client: Client,
}

impl Cache {
    /// 创建 Redis 客户端
    pub fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;
        info!("Redis client created");
        Ok(Self { client })
    }

    /// 获取连接
    async fn get_conn(&self) -> Result<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(LoyaltyError::from)
    }

    /// 健康检查
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.get_conn().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(LoyaltyError::from)
    }

    /// 获取值
    #[instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.get_conn().await?;
        let value: Option<String> = conn.get(key).await?;

        match value {
            Some(v) => {
                let parsed: T = serde_json::from_str(&v).map_err(|e| {
                    LoyaltyError::Internal(format!("Cache deserialization error: {}", e))
                })?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    /// 设置值
    #[instrument(skip(self, value))]
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let mut conn = self.get_conn().await?;
        let serialized = serde_json::to_string(value)
            .map_err(|e| LoyaltyError::Internal(format!("Cache serialization error: {}", e)))?;

        let _: () = conn.set_ex(key, serialized, ttl.as_secs()).await?;
        Ok(())
    }

    /// 删除值
    #[instrument(skip(self))]
    pub async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.get_conn().await?;
        let _: () = conn.del(key).await?;
        Ok(())
    }

    /// 批量删除（按模式）
    #[instrument(skip(self))]
    pub async fn delete_pattern(&self, pattern: &str) -> Result<u64> {
        let mut conn = self.get_conn().await?;
        let keys: Vec<String> = conn.keys(pattern).await?;

        if keys.is_empty() {
            return Ok(0);
        }

        let deleted: u64 = conn.del(&keys).await?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // 需要 Redis 连接
    async fn test_cache_roundtrip() {
        let cache = Cache::new(&RedisConfig::default()).unwrap();
        cache
            .set("test:key", &"value".to_string(), Duration::from_secs(10))
            .await
            .unwrap();
        let value: Option<String> = cache.get("test:key").await.unwrap();
        assert_eq!(value, Some("value".to_string()));
        cache.delete("test:key").await.unwrap();
    }
}
