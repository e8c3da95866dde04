//! JWT Token 处理
//!
//! 认证由外部系统负责签发，这里只保留验证与解析；
//! 生成接口用于测试和本地联调。

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// JWT 配置
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// 签名密钥
    pub secret: String,
    /// Token 过期时间（秒）
    pub expires_in_secs: i64,
    /// Token 签发者
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: "loyalty-api-secret-key-change-in-production".to_string(),
            expires_in_secs: 86400, // 24 小时
            issuer: "loyalty-api-service".to_string(),
        }
    }
}

/// JWT Claims（Token 载荷）
///
/// 账本核心信任这里给出的主体身份，不再二次校验
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// 用户 ID
    pub sub: String,
    /// 角色：user 或 admin
    pub role: String,
    /// 签发时间
    pub iat: i64,
    /// 过期时间
    pub exp: i64,
    /// 签发者
    pub iss: String,
}

impl Claims {
    /// 是否为管理员
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// JWT 管理器
#[derive(Clone)]
pub struct JwtManager {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtManager {
    /// 创建 JWT 管理器
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// 生成 JWT Token
    pub fn generate_token(&self, user_id: &str, role: &str) -> Result<(String, i64), ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.config.expires_in_secs);

        let claims = Claims {
            sub: user_id.to_string(),
            role: role.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.issuer.clone(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Internal(format!("JWT 生成失败: {}", e)))?;

        Ok((token, exp.timestamp()))
    }

    /// 验证并解析 JWT Token
    pub fn verify_token(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ApiError::Unauthorized("Token 已过期".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    ApiError::Unauthorized("无效的 Token".to_string())
                }
                _ => ApiError::Unauthorized(format!("Token 验证失败: {}", e)),
            },
        )?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_and_verify_token() {
        let manager = JwtManager::new(JwtConfig::default());

        let (token, _exp) = manager.generate_token("user-123", "user").unwrap();
        let claims = manager.verify_token(&token).unwrap();

        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.role, "user");
        assert!(!claims.is_admin());
    }

    #[test]
    fn test_admin_claims() {
        let manager = JwtManager::new(JwtConfig::default());
        let (token, _) = manager.generate_token("admin-1", "admin").unwrap();
        let claims = manager.verify_token(&token).unwrap();
        assert!(claims.is_admin());
    }

    #[test]
    fn test_invalid_token() {
        let manager = JwtManager::new(JwtConfig::default());
        assert!(manager.verify_token("invalid.token.here").is_err());
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let issuer_a = JwtManager::new(JwtConfig {
            issuer: "other-service".to_string(),
            ..JwtConfig::default()
        });
        let verifier = JwtManager::new(JwtConfig::default());

        let (token, _) = issuer_a.generate_token("user-1", "user").unwrap();
        assert!(verifier.verify_token(&token).is_err());
    }
}
