//! 认证模块
//!
//! JWT 验证与处理器内的权限判定辅助。登录与签发由外部系统负责。

mod jwt;

pub use jwt::{Claims, JwtConfig, JwtManager};

use crate::error::{ApiError, Result};

/// 要求管理员角色
pub fn require_admin(claims: &Claims) -> Result<()> {
    if !claims.is_admin() {
        return Err(ApiError::Forbidden("需要管理员权限".to_string()));
    }
    Ok(())
}

/// 要求本人或管理员
///
/// 用户只能访问自己的订单、余额与流水；管理员不受限
pub fn require_self_or_admin(claims: &Claims, user_id: &str) -> Result<()> {
    if claims.sub != user_id && !claims.is_admin() {
        return Err(ApiError::Forbidden("仅允许访问本人数据".to_string()));
    }
    Ok(())
}
