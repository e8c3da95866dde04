//! HTTP 请求处理器
//!
//! 处理器只做三件事：校验请求、调用领域服务、包装统一响应

pub mod contest;
pub mod coupon;
pub mod order;
pub mod points;
pub mod reward;
pub mod voting;
