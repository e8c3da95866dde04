//! 积分平台 REST API 服务
//!
//! 暴露订单、竞猜、投票、行为奖励与积分账户的 JSON-over-HTTP 接口。
//!
//! ## 核心功能
//!
//! - **订单**：下单、查单、状态变更（完成/取消触发积分结算）
//! - **竞猜**：提交答案（扣报名费）、公布答案（批量发奖）
//! - **投票**：投票/撤票，票数与积分同事务变更
//! - **行为奖励**：签到、问卷、评价、邀请的一次性奖励
//! - **积分账户**：余额、流水、运营发放、流水冲正
//! - **优惠券**：购物车折扣试算
//!
//! ## 模块结构
//!
//! - `dto`: 请求和响应的数据传输对象
//! - `error`: 错误类型定义
//! - `auth`: JWT 验证与权限判定
//! - `middleware`: 认证中间件
//! - `handlers`: HTTP 请求处理器
//! - `routes`: 路由配置
//! - `state`: 应用状态
//!
//! ## 技术栈
//!
//! - Web 框架：Axum
//! - 数据验证：validator
//! - 序列化：serde (camelCase)

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

// 重新导出核心类型
pub use auth::{Claims, JwtConfig, JwtManager};
pub use dto::{ApiResponse, BalanceResponse, OrderDetailResponse};
pub use error::{ApiError, Result};
pub use state::AppState;
