//! 积分账本服务
//!
//! 提供积分平台的核心领域逻辑：积分账本、订单结算、竞猜结算、投票结算、
//! 行为奖励和优惠券计算。
//!
//! ## 核心功能
//!
//! - **积分账本**：用户积分余额的唯一变更入口，幂等、可逆、全量留痕
//! - **订单结算**：订单完成加分、取消撤销、积分抵扣退还、库存回补
//! - **竞猜结算**：提交扣费、公布答案时批量发奖（全有或全无）
//! - **投票结算**：投票加分与票数同步变更，撤票同步回退
//! - **行为奖励**：签到、问卷、评价、邀请等一次性奖励
//! - **优惠券**：折扣计算与使用资格校验
//!
//! ## 模块结构
//!
//! - `models`: 领域模型定义
//! - `error`: 错误类型定义
//! - `repository`: 数据库仓储层
//! - `service`: 业务服务层
//!
//! ## 一致性约定
//!
//! `users.points` 只允许通过 [`service::LedgerService`] 变更：条件更新保证
//! 余额不为负，幂等键唯一索引保证同一业务事件至多入账一次，多表变更统一
//! 包在单个数据库事务内。

pub mod error;
pub mod models;
pub mod repository;
pub mod service;

pub use error::{LedgerError, Result};
pub use models::*;
pub use repository::{
    ContestRepository, CouponRepository, OrderRepository, PointTransactionRepository,
    ProductRepository, UserRepository, VotingRepository,
};
pub use service::{
    ContestService, LedgerService, OrderService, RewardService, VotingService, dto,
};
