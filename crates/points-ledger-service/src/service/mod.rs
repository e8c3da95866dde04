//! 服务层
//!
//! 实现积分平台业务逻辑，协调仓储层和缓存层。
//!
//! ## 模块结构
//!
//! - `dto`: 数据传输对象定义
//! - `ledger_service`: 积分账本服务（余额的唯一变更入口）
//! - `order_service`: 订单创建与状态机结算
//! - `contest_service`: 竞猜提交与批量发奖
//! - `voting_service`: 投票与撤票
//! - `reward_service`: 一次性行为奖励

pub mod dto;
pub mod contest_service;
pub mod ledger_service;
pub mod order_service;
pub mod reward_service;
pub mod voting_service;

pub use contest_service::ContestService;
pub use ledger_service::LedgerService;
pub use order_service::OrderService;
pub use reward_service::RewardService;
pub use voting_service::VotingService;
