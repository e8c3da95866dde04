//! 数据库仓储层
//!
//! 仓储以连接池为成员提供普通查询，以 `*_in_tx` 静态方法参与调用方事务

mod contest_repo;
mod coupon_repo;
mod ledger_repo;
mod order_repo;
mod product_repo;
mod traits;
mod user_repo;
mod voting_repo;

pub use contest_repo::ContestRepository;
pub use coupon_repo::CouponRepository;
pub use ledger_repo::PointTransactionRepository;
pub use order_repo::OrderRepository;
pub use product_repo::ProductRepository;
pub use traits::{OrderRepositoryTrait, PointTransactionRepositoryTrait};
pub use user_repo::UserRepository;
pub use voting_repo::VotingRepository;
