//! 积分服务错误类型
//!
//! 定义服务层的业务错误和系统错误

use thiserror::Error;

use crate::models::OrderStatus;

/// 积分服务错误类型
#[derive(Debug, Error)]
pub enum LedgerError {
    // === 账本相关错误 ===
    #[error("用户不存在: {0}")]
    UserNotFound(String),

    #[error("积分流水不存在: {0}")]
    TransactionNotFound(i64),

    #[error("积分余额不足: 需要 {required}, 实际 {actual}")]
    InsufficientBalance { required: i32, actual: i32 },

    #[error("重复的结算请求: idempotency_key={0}")]
    AlreadyProcessed(String),

    #[error("流水不可冲正: transaction_id={0}")]
    NotReversible(i64),

    // === 订单相关错误 ===
    #[error("订单不存在: {0}")]
    OrderNotFound(i64),

    #[error("订单状态流转不合法: {from:?} -> {to:?}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("订单未完成支付，不能进入履约状态: order_id={0}")]
    PaymentRequired(i64),

    #[error("商品不存在: {0}")]
    ProductNotFound(i64),

    #[error("商品库存不足: product_id={0}")]
    OutOfStock(i64),

    // === 竞猜相关错误 ===
    #[error("竞猜不存在: {0}")]
    ContestNotFound(i64),

    #[error("竞猜未开放或已结束: contest_id={0}")]
    ContestClosed(i64),

    // === 投票相关错误 ===
    #[error("投票活动不存在: {0}")]
    CampaignNotFound(i64),

    #[error("投票选项不存在: {0}")]
    EntryNotFound(i64),

    #[error("投票窗口已关闭: campaign_id={0}")]
    VotingClosed(i64),

    #[error("已为该选项投过票: campaign_id={campaign_id}, entry_id={entry_id}")]
    AlreadyVoted { campaign_id: i64, entry_id: i64 },

    #[error("已达到活动投票上限: campaign_id={campaign_id}, limit={limit}")]
    VoteLimitReached { campaign_id: i64, limit: i32 },

    #[error("今日已投票: campaign_id={0}")]
    DailyVoteLimitReached(i64),

    #[error("投票记录不存在: entry_id={entry_id}, user_id={user_id}")]
    VoteNotFound { entry_id: i64, user_id: String },

    // === 优惠券相关错误 ===
    #[error("优惠券不存在: {0}")]
    CouponNotFound(i64),

    #[error("优惠券不可用: {0}")]
    CouponNotApplicable(String),

    // === 系统错误 ===
    #[error("数据库错误: {0}")]
    Database(#[source] sqlx::Error),

    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("内部错误: {0}")]
    Internal(String),

    #[error("参数校验失败: {0}")]
    Validation(String),

    #[error("事务冲突中止，请重试")]
    TransactionAborted,
}

/// 积分服务 Result 类型别名
pub type Result<T> = std::result::Result<T, LedgerError>;

/// 幂等键唯一索引的约束名，并发重复请求触发 23505 时据此识别
const IDEMPOTENCY_KEY_CONSTRAINT: &str = "point_transactions_idempotency_key_key";

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if let Some(code) = db_err.code() {
                match code.as_ref() {
                    // 串行化失败 / 死锁：整个事务已回滚，调用方可整体重试
                    "40001" | "40P01" => return Self::TransactionAborted,
                    // 唯一约束冲突：并发重复的幂等键在索引处被拦截
                    "23505" if db_err.constraint() == Some(IDEMPOTENCY_KEY_CONSTRAINT) => {
                        return Self::AlreadyProcessed(db_err.message().to_string());
                    }
                    _ => {}
                }
            }
        }
        Self::Database(err)
    }
}

impl LedgerError {
    /// 检查是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_) | Self::TransactionAborted)
    }

    /// 检查是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        !matches!(
            self,
            Self::Database(_)
                | Self::Serialization(_)
                | Self::Internal(_)
                | Self::TransactionAborted
        )
    }

    /// 获取错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::AlreadyProcessed(_) => "ALREADY_PROCESSED",
            Self::NotReversible(_) => "NOT_REVERSIBLE",
            Self::OrderNotFound(_) => "ORDER_NOT_FOUND",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::PaymentRequired(_) => "INVALID_TRANSITION",
            Self::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            Self::OutOfStock(_) => "OUT_OF_STOCK",
            Self::ContestNotFound(_) => "CONTEST_NOT_FOUND",
            Self::ContestClosed(_) => "CONTEST_CLOSED",
            Self::CampaignNotFound(_) => "CAMPAIGN_NOT_FOUND",
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::VotingClosed(_) => "VOTING_CLOSED",
            Self::AlreadyVoted { .. } => "ALREADY_VOTED",
            Self::VoteLimitReached { .. } => "VOTE_LIMIT_REACHED",
            Self::DailyVoteLimitReached(_) => "DAILY_VOTE_LIMIT_REACHED",
            Self::VoteNotFound { .. } => "VOTE_NOT_FOUND",
            Self::CouponNotFound(_) => "COUPON_NOT_FOUND",
            Self::CouponNotApplicable(_) => "COUPON_NOT_APPLICABLE",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::TransactionAborted => "TRANSACTION_ABORTED",
        }
    }
}
