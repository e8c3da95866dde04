//! 积分服务枚举类型定义
//!
//! 所有枚举都支持数据库（sqlx）和 JSON（serde）序列化

use serde::{Deserialize, Serialize};

/// 积分变动原因
///
/// 账本的封闭枚举，线上的每一条流水都必须归入其中之一。
/// 线上取值为 kebab-case（如 `order-completion`），与流水表存储格式一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "varchar", rename_all = "kebab-case")]
pub enum PointReason {
    /// 每日签到
    CheckIn,
    /// 邀请新用户
    Referral,
    /// 反馈奖励
    Feedback,
    /// 预测获胜
    PredictionWin,
    /// 运营手动发放
    AdminGrant,
    /// 连续签到加成
    StreakBonus,
    /// 问卷完成
    SurveyCompletion,
    /// 订单完成奖励
    OrderCompletion,
    /// 投票奖励
    Vote,
    /// 撤票回退
    VoteRemoval,
    /// 竞猜参与（报名费扣减）
    ContestParticipation,
    /// 竞猜获胜奖励
    ContestWin,
    /// 评价奖励
    ReviewReward,
    /// 下单时积分抵扣
    OrderPointsSpent,
    /// 订单取消退还抵扣积分
    OrderPointsRefund,
    /// 订单完成奖励撤销（完成后取消）
    OrderCompletionReversal,
    /// 竞猜奖励撤销
    ContestWinReversal,
    /// 运营发放撤销
    AdminGrantReversal,
}

impl PointReason {
    /// 返回该原因对应的冲正原因
    ///
    /// 冲正以新流水入账，原流水永不修改。未定义映射的原因不可冲正。
    pub fn reversal(&self) -> Option<PointReason> {
        match self {
            Self::OrderCompletion => Some(Self::OrderCompletionReversal),
            Self::OrderPointsSpent => Some(Self::OrderPointsRefund),
            Self::Vote => Some(Self::VoteRemoval),
            Self::ContestWin => Some(Self::ContestWinReversal),
            Self::AdminGrant => Some(Self::AdminGrantReversal),
            _ => None,
        }
    }

    /// 是否为冲正类原因
    pub fn is_reversal(&self) -> bool {
        matches!(
            self,
            Self::OrderCompletionReversal
                | Self::OrderPointsRefund
                | Self::VoteRemoval
                | Self::ContestWinReversal
                | Self::AdminGrantReversal
        )
    }
}

/// 订单状态
///
/// 生命周期：pending -> waiting_payment|processing -> waiting_confirmation
/// -> shipped -> delivered -> completed；任一非取消状态均可进入 cancelled，
/// 从 completed 进入 cancelled 会触发奖励撤销。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum OrderStatus {
    /// 待处理 - 订单已创建
    #[default]
    Pending,
    /// 待支付
    WaitingPayment,
    /// 处理中 - 已支付，备货中
    Processing,
    /// 待确认
    WaitingConfirmation,
    /// 已发货
    Shipped,
    /// 已送达
    Delivered,
    /// 已完成 - 触发积分奖励结算
    Completed,
    /// 已取消 - 触发退还/撤销结算
    Cancelled,
}

impl OrderStatus {
    /// 检查状态流转是否合法
    pub fn can_transition_to(self, to: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, to) {
            // 取消：除已取消外任意状态均可进入（含已完成，触发撤销）
            (Cancelled, Cancelled) => false,
            (_, Cancelled) => true,
            (Pending, WaitingPayment) | (Pending, Processing) => true,
            (WaitingPayment, Processing) => true,
            (Processing, WaitingConfirmation) => true,
            (WaitingConfirmation, Shipped) => true,
            (Shipped, Delivered) => true,
            (Delivered, Completed) => true,
            _ => false,
        }
    }

    /// 进入该状态是否要求订单已完成支付
    pub fn requires_paid(self) -> bool {
        matches!(
            self,
            Self::Processing | Self::Shipped | Self::Delivered | Self::Completed
        )
    }

    /// 是否为完成前状态（用于判定取消时的退还路径）
    pub fn is_pre_completion(self) -> bool {
        !matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// 支付状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum PaymentStatus {
    /// 未支付
    #[default]
    Unpaid,
    /// 已支付
    Paid,
    /// 已退款
    Refunded,
}

/// 竞猜状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum ContestStatus {
    /// 未开始
    #[default]
    Scheduled,
    /// 进行中 - 接受答案提交
    Open,
    /// 已结束 - 答案已公布，奖励已结算
    Finished,
    /// 已取消
    Cancelled,
}

/// 投票活动状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum CampaignStatus {
    /// 草稿 - 配置中，不接受投票
    #[default]
    Draft,
    /// 进行中
    Active,
    /// 已结束
    Finished,
    /// 已取消
    Cancelled,
}

/// 投票选项状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum EntryStatus {
    /// 待审核 - 不可投票
    #[default]
    Pending,
    /// 已通过 - 可投票
    Approved,
    /// 已驳回
    Rejected,
}

/// 投票频率限制
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum VotingFrequency {
    /// 不限频率（仍受 max_votes_per_user 约束）
    #[default]
    Unlimited,
    /// 每日一票
    Daily,
}

/// 优惠券类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum CouponType {
    /// 折扣百分比（如 10% off）
    Percentage,
    /// 固定金额（如减 50 元）
    FixedAmount,
    /// 免运费
    FreeShipping,
}
