//! 行为奖励服务
//!
//! 签到、问卷、评价、邀请等一次性奖励的薄封装：每个动作映射到一个
//! 结构化幂等键，"至多发放一次"完全由账本保证，无需额外去重表。

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{LedgerError, Result};
use crate::models::{LedgerEntry, PointReason};
use crate::service::dto::LedgerOutcome;
use crate::service::ledger_service::LedgerService;

/// 行为奖励服务
pub struct RewardService {
    ledger: Arc<LedgerService>,
}

impl RewardService {
    pub fn new(ledger: Arc<LedgerService>) -> Self {
        Self { ledger }
    }

    /// 问卷完成奖励：同一用户对同一问卷至多发放一次
    #[instrument(skip(self), fields(survey_id = survey_id, user_id = %user_id))]
    pub async fn complete_survey(
        &self,
        survey_id: i64,
        user_id: &str,
        points: i32,
    ) -> Result<LedgerOutcome> {
        Self::validate_points(points)?;
        let entry = LedgerEntry::new(
            user_id,
            points,
            PointReason::SurveyCompletion,
            format!("survey:{}:user:{}", survey_id, user_id),
        )
        .with_notes(format!("问卷 {} 完成奖励", survey_id));
        self.ledger.apply(entry).await
    }

    /// 评价奖励：同一条评价至多发放一次
    #[instrument(skip(self), fields(review_id = review_id, user_id = %user_id))]
    pub async fn review_reward(
        &self,
        review_id: i64,
        user_id: &str,
        points: i32,
        admin_id: Option<String>,
    ) -> Result<LedgerOutcome> {
        Self::validate_points(points)?;
        let mut entry = LedgerEntry::new(
            user_id,
            points,
            PointReason::ReviewReward,
            format!("review:{}", review_id),
        )
        .with_notes(format!("评价 {} 奖励", review_id));
        entry.admin_id = admin_id;
        self.ledger.apply(entry).await
    }

    /// 每日签到奖励：以日期入键，一天至多一次
    #[instrument(skip(self), fields(user_id = %user_id, date = %date))]
    pub async fn daily_check_in(
        &self,
        user_id: &str,
        points: i32,
        date: NaiveDate,
    ) -> Result<LedgerOutcome> {
        Self::validate_points(points)?;
        let entry = LedgerEntry::new(
            user_id,
            points,
            PointReason::CheckIn,
            format!("check-in:{}:{}", user_id, date.format("%Y-%m-%d")),
        );
        self.ledger.apply(entry).await
    }

    /// 邀请奖励：以被邀请人入键，同一新用户只计一次
    #[instrument(skip(self), fields(referrer_id = %referrer_id, invitee_id = %invitee_id))]
    pub async fn referral_bonus(
        &self,
        referrer_id: &str,
        invitee_id: &str,
        points: i32,
    ) -> Result<LedgerOutcome> {
        Self::validate_points(points)?;
        let entry = LedgerEntry::new(
            referrer_id,
            points,
            PointReason::Referral,
            format!("referral:{}", invitee_id),
        )
        .with_notes(format!("邀请用户 {} 注册", invitee_id));
        self.ledger.apply(entry).await
    }

    /// 运营发放/扣减
    ///
    /// 金额带符号，每次请求铸造独立幂等键（运营可对同一用户多次操作），
    /// 流水记录操作管理员。
    #[instrument(skip(self, notes), fields(admin_id = %admin_id, user_id = %user_id, amount = amount))]
    pub async fn admin_grant(
        &self,
        admin_id: &str,
        user_id: &str,
        amount: i32,
        notes: Option<String>,
    ) -> Result<LedgerOutcome> {
        if amount == 0 {
            return Err(LedgerError::Validation("发放金额不能为零".to_string()));
        }
        let mut entry = LedgerEntry::new(
            user_id,
            amount,
            PointReason::AdminGrant,
            format!("admin-grant:{}", Uuid::new_v4()),
        )
        .with_admin(admin_id);
        entry.notes = notes;
        self.ledger.apply(entry).await
    }

    /// 奖励积分必须为正
    fn validate_points(points: i32) -> Result<()> {
        if points <= 0 {
            return Err(LedgerError::Validation("奖励积分必须大于 0".to_string()));
        }
        Ok(())
    }
}
