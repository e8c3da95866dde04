//! 投票服务
//!
//! 票数与积分同增同减：投票时写入记录、选项票数 +1、用户加分，
//! 撤票时三者同步回退，均在单个事务内完成，不存在票数与积分背离的中间态。
//!
//! ## 投票校验顺序
//!
//! 1. 活动开放（状态 + 时间窗口）-> 2. 选项有效且属于该活动
//!    -> 3. 未重复投票 -> 4. 活动内票数上限 -> 5. 每日频率限制
//!
//! 预检后仍可能被并发抢先，(campaign_id, entry_id, user_id) 唯一索引
//! 是最终裁判：冲突时整个事务回滚，表现为 `AlreadyVoted`。

use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, instrument};

use crate::error::{LedgerError, Result};
use crate::models::{LedgerEntry, PointReason, UserVote, VoteEntry, VotingCampaign, VotingFrequency};
use crate::repository::VotingRepository;
use crate::service::dto::{RemoveVoteResponse, VoteResponse};
use crate::service::ledger_service::LedgerService;

/// user_votes 唯一索引约束名，并发重复投票触发 23505 时据此识别
const USER_VOTE_CONSTRAINT: &str = "user_votes_campaign_id_entry_id_user_id_key";

/// 投票服务
pub struct VotingService {
    voting_repo: Arc<VotingRepository>,
    ledger: Arc<LedgerService>,
    pool: PgPool,
}

impl VotingService {
    pub fn new(
        voting_repo: Arc<VotingRepository>,
        ledger: Arc<LedgerService>,
        pool: PgPool,
    ) -> Self {
        Self {
            voting_repo,
            ledger,
            pool,
        }
    }

    /// 投出一票
    #[instrument(skip(self), fields(campaign_id = campaign_id, entry_id = entry_id, user_id = %user_id))]
    pub async fn vote(
        &self,
        campaign_id: i64,
        entry_id: i64,
        user_id: &str,
    ) -> Result<VoteResponse> {
        let now = Utc::now();
        let campaign = self.validate_campaign_open(campaign_id).await?;
        self.validate_entry(campaign_id, entry_id).await?;

        // 重复投票预检（唯一索引兜底并发场景）
        if self
            .voting_repo
            .get_vote(campaign_id, entry_id, user_id)
            .await?
            .is_some()
        {
            return Err(LedgerError::AlreadyVoted {
                campaign_id,
                entry_id,
            });
        }

        // 活动内总票数上限
        let vote_count = self
            .voting_repo
            .count_user_votes(campaign_id, user_id)
            .await?;
        if vote_count >= campaign.max_votes_per_user as i64 {
            return Err(LedgerError::VoteLimitReached {
                campaign_id,
                limit: campaign.max_votes_per_user,
            });
        }

        // 每日频率限制：当日零点起已有投票则拒绝
        if campaign.voting_frequency == VotingFrequency::Daily {
            let today_start = now.date_naive().and_time(chrono::NaiveTime::MIN).and_utc();
            let today_votes = self
                .voting_repo
                .count_user_votes_since(campaign_id, user_id, today_start)
                .await?;
            if today_votes > 0 {
                return Err(LedgerError::DailyVoteLimitReached(campaign_id));
            }
        }

        // 投票、票数、积分在同一事务内落库
        let mut tx = self.pool.begin().await?;

        let vote = UserVote {
            id: 0,
            campaign_id,
            entry_id,
            user_id: user_id.to_string(),
            created_at: now,
        };
        let vote_id = match VotingRepository::create_vote_in_tx(&mut tx, &vote).await {
            Ok(id) => id,
            Err(e) if is_duplicate_vote(&e) => {
                return Err(LedgerError::AlreadyVoted {
                    campaign_id,
                    entry_id,
                });
            }
            Err(e) => return Err(e),
        };

        VotingRepository::increment_entry_votes_in_tx(&mut tx, entry_id).await?;

        let mut new_balance = 0;
        if campaign.points_per_vote > 0 {
            let vote = UserVote { id: vote_id, ..vote };
            let entry = LedgerEntry::new(
                user_id,
                campaign.points_per_vote,
                PointReason::Vote,
                vote.credit_key(),
            )
            .with_notes(format!("投票活动「{}」奖励", campaign.title));
            let outcome = LedgerService::apply_in_tx(&mut tx, &entry).await?;
            new_balance = outcome.new_balance;
        }

        tx.commit().await?;
        self.ledger.invalidate_balance_cache(user_id).await;

        info!(vote_id = vote_id, points = campaign.points_per_vote, "投票成功");

        Ok(VoteResponse {
            vote_id,
            entry_id,
            new_balance,
        })
    }

    /// 撤销一票
    ///
    /// 仅在投票窗口开放期间允许；删除记录、票数 -1、扣回奖励积分
    /// 同事务完成。用户已把奖励积分花掉导致余额不足时整体失败。
    #[instrument(skip(self), fields(campaign_id = campaign_id, entry_id = entry_id, user_id = %user_id))]
    pub async fn remove_vote(
        &self,
        campaign_id: i64,
        entry_id: i64,
        user_id: &str,
    ) -> Result<RemoveVoteResponse> {
        let campaign = self.validate_campaign_open(campaign_id).await?;

        let mut tx = self.pool.begin().await?;

        let vote_id = VotingRepository::delete_vote_in_tx(&mut tx, campaign_id, entry_id, user_id)
            .await?
            .ok_or_else(|| LedgerError::VoteNotFound {
                entry_id,
                user_id: user_id.to_string(),
            })?;

        VotingRepository::decrement_entry_votes_in_tx(&mut tx, entry_id).await?;

        let mut new_balance = 0;
        if campaign.points_per_vote > 0 {
            let entry = LedgerEntry::new(
                user_id,
                -campaign.points_per_vote,
                PointReason::VoteRemoval,
                format!("vote:{}:removal", vote_id),
            )
            .with_notes(format!("投票活动「{}」撤票回退", campaign.title));
            let outcome = LedgerService::apply_in_tx(&mut tx, &entry).await?;
            new_balance = outcome.new_balance;
        }

        tx.commit().await?;
        self.ledger.invalidate_balance_cache(user_id).await;

        info!(vote_id = vote_id, "撤票成功");

        Ok(RemoveVoteResponse {
            entry_id,
            new_balance,
        })
    }

    /// 查询投票活动
    pub async fn get_campaign(&self, campaign_id: i64) -> Result<VotingCampaign> {
        self.voting_repo
            .get_campaign(campaign_id)
            .await?
            .ok_or(LedgerError::CampaignNotFound(campaign_id))
    }

    // ==================== 私有方法 ====================

    /// 校验活动存在且投票窗口开放
    async fn validate_campaign_open(&self, campaign_id: i64) -> Result<VotingCampaign> {
        let campaign = self.get_campaign(campaign_id).await?;
        if !campaign.is_open(Utc::now()) {
            return Err(LedgerError::VotingClosed(campaign_id));
        }
        Ok(campaign)
    }

    /// 校验选项存在、属于该活动且已通过审核
    async fn validate_entry(&self, campaign_id: i64, entry_id: i64) -> Result<VoteEntry> {
        let entry = self
            .voting_repo
            .get_entry(entry_id)
            .await?
            .filter(|e| e.campaign_id == campaign_id)
            .ok_or(LedgerError::EntryNotFound(entry_id))?;

        if !entry.is_votable() {
            return Err(LedgerError::Validation(format!(
                "投票选项未通过审核: entry_id={}",
                entry_id
            )));
        }
        Ok(entry)
    }
}

/// 识别 user_votes 唯一索引冲突（并发重复投票）
fn is_duplicate_vote(err: &LedgerError) -> bool {
    if let LedgerError::Database(sqlx::Error::Database(db_err)) = err {
        return db_err.code().as_deref() == Some("23505")
            && db_err.constraint() == Some(USER_VOTE_CONSTRAINT);
    }
    false
}
