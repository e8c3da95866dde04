//! 投票相关实体定义
//!
//! 票数与积分必须同增同减：投票时选项票数 +1 且用户加分，
//! 撤票时两者同时回退，均在同一事务内完成。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{CampaignStatus, EntryStatus, VotingFrequency};

/// 投票活动
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VotingCampaign {
    pub id: i64,
    pub title: String,
    pub status: CampaignStatus,
    /// 每票奖励积分
    pub points_per_vote: i32,
    /// 单用户在本活动内的总票数上限
    pub max_votes_per_user: i32,
    /// 投票频率限制
    pub voting_frequency: VotingFrequency,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VotingCampaign {
    /// 投票窗口当前是否开放
    ///
    /// 要求状态为进行中且处于时间窗口内；撤票沿用同一窗口判定
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.status == CampaignStatus::Active && now >= self.start_at && now <= self.end_at
    }
}

/// 投票选项
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VoteEntry {
    pub id: i64,
    pub campaign_id: i64,
    pub title: String,
    pub status: EntryStatus,
    /// 当前票数，与未撤销投票记录数保持一致
    pub vote_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VoteEntry {
    /// 是否可接受投票
    pub fn is_votable(&self) -> bool {
        self.status == EntryStatus::Approved
    }
}

/// 用户投票记录
///
/// (campaign_id, entry_id, user_id) 唯一，一人对一个选项至多一票
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserVote {
    pub id: i64,
    pub campaign_id: i64,
    pub entry_id: i64,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

impl UserVote {
    /// 投票加分的幂等键
    pub fn credit_key(&self) -> String {
        format!("vote:{}", self.id)
    }

    /// 撤票扣分的幂等键
    pub fn removal_key(&self) -> String {
        format!("vote:{}:removal", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn create_test_campaign(now: DateTime<Utc>) -> VotingCampaign {
        VotingCampaign {
            id: 1,
            title: "人气评选".to_string(),
            status: CampaignStatus::Active,
            points_per_vote: 2,
            max_votes_per_user: 5,
            voting_frequency: VotingFrequency::Unlimited,
            start_at: now - Duration::days(1),
            end_at: now + Duration::days(1),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_campaign_is_open() {
        let now = Utc::now();
        let mut campaign = create_test_campaign(now);
        assert!(campaign.is_open(now));

        // 窗口外
        assert!(!campaign.is_open(now + Duration::days(2)));
        assert!(!campaign.is_open(now - Duration::days(2)));

        // 已取消
        campaign.status = CampaignStatus::Cancelled;
        assert!(!campaign.is_open(now));

        // 草稿
        campaign.status = CampaignStatus::Draft;
        assert!(!campaign.is_open(now));
    }

    #[test]
    fn test_entry_is_votable() {
        let now = Utc::now();
        let mut entry = VoteEntry {
            id: 1,
            campaign_id: 1,
            title: "选手 A".to_string(),
            status: EntryStatus::Approved,
            vote_count: 0,
            created_at: now,
            updated_at: now,
        };
        assert!(entry.is_votable());

        entry.status = EntryStatus::Pending;
        assert!(!entry.is_votable());

        entry.status = EntryStatus::Rejected;
        assert!(!entry.is_votable());
    }

    #[test]
    fn test_vote_keys() {
        let vote = UserVote {
            id: 33,
            campaign_id: 1,
            entry_id: 2,
            user_id: "user-1".to_string(),
            created_at: Utc::now(),
        };
        assert_eq!(vote.credit_key(), "vote:33");
        assert_eq!(vote.removal_key(), "vote:33:removal");
    }
}
