//! 投票仓储
//!
//! 提供投票活动、选项与投票记录的数据访问。
//! (campaign_id, entry_id, user_id) 唯一索引保证一人一选项至多一票。

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Row};

use crate::error::Result;
use crate::models::{UserVote, VoteEntry, VotingCampaign};

/// 投票仓储
pub struct VotingRepository {
    pool: PgPool,
}

const CAMPAIGN_COLUMNS: &str = r#"
    SELECT id, title, status, points_per_vote, max_votes_per_user,
           voting_frequency, start_at, end_at, created_at, updated_at
    FROM voting_campaigns
"#;

const ENTRY_COLUMNS: &str = r#"
    SELECT id, campaign_id, title, status, vote_count, created_at, updated_at
    FROM vote_entries
"#;

const VOTE_COLUMNS: &str = r#"
    SELECT id, campaign_id, entry_id, user_id, created_at
    FROM user_votes
"#;

impl VotingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 按 ID 查询投票活动
    pub async fn get_campaign(&self, id: i64) -> Result<Option<VotingCampaign>> {
        let campaign =
            sqlx::query_as::<_, VotingCampaign>(&format!("{CAMPAIGN_COLUMNS} WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(campaign)
    }

    /// 按 ID 查询投票选项
    pub async fn get_entry(&self, id: i64) -> Result<Option<VoteEntry>> {
        let entry = sqlx::query_as::<_, VoteEntry>(&format!("{ENTRY_COLUMNS} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(entry)
    }

    /// 查询用户对某选项的投票记录
    pub async fn get_vote(
        &self,
        campaign_id: i64,
        entry_id: i64,
        user_id: &str,
    ) -> Result<Option<UserVote>> {
        let vote = sqlx::query_as::<_, UserVote>(&format!(
            "{VOTE_COLUMNS} WHERE campaign_id = $1 AND entry_id = $2 AND user_id = $3"
        ))
        .bind(campaign_id)
        .bind(entry_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(vote)
    }

    /// 统计用户在活动内的总票数
    pub async fn count_user_votes(&self, campaign_id: i64, user_id: &str) -> Result<i64> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS cnt
            FROM user_votes
            WHERE campaign_id = $1 AND user_id = $2
            "#,
        )
        .bind(campaign_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("cnt"))
    }

    /// 统计用户在活动内自某时刻起的票数
    ///
    /// 用于 daily 频率限制：传入当日零点
    pub async fn count_user_votes_since(
        &self,
        campaign_id: i64,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<i64> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS cnt
            FROM user_votes
            WHERE campaign_id = $1 AND user_id = $2 AND created_at >= $3
            "#,
        )
        .bind(campaign_id)
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("cnt"))
    }

    // ==================== 事务操作 ====================

    /// 在事务中创建投票记录
    ///
    /// 返回新记录 ID。唯一索引冲突表示并发重复投票，整个事务回滚。
    pub async fn create_vote_in_tx(tx: &mut PgConnection, vote: &UserVote) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO user_votes (campaign_id, entry_id, user_id, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(vote.campaign_id)
        .bind(vote.entry_id)
        .bind(&vote.user_id)
        .bind(vote.created_at)
        .fetch_one(tx)
        .await?;

        Ok(row.get("id"))
    }

    /// 在事务中删除投票记录
    ///
    /// 返回被删除记录的 ID（不存在则为 None）
    pub async fn delete_vote_in_tx(
        tx: &mut PgConnection,
        campaign_id: i64,
        entry_id: i64,
        user_id: &str,
    ) -> Result<Option<i64>> {
        let row = sqlx::query(
            r#"
            DELETE FROM user_votes
            WHERE campaign_id = $1 AND entry_id = $2 AND user_id = $3
            RETURNING id
            "#,
        )
        .bind(campaign_id)
        .bind(entry_id)
        .bind(user_id)
        .fetch_optional(tx)
        .await?;

        Ok(row.map(|r| r.get("id")))
    }

    /// 在事务中增加选项票数
    pub async fn increment_entry_votes_in_tx(tx: &mut PgConnection, entry_id: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE vote_entries
            SET vote_count = vote_count + 1, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(entry_id)
        .execute(tx)
        .await?;

        Ok(())
    }

    /// 在事务中减少选项票数（下限为 0）
    pub async fn decrement_entry_votes_in_tx(tx: &mut PgConnection, entry_id: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE vote_entries
            SET vote_count = GREATEST(vote_count - 1, 0), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(entry_id)
        .execute(tx)
        .await?;

        Ok(())
    }
}
