//! 竞猜仓储
//!
//! 提供竞猜活动与提交记录的数据访问。公布答案通过条件更新加锁，
//! 保证批量发奖只会执行一次。

use sqlx::{PgConnection, PgPool, Row};

use crate::error::Result;
use crate::models::{Contest, ContestSubmission};

/// 竞猜仓储
pub struct ContestRepository {
    pool: PgPool,
}

const CONTEST_COLUMNS: &str = r#"
    SELECT id, title, question, answer, points_per_answer, reward_points,
           is_answer_published, status, start_at, end_at, created_at, updated_at
    FROM contests
"#;

const SUBMISSION_COLUMNS: &str = r#"
    SELECT id, contest_id, user_id, answer, points_spent, is_correct,
           reward_points_earned, created_at
    FROM contest_submissions
"#;

impl ContestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 按 ID 查询竞猜
    pub async fn get_contest(&self, id: i64) -> Result<Option<Contest>> {
        let contest = sqlx::query_as::<_, Contest>(&format!("{CONTEST_COLUMNS} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(contest)
    }

    /// 列出竞猜的全部提交
    pub async fn list_submissions(&self, contest_id: i64) -> Result<Vec<ContestSubmission>> {
        let submissions = sqlx::query_as::<_, ContestSubmission>(&format!(
            "{SUBMISSION_COLUMNS} WHERE contest_id = $1 ORDER BY id"
        ))
        .bind(contest_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(submissions)
    }

    // ==================== 事务操作 ====================

    /// 在事务中按 ID 查询竞猜（带行级锁）
    pub async fn get_contest_for_update(
        tx: &mut PgConnection,
        id: i64,
    ) -> Result<Option<Contest>> {
        let contest =
            sqlx::query_as::<_, Contest>(&format!("{CONTEST_COLUMNS} WHERE id = $1 FOR UPDATE"))
                .bind(id)
                .fetch_optional(tx)
                .await?;

        Ok(contest)
    }

    /// 在事务中创建提交记录
    ///
    /// 返回新记录 ID
    pub async fn create_submission_in_tx(
        tx: &mut PgConnection,
        submission: &ContestSubmission,
    ) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO contest_submissions
                (contest_id, user_id, answer, points_spent, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(submission.contest_id)
        .bind(&submission.user_id)
        .bind(&submission.answer)
        .bind(submission.points_spent)
        .bind(submission.created_at)
        .fetch_one(tx)
        .await?;

        Ok(row.get("id"))
    }

    /// 在事务中公布答案并锁定竞猜
    ///
    /// 条件更新：仅当答案尚未公布时生效，返回是否真正更新。
    /// 并发公布只有一个请求能拿到 true，其余视为重复请求。
    pub async fn publish_answer_in_tx(
        tx: &mut PgConnection,
        contest_id: i64,
        answer: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE contests
            SET answer = $2, is_answer_published = true, status = 'finished', updated_at = NOW()
            WHERE id = $1 AND is_answer_published = false
            "#,
        )
        .bind(contest_id)
        .bind(answer)
        .execute(tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 在事务中查询竞猜的全部提交
    pub async fn list_submissions_in_tx(
        tx: &mut PgConnection,
        contest_id: i64,
    ) -> Result<Vec<ContestSubmission>> {
        let submissions = sqlx::query_as::<_, ContestSubmission>(&format!(
            "{SUBMISSION_COLUMNS} WHERE contest_id = $1 ORDER BY id"
        ))
        .bind(contest_id)
        .fetch_all(tx)
        .await?;

        Ok(submissions)
    }

    /// 在事务中写入提交的判定结果
    pub async fn update_submission_result_in_tx(
        tx: &mut PgConnection,
        submission_id: i64,
        is_correct: bool,
        reward_points_earned: i32,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE contest_submissions
            SET is_correct = $2, reward_points_earned = $3
            WHERE id = $1
            "#,
        )
        .bind(submission_id)
        .bind(is_correct)
        .bind(reward_points_earned)
        .execute(tx)
        .await?;

        Ok(())
    }
}
