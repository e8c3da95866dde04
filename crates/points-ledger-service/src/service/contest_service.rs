//! 竞猜服务
//!
//! 提交答案时原子扣报名费，管理员公布答案时一次性批量判定并发奖。
//!
//! ## 公布流程
//!
//! 1. 行锁竞猜 -> 2. 条件更新锁定（`is_answer_published = false` 谓词）
//!    -> 3. 逐条判定提交并为答对者发奖 -> 4. 提交事务 -> 5. 缓存失效
//!
//! 任一步失败整批回滚：不存在部分提交被判定、部分奖励已发放的中间态。
//! 重新发起公布会完整重做，幂等键保证不会重复发奖。

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, instrument};

use crate::error::{LedgerError, Result};
use crate::models::{Contest, ContestSubmission, LedgerEntry, PointReason};
use crate::repository::ContestRepository;
use crate::service::dto::{PublishAnswerResponse, SubmitAnswerResponse};
use crate::service::ledger_service::LedgerService;

/// 竞猜服务
pub struct ContestService {
    contest_repo: Arc<ContestRepository>,
    ledger: Arc<LedgerService>,
    pool: PgPool,
}

impl ContestService {
    pub fn new(
        contest_repo: Arc<ContestRepository>,
        ledger: Arc<LedgerService>,
        pool: PgPool,
    ) -> Self {
        Self {
            contest_repo,
            ledger,
            pool,
        }
    }

    /// 提交答案
    ///
    /// 报名费扣减与提交记录写入在同一事务内：余额不足时条件更新不命中，
    /// 提交记录一并回滚。同一用户允许多次提交，每次独立扣费。
    #[instrument(skip(self, answer), fields(contest_id = contest_id, user_id = %user_id))]
    pub async fn submit_answer(
        &self,
        contest_id: i64,
        user_id: &str,
        answer: &str,
    ) -> Result<SubmitAnswerResponse> {
        if answer.trim().is_empty() {
            return Err(LedgerError::Validation("答案不能为空".to_string()));
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let contest = ContestRepository::get_contest_for_update(&mut tx, contest_id)
            .await?
            .ok_or(LedgerError::ContestNotFound(contest_id))?;

        if !contest.accepts_submissions(now) {
            return Err(LedgerError::ContestClosed(contest_id));
        }

        let mut submission = ContestSubmission {
            id: 0,
            contest_id,
            user_id: user_id.to_string(),
            answer: answer.trim().to_string(),
            points_spent: contest.points_per_answer,
            is_correct: None,
            reward_points_earned: None,
            created_at: now,
        };
        submission.id = ContestRepository::create_submission_in_tx(&mut tx, &submission).await?;

        let mut new_balance = 0;
        if contest.points_per_answer > 0 {
            let entry = LedgerEntry::new(
                user_id,
                -contest.points_per_answer,
                PointReason::ContestParticipation,
                submission.entry_fee_key(),
            )
            .with_notes(format!("竞猜「{}」报名", contest.title));
            let outcome = LedgerService::apply_in_tx(&mut tx, &entry).await?;
            new_balance = outcome.new_balance;
        }

        tx.commit().await?;
        self.ledger.invalidate_balance_cache(user_id).await;

        info!(
            submission_id = submission.id,
            points_spent = contest.points_per_answer,
            "竞猜答案提交成功"
        );

        Ok(SubmitAnswerResponse {
            submission_id: submission.id,
            points_spent: contest.points_per_answer,
            new_balance,
        })
    }

    /// 公布答案并批量发奖
    ///
    /// 条件更新同时锁定竞猜，并发公布只有一个请求生效，其余返回
    /// `AlreadyProcessed`。全部提交在同一事务内判定与发奖，全有或全无。
    #[instrument(skip(self, correct_answer), fields(contest_id = contest_id))]
    pub async fn publish_answer(
        &self,
        contest_id: i64,
        correct_answer: &str,
        admin_id: &str,
    ) -> Result<PublishAnswerResponse> {
        let correct_answer = correct_answer.trim();
        if correct_answer.is_empty() {
            return Err(LedgerError::Validation("正确答案不能为空".to_string()));
        }

        let mut tx = self.pool.begin().await?;

        let contest = ContestRepository::get_contest_for_update(&mut tx, contest_id)
            .await?
            .ok_or(LedgerError::ContestNotFound(contest_id))?;

        let published =
            ContestRepository::publish_answer_in_tx(&mut tx, contest_id, correct_answer).await?;
        if !published {
            return Err(LedgerError::AlreadyProcessed(format!(
                "contest:{}:publish",
                contest_id
            )));
        }

        // 每条提交恰好访问一次：判定对错，答对者发放奖励
        let submissions = ContestRepository::list_submissions_in_tx(&mut tx, contest_id).await?;
        let total_submissions = submissions.len() as i64;
        let mut correct_count = 0i64;
        let mut points_awarded = 0i64;
        let mut winners: HashSet<String> = HashSet::new();

        for submission in &submissions {
            let is_correct = Contest::is_correct_answer(correct_answer, &submission.answer);
            let reward = if is_correct { contest.reward_points } else { 0 };

            if is_correct {
                correct_count += 1;
                if reward > 0 {
                    let entry = LedgerEntry::new(
                        submission.user_id.clone(),
                        reward,
                        PointReason::ContestWin,
                        submission.win_key(),
                    )
                    .with_admin(admin_id)
                    .with_notes(format!("竞猜「{}」获胜奖励", contest.title));
                    LedgerService::apply_in_tx(&mut tx, &entry).await?;
                    points_awarded += reward as i64;
                    winners.insert(submission.user_id.clone());
                }
            }

            ContestRepository::update_submission_result_in_tx(
                &mut tx,
                submission.id,
                is_correct,
                reward,
            )
            .await?;
        }

        tx.commit().await?;

        for user_id in &winners {
            self.ledger.invalidate_balance_cache(user_id).await;
        }

        info!(
            total_submissions = total_submissions,
            correct_count = correct_count,
            points_awarded = points_awarded,
            "竞猜答案公布，奖励结算完成"
        );

        Ok(PublishAnswerResponse {
            contest_id,
            total_submissions,
            correct_count,
            points_awarded,
        })
    }

    /// 查询竞猜详情
    pub async fn get_contest(&self, contest_id: i64) -> Result<Contest> {
        self.contest_repo
            .get_contest(contest_id)
            .await?
            .ok_or(LedgerError::ContestNotFound(contest_id))
    }

    /// 查询竞猜的全部提交
    pub async fn list_submissions(&self, contest_id: i64) -> Result<Vec<ContestSubmission>> {
        // 先确认竞猜存在，避免对不存在的 ID 返回空列表造成误判
        self.get_contest(contest_id).await?;
        self.contest_repo.list_submissions(contest_id).await
    }
}
