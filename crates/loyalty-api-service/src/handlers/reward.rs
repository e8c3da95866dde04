//! 行为奖励 API 处理器
//!
//! 问卷、评价、签到、邀请的一次性奖励。重复请求命中账本幂等键，
//! 返回首次入账结果（`applied = false`），余额不再变动。

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use chrono::Utc;
use validator::Validate;

use points_ledger::service::dto::LedgerOutcome;

use crate::{
    auth::{self, Claims},
    dto::{ApiResponse, CheckInRequest, ReferralRequest, ReviewRewardRequest, SurveyCompleteRequest},
    error::Result,
    state::AppState,
};

/// 问卷完成奖励
///
/// POST /api/surveys/{id}/complete
pub async fn complete_survey(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(survey_id): Path<i64>,
    Json(req): Json<SurveyCompleteRequest>,
) -> Result<Json<ApiResponse<LedgerOutcome>>> {
    req.validate()?;

    let outcome = state
        .rewards
        .complete_survey(survey_id, &claims.sub, req.points)
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// 评价奖励（管理员）
///
/// POST /api/reviews/{id}/reward
pub async fn review_reward(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(review_id): Path<i64>,
    Json(req): Json<ReviewRewardRequest>,
) -> Result<Json<ApiResponse<LedgerOutcome>>> {
    auth::require_admin(&claims)?;
    req.validate()?;

    let outcome = state
        .rewards
        .review_reward(review_id, &req.user_id, req.points, Some(claims.sub.clone()))
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// 每日签到
///
/// POST /api/check-in
pub async fn check_in(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CheckInRequest>,
) -> Result<Json<ApiResponse<LedgerOutcome>>> {
    req.validate()?;

    let outcome = state
        .rewards
        .daily_check_in(&claims.sub, req.points, Utc::now().date_naive())
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// 邀请奖励
///
/// POST /api/referrals
pub async fn referral(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ReferralRequest>,
) -> Result<Json<ApiResponse<LedgerOutcome>>> {
    req.validate()?;

    let outcome = state
        .rewards
        .referral_bonus(&claims.sub, &req.invitee_id, req.points)
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}
