//! 竞猜 API 处理器

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use validator::Validate;

use points_ledger::{Contest, ContestSubmission};
use points_ledger::service::dto::{PublishAnswerResponse, SubmitAnswerResponse};

use crate::{
    auth::{self, Claims},
    dto::{ApiResponse, PublishAnswerRequest, SubmitAnswerRequest},
    error::Result,
    state::AppState,
};

/// 提交竞猜答案（扣报名费）
///
/// POST /api/contests/{id}/submit
pub async fn submit_answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(contest_id): Path<i64>,
    Json(req): Json<SubmitAnswerRequest>,
) -> Result<Json<ApiResponse<SubmitAnswerResponse>>> {
    req.validate()?;

    let response = state
        .contests
        .submit_answer(contest_id, &claims.sub, &req.answer)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

/// 公布答案并批量发奖（管理员）
///
/// POST /api/contests/{id}/publish
pub async fn publish_answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(contest_id): Path<i64>,
    Json(req): Json<PublishAnswerRequest>,
) -> Result<Json<ApiResponse<PublishAnswerResponse>>> {
    auth::require_admin(&claims)?;
    req.validate()?;

    let response = state
        .contests
        .publish_answer(contest_id, &req.answer, &claims.sub)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

/// 查询竞猜详情
///
/// GET /api/contests/{id}
pub async fn get_contest(
    State(state): State<AppState>,
    Path(contest_id): Path<i64>,
) -> Result<Json<ApiResponse<Contest>>> {
    let contest = state.contests.get_contest(contest_id).await?;
    Ok(Json(ApiResponse::success(contest)))
}

/// 查询竞猜提交列表（管理员）
///
/// GET /api/contests/{id}/submissions
pub async fn list_submissions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(contest_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<ContestSubmission>>>> {
    auth::require_admin(&claims)?;

    let submissions = state.contests.list_submissions(contest_id).await?;
    Ok(Json(ApiResponse::success(submissions)))
}
