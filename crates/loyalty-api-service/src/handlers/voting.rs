//! 投票 API 处理器

use axum::{
    Extension, Json,
    extract::{Path, State},
};

use points_ledger::service::dto::{RemoveVoteResponse, VoteResponse};

use crate::{
    auth::Claims,
    dto::ApiResponse,
    error::Result,
    state::AppState,
};

/// 投票
///
/// POST /api/voting/{campaign_id}/entries/{entry_id}/vote
pub async fn vote(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((campaign_id, entry_id)): Path<(i64, i64)>,
) -> Result<Json<ApiResponse<VoteResponse>>> {
    let response = state
        .voting
        .vote(campaign_id, entry_id, &claims.sub)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

/// 撤票
///
/// DELETE /api/voting/{campaign_id}/entries/{entry_id}/vote
pub async fn remove_vote(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((campaign_id, entry_id)): Path<(i64, i64)>,
) -> Result<Json<ApiResponse<RemoveVoteResponse>>> {
    let response = state
        .voting
        .remove_vote(campaign_id, entry_id, &claims.sub)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}
