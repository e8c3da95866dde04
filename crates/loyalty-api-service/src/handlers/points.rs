//! 积分账户 API 处理器
//!
//! 余额与流水查询、运营发放、流水冲正

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use validator::Validate;

use points_ledger::service::dto::{LedgerOutcome, TransactionDto};

use crate::{
    auth::{self, Claims},
    dto::{
        AdminGrantRequest, ApiResponse, BalanceResponse, ReverseTransactionRequest,
        TransactionQuery,
    },
    error::Result,
    state::AppState,
};

/// 查询用户余额
///
/// GET /api/users/{user_id}/points
pub async fn get_balance(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<BalanceResponse>>> {
    auth::require_self_or_admin(&claims, &user_id)?;

    let points = state.ledger.balance(&user_id).await?;
    Ok(Json(ApiResponse::success(BalanceResponse {
        user_id,
        points,
    })))
}

/// 查询用户流水（按时间倒序，可按原因过滤）
///
/// GET /api/users/{user_id}/transactions
pub async fn list_transactions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<String>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<ApiResponse<Vec<TransactionDto>>>> {
    auth::require_self_or_admin(&claims, &user_id)?;

    let transactions = state
        .ledger
        .history(&user_id, query.reason, query.limit())
        .await?;
    let items: Vec<TransactionDto> = transactions.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success(items)))
}

/// 运营发放/扣减积分（管理员）
///
/// POST /api/admin/points/grant
pub async fn admin_grant(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AdminGrantRequest>,
) -> Result<Json<ApiResponse<LedgerOutcome>>> {
    auth::require_admin(&claims)?;
    req.validate()?;

    let outcome = state
        .rewards
        .admin_grant(&claims.sub, &req.user_id, req.amount, req.notes)
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// 冲正一条流水（管理员）
///
/// POST /api/admin/points/reverse
///
/// 以负向新流水入账，原流水保留；重复冲正同一笔流水幂等
pub async fn reverse_transaction(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ReverseTransactionRequest>,
) -> Result<Json<ApiResponse<LedgerOutcome>>> {
    auth::require_admin(&claims)?;
    req.validate()?;

    let outcome = state
        .ledger
        .reverse(req.transaction_id, Some(claims.sub.clone()), req.notes)
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}
