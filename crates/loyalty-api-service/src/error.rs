//! API 层错误类型定义
//!
//! 负责把领域层错误映射为 HTTP 状态码与统一响应体

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use points_ledger::LedgerError;

/// API 层错误类型
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // 认证错误
    #[error("未授权: {0}")]
    Unauthorized(String),
    #[error("禁止访问: {0}")]
    Forbidden(String),

    // 验证错误
    #[error("参数验证失败: {0}")]
    Validation(String),

    // 领域错误（状态码与错误码按变体映射）
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    // 系统错误
    #[error("内部错误: {0}")]
    Internal(String),
}

impl ApiError {
    /// 返回对应的 HTTP 状态码
    ///
    /// 领域业务错误统一 400（余额不足、重复结算、非法流转等都是
    /// 请求在当前状态下不被允许），资源不存在 404，系统故障 500。
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Ledger(e) => match e {
                LedgerError::UserNotFound(_)
                | LedgerError::TransactionNotFound(_)
                | LedgerError::OrderNotFound(_)
                | LedgerError::ProductNotFound(_)
                | LedgerError::ContestNotFound(_)
                | LedgerError::CampaignNotFound(_)
                | LedgerError::EntryNotFound(_)
                | LedgerError::VoteNotFound { .. }
                | LedgerError::CouponNotFound(_) => StatusCode::NOT_FOUND,
                LedgerError::Database(_)
                | LedgerError::Serialization(_)
                | LedgerError::Internal(_)
                | LedgerError::TransactionAborted => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            },
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Ledger(e) => e.error_code(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志，防止信息泄露
        let message = match &self {
            Self::Ledger(e @ (LedgerError::Database(_)
            | LedgerError::Serialization(_)
            | LedgerError::Internal(_))) => {
                tracing::error!(error = %e, "领域层系统错误");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "内部错误");
                "服务内部错误，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

/// 从 validator 错误转换
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, ApiError>;
