//! 优惠券 API 处理器

use axum::{Extension, Json, extract::State};
use chrono::Utc;
use validator::Validate;

use points_ledger::LedgerError;
use points_ledger::models::CartLine;
use points_ledger::service::dto::DiscountPreview;

use crate::{
    auth::Claims,
    dto::{ApiResponse, CouponPreviewRequest},
    error::Result,
    state::AppState,
};

/// 购物车折扣试算
///
/// POST /api/coupons/preview
///
/// 只做计算不核销；真正的用量登记发生在下单事务内
pub async fn preview_discount(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CouponPreviewRequest>,
) -> Result<Json<ApiResponse<DiscountPreview>>> {
    req.validate()?;

    let coupon = state
        .coupon_repo
        .get_by_code(&req.coupon_code)
        .await?
        .ok_or_else(|| {
            LedgerError::CouponNotApplicable(format!("券码 {} 不存在", req.coupon_code))
        })?;

    let lines: Vec<CartLine> = req
        .items
        .iter()
        .map(|l| CartLine {
            product_id: l.product_id,
            quantity: l.quantity,
        })
        .collect();

    coupon.can_be_used_by(&claims.sub, req.order_amount, &lines, Utc::now())?;

    Ok(Json(ApiResponse::success(DiscountPreview {
        coupon_id: coupon.id,
        discount_amount: coupon.compute_discount(req.order_amount),
        free_shipping: coupon.is_free_shipping(),
    })))
}
