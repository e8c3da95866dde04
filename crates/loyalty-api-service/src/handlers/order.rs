//! 订单 API 处理器
//!
//! 下单、查单与状态变更。状态变更会触发积分结算（完成加分、
//! 取消退还/撤销），结算逻辑全部在领域服务内完成。

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use validator::Validate;

use points_ledger::Order;
use points_ledger::service::dto::{
    self as service_dto, CreateOrderResponse, OrderLineRequest, OrderStatusChangeResponse,
};

use crate::{
    auth::{self, Claims},
    dto::{ApiResponse, CreateOrderRequest, ListQuery, OrderDetailResponse, UpdateOrderStatusRequest},
    error::Result,
    state::AppState,
};

/// 创建订单
///
/// POST /api/orders
///
/// 下单人取自 Token 主体；库存扣减、优惠券核销、积分抵扣
/// 与订单写入在同一事务内完成。
pub async fn create_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Json<ApiResponse<CreateOrderResponse>>> {
    req.validate()?;

    let mut request = service_dto::CreateOrderRequest::new(
        claims.sub.clone(),
        req.items
            .iter()
            .map(|l| OrderLineRequest {
                product_id: l.product_id,
                quantity: l.quantity,
            })
            .collect(),
    );
    if let Some(coupon_id) = req.coupon_id {
        request = request.with_coupon(coupon_id);
    }
    if let Some(points_used) = req.points_used {
        request = request.with_points_used(points_used);
    }
    if let Some(shipping_fee) = req.shipping_fee {
        request = request.with_shipping_fee(shipping_fee);
    }

    let response = state.orders.create_order(request).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// 查询订单详情（含明细）
///
/// GET /api/orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(order_id): Path<i64>,
) -> Result<Json<ApiResponse<OrderDetailResponse>>> {
    let (order, items) = state.orders.get_order(order_id).await?;
    auth::require_self_or_admin(&claims, &order.user_id)?;

    Ok(Json(ApiResponse::success(OrderDetailResponse {
        order,
        items,
    })))
}

/// 查询用户订单列表
///
/// GET /api/users/{user_id}/orders
pub async fn list_user_orders(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<Order>>>> {
    auth::require_self_or_admin(&claims, &user_id)?;

    let orders = state.orders.list_user_orders(&user_id, query.limit()).await?;
    Ok(Json(ApiResponse::success(orders)))
}

/// 订单状态变更（管理员）
///
/// PUT /api/orders/{id}/status
pub async fn update_order_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(order_id): Path<i64>,
    Json(req): Json<UpdateOrderStatusRequest>,
) -> Result<Json<ApiResponse<OrderStatusChangeResponse>>> {
    auth::require_admin(&claims)?;

    let response = state
        .orders
        .update_status(order_id, req.status, Some(claims.sub.clone()))
        .await?;
    Ok(Json(ApiResponse::success(response)))
}
