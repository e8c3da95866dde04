//! 路由配置模块
//!
//! 定义所有 REST API 端点的路由映射

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::{handlers, state::AppState};

/// 构建订单相关路由
fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(handlers::order::create_order))
        .route("/orders/{id}", get(handlers::order::get_order))
        .route(
            "/orders/{id}/status",
            put(handlers::order::update_order_status),
        )
        .route(
            "/users/{user_id}/orders",
            get(handlers::order::list_user_orders),
        )
}

/// 构建竞猜相关路由
fn contest_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/contests/{id}/submit",
            post(handlers::contest::submit_answer),
        )
        .route(
            "/contests/{id}/publish",
            post(handlers::contest::publish_answer),
        )
        .route("/contests/{id}", get(handlers::contest::get_contest))
        .route(
            "/contests/{id}/submissions",
            get(handlers::contest::list_submissions),
        )
}

/// 构建投票相关路由
fn voting_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/voting/{campaign_id}/entries/{entry_id}/vote",
            post(handlers::voting::vote),
        )
        .route(
            "/voting/{campaign_id}/entries/{entry_id}/vote",
            delete(handlers::voting::remove_vote),
        )
}

/// 构建行为奖励路由
fn reward_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/surveys/{id}/complete",
            post(handlers::reward::complete_survey),
        )
        .route(
            "/reviews/{id}/reward",
            post(handlers::reward::review_reward),
        )
        .route("/check-in", post(handlers::reward::check_in))
        .route("/referrals", post(handlers::reward::referral))
}

/// 构建积分账户路由
fn points_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/users/{user_id}/points",
            get(handlers::points::get_balance),
        )
        .route(
            "/users/{user_id}/transactions",
            get(handlers::points::list_transactions),
        )
        .route("/admin/points/grant", post(handlers::points::admin_grant))
        .route(
            "/admin/points/reverse",
            post(handlers::points::reverse_transaction),
        )
}

/// 构建优惠券路由
fn coupon_routes() -> Router<AppState> {
    Router::new().route("/coupons/preview", post(handlers::coupon::preview_discount))
}

/// 构建完整的 API 路由
///
/// 返回所有 API 路由（不含前缀，由调用方在 main.rs 中挂载）
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(order_routes())
        .merge(contest_routes())
        .merge(voting_routes())
        .merge(reward_routes())
        .merge(points_routes())
        .merge(coupon_routes())
}
