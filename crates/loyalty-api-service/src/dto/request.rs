//! 请求 DTO 定义
//!
//! 所有 REST API 的请求参数和请求体结构

use points_ledger::{OrderStatus, PointReason};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// 订单行请求
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: i64,
    #[validate(range(min = 1, max = 999, message = "单品数量必须在1-999之间"))]
    pub quantity: i32,
}

/// 创建订单请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, message = "订单明细不能为空"), nested)]
    pub items: Vec<OrderItemRequest>,
    pub coupon_id: Option<i64>,
    /// 下单时抵扣的积分
    #[validate(range(min = 0, message = "抵扣积分不能为负"))]
    pub points_used: Option<i32>,
    /// 运费（分）
    #[validate(range(min = 0, message = "运费不能为负"))]
    pub shipping_fee: Option<i64>,
}

/// 订单状态变更请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

/// 竞猜提交请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerRequest {
    #[validate(length(min = 1, max = 200, message = "答案长度必须在1-200个字符之间"))]
    pub answer: String,
}

/// 竞猜公布答案请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PublishAnswerRequest {
    #[validate(length(min = 1, max = 200, message = "正确答案长度必须在1-200个字符之间"))]
    pub answer: String,
}

/// 问卷完成奖励请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SurveyCompleteRequest {
    #[validate(range(min = 1, max = 100_000, message = "奖励积分必须在1-100000之间"))]
    pub points: i32,
}

/// 评价奖励请求（管理员为指定用户发放）
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRewardRequest {
    #[validate(length(min = 1, max = 64, message = "用户 ID 长度必须在1-64个字符之间"))]
    pub user_id: String,
    #[validate(range(min = 1, max = 100_000, message = "奖励积分必须在1-100000之间"))]
    pub points: i32,
}

/// 每日签到请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    #[validate(range(min = 1, max = 1000, message = "签到积分必须在1-1000之间"))]
    pub points: i32,
}

/// 邀请奖励请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReferralRequest {
    #[validate(length(min = 1, max = 64, message = "被邀请人 ID 长度必须在1-64个字符之间"))]
    pub invitee_id: String,
    #[validate(range(min = 1, max = 100_000, message = "奖励积分必须在1-100000之间"))]
    pub points: i32,
}

/// 运营发放/扣减请求
///
/// 金额带符号：正数发放，负数扣减；零在处理器中拒绝
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdminGrantRequest {
    #[validate(length(min = 1, max = 64, message = "用户 ID 长度必须在1-64个字符之间"))]
    pub user_id: String,
    #[validate(range(min = -1_000_000, max = 1_000_000, message = "发放金额超出允许范围"))]
    pub amount: i32,
    #[validate(length(max = 500, message = "备注不超过500字符"))]
    pub notes: Option<String>,
}

/// 流水冲正请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReverseTransactionRequest {
    pub transaction_id: i64,
    #[validate(length(max = 500, message = "备注不超过500字符"))]
    pub notes: Option<String>,
}

/// 流水查询参数
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionQuery {
    pub reason: Option<PointReason>,
    pub limit: Option<i64>,
}

/// 列表查询参数
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub limit: Option<i64>,
}

impl ListQuery {
    /// 条数上限，默认 20，最大 100
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(20).clamp(1, 100)
    }
}

impl TransactionQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(20).clamp(1, 100)
    }
}

/// 优惠券折扣试算请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CouponPreviewRequest {
    #[validate(length(min = 1, max = 64, message = "券码长度必须在1-64个字符之间"))]
    pub coupon_code: String,
    #[validate(range(min = 0, message = "订单金额不能为负"))]
    pub order_amount: i64,
    #[validate(length(min = 1, message = "商品明细不能为空"), nested)]
    pub items: Vec<OrderItemRequest>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_order_request_validation() {
        let valid = CreateOrderRequest {
            items: vec![OrderItemRequest {
                product_id: 1,
                quantity: 2,
            }],
            coupon_id: None,
            points_used: Some(10),
            shipping_fee: Some(800),
        };
        assert!(valid.validate().is_ok());

        // 空明细
        let empty = CreateOrderRequest {
            items: vec![],
            coupon_id: None,
            points_used: None,
            shipping_fee: None,
        };
        assert!(empty.validate().is_err());

        // 明细数量越界
        let bad_quantity = CreateOrderRequest {
            items: vec![OrderItemRequest {
                product_id: 1,
                quantity: 0,
            }],
            coupon_id: None,
            points_used: None,
            shipping_fee: None,
        };
        assert!(bad_quantity.validate().is_err());

        // 负抵扣
        let negative_points = CreateOrderRequest {
            items: vec![OrderItemRequest {
                product_id: 1,
                quantity: 1,
            }],
            coupon_id: None,
            points_used: Some(-1),
            shipping_fee: None,
        };
        assert!(negative_points.validate().is_err());
    }

    #[test]
    fn test_submit_answer_request_validation() {
        let valid = SubmitAnswerRequest {
            answer: "2:1".to_string(),
        };
        assert!(valid.validate().is_ok());

        let empty = SubmitAnswerRequest {
            answer: "".to_string(),
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_admin_grant_request_validation() {
        let valid = AdminGrantRequest {
            user_id: "user-1".to_string(),
            amount: -50,
            notes: Some("活动违规扣减".to_string()),
        };
        assert!(valid.validate().is_ok());

        let out_of_range = AdminGrantRequest {
            user_id: "user-1".to_string(),
            amount: 2_000_000,
            notes: None,
        };
        assert!(out_of_range.validate().is_err());
    }

    #[test]
    fn test_list_query_limit_clamped() {
        assert_eq!(ListQuery { limit: None }.limit(), 20);
        assert_eq!(ListQuery { limit: Some(500) }.limit(), 100);
        assert_eq!(ListQuery { limit: Some(0) }.limit(), 1);
        assert_eq!(
            TransactionQuery {
                reason: None,
                limit: Some(50)
            }
            .limit(),
            50
        );
    }

    #[test]
    fn test_status_deserialization() {
        let req: UpdateOrderStatusRequest =
            serde_json::from_str(r#"{"status":"waiting_payment"}"#).unwrap();
        assert_eq!(req.status, OrderStatus::WaitingPayment);
    }

    #[test]
    fn test_transaction_query_reason_deserialization() {
        let query: TransactionQuery =
            serde_json::from_str(r#"{"reason":"order-completion","limit":10}"#).unwrap();
        assert_eq!(query.reason, Some(PointReason::OrderCompletion));
    }
}
