//! 数据传输对象
//!
//! 请求和响应的 DTO 定义，序列化统一使用 camelCase

mod request;
mod response;

pub use request::{
    AdminGrantRequest, CheckInRequest, CouponPreviewRequest, CreateOrderRequest, ListQuery,
    OrderItemRequest, PublishAnswerRequest, ReferralRequest, ReverseTransactionRequest,
    ReviewRewardRequest, SubmitAnswerRequest, SurveyCompleteRequest, TransactionQuery,
    UpdateOrderStatusRequest,
};
pub use response::{ApiResponse, BalanceResponse, OrderDetailResponse};
