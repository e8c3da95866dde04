//! 订单服务
//!
//! 处理订单创建与状态机结算：
//! - 创建：校验商品、条件扣库存、快照单价与积分奖励、优惠券核销、积分抵扣
//! - 完成：按创建时固化的 `points_earned` 加分，幂等
//! - 取消：回补库存；完成后取消撤销奖励；未完成取消退还抵扣积分
//!
//! ## 创建流程
//!
//! 1. 参数校验 -> 2. 优惠券资格预检 -> 3. 事务内扣库存并快照
//!    -> 4. 优惠券用量登记（条件更新）-> 5. 写订单与明细
//!    -> 6. 抵扣积分入账 -> 7. 提交 -> 8. 缓存失效
//!
//! 状态变更的校验与结算全部发生在持有订单行锁的单个事务内，
//! 同一订单的并发状态变更被串行化，结算至多生效一次。

use std::sync::Arc;

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{LedgerError, Result};
use crate::models::{
    CartLine, LedgerEntry, Order, OrderItem, OrderStatus, PaymentStatus, PointReason, Product,
    sum_points_earned,
};
use crate::repository::{CouponRepository, OrderRepository, ProductRepository};
use crate::service::dto::{
    CreateOrderRequest, CreateOrderResponse, OrderStatusChangeResponse,
};
use crate::service::ledger_service::LedgerService;

/// 订单服务
pub struct OrderService {
    order_repo: Arc<OrderRepository>,
    coupon_repo: Arc<CouponRepository>,
    ledger: Arc<LedgerService>,
    pool: PgPool,
}

impl OrderService {
    pub fn new(
        order_repo: Arc<OrderRepository>,
        coupon_repo: Arc<CouponRepository>,
        ledger: Arc<LedgerService>,
        pool: PgPool,
    ) -> Self {
        Self {
            order_repo,
            coupon_repo,
            ledger,
            pool,
        }
    }

    /// 创建订单
    ///
    /// 单价与单件积分奖励在此刻从商品快照进入明细，`points_earned`
    /// 一并计算并固化，后续商品调价或调整奖励不影响已创建订单。
    #[instrument(skip(self, request), fields(user_id = %request.user_id, item_count = request.items.len()))]
    pub async fn create_order(&self, request: CreateOrderRequest) -> Result<CreateOrderResponse> {
        Self::validate_create_request(&request)?;

        // 优惠券在事务外预检，用量上限在事务内的条件更新中二次校验
        let coupon = match request.coupon_id {
            Some(coupon_id) => Some(
                self.coupon_repo
                    .get_coupon(coupon_id)
                    .await?
                    .ok_or(LedgerError::CouponNotFound(coupon_id))?,
            ),
            None => None,
        };

        let now = Utc::now();
        let order_no = generate_order_no();
        let mut tx = self.pool.begin().await?;

        // 1. 逐项扣库存并快照商品信息
        let mut products: Vec<(Product, i32)> = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let product = ProductRepository::get_product_in_tx(&mut tx, line.product_id)
                .await?
                .ok_or(LedgerError::ProductNotFound(line.product_id))?;

            if !product.is_active {
                return Err(LedgerError::ProductNotFound(line.product_id));
            }

            let reserved =
                ProductRepository::reserve_stock_in_tx(&mut tx, line.product_id, line.quantity)
                    .await?;
            if !reserved {
                return Err(LedgerError::OutOfStock(line.product_id));
            }

            products.push((product, line.quantity));
        }

        let total_amount: i64 = products
            .iter()
            .map(|(p, qty)| p.price * *qty as i64)
            .sum();
        let points_earned: i32 = products
            .iter()
            .map(|(p, qty)| p.points_reward * qty)
            .sum();

        // 2. 优惠券资格校验与核销
        let mut discount_amount = 0i64;
        let mut shipping_fee = request.shipping_fee;
        if let Some(ref coupon) = coupon {
            let lines: Vec<CartLine> = request
                .items
                .iter()
                .map(|l| CartLine {
                    product_id: l.product_id,
                    quantity: l.quantity,
                })
                .collect();
            coupon.can_be_used_by(&request.user_id, total_amount, &lines, now)?;

            discount_amount = coupon.compute_discount(total_amount);
            if coupon.is_free_shipping() {
                shipping_fee = 0;
            }

            // 用量统计与订单创建同事务提交；并发用尽时谓词不命中，整单回滚
            let recorded =
                CouponRepository::record_usage_in_tx(&mut tx, coupon.id, discount_amount).await?;
            if !recorded {
                return Err(LedgerError::CouponNotApplicable(format!(
                    "优惠券 {} 已达使用上限",
                    coupon.code
                )));
            }
        }

        // 3. 写订单与明细
        let order = Order {
            id: 0,
            order_no: order_no.clone(),
            user_id: request.user_id.clone(),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            total_amount,
            discount_amount,
            shipping_fee,
            coupon_id: coupon.as_ref().map(|c| c.id),
            points_earned,
            points_used: request.points_used,
            points_refunded: false,
            created_at: now,
            updated_at: now,
        };
        let order_id = OrderRepository::create_order_in_tx(&mut tx, &order).await?;

        for (product, quantity) in &products {
            let item = OrderItem {
                id: 0,
                order_id,
                product_id: product.id,
                product_name: product.name.clone(),
                quantity: *quantity,
                unit_price: product.price,
                points_reward: product.points_reward,
                created_at: now,
            };
            OrderRepository::create_item_in_tx(&mut tx, &item).await?;
        }

        // 4. 抵扣积分入账（余额不足时整单回滚，库存与订单一并撤销）
        if request.points_used > 0 {
            let entry = LedgerEntry::new(
                request.user_id.clone(),
                -request.points_used,
                PointReason::OrderPointsSpent,
                order.points_spent_key(),
            )
            .with_notes(format!("订单 {} 积分抵扣", order_no));
            LedgerService::apply_in_tx(&mut tx, &entry).await?;
        }

        tx.commit().await?;

        if request.points_used > 0 {
            self.ledger.invalidate_balance_cache(&request.user_id).await;
        }

        let payable_amount = (total_amount - discount_amount).max(0) + shipping_fee;
        info!(
            order_id = order_id,
            order_no = %order_no,
            total_amount = total_amount,
            discount_amount = discount_amount,
            points_earned = points_earned,
            points_used = request.points_used,
            "订单创建成功"
        );

        Ok(CreateOrderResponse {
            order_id,
            order_no,
            total_amount,
            discount_amount,
            shipping_fee,
            payable_amount,
            points_earned,
            points_used: request.points_used,
        })
    }

    /// 订单状态变更与结算
    ///
    /// 行锁 + 状态流转表校验；进入 `completed` 加分，进入 `cancelled`
    /// 回补库存并按前置状态退还或撤销积分。全部在一个事务内完成。
    #[instrument(skip(self), fields(order_id = order_id, to_status = ?to_status))]
    pub async fn update_status(
        &self,
        order_id: i64,
        to_status: OrderStatus,
        admin_id: Option<String>,
    ) -> Result<OrderStatusChangeResponse> {
        let mut tx = self.pool.begin().await?;

        let order = OrderRepository::get_order_for_update(&mut tx, order_id)
            .await?
            .ok_or(LedgerError::OrderNotFound(order_id))?;
        let from_status = order.status;

        if !from_status.can_transition_to(to_status) {
            return Err(LedgerError::InvalidTransition {
                from: from_status,
                to: to_status,
            });
        }

        // 履约链路（处理中及之后）必须先完成支付
        if to_status.requires_paid() && order.payment_status != PaymentStatus::Paid {
            return Err(LedgerError::PaymentRequired(order_id));
        }

        match to_status {
            OrderStatus::Completed => {
                self.settle_completion(&mut tx, &order, admin_id.as_deref())
                    .await?;
            }
            OrderStatus::Cancelled => {
                self.settle_cancellation(&mut tx, &order, admin_id.as_deref())
                    .await?;
            }
            _ => {}
        }

        OrderRepository::update_status_in_tx(&mut tx, order_id, to_status).await?;
        tx.commit().await?;

        self.ledger.invalidate_balance_cache(&order.user_id).await;

        info!(
            order_no = %order.order_no,
            from = ?from_status,
            to = ?to_status,
            "订单状态变更完成"
        );

        Ok(OrderStatusChangeResponse {
            order_id,
            order_no: order.order_no,
            from_status,
            to_status,
        })
    }

    /// 查询订单与明细
    pub async fn get_order(&self, order_id: i64) -> Result<(Order, Vec<OrderItem>)> {
        let order = self
            .order_repo
            .get_order(order_id)
            .await?
            .ok_or(LedgerError::OrderNotFound(order_id))?;
        let items = self.order_repo.list_items(order_id).await?;
        Ok((order, items))
    }

    /// 查询用户订单列表
    pub async fn list_user_orders(&self, user_id: &str, limit: i64) -> Result<Vec<Order>> {
        self.order_repo.list_by_user(user_id, limit).await
    }

    // ==================== 私有方法 ====================

    /// 完成结算：按固化值加分，幂等键以订单号为锚点
    ///
    /// 历史订单 `points_earned` 未固化（取值非正）时从明细快照恢复并补写，
    /// 快照值不受商品后续变更影响。
    async fn settle_completion(
        &self,
        tx: &mut PgConnection,
        order: &Order,
        admin_id: Option<&str>,
    ) -> Result<()> {
        let mut points_earned = order.points_earned;
        if points_earned <= 0 {
            let items = OrderRepository::list_items_in_tx(tx, order.id).await?;
            points_earned = sum_points_earned(&items);
            if points_earned > 0 {
                OrderRepository::update_points_earned_in_tx(tx, order.id, points_earned).await?;
            }
        }

        if points_earned > 0 {
            let mut entry = LedgerEntry::new(
                order.user_id.clone(),
                points_earned,
                PointReason::OrderCompletion,
                order.completion_key(),
            )
            .with_notes(format!("订单 {} 完成奖励", order.order_no));
            entry.admin_id = admin_id.map(String::from);
            LedgerService::apply_in_tx(tx, &entry).await?;
        }

        Ok(())
    }

    /// 取消结算：回补库存；完成后取消撤销奖励，未完成取消退还抵扣积分
    async fn settle_cancellation(
        &self,
        tx: &mut PgConnection,
        order: &Order,
        admin_id: Option<&str>,
    ) -> Result<()> {
        // 1. 回补每个明细行的库存与销量
        let items = OrderRepository::list_items_in_tx(tx, order.id).await?;
        for item in &items {
            ProductRepository::restock_in_tx(tx, item.product_id, item.quantity).await?;
        }

        if order.status == OrderStatus::Completed {
            // 2a. 完成后取消：撤销已发放的完成奖励
            let mut points_earned = order.points_earned;
            if points_earned <= 0 {
                points_earned = sum_points_earned(&items);
            }
            if points_earned > 0 {
                let mut entry = LedgerEntry::new(
                    order.user_id.clone(),
                    -points_earned,
                    PointReason::OrderCompletionReversal,
                    order.completion_reversal_key(),
                )
                .with_notes(format!("订单 {} 完成后取消，撤销奖励", order.order_no));
                entry.admin_id = admin_id.map(String::from);
                LedgerService::apply_in_tx(tx, &entry).await?;
            }
        } else if order.needs_points_refund() {
            // 2b. 未完成取消：退还下单时抵扣的积分，至多一次
            let mut entry = LedgerEntry::new(
                order.user_id.clone(),
                order.points_used,
                PointReason::OrderPointsRefund,
                order.points_refund_key(),
            )
            .with_notes(format!("订单 {} 取消，退还抵扣积分", order.order_no));
            entry.admin_id = admin_id.map(String::from);
            LedgerService::apply_in_tx(tx, &entry).await?;
            OrderRepository::mark_points_refunded_in_tx(tx, order.id).await?;
        }

        Ok(())
    }

    /// 创建订单参数校验
    fn validate_create_request(request: &CreateOrderRequest) -> Result<()> {
        if request.items.is_empty() {
            return Err(LedgerError::Validation("订单明细不能为空".to_string()));
        }
        if request.items.iter().any(|l| l.quantity <= 0) {
            return Err(LedgerError::Validation("商品数量必须大于 0".to_string()));
        }
        if request.points_used < 0 {
            return Err(LedgerError::Validation("抵扣积分不能为负".to_string()));
        }
        if request.shipping_fee < 0 {
            return Err(LedgerError::Validation("运费不能为负".to_string()));
        }
        Ok(())
    }
}

/// 生成订单号
///
/// 格式: SO{yyyyMMddHHmmss}{6位随机数}
fn generate_order_no() -> String {
    let now = Utc::now();
    let uuid = Uuid::new_v4();
    let random = uuid.as_u128() % 1_000_000;
    format!("SO{}{:06}", now.format("%Y%m%d%H%M%S"), random)
}
