use serde_json::{Value, json};

use crate::domain::distribution::{
    MAX_TICKETS_PER_ITEM, count_by_drawing, normalize, parse_selection, tickets_total, within_limit,
};
use crate::domain::status::{is_excluded, normalize_order_status};
use crate::error::{AppError, AppResult};
use crate::models::{
    CheckoutItemRequest, CheckoutItemResponse, Order, OrderCompletedResponse,
    OrderStatusChangedRequest, OrderStatusChangedResponse, entry_types,
};
use crate::services::{AuditService, DrawingService, SettingsService, TicketService};
use crate::store::{MetaScope, Stores, keys};

/// 宿主事件入口：结账写入、订单完成、订单状态变更
#[derive(Clone)]
pub struct OrderEventService {
    stores: Stores,
    settings: SettingsService,
    drawings: DrawingService,
    tickets: TicketService,
    audit: AuditService,
}

impl OrderEventService {
    pub fn new(
        stores: Stores,
        settings: SettingsService,
        drawings: DrawingService,
        tickets: TicketService,
        audit: AuditService,
    ) -> Self {
        Self {
            stores,
            settings,
            drawings,
            tickets,
            audit,
        }
    }

    /// 结账时校验买家选择并写入订单行元数据
    pub async fn record_checkout_item(&self, req: &CheckoutItemRequest) -> AppResult<CheckoutItemResponse> {
        if req.quantity < 1 {
            return Err(AppError::ValidationError("Quantity must be at least 1".into()));
        }
        let config = self.drawings.product_config(req.product_id).await?;
        let selection = parse_selection(&req.selection);

        if !config.target_lotteries.is_empty() && selection.is_empty() {
            return Err(AppError::ValidationError(
                "Please choose at least one loterie".into(),
            ));
        }
        if config.ticket_allocation > 0 && selection.len() as i64 > config.ticket_allocation {
            return Err(AppError::ValidationError(format!(
                "You can choose at most {} loteries for this product",
                config.ticket_allocation
            )));
        }
        if !config.target_lotteries.is_empty() {
            if let Some(unknown) = selection
                .iter()
                .find(|id| !config.target_lotteries.contains(id))
            {
                return Err(AppError::ValidationError(format!(
                    "Loterie {unknown} is not available for this product"
                )));
            }
        }

        let allocation = config.ticket_allocation.max(1);
        let total = tickets_total(allocation, req.quantity);
        if !within_limit(total) {
            return Err(AppError::ValidationError(format!(
                "At most {MAX_TICKETS_PER_ITEM} tickets per order item"
            )));
        }
        let distribution = normalize(&selection, total);
        let item_meta = [
            (keys::ITEM_SELECTION, json!(selection)),
            (keys::ITEM_ALLOCATION, json!(allocation)),
            (keys::ITEM_DISTRIBUTION, json!(distribution)),
        ];
        for (key, value) in item_meta {
            self.stores
                .meta
                .set(MetaScope::OrderItem, req.item_id, key, value)
                .await?;
        }
        log::info!(
            "Checkout item {} recorded: {} tickets over loteries {:?}",
            req.item_id,
            distribution.len(),
            selection
        );

        Ok(CheckoutItemResponse {
            item_id: req.item_id,
            selection,
            ticket_allocation: allocation,
            distribution,
        })
    }

    async fn find_order(&self, order_id: i64) -> AppResult<Order> {
        self.stores
            .orders
            .find_order(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {order_id} not found")))
    }

    /// 订单涉及的活动（升序）
    async fn touched_drawings(&self, order: &Order) -> AppResult<Vec<i64>> {
        let mut ids: Vec<i64> = Vec::new();
        for item in &order.items {
            let distribution = self.tickets.item_distribution(item).await?;
            for (drawing_id, _) in count_by_drawing(&distribution) {
                if !ids.contains(&drawing_id) {
                    ids.push(drawing_id);
                }
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    /// 订单完成：重新同步已售计数，每个订单只同步一次
    pub async fn on_order_completed(&self, order_id: i64) -> AppResult<OrderCompletedResponse> {
        let order = self.find_order(order_id).await?;
        let synced = self
            .stores
            .raw(MetaScope::Order, order_id, keys::ORDER_COUNTS_SYNCED)
            .await?
            .is_some_and(|v| matches!(v, Value::Bool(true)) || v == json!("yes") || v == json!(1));
        if synced {
            log::debug!("Order {order_id} ticket counts already synced");
            return Ok(OrderCompletedResponse {
                order_id,
                synced: false,
                affected_loteries: Vec::new(),
            });
        }

        let mut ledger = self.tickets.ledger();
        for drawing_id in self.touched_drawings(&order).await? {
            ledger.enqueue_refresh(drawing_id);
        }
        let affected = ledger.flush_refresh().await?;
        self.stores
            .meta
            .set(MetaScope::Order, order_id, keys::ORDER_COUNTS_SYNCED, json!(true))
            .await?;
        log::info!("Order {order_id} completed, counters synced for {affected:?}");

        Ok(OrderCompletedResponse {
            order_id,
            synced: true,
            affected_loteries: affected,
        })
    }

    /// 订单状态变更：刷新计数，有效性翻转时记审计
    pub async fn on_order_status_changed(
        &self,
        req: &OrderStatusChangedRequest,
    ) -> AppResult<OrderStatusChangedResponse> {
        let order = self.find_order(req.order_id).await?;
        let settings = self.settings.get().await?;
        let was_valid = !is_excluded(&req.old_status, &settings);
        let is_valid = !is_excluded(&req.new_status, &settings);
        let validity_changed = was_valid != is_valid;

        let touched = self.touched_drawings(&order).await?;
        let mut ledger = self.tickets.ledger();
        for drawing_id in &touched {
            ledger.enqueue_refresh(*drawing_id);
        }
        let affected = ledger.flush_refresh().await?;

        if validity_changed {
            let old_status = normalize_order_status(&req.old_status);
            let new_status = normalize_order_status(&req.new_status);
            let outcome = if is_valid { "valid" } else { "invalid" };
            for drawing_id in &affected {
                self.audit
                    .append(
                        *drawing_id,
                        entry_types::ORDER_STATUS,
                        &format!(
                            "Order #{} changed from {old_status} to {new_status}; its tickets are now {outcome}",
                            order.number
                        ),
                        json!({
                            "order_id": order.id,
                            "old_status": old_status,
                            "new_status": new_status,
                        }),
                        None,
                    )
                    .await?;
            }
        }
        log::info!(
            "Order {} status {} -> {} (validity changed: {validity_changed})",
            order.id,
            req.old_status,
            req.new_status
        );

        Ok(OrderStatusChangedResponse {
            order_id: order.id,
            affected_loteries: affected,
            validity_changed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProductLotteryConfig;
    use crate::services::test_support::*;

    async fn product(fx: &Fixture, product_id: i64, allocation: i64, targets: &[i64]) {
        fx.services
            .drawings
            .save_product_config(
                product_id,
                &ProductLotteryConfig {
                    ticket_allocation: allocation,
                    target_lotteries: targets.to_vec(),
                },
            )
            .await
            .unwrap();
    }

    fn checkout(item_id: i64, quantity: i64, selection: Value) -> CheckoutItemRequest {
        CheckoutItemRequest {
            item_id,
            product_id: 50,
            quantity,
            selection,
        }
    }

    #[tokio::test]
    async fn test_checkout_accepts_csv_and_builds_distribution() {
        let fx = Fixture::new();
        fx.drawing(1, "Vélo", 0).await;
        fx.drawing(2, "Tablette", 0).await;
        product(&fx, 50, 2, &[1, 2]).await;

        let res = fx
            .services
            .order_events
            .record_checkout_item(&checkout(1000, 3, json!("2, 1,2")))
            .await
            .unwrap();
        assert_eq!(res.selection, vec![2, 1]);
        assert_eq!(res.distribution, vec![2, 1, 2, 1, 2, 1]);
        assert_eq!(fx.item_meta(1000, keys::ITEM_ALLOCATION).await, Some(json!(2)));
    }

    #[tokio::test]
    async fn test_checkout_validation() {
        let fx = Fixture::new();
        fx.drawing(1, "Vélo", 0).await;
        fx.drawing(2, "Tablette", 0).await;
        fx.drawing(3, "Montre", 0).await;
        product(&fx, 50, 1, &[1, 2]).await;
        let events = &fx.services.order_events;

        for selection in [json!([]), json!("[1,2]"), json!([3]), json!("")] {
            let err = events
                .record_checkout_item(&checkout(1000, 1, selection))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::ValidationError(_)));
        }
        assert_eq!(fx.item_meta(1000, keys::ITEM_DISTRIBUTION).await, None);

        let err = events
            .record_checkout_item(&checkout(1000, 0, json!([1])))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        // 1 × i64::MAX 张票超过单行上限
        let err = events
            .record_checkout_item(&checkout(1000, i64::MAX, json!([1])))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert_eq!(fx.item_meta(1000, keys::ITEM_DISTRIBUTION).await, None);
    }

    #[tokio::test]
    async fn test_order_completed_syncs_once() {
        let fx = Fixture::new();
        fx.drawing(1, "Vélo", 0).await;
        fx.order(100, "completed", None, &[(1000, 2, 2000, 0)]);
        fx.checkout(1000, 1, 2, &[1]).await;

        let first = fx.services.order_events.on_order_completed(100).await.unwrap();
        assert!(first.synced);
        assert_eq!(first.affected_loteries, vec![1]);
        assert_eq!(fx.services.drawings.load(1).await.unwrap().tickets_sold, 2);

        let second = fx.services.order_events.on_order_completed(100).await.unwrap();
        assert!(!second.synced);
        assert!(second.affected_loteries.is_empty());
    }

    #[tokio::test]
    async fn test_status_change_flips_validity_and_audits() {
        let fx = Fixture::new();
        fx.drawing(1, "Vélo", 0).await;
        fx.drawing(2, "Tablette", 0).await;
        fx.order(100, "completed", None, &[(1000, 2, 2000, 0)]);
        fx.checkout(1000, 1, 2, &[1, 2]).await;
        fx.services.order_events.on_order_completed(100).await.unwrap();
        assert_eq!(fx.services.drawings.load(1).await.unwrap().tickets_sold, 1);

        fx.store.set_order_status(100, "wc-refunded").unwrap();
        let res = fx
            .services
            .order_events
            .on_order_status_changed(&OrderStatusChangedRequest {
                order_id: 100,
                old_status: "wc-completed".into(),
                new_status: "wc-refunded".into(),
            })
            .await
            .unwrap();
        assert!(res.validity_changed);
        assert_eq!(res.affected_loteries, vec![1, 2]);
        assert_eq!(fx.services.drawings.load(1).await.unwrap().tickets_sold, 0);
        assert_eq!(fx.services.drawings.load(2).await.unwrap().tickets_sold, 0);

        let log = fx.services.audit.read(2).await.unwrap();
        assert_eq!(log[0].entry_type, entry_types::ORDER_STATUS);
        assert!(log[0].message.contains("now invalid"));
    }

    #[tokio::test]
    async fn test_status_change_within_valid_states_is_silent() {
        let fx = Fixture::new();
        fx.drawing(1, "Vélo", 0).await;
        fx.order(100, "processing", None, &[(1000, 1, 1000, 0)]);
        fx.checkout(1000, 1, 1, &[1]).await;
        fx.store.set_order_status(100, "completed").unwrap();

        let res = fx
            .services
            .order_events
            .on_order_status_changed(&OrderStatusChangedRequest {
                order_id: 100,
                old_status: "processing".into(),
                new_status: "completed".into(),
            })
            .await
            .unwrap();
        assert!(!res.validity_changed);
        assert!(fx.services.audit.read(1).await.unwrap().is_empty());
    }
}
