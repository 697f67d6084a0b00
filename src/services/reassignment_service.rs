use serde_json::json;

use crate::domain::distribution::selection_from_distribution;
use crate::domain::status::{is_excluded, map_roles};
use crate::error::{AppError, AppResult};
use crate::models::{
    Actor, ReassignBatchResponse, ReassignSkipped, ReassignTicketRequest, entry_types,
};
use crate::services::{AuditService, DrawingService, SettingsService, TicketLedger, TicketService};
use crate::store::{MetaScope, Stores, keys};

/// 谁在转移：运营人员可转任意订单，顾客只能转自己的
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReassignScope {
    Operator,
    Customer(i64),
}

#[derive(Clone)]
pub struct ReassignmentService {
    stores: Stores,
    settings: SettingsService,
    drawings: DrawingService,
    tickets: TicketService,
    audit: AuditService,
}

impl ReassignmentService {
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

    /// 活动覆盖优先，其次全局开关
    pub async fn is_enabled_for(&self, drawing_id: i64) -> AppResult<bool> {
        let settings = self.settings.get().await?;
        let drawing = self.drawings.load(drawing_id).await?;
        Ok(drawing
            .reassignment_mode
            .resolve(settings.reassignment_enabled))
    }

    /// 转移一张票；失败时不做任何修改
    pub async fn reassign(
        &self,
        ledger: &mut TicketLedger,
        actor: &Actor,
        scope: ReassignScope,
        req: &ReassignTicketRequest,
    ) -> AppResult<()> {
        let reference = req.reference;
        let target_id = req.target_loterie_id;
        if target_id <= 0 {
            return Err(AppError::ValidationError(format!(
                "Invalid target loterie {target_id}"
            )));
        }

        let (order, item, mut distribution) = self.tickets.locate(&reference).await?;
        if let ReassignScope::Customer(customer_id) = scope {
            if order.customer_id != Some(customer_id) {
                return Err(AppError::Forbidden);
            }
        }

        let origin_id = distribution[reference.slot];
        if origin_id == target_id {
            return Err(AppError::Eligibility(format!(
                "Ticket {} is already assigned to loterie {target_id}",
                reference.ticket_number()
            )));
        }

        let settings = self.settings.get().await?;
        if is_excluded(&order.status, &settings) {
            return Err(AppError::Eligibility(format!(
                "Ticket {} belongs to an invalid order",
                reference.ticket_number()
            )));
        }
        if !settings.reassignment_enabled {
            return Err(AppError::Eligibility("Ticket reassignment is disabled".into()));
        }

        let origin = if origin_id > 0 {
            self.drawings.find(origin_id).await?
        } else {
            None
        };
        if let Some(origin) = &origin {
            if !origin.reassignment_mode.resolve(settings.reassignment_enabled) {
                return Err(AppError::Eligibility(format!(
                    "Reassignment is disabled for loterie \"{}\"",
                    origin.title
                )));
            }
            let history = self.drawings.draw_history(origin.id).await?;
            if map_roles(&history).contains_key(&reference) {
                return Err(AppError::Eligibility(format!(
                    "Ticket {} was drawn and is locked",
                    reference.ticket_number()
                )));
            }
        }

        let target = self.drawings.load(target_id).await?;
        if !target.is_published() {
            return Err(AppError::Eligibility(format!(
                "Loterie {target_id} is not open"
            )));
        }
        if !target.reassignment_mode.resolve(settings.reassignment_enabled) {
            return Err(AppError::Eligibility(format!(
                "Loterie \"{}\" does not accept reassigned tickets",
                target.title
            )));
        }

        distribution[reference.slot] = target_id;
        let selection = selection_from_distribution(&distribution);
        self.stores
            .meta
            .set(
                MetaScope::OrderItem,
                item.id,
                keys::ITEM_DISTRIBUTION,
                json!(distribution),
            )
            .await?;
        self.stores
            .meta
            .set(MetaScope::OrderItem, item.id, keys::ITEM_SELECTION, json!(selection))
            .await?;

        let origin_title = origin
            .as_ref()
            .map(|d| d.title.clone())
            .unwrap_or_else(|| "unassigned".to_string());
        let message = format!(
            "Ticket {} (order #{}) moved from \"{}\" to \"{}\" by {}",
            reference.ticket_number(),
            order.number,
            origin_title,
            target.title,
            actor.display_name
        );
        let context = json!({
            "reference": reference.to_string(),
            "order_id": order.id,
            "from": origin_id,
            "to": target_id,
        });
        if origin_id > 0 {
            self.audit
                .append(origin_id, entry_types::REASSIGNMENT, &message, context.clone(), Some(actor.id))
                .await?;
        }
        self.audit
            .append(target_id, entry_types::REASSIGNMENT, &message, context, Some(actor.id))
            .await?;

        for id in [origin_id, target_id] {
            ledger.invalidate(id);
            ledger.enqueue_refresh(id);
        }
        log::info!(
            "Ticket {reference} reassigned from loterie {origin_id} to {target_id} by user {}",
            actor.id
        );
        Ok(())
    }

    /// 批量转移：逐张独立处理，不合格的跳过，存储故障则中止
    pub async fn reassign_batch(
        &self,
        actor: &Actor,
        scope: ReassignScope,
        requests: &[ReassignTicketRequest],
    ) -> AppResult<ReassignBatchResponse> {
        let mut ledger = self.tickets.ledger();
        let mut moved = 0;
        let mut skipped = Vec::new();

        for req in requests {
            match self.reassign(&mut ledger, actor, scope, req).await {
                Ok(()) => moved += 1,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    log::warn!("Skipping reassignment of {}: {}", req.reference, e);
                    skipped.push(ReassignSkipped {
                        reference: req.reference,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let refreshed_loteries = ledger.flush_refresh().await?;
        Ok(ReassignBatchResponse {
            moved,
            skipped,
            refreshed_loteries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CommitDrawRequest, PrepareDrawRequest, TicketRef, UpdateSettingsRequest};
    use crate::services::test_support::*;

    fn move_to(reference: &str, target: i64) -> ReassignTicketRequest {
        ReassignTicketRequest {
            reference: reference.parse().unwrap(),
            target_loterie_id: target,
        }
    }

    async fn two_drawings() -> Fixture {
        let fx = Fixture::new();
        fx.drawing(1, "Vélo", 0).await;
        fx.drawing(2, "Tablette", 0).await;
        fx.order(100, "completed", Some(5), &[(1000, 3, 3000, 0)]);
        fx.checkout(1000, 1, 3, &[1]).await;
        fx
    }

    #[tokio::test]
    async fn test_reassign_moves_exactly_one_ticket() {
        let fx = two_drawings().await;
        let mut ledger = fx.services.tickets.ledger();
        let before_1 = ledger.stats(1, false).await.unwrap().valid_tickets;
        let before_2 = ledger.stats(2, false).await.unwrap().valid_tickets;

        let result = fx
            .services
            .reassignment
            .reassign_batch(&operator(), ReassignScope::Operator, &[move_to("100:1000:1", 2)])
            .await
            .unwrap();
        assert_eq!(result.moved, 1);
        assert_eq!(result.refreshed_loteries, vec![1, 2]);

        let mut ledger = fx.services.tickets.ledger();
        assert_eq!(ledger.stats(1, false).await.unwrap().valid_tickets, before_1 - 1);
        assert_eq!(ledger.stats(2, false).await.unwrap().valid_tickets, before_2 + 1);
        assert_eq!(fx.item_meta(1000, keys::ITEM_DISTRIBUTION).await, Some(json!([1, 2, 1])));
        assert_eq!(fx.item_meta(1000, keys::ITEM_SELECTION).await, Some(json!([1, 2])));
        assert_eq!(fx.services.drawings.load(2).await.unwrap().tickets_sold, 1);

        let log_1 = fx.services.audit.read(1).await.unwrap();
        let log_2 = fx.services.audit.read(2).await.unwrap();
        assert_eq!(log_1[0].entry_type, entry_types::REASSIGNMENT);
        assert_eq!(log_2[0].user_id, Some(1));
    }

    #[tokio::test]
    async fn test_batch_skips_ineligible_tickets() {
        let fx = two_drawings().await;
        fx.drawing(3, "Montre", 0).await;
        fx.set_mode(3, "disabled").await;

        let result = fx
            .services
            .reassignment
            .reassign_batch(
                &operator(),
                ReassignScope::Operator,
                &[
                    move_to("100:1000:0", 3),
                    move_to("100:1000:1", 1),
                    move_to("100:1000:9", 2),
                    move_to("100:1000:2", 2),
                ],
            )
            .await
            .unwrap();
        assert_eq!(result.moved, 1);
        assert_eq!(result.skipped.len(), 3);
        assert_eq!(fx.item_meta(1000, keys::ITEM_DISTRIBUTION).await, Some(json!([1, 1, 2])));
    }

    #[tokio::test]
    async fn test_global_toggle_blocks_reassignment() {
        let fx = two_drawings().await;
        fx.services
            .settings
            .update(&UpdateSettingsRequest {
                reassignment_enabled: Some(false),
                ..Default::default()
            })
            .await
            .unwrap();
        let mut ledger = fx.services.tickets.ledger();
        let err = fx
            .services
            .reassignment
            .reassign(&mut ledger, &operator(), ReassignScope::Operator, &move_to("100:1000:0", 2))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Eligibility(_)));
    }

    #[tokio::test]
    async fn test_invalid_order_cannot_move() {
        let fx = two_drawings().await;
        fx.store.set_order_status(100, "refunded").unwrap();
        let mut ledger = fx.services.tickets.ledger();
        let err = fx
            .services
            .reassignment
            .reassign(&mut ledger, &operator(), ReassignScope::Operator, &move_to("100:1000:0", 2))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Eligibility(_)));
    }

    #[tokio::test]
    async fn test_customer_scope_limited_to_own_orders() {
        let fx = two_drawings().await;
        let mut ledger = fx.services.tickets.ledger();
        let err = fx
            .services
            .reassignment
            .reassign(&mut ledger, &customer(6), ReassignScope::Customer(6), &move_to("100:1000:0", 2))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        fx.services
            .reassignment
            .reassign(&mut ledger, &customer(5), ReassignScope::Customer(5), &move_to("100:1000:0", 2))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_drawn_ticket_is_locked() {
        let fx = two_drawings().await;
        fx.close(1).await;
        let preview = fx
            .services
            .draws
            .prepare(
                &operator(),
                1,
                &PrepareDrawRequest {
                    exclude_cancelled_orders: true,
                    public_seed: Some("ABC".into()),
                    confirm_reviewed: true,
                },
            )
            .await
            .unwrap();
        let report = fx
            .services
            .draws
            .commit(
                &operator(),
                &Default::default(),
                1,
                &CommitDrawRequest {
                    nonce: preview.nonce,
                    alternate_count: 0,
                },
            )
            .await
            .unwrap();
        let winner: TicketRef = report.body.winners[0].signature.parse().unwrap();

        let mut ledger = fx.services.tickets.ledger();
        let before = ledger.stats(1, false).await.unwrap().valid_tickets;
        let err = fx
            .services
            .reassignment
            .reassign(
                &mut ledger,
                &operator(),
                ReassignScope::Operator,
                &ReassignTicketRequest {
                    reference: winner,
                    target_loterie_id: 2,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Eligibility(_)));
        assert_eq!(ledger.stats(1, true).await.unwrap().valid_tickets, before);
        assert_eq!(fx.item_meta(1000, keys::ITEM_DISTRIBUTION).await, Some(json!([1, 1, 1])));
    }

    #[tokio::test]
    async fn test_is_enabled_for_resolution() {
        let fx = two_drawings().await;
        fx.set_mode(2, "disabled").await;
        assert!(fx.services.reassignment.is_enabled_for(1).await.unwrap());
        assert!(!fx.services.reassignment.is_enabled_for(2).await.unwrap());
    }
}
