use chrono::Utc;
use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

use crate::domain::audit::push_capped;
use crate::domain::draw::{
    MAX_ALTERNATES, checksum, generate_seed, pick_winners, ticket_source, verify_report,
};
use crate::domain::status::{is_draw_disqualified, map_roles};
use crate::error::{AppError, AppResult};
use crate::models::{
    Actor, ClientMeta, CommitDrawRequest, DrawHistoryEntry, DrawOptions, DrawPreview, DrawReport,
    DrawReportBody, DrawReportVerification, DrawRoleMark, DrawStep, DrawWinner, DrawWizardState,
    DrawWizardView, PrepareDrawRequest, TicketRecord, TicketStatus, entry_types,
};
use crate::services::{AuditService, DrawingService, TicketLedger, TicketService};
use crate::store::{MetaScope, Stores, keys};

/// 手动开奖向导：PREPARE -> VALIDATE -> COMMITTED
#[derive(Clone)]
pub struct DrawService {
    stores: Stores,
    drawings: DrawingService,
    tickets: TicketService,
    audit: AuditService,
    report_limit: usize,
    history_limit: usize,
}

impl DrawService {
    pub fn new(
        stores: Stores,
        drawings: DrawingService,
        tickets: TicketService,
        audit: AuditService,
        report_limit: usize,
        history_limit: usize,
    ) -> Self {
        Self {
            stores,
            drawings,
            tickets,
            audit,
            report_limit,
            history_limit,
        }
    }

    async fn load_state(&self, drawing_id: i64) -> AppResult<Option<DrawWizardState>> {
        self.stores
            .load::<DrawWizardState>(MetaScope::Drawing, drawing_id, keys::MANUAL_DRAW_STATE)
            .await
    }

    async fn save_state(&self, state: &DrawWizardState) -> AppResult<()> {
        self.stores
            .save(MetaScope::Drawing, state.loterie_id, keys::MANUAL_DRAW_STATE, state)
            .await
    }

    pub async fn wizard(&self, drawing_id: i64) -> AppResult<DrawWizardView> {
        self.drawings.load(drawing_id).await?;
        let state = self.load_state(drawing_id).await?;
        Ok(DrawWizardView {
            loterie_id: drawing_id,
            step: state.as_ref().map(|s| s.step).unwrap_or(DrawStep::Prepare),
            state,
        })
    }

    /// 奖池：状态恰为有效的票，按引用排序保证可复现
    pub async fn eligible_pool(
        &self,
        ledger: &mut TicketLedger,
        drawing_id: i64,
        exclude_cancelled_orders: bool,
    ) -> AppResult<Vec<TicketRecord>> {
        let stats = ledger.stats(drawing_id, true).await?;
        let mut pool: Vec<TicketRecord> = stats
            .tickets
            .iter()
            .filter(|t| t.status == TicketStatus::Valid)
            .filter(|t| !exclude_cancelled_orders || !is_draw_disqualified(&t.order_status))
            .cloned()
            .collect();
        pool.sort_by_key(|t| t.reference);
        Ok(pool)
    }

    /// PREPARE：确认核对并锁定选项，进入 VALIDATE
    pub async fn prepare(
        &self,
        actor: &Actor,
        drawing_id: i64,
        req: &PrepareDrawRequest,
    ) -> AppResult<DrawPreview> {
        self.drawings.load(drawing_id).await?;
        if let Some(state) = self.load_state(drawing_id).await? {
            if state.step != DrawStep::Prepare {
                return Err(AppError::ValidationError(
                    "A draw is already in progress; restart the wizard first".into(),
                ));
            }
        }
        if !req.confirm_reviewed {
            return Err(AppError::ValidationError(
                "Please confirm that you reviewed the participant list".into(),
            ));
        }

        let provided = req
            .public_seed
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let seed = provided.map(str::to_string).unwrap_or_else(generate_seed);

        let mut ledger = self.tickets.ledger();
        let pool = self
            .eligible_pool(&mut ledger, drawing_id, req.exclude_cancelled_orders)
            .await?;
        if pool.is_empty() {
            return Err(AppError::Eligibility(
                "No eligible tickets for this loterie".into(),
            ));
        }
        let participants: HashSet<String> = pool.iter().map(|t| t.participant_key()).collect();

        let state = DrawWizardState {
            step: DrawStep::Validate,
            loterie_id: drawing_id,
            operator_id: actor.id,
            exclude_cancelled_orders: req.exclude_cancelled_orders,
            public_seed: seed,
            seed_provided: provided.is_some(),
            nonce: Uuid::new_v4().to_string(),
            pool_size: pool.len(),
            prepared_at: Utc::now(),
            report_id: None,
        };
        self.save_state(&state).await?;
        log::info!(
            "Draw prepared for loterie {drawing_id} by user {} ({} tickets)",
            actor.id,
            pool.len()
        );

        Ok(DrawPreview {
            loterie_id: drawing_id,
            step: state.step,
            nonce: state.nonce,
            seed: state.public_seed,
            pool_size: state.pool_size,
            unique_participants: participants.len(),
            exclude_cancelled_orders: state.exclude_cancelled_orders,
            max_alternates: MAX_ALTERNATES,
        })
    }

    /// COMMITTED：执行开奖并写入不可变报告
    pub async fn commit(
        &self,
        actor: &Actor,
        client: &ClientMeta,
        drawing_id: i64,
        req: &CommitDrawRequest,
    ) -> AppResult<DrawReport> {
        let drawing = self.drawings.load(drawing_id).await?;
        let mut state = match self.load_state(drawing_id).await? {
            Some(state) if state.step == DrawStep::Validate => state,
            _ => {
                return Err(AppError::ValidationError(
                    "The draw must be prepared before it can be committed".into(),
                ));
            }
        };
        if req.nonce != state.nonce {
            return Err(AppError::ValidationError("Security token mismatch".into()));
        }
        if state.operator_id != actor.id {
            return Err(AppError::ValidationError(
                "The draw was prepared by another operator".into(),
            ));
        }
        if req.alternate_count > MAX_ALTERNATES {
            return Err(AppError::ValidationError(format!(
                "At most {MAX_ALTERNATES} alternates can be drawn"
            )));
        }

        let mut ledger = self.tickets.ledger();
        let pool = self
            .eligible_pool(&mut ledger, drawing_id, state.exclude_cancelled_orders)
            .await?;
        if pool.is_empty() {
            return Err(AppError::Eligibility(
                "No eligible tickets for this loterie".into(),
            ));
        }

        let references: Vec<String> = pool.iter().map(|t| t.reference.to_string()).collect();
        let source = ticket_source(&references);
        let picks = pick_winners(&state.public_seed, &source, pool.len(), req.alternate_count);

        let winners: Vec<DrawWinner> = picks
            .iter()
            .map(|pick| {
                let ticket = &pool[pick.index];
                DrawWinner {
                    signature: ticket.reference.to_string(),
                    ticket_number: ticket.ticket_number.clone(),
                    order_id: ticket.order_id,
                    order_number: ticket.order_number.clone(),
                    participant: ticket.customer_name.clone(),
                    role: pick.role,
                    position: pick.position,
                }
            })
            .collect();

        let body = DrawReportBody {
            id: format!("draw-{}", Uuid::new_v4().simple()),
            loterie_id: drawing_id,
            report_type: "manual".to_string(),
            created_at: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            seed: state.public_seed.clone(),
            ticket_count: pool.len(),
            operator_id: actor.id,
            operator: actor.display_name.clone(),
            ip: client.ip.clone(),
            user_agent: client.user_agent.clone(),
            winners,
            options: DrawOptions {
                exclude_cancelled_orders: state.exclude_cancelled_orders,
                alternate_count: req.alternate_count,
                seed_provided: state.seed_provided,
            },
        };
        let report = DrawReport {
            checksum: checksum(&body)?,
            body,
        };

        let mut reports = self.stored_reports(drawing_id).await?;
        push_capped(&mut reports, report.clone(), self.report_limit);
        self.stores
            .save(MetaScope::Drawing, drawing_id, keys::MANUAL_DRAW_REPORTS, &reports)
            .await?;

        let mut history = self.drawings.draw_history(drawing_id).await?;
        push_capped(&mut history, DrawHistoryEntry::from(&report), self.history_limit);
        self.stores
            .save(MetaScope::Drawing, drawing_id, keys::DRAW_HISTORY, &history)
            .await?;

        if let Some(winner) = report.body.winners.first() {
            self.audit
                .append(
                    drawing_id,
                    entry_types::DRAW,
                    &format!(
                        "Manual draw for \"{}\": winning ticket {} (order #{})",
                        drawing.title, winner.ticket_number, winner.order_number
                    ),
                    json!({
                        "report_id": report.body.id,
                        "seed": report.body.seed,
                        "ticket_count": report.body.ticket_count,
                        "alternates": report.body.winners.len() - 1,
                    }),
                    Some(actor.id),
                )
                .await?;
        }

        state.step = DrawStep::Committed;
        state.report_id = Some(report.body.id.clone());
        self.save_state(&state).await?;

        ledger.invalidate(drawing_id);
        ledger.enqueue_refresh(drawing_id);
        ledger.flush_refresh().await?;

        log::info!(
            "Draw {} committed for loterie {drawing_id} by user {} ({} tickets, checksum {})",
            report.body.id,
            actor.id,
            report.body.ticket_count,
            report.checksum
        );
        Ok(report)
    }

    /// 回到 PREPARE；已写入的报告保留
    pub async fn restart(&self, actor: &Actor, drawing_id: i64) -> AppResult<DrawWizardView> {
        self.drawings.load(drawing_id).await?;
        self.stores
            .meta
            .delete(MetaScope::Drawing, drawing_id, keys::MANUAL_DRAW_STATE)
            .await?;
        log::info!("Draw wizard restarted for loterie {drawing_id} by user {}", actor.id);
        Ok(DrawWizardView {
            loterie_id: drawing_id,
            step: DrawStep::Prepare,
            state: None,
        })
    }

    async fn stored_reports(&self, drawing_id: i64) -> AppResult<Vec<DrawReport>> {
        Ok(self
            .stores
            .load::<Vec<DrawReport>>(MetaScope::Drawing, drawing_id, keys::MANUAL_DRAW_REPORTS)
            .await?
            .unwrap_or_default())
    }

    /// 最新的在前
    pub async fn reports(&self, drawing_id: i64) -> AppResult<Vec<DrawReport>> {
        self.drawings.load(drawing_id).await?;
        let mut reports = self.stored_reports(drawing_id).await?;
        reports.reverse();
        Ok(reports)
    }

    pub async fn report(&self, drawing_id: i64, report_id: &str) -> AppResult<DrawReport> {
        self.stored_reports(drawing_id)
            .await?
            .into_iter()
            .find(|r| r.body.id == report_id)
            .ok_or_else(|| AppError::NotFound(format!("Draw report {report_id} not found")))
    }

    pub async fn verify(&self, drawing_id: i64, report_id: &str) -> AppResult<DrawReportVerification> {
        let report = self.report(drawing_id, report_id).await?;
        let valid = verify_report(&report)?;
        if !valid {
            log::warn!("Checksum mismatch for draw report {report_id} of loterie {drawing_id}");
        }
        Ok(DrawReportVerification {
            report_id: report.body.id,
            checksum: report.checksum,
            valid,
        })
    }

    /// 最近一次开奖的角色映射，键为票据引用
    pub async fn roles(&self, drawing_id: i64) -> AppResult<BTreeMap<String, DrawRoleMark>> {
        let history = self.drawings.draw_history(drawing_id).await?;
        Ok(map_roles(&history)
            .into_iter()
            .map(|(reference, mark)| (reference.to_string(), mark))
            .collect())
    }

    /// 最新的在前
    pub async fn history(&self, drawing_id: i64) -> AppResult<Vec<DrawHistoryEntry>> {
        let mut history = self.drawings.draw_history(drawing_id).await?;
        history.reverse();
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DrawRole;
    use crate::services::test_support::*;
    use crate::store::MetaStore;

    fn prepare_req(seed: Option<&str>) -> PrepareDrawRequest {
        PrepareDrawRequest {
            exclude_cancelled_orders: true,
            public_seed: seed.map(str::to_string),
            confirm_reviewed: true,
        }
    }

    /// 5 张有效票的活动
    async fn five_ticket_drawing() -> Fixture {
        let fx = Fixture::new();
        fx.drawing(1, "Vélo", 5).await;
        for n in 0..5 {
            let order_id = 100 + n;
            let item_id = 1000 + n;
            fx.order(order_id, "completed", None, &[(item_id, 1, 1000, 0)]);
            fx.checkout(item_id, 1, 1, &[1]).await;
        }
        fx
    }

    async fn run_draw(fx: &Fixture, seed: &str, alternates: u8) -> DrawReport {
        let preview = fx
            .services
            .draws
            .prepare(&operator(), 1, &prepare_req(Some(seed)))
            .await
            .unwrap();
        fx.services
            .draws
            .commit(
                &operator(),
                &ClientMeta {
                    ip: "10.0.0.1".into(),
                    user_agent: "tests".into(),
                },
                1,
                &CommitDrawRequest {
                    nonce: preview.nonce,
                    alternate_count: alternates,
                },
            )
            .await
            .unwrap()
    }

    fn signatures(report: &DrawReport) -> Vec<(String, DrawRole)> {
        report
            .body
            .winners
            .iter()
            .map(|w| (w.signature.clone(), w.role))
            .collect()
    }

    #[tokio::test]
    async fn test_draw_is_deterministic_for_same_pool_and_seed() {
        let a = five_ticket_drawing().await;
        let b = five_ticket_drawing().await;
        let first = run_draw(&a, "ABC", 2).await;
        let second = run_draw(&b, "ABC", 2).await;

        assert_eq!(first.body.winners.len(), 3);
        assert_eq!(first.body.ticket_count, 5);
        assert_eq!(signatures(&first), signatures(&second));
        let distinct: HashSet<&str> = first.body.winners.iter().map(|w| w.signature.as_str()).collect();
        assert_eq!(distinct.len(), 3);
        assert_eq!(first.body.winners[0].role, DrawRole::Winner);
        assert!(first.body.winners[1..].iter().all(|w| w.role == DrawRole::Alternate));
        assert!(verify_report(&first).unwrap());
    }

    #[tokio::test]
    async fn test_commit_records_report_history_and_audit() {
        let fx = five_ticket_drawing().await;
        let report = run_draw(&fx, "ABC", 1).await;

        let reports = fx.services.draws.reports(1).await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0], report);
        assert_eq!(reports[0].body.ip, "10.0.0.1");

        let history = fx.services.draws.history(1).await.unwrap();
        assert_eq!(history[0].report_id, report.body.id);
        assert_eq!(history[0].checksum, report.checksum);

        let log = fx.services.audit.read(1).await.unwrap();
        assert_eq!(log[0].entry_type, entry_types::DRAW);
        assert!(log[0].message.contains(&report.body.winners[0].ticket_number));

        let wizard = fx.services.draws.wizard(1).await.unwrap();
        assert_eq!(wizard.step, DrawStep::Committed);

        let roles = fx.services.draws.roles(1).await.unwrap();
        assert_eq!(roles.len(), 2);
        assert!(roles[&report.body.winners[0].signature].lock_reassignment);

        let mut ledger = fx.services.tickets.ledger();
        let stats = ledger.stats(1, false).await.unwrap();
        assert_eq!(stats.winner_tickets, 1);
        assert_eq!(stats.alternate_tickets, 1);
        assert_eq!(stats.valid_tickets, 5);
    }

    #[tokio::test]
    async fn test_prepare_requires_confirmation() {
        let fx = five_ticket_drawing().await;
        let mut req = prepare_req(None);
        req.confirm_reviewed = false;
        let err = fx.services.draws.prepare(&operator(), 1, &req).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert_eq!(fx.services.draws.wizard(1).await.unwrap().step, DrawStep::Prepare);
    }

    #[tokio::test]
    async fn test_empty_pool_is_rejected() {
        let fx = Fixture::new();
        fx.drawing(1, "Vélo", 0).await;
        fx.order(100, "on-hold", None, &[(1000, 1, 1000, 0)]);
        fx.checkout(1000, 1, 1, &[1]).await;

        let err = fx
            .services
            .draws
            .prepare(&operator(), 1, &prepare_req(None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Eligibility(_)));
        assert!(fx.services.draws.wizard(1).await.unwrap().state.is_none());

        // 不排除时 on-hold 订单仍在奖池中
        let mut req = prepare_req(None);
        req.exclude_cancelled_orders = false;
        let preview = fx.services.draws.prepare(&operator(), 1, &req).await.unwrap();
        assert_eq!(preview.pool_size, 1);
        assert_eq!(preview.seed.len(), 16);
    }

    #[tokio::test]
    async fn test_nonce_mismatch_rejected_without_report() {
        let fx = five_ticket_drawing().await;
        fx.services
            .draws
            .prepare(&operator(), 1, &prepare_req(Some("ABC")))
            .await
            .unwrap();
        let err = fx
            .services
            .draws
            .commit(
                &operator(),
                &ClientMeta::default(),
                1,
                &CommitDrawRequest {
                    nonce: "forged".into(),
                    alternate_count: 0,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert!(fx.services.draws.reports(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_too_many_alternates_rejected() {
        let fx = five_ticket_drawing().await;
        let preview = fx
            .services
            .draws
            .prepare(&operator(), 1, &prepare_req(Some("ABC")))
            .await
            .unwrap();
        let err = fx
            .services
            .draws
            .commit(
                &operator(),
                &ClientMeta::default(),
                1,
                &CommitDrawRequest {
                    nonce: preview.nonce,
                    alternate_count: 4,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_restart_allows_new_draw_and_latest_draw_wins() {
        let fx = five_ticket_drawing().await;
        let first = run_draw(&fx, "ABC", 0).await;

        let err = fx
            .services
            .draws
            .prepare(&operator(), 1, &prepare_req(Some("XYZ")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        fx.services.draws.restart(&operator(), 1).await.unwrap();
        let second = run_draw(&fx, "XYZ", 0).await;
        // 上一次的中奖票不在新奖池中
        assert_eq!(second.body.ticket_count, 4);
        assert_ne!(first.body.winners[0].signature, second.body.winners[0].signature);

        let roles = fx.services.draws.roles(1).await.unwrap();
        assert_eq!(roles.len(), 1);
        assert!(roles.contains_key(&second.body.winners[0].signature));
        assert_eq!(fx.services.draws.reports(1).await.unwrap()[0].body.id, second.body.id);
    }

    #[tokio::test]
    async fn test_verify_detects_tampering() {
        let fx = five_ticket_drawing().await;
        let report = run_draw(&fx, "ABC", 0).await;
        let ok = fx.services.draws.verify(1, &report.body.id).await.unwrap();
        assert!(ok.valid);

        let mut tampered = report.clone();
        tampered.body.seed = "ABD".into();
        fx.store
            .set(MetaScope::Drawing, 1, keys::MANUAL_DRAW_REPORTS, json!([tampered]))
            .await
            .unwrap();
        let bad = fx.services.draws.verify(1, &report.body.id).await.unwrap();
        assert!(!bad.valid);
    }

    #[tokio::test]
    async fn test_reports_and_history_keep_latest_twenty() {
        let fx = five_ticket_drawing().await;
        let mut ids = Vec::new();
        for n in 0..23 {
            if n > 0 {
                fx.services.draws.restart(&operator(), 1).await.unwrap();
            }
            ids.push(run_draw(&fx, &format!("SEED{n}"), 0).await.body.id);
        }

        let reports = fx.services.draws.reports(1).await.unwrap();
        assert_eq!(reports.len(), 20);
        assert_eq!(reports[0].body.id, ids[22]);
        assert_eq!(reports[19].body.id, ids[3]);
        let err = fx.services.draws.report(1, &ids[0]).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        assert_eq!(fx.services.draws.history(1).await.unwrap().len(), 20);
    }
}
