use chrono::Utc;
use serde_json::json;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::domain::distribution::{
    MAX_TICKETS_PER_ITEM, normalize, parse_distribution, parse_int, parse_selection, repair,
    tickets_total, within_limit,
};
use crate::domain::stats::{aggregate, filter_tickets};
use crate::domain::status::{apply_role, map_roles, normalize_order_status, resolve};
use crate::error::{AppError, AppResult};
use crate::models::{
    CustomerTicket, DistributionPreviewRequest, DistributionPreviewResponse, Drawing,
    DrawingStats, DrawingStatsView, Order, OrderFilter, OrderItem, Settings, StatsQuery,
    TicketRecord, TicketRef,
};
use crate::services::{DrawingService, SettingsService};
use crate::store::{MetaScope, Stores, keys};

/// "我的彩票"只列出这些状态的订单
const CUSTOMER_ORDER_STATUSES: [&str; 2] = ["completed", "processing"];

#[derive(Clone)]
pub struct TicketService {
    stores: Stores,
    settings: SettingsService,
    drawings: DrawingService,
}

impl TicketService {
    pub fn new(stores: Stores, settings: SettingsService, drawings: DrawingService) -> Self {
        Self {
            stores,
            settings,
            drawings,
        }
    }

    /// 新建一个请求级别的统计缓存
    pub fn ledger(&self) -> TicketLedger {
        TicketLedger::new(self.clone())
    }

    /// 后台预览：按选择与票数生成分配数组，不落库
    pub fn preview_distribution(
        &self,
        req: &DistributionPreviewRequest,
    ) -> AppResult<DistributionPreviewResponse> {
        if !within_limit(req.tickets_total) {
            return Err(AppError::ValidationError(format!(
                "At most {MAX_TICKETS_PER_ITEM} tickets per order item"
            )));
        }
        let selection = parse_selection(&req.selection);
        let distribution = normalize(&selection, req.tickets_total);
        Ok(DistributionPreviewResponse {
            selection,
            distribution,
        })
    }

    /// 读取订单行的分配数组；长度不符时按选择重建并写回
    ///
    /// 没有任何抽奖元数据的订单行不是抽奖商品，返回空数组。
    pub async fn item_distribution(&self, item: &OrderItem) -> AppResult<Vec<i64>> {
        let selection_raw = self
            .stores
            .raw(MetaScope::OrderItem, item.id, keys::ITEM_SELECTION)
            .await?;
        let allocation_raw = self
            .stores
            .raw(MetaScope::OrderItem, item.id, keys::ITEM_ALLOCATION)
            .await?;
        let distribution_raw = self
            .stores
            .raw(MetaScope::OrderItem, item.id, keys::ITEM_DISTRIBUTION)
            .await?;

        if selection_raw.is_none() && allocation_raw.is_none() && distribution_raw.is_none() {
            return Ok(Vec::new());
        }

        let selection = selection_raw
            .as_ref()
            .map(parse_selection)
            .unwrap_or_default();
        let allocation = allocation_raw.as_ref().and_then(parse_int).unwrap_or(1);
        let persisted = distribution_raw.as_ref().and_then(parse_distribution);

        let expected = tickets_total(allocation, item.quantity);
        if !within_limit(expected) {
            log::warn!(
                "Skipping order item {}: {expected} tickets exceeds the per-item limit (allocation={allocation}, quantity={})",
                item.id,
                item.quantity
            );
            return Ok(Vec::new());
        }

        let (distribution, rebuilt) = repair(persisted, &selection, allocation, item.quantity);
        if rebuilt {
            log::warn!(
                "Rebuilt ticket distribution for order item {} (allocation={}, quantity={}, tickets={})",
                item.id,
                allocation,
                item.quantity,
                distribution.len()
            );
            self.stores
                .meta
                .set(
                    MetaScope::OrderItem,
                    item.id,
                    keys::ITEM_DISTRIBUTION,
                    json!(distribution),
                )
                .await?;
        }
        Ok(distribution)
    }

    /// 某个活动的全部派生票据（扫描所有状态的订单）
    pub async fn collect_tickets(
        &self,
        drawing: &Drawing,
        settings: &Settings,
    ) -> AppResult<Vec<TicketRecord>> {
        let history = self.drawings.draw_history(drawing.id).await?;
        let roles = map_roles(&history);
        let accepts = drawing
            .reassignment_mode
            .resolve(settings.reassignment_enabled);

        let orders = self
            .stores
            .orders
            .orders_matching(&OrderFilter::default())
            .await?;

        let mut tickets = Vec::new();
        for order in &orders {
            for item in &order.items {
                let distribution = self.item_distribution(item).await?;
                let slots: Vec<usize> = distribution
                    .iter()
                    .enumerate()
                    .filter(|(_, id)| **id == drawing.id)
                    .map(|(slot, _)| slot)
                    .collect();
                if slots.is_empty() {
                    continue;
                }

                let share = (item.total_cents + item.tax_cents) as f64 / 100.0 / slots.len() as f64;
                for slot in slots {
                    let reference = TicketRef::new(order.id, item.id, slot);
                    let role = roles.get(&reference);
                    let resolution = apply_role(resolve(&order.status, settings, accepts), role);
                    tickets.push(TicketRecord {
                        reference,
                        ticket_number: reference.ticket_number(),
                        loterie_id: drawing.id,
                        order_id: order.id,
                        order_number: order.number.clone(),
                        order_status: normalize_order_status(&order.status),
                        order_created_at: order.created_at,
                        item_id: item.id,
                        slot,
                        product_name: item.name.clone(),
                        customer_id: order.customer_id,
                        customer_name: order.customer_name(),
                        customer_email: order.customer_email(),
                        amount: share,
                        status: resolution.status,
                        status_label: resolution.label,
                        status_note: resolution.note,
                        reassignable: resolution.reassignable,
                        draw_role: role.map(|r| r.role),
                        draw_position: role.map(|r| r.position),
                    });
                }
            }
        }
        Ok(tickets)
    }

    /// 顾客的全部票据（已完成 / 处理中的订单）
    pub async fn customer_tickets(&self, customer_id: i64) -> AppResult<Vec<CustomerTicket>> {
        let settings = self.settings.get().await?;
        let orders = self
            .stores
            .orders
            .orders_matching(&OrderFilter::for_customer(customer_id, &CUSTOMER_ORDER_STATUSES))
            .await?;

        let mut drawings: HashMap<i64, Option<Drawing>> = HashMap::new();
        let mut roles = HashMap::new();
        let mut out = Vec::new();

        for order in &orders {
            for item in &order.items {
                let distribution = self.item_distribution(item).await?;
                for (slot, drawing_id) in distribution.into_iter().enumerate() {
                    let reference = TicketRef::new(order.id, item.id, slot);
                    let drawing = if drawing_id > 0 {
                        if !drawings.contains_key(&drawing_id) {
                            let found = self.drawings.find(drawing_id).await?;
                            if found.is_some() {
                                let history = self.drawings.draw_history(drawing_id).await?;
                                roles.extend(map_roles(&history));
                            }
                            drawings.insert(drawing_id, found);
                        }
                        drawings.get(&drawing_id).cloned().flatten()
                    } else {
                        None
                    };

                    // 未分配的票只受订单状态与全局开关约束
                    let accepts = drawing
                        .as_ref()
                        .map(|d| d.reassignment_mode.resolve(settings.reassignment_enabled))
                        .unwrap_or(settings.reassignment_enabled);
                    let resolution =
                        apply_role(resolve(&order.status, &settings, accepts), roles.get(&reference));

                    out.push(CustomerTicket {
                        reference,
                        ticket_number: reference.ticket_number(),
                        loterie_id: drawing_id,
                        loterie_title: drawing.as_ref().map(|d| d.title.clone()).unwrap_or_default(),
                        end_at: drawing.as_ref().and_then(|d| d.end_at),
                        order_id: order.id,
                        order_number: order.number.clone(),
                        product_name: item.name.clone(),
                        status: resolution.status,
                        status_label: resolution.label,
                        reassignable: resolution.reassignable,
                    });
                }
            }
        }
        Ok(out)
    }

    /// 定位单张票：订单、订单行与当前分配数组
    pub async fn locate(&self, reference: &TicketRef) -> AppResult<(Order, OrderItem, Vec<i64>)> {
        let order = self
            .stores
            .orders
            .find_order(reference.order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {} not found", reference.order_id)))?;
        let item = order
            .item(reference.item_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Ticket {reference} not found")))?;
        let distribution = self.item_distribution(&item).await?;
        if reference.slot >= distribution.len() {
            return Err(AppError::NotFound(format!("Ticket {reference} not found")));
        }
        Ok((order, item, distribution))
    }
}

/// 请求级别的活动统计缓存
///
/// 每个请求新建一个，不跨请求共享。变更操作把受影响的活动放进待刷新队列，
/// 请求结束前调用 `flush_refresh` 强制重建并写回已售计数。
pub struct TicketLedger {
    tickets: TicketService,
    settings: Option<Settings>,
    cache: HashMap<i64, Arc<DrawingStats>>,
    pending: BTreeSet<i64>,
}

impl TicketLedger {
    fn new(tickets: TicketService) -> Self {
        Self {
            tickets,
            settings: None,
            cache: HashMap::new(),
            pending: BTreeSet::new(),
        }
    }

    async fn settings(&mut self) -> AppResult<Settings> {
        if let Some(settings) = &self.settings {
            return Ok(settings.clone());
        }
        let settings = self.tickets.settings.get().await?;
        self.settings = Some(settings.clone());
        Ok(settings)
    }

    pub async fn stats(&mut self, drawing_id: i64, force: bool) -> AppResult<Arc<DrawingStats>> {
        if force {
            self.cache.remove(&drawing_id);
        }
        if let Some(stats) = self.cache.get(&drawing_id) {
            return Ok(stats.clone());
        }

        let drawing = self.tickets.drawings.load(drawing_id).await?;
        let settings = self.settings().await?;
        let tickets = self.tickets.collect_tickets(&drawing, &settings).await?;
        let stats = Arc::new(aggregate(&drawing, tickets, Utc::now()));
        log::debug!(
            "Built stats for loterie {drawing_id}: {} valid / {} total",
            stats.valid_tickets,
            stats.total_tickets
        );
        self.cache.insert(drawing_id, stats.clone());
        Ok(stats)
    }

    /// 统计 + 过滤后的票据分页
    pub async fn stats_view(&mut self, drawing_id: i64, query: &StatsQuery) -> AppResult<DrawingStatsView> {
        let stats = self.stats(drawing_id, query.refresh).await?;
        let page_size = self.settings().await?.table_page_size;
        let tickets = filter_tickets(&stats.tickets, query, page_size);
        Ok(DrawingStatsView {
            stats: stats.as_ref().clone(),
            tickets,
        })
    }

    /// 带 `refresh` 时先重建并校正已售计数，再复用缓存出视图（只重建一次）
    pub async fn refreshed_stats_view(
        &mut self,
        drawing_id: i64,
        query: &StatsQuery,
    ) -> AppResult<DrawingStatsView> {
        if !query.refresh {
            return self.stats_view(drawing_id, query).await;
        }
        self.enqueue_refresh(drawing_id);
        if !self.flush_refresh().await?.contains(&drawing_id) {
            return Err(AppError::NotFound(format!("Loterie {drawing_id} not found")));
        }
        let cached = StatsQuery {
            refresh: false,
            ..query.clone()
        };
        self.stats_view(drawing_id, &cached).await
    }

    pub fn invalidate(&mut self, drawing_id: i64) {
        self.cache.remove(&drawing_id);
    }

    pub fn enqueue_refresh(&mut self, drawing_id: i64) {
        if drawing_id > 0 {
            self.pending.insert(drawing_id);
        }
    }

    /// 强制重建待刷新的活动，并把有效票数写回已售计数
    pub async fn flush_refresh(&mut self) -> AppResult<Vec<i64>> {
        let pending = std::mem::take(&mut self.pending);
        let mut refreshed = Vec::with_capacity(pending.len());
        for drawing_id in pending {
            let stats = match self.stats(drawing_id, true).await {
                Ok(stats) => stats,
                Err(AppError::NotFound(_)) => {
                    log::warn!("Skipping counter refresh for missing loterie {drawing_id}");
                    continue;
                }
                Err(e) => return Err(e),
            };
            self.tickets
                .drawings
                .set_tickets_sold(drawing_id, stats.valid_tickets)
                .await?;
            refreshed.push(drawing_id);
        }
        if !refreshed.is_empty() {
            log::info!("Ticket counters refreshed for loteries {refreshed:?}");
        }
        Ok(refreshed)
    }
}
