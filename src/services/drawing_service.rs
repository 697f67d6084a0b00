use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Value, json};

use crate::domain::audit::strip_markup;
use crate::domain::distribution::{parse_int, parse_selection};
use crate::domain::stats::progress;
use crate::error::{AppError, AppResult};
use crate::models::{
    Actor, DrawHistoryEntry, Drawing, DrawingChoice, DrawingPost, DrawingSummary, ManualStatus,
    ProductLotteryConfig, ReassignmentMode, Settings, UpdateDrawingMetaRequest, entry_types,
};
use crate::services::AuditService;
use crate::store::{MetaScope, Stores, keys};

/// 解析日期：RFC 3339、"YYYY-MM-DD HH:MM:SS" 或 "YYYY-MM-DD"
/// 只有日期时，结束日期取当天 23:59:59，开始日期取 00:00:00
pub fn parse_date(raw: &str, end_of_day: bool) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let time = if end_of_day {
        date.and_hms_opt(23, 59, 59)?
    } else {
        date.and_hms_opt(0, 0, 0)?
    };
    Some(time.and_utc())
}

fn value_as_string(value: Option<Value>) -> String {
    match value {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[derive(Clone)]
pub struct DrawingService {
    stores: Stores,
    audit: AuditService,
}

impl DrawingService {
    pub fn new(stores: Stores, audit: AuditService) -> Self {
        Self { stores, audit }
    }

    pub async fn find(&self, drawing_id: i64) -> AppResult<Option<Drawing>> {
        let Some(post) = self.stores.drawings.find_drawing_post(drawing_id).await? else {
            return Ok(None);
        };
        Ok(Some(self.hydrate(post).await?))
    }

    pub async fn load(&self, drawing_id: i64) -> AppResult<Drawing> {
        self.find(drawing_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loterie {drawing_id} not found")))
    }

    /// 后台列表：全部活动（含草稿），按标题排序
    pub async fn list(&self) -> AppResult<Vec<Drawing>> {
        let posts = self.stores.drawings.list_drawing_posts().await?;
        let mut drawings = Vec::with_capacity(posts.len());
        for post in posts {
            drawings.push(self.hydrate(post).await?);
        }
        Ok(drawings)
    }

    /// 文章 + 元数据 -> 强类型活动
    async fn hydrate(&self, post: DrawingPost) -> AppResult<Drawing> {
        let id = post.id;
        let meta = |key: &'static str| self.stores.raw(MetaScope::Drawing, id, key);

        let capacity = meta(keys::TICKET_CAPACITY)
            .await?
            .as_ref()
            .and_then(parse_int)
            .unwrap_or(0)
            .max(0);
        let prize_description = value_as_string(meta(keys::LOT_DESCRIPTION).await?);
        let start_at = parse_date(&value_as_string(meta(keys::START_DATE).await?), false);
        let end_at = parse_date(&value_as_string(meta(keys::END_DATE).await?), true);
        let manual_status = ManualStatus::parse(&value_as_string(meta(keys::MANUAL_STATUS).await?));
        let reassignment_mode =
            ReassignmentMode::parse(&value_as_string(meta(keys::REASSIGNMENT_MODE).await?));
        let tickets_sold = meta(keys::TICKETS_SOLD)
            .await?
            .as_ref()
            .and_then(parse_int)
            .unwrap_or(0)
            .max(0);

        Ok(Drawing {
            id,
            title: post.title,
            post_status: post.post_status,
            capacity,
            prize_description,
            start_at,
            end_at,
            manual_status,
            reassignment_mode,
            tickets_sold,
        })
    }

    /// 活动元数据保存
    pub async fn update_meta(
        &self,
        actor: &Actor,
        drawing_id: i64,
        req: &UpdateDrawingMetaRequest,
    ) -> AppResult<Drawing> {
        let drawing = self.load(drawing_id).await?;
        let mut changed: Vec<&str> = Vec::new();

        if let Some(capacity) = req.capacity {
            self.set_meta(drawing_id, keys::TICKET_CAPACITY, json!(capacity.max(0)))
                .await?;
            changed.push("capacity");
        }
        if let Some(description) = &req.prize_description {
            self.set_meta(drawing_id, keys::LOT_DESCRIPTION, json!(strip_markup(description)))
                .await?;
            changed.push("prize_description");
        }
        if let Some(start) = &req.start_date {
            self.set_date(drawing_id, keys::START_DATE, start, false).await?;
            changed.push("start_date");
        }
        if let Some(end) = &req.end_date {
            self.set_date(drawing_id, keys::END_DATE, end, true).await?;
            changed.push("end_date");
        }
        if let Some(status) = &req.manual_status {
            if status.trim().is_empty() {
                self.stores
                    .meta
                    .delete(MetaScope::Drawing, drawing_id, keys::MANUAL_STATUS)
                    .await?;
            } else {
                let parsed = ManualStatus::parse(status).ok_or_else(|| {
                    AppError::ValidationError(format!("Unknown manual status: {status}"))
                })?;
                self.set_meta(drawing_id, keys::MANUAL_STATUS, json!(parsed.as_str()))
                    .await?;
            }
            changed.push("manual_status");
        }
        if let Some(mode) = req.reassignment_mode {
            self.set_meta(drawing_id, keys::REASSIGNMENT_MODE, json!(mode.as_str()))
                .await?;
            changed.push("reassignment_mode");
        }

        if !changed.is_empty() {
            self.audit
                .append(
                    drawing_id,
                    entry_types::SETTINGS,
                    &format!("Loterie \"{}\" settings updated", drawing.title),
                    json!({ "fields": changed }),
                    Some(actor.id),
                )
                .await?;
            log::info!("Loterie {drawing_id} meta updated by user {}: {:?}", actor.id, changed);
        }

        self.load(drawing_id).await
    }

    async fn set_meta(&self, drawing_id: i64, key: &str, value: Value) -> AppResult<()> {
        self.stores
            .meta
            .set(MetaScope::Drawing, drawing_id, key, value)
            .await
    }

    async fn set_date(&self, drawing_id: i64, key: &str, raw: &str, end_of_day: bool) -> AppResult<()> {
        if raw.trim().is_empty() {
            return self.stores.meta.delete(MetaScope::Drawing, drawing_id, key).await;
        }
        if parse_date(raw, end_of_day).is_none() {
            return Err(AppError::ValidationError(format!("Invalid date: {raw}")));
        }
        self.set_meta(drawing_id, key, json!(raw.trim())).await
    }

    pub async fn set_tickets_sold(&self, drawing_id: i64, sold: usize) -> AppResult<()> {
        self.set_meta(drawing_id, keys::TICKETS_SOLD, json!(sold)).await
    }

    /// 前台摘要（基于已售计数缓存）
    pub async fn summary(&self, drawing_id: i64) -> AppResult<DrawingSummary> {
        let drawing = self.load(drawing_id).await?;
        if !drawing.is_published() {
            return Err(AppError::NotFound(format!("Loterie {drawing_id} not found")));
        }
        let sold = drawing.tickets_sold.max(0) as usize;
        Ok(DrawingSummary {
            id: drawing.id,
            title: strip_markup(&drawing.title),
            prize_description: drawing.prize_description.clone(),
            end_at: drawing.end_at,
            tickets_sold: drawing.tickets_sold,
            capacity: drawing.capacity,
            progress: progress(sold, drawing.capacity),
        })
    }

    /// 已发布活动，按标题排序
    pub async fn choices(&self, settings: &Settings) -> AppResult<Vec<DrawingChoice>> {
        let posts = self.stores.drawings.list_drawing_posts().await?;
        let mut choices = Vec::new();
        for post in posts.into_iter().filter(|p| p.post_status == "publish") {
            let drawing = self.hydrate(post).await?;
            choices.push(DrawingChoice {
                id: drawing.id,
                title: drawing.title.clone(),
                accepts_reassignment: drawing
                    .reassignment_mode
                    .resolve(settings.reassignment_enabled),
            });
        }
        Ok(choices)
    }

    pub async fn draw_history(&self, drawing_id: i64) -> AppResult<Vec<DrawHistoryEntry>> {
        Ok(self
            .stores
            .load::<Vec<DrawHistoryEntry>>(MetaScope::Drawing, drawing_id, keys::DRAW_HISTORY)
            .await?
            .unwrap_or_default())
    }

    pub async fn product_config(&self, product_id: i64) -> AppResult<ProductLotteryConfig> {
        let allocation = self
            .stores
            .raw(MetaScope::Product, product_id, keys::PRODUCT_TICKET_ALLOCATION)
            .await?
            .as_ref()
            .and_then(parse_int)
            .unwrap_or(0)
            .max(0);
        let targets = self
            .stores
            .raw(MetaScope::Product, product_id, keys::PRODUCT_TARGET_LOTERIES)
            .await?
            .map(|v| parse_selection(&v))
            .unwrap_or_default();
        Ok(ProductLotteryConfig {
            ticket_allocation: allocation,
            target_lotteries: targets,
        })
    }

    pub async fn save_product_config(
        &self,
        product_id: i64,
        config: &ProductLotteryConfig,
    ) -> AppResult<ProductLotteryConfig> {
        let targets = parse_selection(&json!(config.target_lotteries));
        for target in &targets {
            if self.stores.drawings.find_drawing_post(*target).await?.is_none() {
                return Err(AppError::ValidationError(format!(
                    "Unknown loterie {target}"
                )));
            }
        }
        let normalized = ProductLotteryConfig {
            ticket_allocation: config.ticket_allocation.max(0),
            target_lotteries: targets,
        };
        self.stores
            .meta
            .set(
                MetaScope::Product,
                product_id,
                keys::PRODUCT_TICKET_ALLOCATION,
                json!(normalized.ticket_allocation),
            )
            .await?;
        self.stores
            .meta
            .set(
                MetaScope::Product,
                product_id,
                keys::PRODUCT_TARGET_LOTERIES,
                json!(normalized.target_lotteries),
            )
            .await?;
        Ok(normalized)
    }
}
