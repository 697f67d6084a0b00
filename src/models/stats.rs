use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::pagination::PaginatedResponse;
use super::ticket::{TicketRecord, TicketStatus};

/// 计算出的活动状态（开奖资格基于此，而非手动覆盖）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DrawingStatusCode {
    Draft,
    Upcoming,
    Closed,
    Complete,
    Active,
}

impl DrawingStatusCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DrawingStatusCode::Draft => "draft",
            DrawingStatusCode::Upcoming => "upcoming",
            DrawingStatusCode::Closed => "closed",
            DrawingStatusCode::Complete => "complete",
            DrawingStatusCode::Active => "active",
        }
    }
}

/// 活动统计（计数永远基于未过滤的全部票据）
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DrawingStats {
    pub loterie_id: i64,
    pub capacity: i64,
    pub total_tickets: usize,
    pub valid_tickets: usize,
    pub invalid_tickets: usize,
    pub winner_tickets: usize,
    pub alternate_tickets: usize,
    pub revenue: f64,
    pub unique_participants: usize,
    pub orders_involved: usize,
    pub progress: f64,
    pub conversion_rate: f64,
    pub status_code: DrawingStatusCode,
    pub status_label: String,
    pub status_class: String,
    pub display_code: String,
    pub manual_override: bool,
    pub ready_for_draw: bool,
    #[serde(skip)]
    pub tickets: Vec<TicketRecord>,
}

/// 统计查询参数
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct StatsQuery {
    #[serde(default)]
    pub refresh: bool,
    pub search: Option<String>,
    pub status: Option<TicketStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DrawingStatsView {
    pub stats: DrawingStats,
    #[schema(value_type = Object)]
    pub tickets: PaginatedResponse<TicketRecord>,
}
