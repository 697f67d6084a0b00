//! 活动统计聚合、状态推导与票据列表过滤

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::models::{
    Drawing, DrawingStats, DrawingStatusCode, PaginatedResponse, PaginationParams, StatsQuery,
    TicketRecord, TicketStatus,
};

/// 四舍五入到两位小数
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn progress(valid: usize, capacity: i64) -> f64 {
    if capacity > 0 {
        round2(valid as f64 / capacity as f64 * 100.0).min(100.0)
    } else {
        0.0
    }
}

/// 按优先级推导：草稿 -> 未开始 -> 已结束 -> 已满 -> 进行中
pub fn compute_status(drawing: &Drawing, valid: usize, now: DateTime<Utc>) -> DrawingStatusCode {
    if !drawing.is_published() {
        return DrawingStatusCode::Draft;
    }
    if drawing.start_at.is_some_and(|start| start > now) {
        return DrawingStatusCode::Upcoming;
    }
    if drawing.end_at.is_some_and(|end| end < now) {
        return DrawingStatusCode::Closed;
    }
    if drawing.capacity > 0 && valid as i64 >= drawing.capacity {
        return DrawingStatusCode::Complete;
    }
    DrawingStatusCode::Active
}

/// (label, class, display_code)
fn status_display(code: DrawingStatusCode) -> (&'static str, &'static str, &'static str) {
    match code {
        DrawingStatusCode::Draft => ("Draft", "draft", "draft"),
        DrawingStatusCode::Upcoming => ("Upcoming", "upcoming", "upcoming"),
        DrawingStatusCode::Closed => ("Ended", "ended", "ended"),
        DrawingStatusCode::Complete => ("Active", "active", "active"),
        DrawingStatusCode::Active => ("Active", "active", "active"),
    }
}

pub fn aggregate(drawing: &Drawing, tickets: Vec<TicketRecord>, now: DateTime<Utc>) -> DrawingStats {
    let mut valid = 0usize;
    let mut invalid = 0usize;
    let mut winners = 0usize;
    let mut alternates = 0usize;
    let mut revenue = 0.0f64;
    let mut participants: HashSet<String> = HashSet::new();
    let mut orders: HashSet<i64> = HashSet::new();

    for ticket in &tickets {
        match ticket.status {
            TicketStatus::Invalid => invalid += 1,
            TicketStatus::Winner => winners += 1,
            TicketStatus::Alternate => alternates += 1,
            TicketStatus::Valid => {}
        }
        if ticket.status.counts_as_valid() {
            valid += 1;
            revenue += ticket.amount;
            participants.insert(ticket.participant_key());
            orders.insert(ticket.order_id);
        }
    }

    let conversion_rate = if orders.is_empty() {
        0.0
    } else {
        round2(valid as f64 / orders.len() as f64 * 100.0)
    };

    let status_code = compute_status(drawing, valid, now);
    let (mut label, mut class, mut display) = {
        let (l, c, d) = status_display(status_code);
        (l.to_string(), c.to_string(), d.to_string())
    };
    if let Some(manual) = drawing.manual_status {
        label = manual.label().to_string();
        class = manual.as_str().to_string();
        display = manual.as_str().to_string();
    }

    let ready_for_draw = valid > 0
        && matches!(
            status_code,
            DrawingStatusCode::Closed | DrawingStatusCode::Complete
        );

    DrawingStats {
        loterie_id: drawing.id,
        capacity: drawing.capacity,
        total_tickets: tickets.len(),
        valid_tickets: valid,
        invalid_tickets: invalid,
        winner_tickets: winners,
        alternate_tickets: alternates,
        revenue: round2(revenue),
        unique_participants: participants.len(),
        orders_involved: orders.len(),
        progress: progress(valid, drawing.capacity),
        conversion_rate,
        status_code,
        status_label: label,
        status_class: class,
        display_code: display,
        manual_override: drawing.manual_status.is_some(),
        ready_for_draw,
        tickets,
    }
}

fn matches_search(ticket: &TicketRecord, needle: &str) -> bool {
    let haystacks = [
        Some(ticket.ticket_number.as_str()),
        Some(ticket.customer_name.as_str()),
        ticket.customer_email.as_deref(),
        Some(ticket.order_number.as_str()),
        Some(ticket.status_label.as_str()),
    ];
    haystacks
        .into_iter()
        .flatten()
        .any(|h| h.to_lowercase().contains(needle))
}

/// 搜索 -> 状态过滤 -> 分页；只影响返回的票据行，不影响计数
pub fn filter_tickets(
    tickets: &[TicketRecord],
    query: &StatsQuery,
    default_per_page: u32,
) -> PaginatedResponse<TicketRecord> {
    let needle = query
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    let filtered: Vec<TicketRecord> = tickets
        .iter()
        .filter(|t| needle.as_deref().is_none_or(|n| matches_search(t, n)))
        .filter(|t| query.status.is_none_or(|s| t.status == s))
        .cloned()
        .collect();

    let params = PaginationParams::new(query.page, Some(query.per_page.unwrap_or(default_per_page)));
    PaginatedResponse::slice(filtered, &params)
}
