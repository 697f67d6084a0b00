//! 票据状态判定与开奖角色映射

use std::collections::HashMap;

use crate::models::{
    DrawHistoryEntry, DrawRole, DrawRoleMark, Settings, TicketRef, TicketResolution, TicketStatus,
};

/// 开奖时排除的订单状态（比失效状态多一个 on-hold）
pub const DRAW_DISQUALIFYING_STATUSES: [&str; 5] =
    ["cancelled", "refunded", "failed", "pending", "on-hold"];

/// 去掉宿主前缀（"wc-"）并转小写
pub fn normalize_order_status(raw: &str) -> String {
    let lowered = raw.trim().to_ascii_lowercase();
    match lowered.strip_prefix("wc-") {
        Some(rest) => rest.to_string(),
        None => lowered,
    }
}

pub fn is_excluded(order_status: &str, settings: &Settings) -> bool {
    let normalized = normalize_order_status(order_status);
    settings
        .excluded_statuses
        .iter()
        .any(|s| normalize_order_status(s) == normalized)
}

pub fn is_draw_disqualified(order_status: &str) -> bool {
    let normalized = normalize_order_status(order_status);
    DRAW_DISQUALIFYING_STATUSES.contains(&normalized.as_str())
}

/// 根据订单状态判定票据；`drawing_accepts` 为该活动的转移开关（已含覆盖逻辑）
pub fn resolve(order_status: &str, settings: &Settings, drawing_accepts: bool) -> TicketResolution {
    let normalized = normalize_order_status(order_status);
    if is_excluded(&normalized, settings) {
        return TicketResolution {
            status: TicketStatus::Invalid,
            label: "Invalid".to_string(),
            note: format!("Order status: {normalized}"),
            reassignable: false,
        };
    }

    let reassignable = settings.reassignment_enabled && drawing_accepts;
    TicketResolution {
        status: TicketStatus::Valid,
        label: "Valid".to_string(),
        note: String::new(),
        reassignable,
    }
}

/// 仅最近一次开奖决定当前角色，更早的开奖只是历史记录
pub fn map_roles(history: &[DrawHistoryEntry]) -> HashMap<TicketRef, DrawRoleMark> {
    let mut roles = HashMap::new();
    let Some(latest) = history.last() else {
        return roles;
    };

    for winner in &latest.winners {
        let Ok(reference) = winner.signature.parse::<TicketRef>() else {
            log::warn!(
                "Skipping malformed signature {} in draw {}",
                winner.signature,
                latest.report_id
            );
            continue;
        };
        let (status, label) = match winner.role {
            DrawRole::Winner => (TicketStatus::Winner, "Winner".to_string()),
            DrawRole::Alternate => (
                TicketStatus::Alternate,
                format!("Alternate #{}", winner.position),
            ),
        };
        roles.insert(
            reference,
            DrawRoleMark {
                status,
                label,
                note: format!("Drawn on {} (report {})", latest.drawn_at, latest.report_id),
                role: winner.role,
                position: winner.position,
                lock_reassignment: true,
            },
        );
    }
    roles
}

/// 开奖角色覆盖订单层面的判定，并锁定转移
pub fn apply_role(resolution: TicketResolution, mark: Option<&DrawRoleMark>) -> TicketResolution {
    match mark {
        Some(mark) => TicketResolution {
            status: mark.status,
            label: mark.label.clone(),
            note: mark.note.clone(),
            reassignable: !mark.lock_reassignment && resolution.reassignable,
        },
        None => resolution,
    }
}
