use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 审计日志条目，只追加不修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub entry_type: String,
    /// 纯文本（已去除标记）
    pub message: String,
    #[schema(value_type = Object)]
    pub context: serde_json::Value,
    pub user_id: Option<i64>,
}

pub mod entry_types {
    pub const REASSIGNMENT: &str = "reassignment";
    pub const DRAW: &str = "draw";
    pub const SETTINGS: &str = "settings";
    pub const ORDER_STATUS: &str = "order_status";
    pub const SYNC: &str = "sync";
}
