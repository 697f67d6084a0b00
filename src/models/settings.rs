use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 插件全局设置，首次读取时按默认值创建
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Settings {
    #[serde(default = "default_reassignment_enabled")]
    pub reassignment_enabled: bool,
    #[serde(default = "default_table_page_size")]
    pub table_page_size: u32,
    #[serde(default = "default_visible_columns")]
    pub visible_columns: Vec<String>,
    /// 使票据失效的订单状态（不带宿主前缀）
    #[serde(default = "default_excluded_statuses")]
    pub excluded_statuses: Vec<String>,
}

pub const DEFAULT_EXCLUDED_STATUSES: [&str; 4] = ["cancelled", "refunded", "failed", "pending"];

pub const AVAILABLE_COLUMNS: [&str; 8] = [
    "ticket_number",
    "customer",
    "email",
    "order",
    "order_status",
    "status",
    "amount",
    "date",
];

fn default_reassignment_enabled() -> bool {
    true
}

fn default_table_page_size() -> u32 {
    25
}

fn default_visible_columns() -> Vec<String> {
    AVAILABLE_COLUMNS.iter().map(|c| c.to_string()).collect()
}

fn default_excluded_statuses() -> Vec<String> {
    DEFAULT_EXCLUDED_STATUSES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reassignment_enabled: default_reassignment_enabled(),
            table_page_size: default_table_page_size(),
            visible_columns: default_visible_columns(),
            excluded_statuses: default_excluded_statuses(),
        }
    }
}

impl Settings {
    pub fn with_page_size(page_size: u32) -> Self {
        Self {
            table_page_size: page_size,
            ..Self::default()
        }
    }
}

/// 设置表单；缺省字段保持原值
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateSettingsRequest {
    pub reassignment_enabled: Option<bool>,
    pub table_page_size: Option<u32>,
    pub visible_columns: Option<Vec<String>>,
    pub excluded_statuses: Option<Vec<String>>,
}
