//! 元数据键名（与宿主站点保持一致）

// 活动
pub const TICKET_CAPACITY: &str = "_lm_ticket_capacity";
pub const LOT_DESCRIPTION: &str = "_lm_lot_description";
pub const START_DATE: &str = "_lm_start_date";
pub const END_DATE: &str = "_lm_end_date";
pub const TICKETS_SOLD: &str = "_lm_tickets_sold";
pub const MANUAL_STATUS: &str = "_lm_manual_status";
pub const REASSIGNMENT_MODE: &str = "_lm_reassignment_mode";
pub const AUDIT_LOG: &str = "_lm_audit_log";
pub const DRAW_HISTORY: &str = "_lm_draw_history";
pub const MANUAL_DRAW_REPORTS: &str = "_lm_manual_draw_reports";
pub const MANUAL_DRAW_STATE: &str = "_lm_manual_draw_state";

// 商品
pub const PRODUCT_TICKET_ALLOCATION: &str = "_lm_product_ticket_allocation";
pub const PRODUCT_TARGET_LOTERIES: &str = "_lm_product_target_lotteries";

// 订单行
pub const ITEM_SELECTION: &str = "lm_lottery_selection";
pub const ITEM_ALLOCATION: &str = "lm_ticket_allocation";
pub const ITEM_DISTRIBUTION: &str = "lm_ticket_distribution";

// 订单
pub const ORDER_COUNTS_SYNCED: &str = "_lm_ticket_counts_synced";

// 全局选项
pub const SETTINGS: &str = "lm_settings";
