use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 宿主文章层面的活动信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DrawingPost {
    pub id: i64,
    pub title: String,
    pub post_status: String,
}

/// 抽奖活动（文章 + 元数据）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Drawing {
    pub id: i64,
    pub title: String,
    pub post_status: String,
    /// 票数上限，0 = 不限
    pub capacity: i64,
    pub prize_description: String,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub manual_status: Option<ManualStatus>,
    pub reassignment_mode: ReassignmentMode,
    /// 已售票数缓存，非权威数据
    pub tickets_sold: i64,
}

impl Drawing {
    pub fn is_published(&self) -> bool {
        self.post_status == "publish"
    }
}

/// 管理员手动覆盖的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ManualStatus {
    Active,
    Upcoming,
    Cancelled,
    Suspended,
    Ended,
}

impl ManualStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManualStatus::Active => "active",
            ManualStatus::Upcoming => "upcoming",
            ManualStatus::Cancelled => "cancelled",
            ManualStatus::Suspended => "suspended",
            ManualStatus::Ended => "ended",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ManualStatus::Active => "Active",
            ManualStatus::Upcoming => "Upcoming",
            ManualStatus::Cancelled => "Cancelled",
            ManualStatus::Suspended => "Suspended",
            ManualStatus::Ended => "Ended",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => Some(ManualStatus::Active),
            "upcoming" => Some(ManualStatus::Upcoming),
            "cancelled" => Some(ManualStatus::Cancelled),
            "suspended" => Some(ManualStatus::Suspended),
            "ended" => Some(ManualStatus::Ended),
            _ => None,
        }
    }
}

/// 单个活动的转移开关：继承全局 / 强制开启 / 强制关闭
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReassignmentMode {
    #[default]
    Inherit,
    Enabled,
    Disabled,
}

impl ReassignmentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReassignmentMode::Inherit => "inherit",
            ReassignmentMode::Enabled => "enabled",
            ReassignmentMode::Disabled => "disabled",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "enabled" => ReassignmentMode::Enabled,
            "disabled" => ReassignmentMode::Disabled,
            _ => ReassignmentMode::Inherit,
        }
    }

    /// 三级判定：活动覆盖 -> 全局设置
    pub fn resolve(&self, global_enabled: bool) -> bool {
        match self {
            ReassignmentMode::Enabled => true,
            ReassignmentMode::Disabled => false,
            ReassignmentMode::Inherit => global_enabled,
        }
    }
}

/// 活动元数据编辑请求
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateDrawingMetaRequest {
    pub capacity: Option<i64>,
    pub prize_description: Option<String>,
    /// YYYY-MM-DD 或 RFC 3339，空字符串表示清除
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// 空字符串表示取消手动覆盖
    pub manual_status: Option<String>,
    pub reassignment_mode: Option<ReassignmentMode>,
}

/// 前台展示用的活动摘要（短代码 / 缩略图浮层）
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DrawingSummary {
    pub id: i64,
    pub title: String,
    pub prize_description: String,
    pub end_at: Option<DateTime<Utc>>,
    pub tickets_sold: i64,
    pub capacity: i64,
    pub progress: f64,
}

/// 可选活动（转移目标下拉框）
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DrawingChoice {
    pub id: i64,
    pub title: String,
    pub accepts_reassignment: bool,
}

/// 商品的抽奖配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct ProductLotteryConfig {
    /// 每件商品发放的票数，0 表示按 1 张计
    pub ticket_allocation: i64,
    pub target_lotteries: Vec<i64>,
}
