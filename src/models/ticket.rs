use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use super::draw::DrawRole;

/// 票据永久引用：订单号:订单行号:槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TicketRef {
    pub order_id: i64,
    pub item_id: i64,
    pub slot: usize,
}

impl TicketRef {
    pub fn new(order_id: i64, item_id: i64, slot: usize) -> Self {
        Self {
            order_id,
            item_id,
            slot,
        }
    }

    /// 展示用票号
    pub fn ticket_number(&self) -> String {
        format!("LM-{}-{}-{:03}", self.order_id, self.item_id, self.slot + 1)
    }
}

impl fmt::Display for TicketRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.order_id, self.item_id, self.slot)
    }
}

impl FromStr for TicketRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() != 3 {
            return Err(format!("Malformed ticket reference: {s}"));
        }
        let order_id = parts[0]
            .parse::<i64>()
            .map_err(|_| format!("Malformed ticket reference: {s}"))?;
        let item_id = parts[1]
            .parse::<i64>()
            .map_err(|_| format!("Malformed ticket reference: {s}"))?;
        let slot = parts[2]
            .parse::<usize>()
            .map_err(|_| format!("Malformed ticket reference: {s}"))?;
        if order_id <= 0 || item_id <= 0 {
            return Err(format!("Malformed ticket reference: {s}"));
        }
        Ok(Self::new(order_id, item_id, slot))
    }
}

impl Serialize for TicketRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TicketRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Valid,
    Invalid,
    Winner,
    Alternate,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Valid => "valid",
            TicketStatus::Invalid => "invalid",
            TicketStatus::Winner => "winner",
            TicketStatus::Alternate => "alternate",
        }
    }

    /// 中奖与候补也计入有效票
    pub fn counts_as_valid(&self) -> bool {
        !matches!(self, TicketStatus::Invalid)
    }
}

/// 票据状态判定结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TicketResolution {
    pub status: TicketStatus,
    pub label: String,
    pub note: String,
    pub reassignable: bool,
}

/// 开奖角色（来自最近一次开奖）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DrawRoleMark {
    pub status: TicketStatus,
    pub label: String,
    pub note: String,
    pub role: DrawRole,
    pub position: usize,
    pub lock_reassignment: bool,
}

/// 派生票据记录，每次读取时重新计算，不单独持久化
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TicketRecord {
    #[schema(value_type = String, example = "1042:87:0")]
    pub reference: TicketRef,
    pub ticket_number: String,
    pub loterie_id: i64,
    pub order_id: i64,
    pub order_number: String,
    /// 去掉宿主前缀后的订单状态
    pub order_status: String,
    pub order_created_at: DateTime<Utc>,
    pub item_id: i64,
    pub slot: usize,
    pub product_name: String,
    pub customer_id: Option<i64>,
    pub customer_name: String,
    pub customer_email: Option<String>,
    /// 订单行金额（含税）按同一活动槽位数均分
    pub amount: f64,
    pub status: TicketStatus,
    pub status_label: String,
    pub status_note: String,
    pub reassignable: bool,
    pub draw_role: Option<DrawRole>,
    pub draw_position: Option<usize>,
}

impl TicketRecord {
    /// 参与者去重键：小写邮箱，否则 "order-<id>"
    pub fn participant_key(&self) -> String {
        match &self.customer_email {
            Some(email) => email.to_lowercase(),
            None => format!("order-{}", self.order_id),
        }
    }
}

/// 顾客"我的彩票"条目
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CustomerTicket {
    #[schema(value_type = String, example = "1042:87:0")]
    pub reference: TicketRef,
    pub ticket_number: String,
    /// 0 表示尚未分配
    pub loterie_id: i64,
    pub loterie_title: String,
    pub end_at: Option<DateTime<Utc>>,
    pub order_id: i64,
    pub order_number: String,
    pub product_name: String,
    pub status: TicketStatus,
    pub status_label: String,
    pub reassignable: bool,
}

/// 单张票转移请求
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ReassignTicketRequest {
    #[schema(value_type = String, example = "1042:87:0")]
    pub reference: TicketRef,
    pub target_loterie_id: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ReassignBatchRequest {
    pub tickets: Vec<ReassignTicketRequest>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReassignSkipped {
    #[schema(value_type = String, example = "1042:87:0")]
    pub reference: TicketRef,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReassignBatchResponse {
    pub moved: usize,
    pub skipped: Vec<ReassignSkipped>,
    /// 需要刷新计数的活动
    pub refreshed_loteries: Vec<i64>,
}

/// 分配预览：按选择与票数生成分配数组
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct DistributionPreviewRequest {
    #[schema(value_type = Object)]
    pub selection: serde_json::Value,
    pub tickets_total: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DistributionPreviewResponse {
    pub selection: Vec<i64>,
    pub distribution: Vec<i64>,
}
