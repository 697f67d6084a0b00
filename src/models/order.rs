use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{order_entity, order_item_entity};

/// 宿主订单（只读视图）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: i64,
    pub number: String,
    /// 原始状态，可能带宿主前缀（如 "wc-completed"）
    pub status: String,
    pub customer_id: Option<i64>,
    pub billing_first_name: Option<String>,
    pub billing_last_name: Option<String>,
    pub billing_email: Option<String>,
    pub shipping_first_name: Option<String>,
    pub shipping_last_name: Option<String>,
    pub customer_display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub name: String,
    pub quantity: i64,
    pub total_cents: i64,
    pub tax_cents: i64,
}

/// 批量订单查询条件；空集合表示不过滤
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub customer_id: Option<i64>,
    pub statuses: Vec<String>,
    pub order_ids: Vec<i64>,
}

impl OrderFilter {
    pub fn for_customer(customer_id: i64, statuses: &[&str]) -> Self {
        Self {
            customer_id: Some(customer_id),
            statuses: statuses.iter().map(|s| s.to_string()).collect(),
            order_ids: Vec::new(),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn join_name(first: &Option<String>, last: &Option<String>) -> Option<String> {
    let parts: Vec<&str> = [non_empty(first), non_empty(last)]
        .into_iter()
        .flatten()
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

impl Order {
    /// 账单姓名 -> 收货姓名 -> 账户显示名 -> 通用占位
    pub fn customer_name(&self) -> String {
        join_name(&self.billing_first_name, &self.billing_last_name)
            .or_else(|| join_name(&self.shipping_first_name, &self.shipping_last_name))
            .or_else(|| non_empty(&self.customer_display_name).map(str::to_string))
            .unwrap_or_else(|| "Guest customer".to_string())
    }

    pub fn customer_email(&self) -> Option<String> {
        non_empty(&self.billing_email).map(str::to_string)
    }

    pub fn item(&self, item_id: i64) -> Option<&OrderItem> {
        self.items.iter().find(|item| item.id == item_id)
    }
}

impl Order {
    pub fn from_models(order: order_entity::Model, items: Vec<order_item_entity::Model>) -> Self {
        Self {
            id: order.id,
            number: order.order_number,
            status: order.status,
            customer_id: order.customer_id,
            billing_first_name: order.billing_first_name,
            billing_last_name: order.billing_last_name,
            billing_email: order.billing_email,
            shipping_first_name: order.shipping_first_name,
            shipping_last_name: order.shipping_last_name,
            customer_display_name: order.customer_display_name,
            created_at: order.created_at,
            items: items.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<order_item_entity::Model> for OrderItem {
    fn from(m: order_item_entity::Model) -> Self {
        Self {
            id: m.id,
            order_id: m.order_id,
            product_id: m.product_id,
            name: m.name,
            quantity: m.quantity,
            total_cents: m.total_cents,
            tax_cents: m.tax_cents,
        }
    }
}

/// 订单状态变更事件（由宿主适配层推送）
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct OrderStatusChangedRequest {
    pub order_id: i64,
    pub old_status: String,
    pub new_status: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderStatusChangedResponse {
    pub order_id: i64,
    /// 受影响的活动
    pub affected_loteries: Vec<i64>,
    /// 有效/无效是否发生翻转
    pub validity_changed: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct OrderCompletedRequest {
    pub order_id: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderCompletedResponse {
    pub order_id: i64,
    /// 已同步过则为 false
    pub synced: bool,
    pub affected_loteries: Vec<i64>,
}

/// 结账时写入订单行的抽奖数据
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CheckoutItemRequest {
    pub item_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    /// 买家选择：逗号分隔字符串、JSON 数组字符串或 id 数组
    #[schema(value_type = Object)]
    pub selection: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckoutItemResponse {
    pub item_id: i64,
    pub selection: Vec<i64>,
    pub ticket_allocation: i64,
    pub distribution: Vec<i64>,
}
