//! 内存实现，用于测试与本地演示

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{DrawingRepository, MetaScope, MetaStore, OrderRepository};
use crate::domain::status::normalize_order_status;
use crate::error::{AppError, AppResult};
use crate::models::{DrawingPost, Order, OrderFilter};

#[derive(Default)]
struct Inner {
    meta: BTreeMap<(MetaScope, i64, String), Value>,
    orders: BTreeMap<i64, Order>,
    drawings: BTreeMap<i64, DrawingPost>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| AppError::InternalError("memory store poisoned".into()))
    }

    pub fn put_drawing(&self, post: DrawingPost) -> AppResult<()> {
        self.lock()?.drawings.insert(post.id, post);
        Ok(())
    }

    pub fn put_order(&self, mut order: Order) -> AppResult<()> {
        order.items.sort_by_key(|item| item.id);
        self.lock()?.orders.insert(order.id, order);
        Ok(())
    }

    /// 模拟宿主修改订单状态
    pub fn set_order_status(&self, order_id: i64, status: &str) -> AppResult<()> {
        let mut inner = self.lock()?;
        let order = inner
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;
        order.status = status.to_string();
        Ok(())
    }
}

fn matches(order: &Order, filter: &OrderFilter) -> bool {
    if let Some(customer_id) = filter.customer_id {
        if order.customer_id != Some(customer_id) {
            return false;
        }
    }
    if !filter.statuses.is_empty() {
        let status = normalize_order_status(&order.status);
        if !filter
            .statuses
            .iter()
            .any(|s| normalize_order_status(s) == status)
        {
            return false;
        }
    }
    filter.order_ids.is_empty() || filter.order_ids.contains(&order.id)
}

#[async_trait]
impl MetaStore for MemoryStore {
    async fn get(&self, scope: MetaScope, entity_id: i64, key: &str) -> AppResult<Option<Value>> {
        Ok(self
            .lock()?
            .meta
            .get(&(scope, entity_id, key.to_string()))
            .cloned())
    }

    async fn set(
        &self,
        scope: MetaScope,
        entity_id: i64,
        key: &str,
        value: Value,
    ) -> AppResult<()> {
        self.lock()?
            .meta
            .insert((scope, entity_id, key.to_string()), value);
        Ok(())
    }

    async fn delete(&self, scope: MetaScope, entity_id: i64, key: &str) -> AppResult<()> {
        self.lock()?.meta.remove(&(scope, entity_id, key.to_string()));
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn orders_matching(&self, filter: &OrderFilter) -> AppResult<Vec<Order>> {
        Ok(self
            .lock()?
            .orders
            .values()
            .filter(|order| matches(order, filter))
            .cloned()
            .collect())
    }

    async fn find_order(&self, order_id: i64) -> AppResult<Option<Order>> {
        Ok(self.lock()?.orders.get(&order_id).cloned())
    }
}

#[async_trait]
impl DrawingRepository for MemoryStore {
    async fn find_drawing_post(&self, drawing_id: i64) -> AppResult<Option<DrawingPost>> {
        Ok(self.lock()?.drawings.get(&drawing_id).cloned())
    }

    async fn list_drawing_posts(&self) -> AppResult<Vec<DrawingPost>> {
        let mut posts: Vec<DrawingPost> = self.lock()?.drawings.values().cloned().collect();
        posts.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(posts)
    }
}
