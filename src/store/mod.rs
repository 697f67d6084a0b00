//! 外部协作者接口：元数据存储、订单查询、活动文章
//!
//! 核心逻辑只依赖这些 trait；生产环境使用 sea-orm 实现，测试使用内存实现。

pub mod keys;
#[cfg(test)]
pub mod memory;
pub mod sea_orm_store;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

use crate::error::AppResult;
use crate::models::{DrawingPost, Order, OrderFilter};

#[cfg(test)]
pub use memory::MemoryStore;
pub use sea_orm_store::SeaOrmStore;

/// 元数据所属实体类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetaScope {
    Drawing,
    Order,
    OrderItem,
    Product,
    /// 全局选项，entity_id 固定为 0
    Option,
}

impl MetaScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetaScope::Drawing => "drawing",
            MetaScope::Order => "order",
            MetaScope::OrderItem => "order_item",
            MetaScope::Product => "product",
            MetaScope::Option => "option",
        }
    }
}

#[async_trait]
pub trait MetaStore: Send + Sync {
    async fn get(&self, scope: MetaScope, entity_id: i64, key: &str) -> AppResult<Option<Value>>;

    async fn set(&self, scope: MetaScope, entity_id: i64, key: &str, value: Value)
    -> AppResult<()>;

    async fn delete(&self, scope: MetaScope, entity_id: i64, key: &str) -> AppResult<()>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// 按 id 升序返回，订单行按 id 升序
    async fn orders_matching(&self, filter: &OrderFilter) -> AppResult<Vec<Order>>;

    async fn find_order(&self, order_id: i64) -> AppResult<Option<Order>>;
}

#[async_trait]
pub trait DrawingRepository: Send + Sync {
    async fn find_drawing_post(&self, drawing_id: i64) -> AppResult<Option<DrawingPost>>;

    /// 按标题升序
    async fn list_drawing_posts(&self) -> AppResult<Vec<DrawingPost>>;
}

/// 服务共享的存储句柄
#[derive(Clone)]
pub struct Stores {
    pub meta: Arc<dyn MetaStore>,
    pub orders: Arc<dyn OrderRepository>,
    pub drawings: Arc<dyn DrawingRepository>,
}

impl Stores {
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: MetaStore + OrderRepository + DrawingRepository + 'static,
    {
        Self {
            meta: backend.clone(),
            orders: backend.clone(),
            drawings: backend,
        }
    }

    /// 读取并反序列化；格式不符时记录警告并视为缺失
    pub async fn load<T: DeserializeOwned>(
        &self,
        scope: MetaScope,
        entity_id: i64,
        key: &str,
    ) -> AppResult<Option<T>> {
        let Some(raw) = self.meta.get(scope, entity_id, key).await? else {
            return Ok(None);
        };
        match serde_json::from_value::<T>(raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                log::warn!(
                    "Ignoring malformed meta {}#{} {}: {}",
                    scope.as_str(),
                    entity_id,
                    key,
                    e
                );
                Ok(None)
            }
        }
    }

    pub async fn save<T: Serialize + Sync>(
        &self,
        scope: MetaScope,
        entity_id: i64,
        key: &str,
        value: &T,
    ) -> AppResult<()> {
        let raw = serde_json::to_value(value)?;
        self.meta.set(scope, entity_id, key, raw).await
    }

    pub async fn raw(&self, scope: MetaScope, entity_id: i64, key: &str) -> AppResult<Option<Value>> {
        self.meta.get(scope, entity_id, key).await
    }
}
