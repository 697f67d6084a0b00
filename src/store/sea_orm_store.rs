//! sea-orm 实现：读取宿主镜像表，元数据写入 entity_meta

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use serde_json::Value;
use std::collections::HashMap;

use super::{DrawingRepository, MetaScope, MetaStore, OrderRepository};
use crate::domain::status::normalize_order_status;
use crate::entities::{
    drawing_entity as drawings, entity_meta_entity as meta, order_entity as orders,
    order_item_entity as items,
};
use crate::error::AppResult;
use crate::models::{DrawingPost, Order, OrderFilter};

#[derive(Clone)]
pub struct SeaOrmStore {
    pool: DatabaseConnection,
}

impl SeaOrmStore {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    async fn find_meta(
        &self,
        scope: MetaScope,
        entity_id: i64,
        key: &str,
    ) -> AppResult<Option<meta::Model>> {
        Ok(meta::Entity::find()
            .filter(meta::Column::Scope.eq(scope.as_str()))
            .filter(meta::Column::EntityId.eq(entity_id))
            .filter(meta::Column::MetaKey.eq(key))
            .one(&self.pool)
            .await?)
    }

    async fn attach_items(&self, order_models: Vec<orders::Model>) -> AppResult<Vec<Order>> {
        if order_models.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = order_models.iter().map(|o| o.id).collect();
        let item_models = items::Entity::find()
            .filter(items::Column::OrderId.is_in(ids))
            .order_by_asc(items::Column::Id)
            .all(&self.pool)
            .await?;

        let mut grouped: HashMap<i64, Vec<items::Model>> = HashMap::new();
        for item in item_models {
            grouped.entry(item.order_id).or_default().push(item);
        }

        Ok(order_models
            .into_iter()
            .map(|order| {
                let order_items = grouped.remove(&order.id).unwrap_or_default();
                Order::from_models(order, order_items)
            })
            .collect())
    }
}

#[async_trait]
impl MetaStore for SeaOrmStore {
    async fn get(&self, scope: MetaScope, entity_id: i64, key: &str) -> AppResult<Option<Value>> {
        Ok(self
            .find_meta(scope, entity_id, key)
            .await?
            .map(|m| m.meta_value))
    }

    async fn set(
        &self,
        scope: MetaScope,
        entity_id: i64,
        key: &str,
        value: Value,
    ) -> AppResult<()> {
        // 读改写，无并发控制（低频管理操作）
        match self.find_meta(scope, entity_id, key).await? {
            Some(existing) => {
                let mut am = existing.into_active_model();
                am.meta_value = Set(value);
                am.updated_at = Set(Utc::now());
                am.update(&self.pool).await?;
            }
            None => {
                meta::ActiveModel {
                    scope: Set(scope.as_str().to_string()),
                    entity_id: Set(entity_id),
                    meta_key: Set(key.to_string()),
                    meta_value: Set(value),
                    updated_at: Set(Utc::now()),
                    ..Default::default()
                }
                .insert(&self.pool)
                .await?;
            }
        }
        Ok(())
    }

    async fn delete(&self, scope: MetaScope, entity_id: i64, key: &str) -> AppResult<()> {
        meta::Entity::delete_many()
            .filter(meta::Column::Scope.eq(scope.as_str()))
            .filter(meta::Column::EntityId.eq(entity_id))
            .filter(meta::Column::MetaKey.eq(key))
            .exec(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for SeaOrmStore {
    async fn orders_matching(&self, filter: &OrderFilter) -> AppResult<Vec<Order>> {
        let mut query = orders::Entity::find().order_by_asc(orders::Column::Id);
        if let Some(customer_id) = filter.customer_id {
            query = query.filter(orders::Column::CustomerId.eq(customer_id));
        }
        if !filter.order_ids.is_empty() {
            query = query.filter(orders::Column::Id.is_in(filter.order_ids.clone()));
        }
        let mut models = query.all(&self.pool).await?;

        // 宿主状态可能带前缀，在内存中比较
        if !filter.statuses.is_empty() {
            let wanted: Vec<String> = filter
                .statuses
                .iter()
                .map(|s| normalize_order_status(s))
                .collect();
            models.retain(|o| wanted.contains(&normalize_order_status(&o.status)));
        }

        self.attach_items(models).await
    }

    async fn find_order(&self, order_id: i64) -> AppResult<Option<Order>> {
        let Some(model) = orders::Entity::find_by_id(order_id).one(&self.pool).await? else {
            return Ok(None);
        };
        Ok(self.attach_items(vec![model]).await?.into_iter().next())
    }
}

#[async_trait]
impl DrawingRepository for SeaOrmStore {
    async fn find_drawing_post(&self, drawing_id: i64) -> AppResult<Option<DrawingPost>> {
        Ok(drawings::Entity::find_by_id(drawing_id)
            .one(&self.pool)
            .await?
            .map(Into::into))
    }

    async fn list_drawing_posts(&self) -> AppResult<Vec<DrawingPost>> {
        let list = drawings::Entity::find()
            .order_by_asc(drawings::Column::Title)
            .order_by_asc(drawings::Column::Id)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }
}

impl From<drawings::Model> for DrawingPost {
    fn from(m: drawings::Model) -> Self {
        DrawingPost {
            id: m.id,
            title: m.title,
            post_status: m.post_status,
        }
    }
}
