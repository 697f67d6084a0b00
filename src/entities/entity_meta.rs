use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// 通用元数据表
/// 说明:
/// - (scope, entity_id, meta_key) 唯一
/// - meta_value 统一存 JSON，读取时在存储边界解析为强类型
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "entity_meta")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// drawing / order / order_item / product / option
    pub scope: String,
    pub entity_id: i64,
    pub meta_key: String,
    pub meta_value: Json,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
