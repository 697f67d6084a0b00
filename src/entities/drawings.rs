use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// 抽奖活动（loterie）
/// 说明:
/// - 对应宿主站点的一篇文章，标题与发布状态来自宿主
/// - 其余字段（容量、日期、审计日志、开奖历史等）保存在 entity_meta
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "drawings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub title: String,
    /// publish / draft / pending / private / trash
    pub post_status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
