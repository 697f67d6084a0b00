use sea_orm_migration::prelude::*;

/// 抽奖活动（宿主站点文章的镜像）
#[derive(DeriveIden)]
enum Drawings {
    Table,
    Id,
    Title,
    PostStatus,
    CreatedAt,
}

/// 订单镜像
#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    OrderNumber,
    Status,
    CustomerId,
    BillingFirstName,
    BillingLastName,
    BillingEmail,
    ShippingFirstName,
    ShippingLastName,
    CustomerDisplayName,
    CreatedAt,
}

/// 订单行
#[derive(DeriveIden)]
enum OrderItems {
    Table,
    Id,
    OrderId,
    ProductId,
    Name,
    Quantity,
    TotalCents,
    TaxCents,
}

/// 通用元数据 (scope, entity_id, meta_key) -> JSON
#[derive(DeriveIden)]
enum EntityMeta {
    Table,
    Id,
    Scope,
    EntityId,
    MetaKey,
    MetaValue,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Drawings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Drawings::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Drawings::Title).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Drawings::PostStatus)
                            .string_len(32)
                            .not_null()
                            .default("draft"),
                    )
                    .col(
                        ColumnDef::new(Drawings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Orders::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Orders::OrderNumber).string_len(64).not_null())
                    .col(ColumnDef::new(Orders::Status).string_len(32).not_null())
                    .col(ColumnDef::new(Orders::CustomerId).big_integer().null())
                    .col(ColumnDef::new(Orders::BillingFirstName).string_len(255).null())
                    .col(ColumnDef::new(Orders::BillingLastName).string_len(255).null())
                    .col(ColumnDef::new(Orders::BillingEmail).string_len(255).null())
                    .col(ColumnDef::new(Orders::ShippingFirstName).string_len(255).null())
                    .col(ColumnDef::new(Orders::ShippingLastName).string_len(255).null())
                    .col(
                        ColumnDef::new(Orders::CustomerDisplayName)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Orders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        // 按顾客查询"我的彩票"
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_orders_customer_id")
                    .table(Orders::Table)
                    .col(Orders::CustomerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrderItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrderItems::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OrderItems::OrderId).big_integer().not_null())
                    .col(ColumnDef::new(OrderItems::ProductId).big_integer().not_null())
                    .col(ColumnDef::new(OrderItems::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(OrderItems::Quantity)
                            .big_integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(OrderItems::TotalCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(OrderItems::TaxCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_order_items_order_id")
                    .table(OrderItems::Table)
                    .col(OrderItems::OrderId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(EntityMeta::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EntityMeta::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(EntityMeta::Scope).string_len(32).not_null())
                    .col(ColumnDef::new(EntityMeta::EntityId).big_integer().not_null())
                    .col(ColumnDef::new(EntityMeta::MetaKey).string_len(191).not_null())
                    .col(ColumnDef::new(EntityMeta::MetaValue).json_binary().not_null())
                    .col(
                        ColumnDef::new(EntityMeta::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        // 每个实体每个 key 只有一条
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_entity_meta_scope_entity_key_unique")
                    .table(EntityMeta::Table)
                    .col(EntityMeta::Scope)
                    .col(EntityMeta::EntityId)
                    .col(EntityMeta::MetaKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EntityMeta::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OrderItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Drawings::Table).to_owned())
            .await?;
        Ok(())
    }
}
