use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Order id comes from the feed, so no auto increment
        manager
            .create_table(
                Table::create()
                    .table(MarketDataOrders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MarketDataOrders::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MarketDataOrders::GeneratedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarketDataOrders::Price)
                            .decimal_len(20, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarketDataOrders::VolumeRemaining)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarketDataOrders::VolumeEntered)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarketDataOrders::MinimumVolume)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarketDataOrders::OrderRange)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MarketDataOrders::IsBid).boolean().not_null())
                    .col(
                        ColumnDef::new(MarketDataOrders::IssueDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MarketDataOrders::Duration).integer().not_null())
                    .col(
                        ColumnDef::new(MarketDataOrders::IsSuspicious)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(MarketDataOrders::MessageKey)
                            .string_len(255)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(MarketDataOrders::UploaderIpHash)
                            .string_len(255)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(MarketDataOrders::MapregionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarketDataOrders::InvtypeId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarketDataOrders::StastationId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarketDataOrders::MapsolarsystemId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarketDataOrders::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .to_owned(),
            )
            .await?;

        // Stddev lookups, retirement and region stats all filter on this
        manager
            .create_index(
                Index::create()
                    .name("idx_market_data_orders_region_type_active")
                    .table(MarketDataOrders::Table)
                    .col(MarketDataOrders::MapregionId)
                    .col(MarketDataOrders::InvtypeId)
                    .col(MarketDataOrders::IsActive)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MarketDataOrders::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum MarketDataOrders {
    Table,
    Id,
    GeneratedAt,
    Price,
    VolumeRemaining,
    VolumeEntered,
    MinimumVolume,
    OrderRange,
    IsBid,
    IssueDate,
    Duration,
    IsSuspicious,
    MessageKey,
    UploaderIpHash,
    MapregionId,
    InvtypeId,
    StastationId,
    MapsolarsystemId,
    IsActive,
}
