use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MarketDataOrderhistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MarketDataOrderhistory::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MarketDataOrderhistory::MapregionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarketDataOrderhistory::InvtypeId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarketDataOrderhistory::Numorders)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarketDataOrderhistory::Low)
                            .decimal_len(20, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarketDataOrderhistory::High)
                            .decimal_len(20, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarketDataOrderhistory::Mean)
                            .decimal_len(20, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarketDataOrderhistory::Quantity)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarketDataOrderhistory::Date)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Not unique: buckets past the update window receive fresh rows
        manager
            .create_index(
                Index::create()
                    .name("idx_market_data_orderhistory_region_type_date")
                    .table(MarketDataOrderhistory::Table)
                    .col(MarketDataOrderhistory::MapregionId)
                    .col(MarketDataOrderhistory::InvtypeId)
                    .col((MarketDataOrderhistory::Date, IndexOrder::Desc))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MarketDataOrderhistory::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum MarketDataOrderhistory {
    Table,
    Id,
    MapregionId,
    InvtypeId,
    Numorders,
    Low,
    High,
    Mean,
    Quantity,
    Date,
}
