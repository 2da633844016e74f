use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Append-only status counters, one row per status code per flush
        manager
            .create_table(
                Table::create()
                    .table(MarketDataEmdrstats::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MarketDataEmdrstats::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MarketDataEmdrstats::StatusType)
                            .small_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarketDataEmdrstats::StatusCount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarketDataEmdrstats::MessageTimestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_market_data_emdrstats_type_time")
                    .table(MarketDataEmdrstats::Table)
                    .col(MarketDataEmdrstats::StatusType)
                    .col((MarketDataEmdrstats::MessageTimestamp, IndexOrder::Desc))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MarketDataEmdrstats::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum MarketDataEmdrstats {
    Table,
    Id,
    StatusType,
    StatusCount,
    MessageTimestamp,
}
