use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MarketDataItemregionstathistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MarketDataItemregionstathistory::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MarketDataItemregionstathistory::MapregionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarketDataItemregionstathistory::InvtypeId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MarketDataItemregionstathistory::Buymean).double().not_null())
                    .col(ColumnDef::new(MarketDataItemregionstathistory::Buyavg).double().not_null())
                    .col(ColumnDef::new(MarketDataItemregionstathistory::Buymedian).double().not_null())
                    .col(ColumnDef::new(MarketDataItemregionstathistory::Sellmean).double().not_null())
                    .col(ColumnDef::new(MarketDataItemregionstathistory::Sellavg).double().not_null())
                    .col(ColumnDef::new(MarketDataItemregionstathistory::Sellmedian).double().not_null())
                    .col(
                        ColumnDef::new(MarketDataItemregionstathistory::Buyvolume)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarketDataItemregionstathistory::Sellvolume)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarketDataItemregionstathistory::Buy95Percentile)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarketDataItemregionstathistory::Sell95Percentile)
                            .double()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MarketDataItemregionstathistory::BuyStdDev).double().not_null())
                    .col(ColumnDef::new(MarketDataItemregionstathistory::SellStdDev).double().not_null())
                    .col(
                        ColumnDef::new(MarketDataItemregionstathistory::Date)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Daily buckets, not unique for the same reason as order history
        manager
            .create_index(
                Index::create()
                    .name("idx_market_data_itemregionstathistory_region_type_date")
                    .table(MarketDataItemregionstathistory::Table)
                    .col(MarketDataItemregionstathistory::MapregionId)
                    .col(MarketDataItemregionstathistory::InvtypeId)
                    .col((MarketDataItemregionstathistory::Date, IndexOrder::Desc))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MarketDataItemregionstathistory::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum MarketDataItemregionstathistory {
    Table,
    Id,
    MapregionId,
    InvtypeId,
    Buymean,
    Buyavg,
    Buymedian,
    Sellmean,
    Sellavg,
    Sellmedian,
    Buyvolume,
    Sellvolume,
    #[iden = "buy_95_percentile"]
    Buy95Percentile,
    #[iden = "sell_95_percentile"]
    Sell95Percentile,
    BuyStdDev,
    SellStdDev,
    Date,
}
