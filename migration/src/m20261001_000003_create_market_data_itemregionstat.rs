use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MarketDataItemregionstat::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MarketDataItemregionstat::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MarketDataItemregionstat::MapregionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarketDataItemregionstat::InvtypeId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MarketDataItemregionstat::Buymean).double().not_null())
                    .col(ColumnDef::new(MarketDataItemregionstat::Buyavg).double().not_null())
                    .col(ColumnDef::new(MarketDataItemregionstat::Buymedian).double().not_null())
                    .col(ColumnDef::new(MarketDataItemregionstat::Sellmean).double().not_null())
                    .col(ColumnDef::new(MarketDataItemregionstat::Sellavg).double().not_null())
                    .col(ColumnDef::new(MarketDataItemregionstat::Sellmedian).double().not_null())
                    .col(
                        ColumnDef::new(MarketDataItemregionstat::Buyvolume)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarketDataItemregionstat::Sellvolume)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarketDataItemregionstat::Buy95Percentile)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarketDataItemregionstat::Sell95Percentile)
                            .double()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MarketDataItemregionstat::BuyStdDev).double().not_null())
                    .col(ColumnDef::new(MarketDataItemregionstat::SellStdDev).double().not_null())
                    .to_owned(),
            )
            .await?;

        // One latest row per region/type
        manager
            .create_index(
                Index::create()
                    .name("idx_market_data_itemregionstat_region_type")
                    .table(MarketDataItemregionstat::Table)
                    .col(MarketDataItemregionstat::MapregionId)
                    .col(MarketDataItemregionstat::InvtypeId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MarketDataItemregionstat::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum MarketDataItemregionstat {
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
}
