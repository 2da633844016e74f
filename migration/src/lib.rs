pub use sea_orm_migration::prelude::*;

mod m20261001_000001_create_market_data_orders;
mod m20261001_000002_create_market_data_orderhistory;
mod m20261001_000003_create_market_data_itemregionstat;
mod m20261001_000004_create_market_data_itemregionstathistory;
mod m20261001_000005_create_market_data_emdrstats;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_create_market_data_orders::Migration),
            Box::new(m20261001_000002_create_market_data_orderhistory::Migration),
            Box::new(m20261001_000003_create_market_data_itemregionstat::Migration),
            Box::new(m20261001_000004_create_market_data_itemregionstathistory::Migration),
            Box::new(m20261001_000005_create_market_data_emdrstats::Migration),
        ]
    }
}
