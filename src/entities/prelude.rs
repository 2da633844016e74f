//! `SeaORM` Entity prelude

pub use super::market_data_emdrstats::Entity as MarketDataEmdrstats;
pub use super::market_data_itemregionstat::Entity as MarketDataItemregionstat;
pub use super::market_data_itemregionstathistory::Entity as MarketDataItemregionstathistory;
pub use super::market_data_orderhistory::Entity as MarketDataOrderhistory;
pub use super::market_data_orders::Entity as MarketDataOrders;
