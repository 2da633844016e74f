//! SeaORM Entity for daily per-region order history

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "market_data_orderhistory")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub mapregion_id: i64,
    pub invtype_id: i64,
    pub numorders: i64,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub low: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub high: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub mean: Decimal,
    pub quantity: i64,
    /// Day bucket (midnight UTC)
    pub date: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
