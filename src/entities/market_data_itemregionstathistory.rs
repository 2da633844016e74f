//! SeaORM Entity for daily snapshots of region/type price statistics

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "market_data_itemregionstathistory")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub mapregion_id: i64,
    pub invtype_id: i64,
    pub buymean: f64,
    pub buyavg: f64,
    pub buymedian: f64,
    pub sellmean: f64,
    pub sellavg: f64,
    pub sellmedian: f64,
    pub buyvolume: i64,
    pub sellvolume: i64,
    #[sea_orm(column_name = "buy_95_percentile")]
    pub buy_95_percentile: f64,
    #[sea_orm(column_name = "sell_95_percentile")]
    pub sell_95_percentile: f64,
    pub buy_std_dev: f64,
    pub sell_std_dev: f64,
    pub date: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
