//! SeaORM Entity for the live order book

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "market_data_orders")]
pub struct Model {
    /// Order id assigned by the game, stable across snapshots
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,
    /// Snapshot time of the newest report merged into this row
    pub generated_at: DateTimeWithTimeZone,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub price: Decimal,
    pub volume_remaining: i64,
    pub volume_entered: i64,
    pub minimum_volume: i64,
    pub order_range: i32,
    pub is_bid: bool,
    pub issue_date: DateTimeWithTimeZone,
    pub duration: i32,
    pub is_suspicious: bool,
    pub message_key: String,
    pub uploader_ip_hash: String,
    pub mapregion_id: i64,
    pub invtype_id: i64,
    pub stastation_id: i64,
    pub mapsolarsystem_id: i64,
    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
