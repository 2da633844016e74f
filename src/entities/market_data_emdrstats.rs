//! SeaORM Entity for periodic ingestion status counters

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "market_data_emdrstats")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// See `models::status::StatusCode`
    pub status_type: i16,
    pub status_count: i64,
    pub message_timestamp: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
