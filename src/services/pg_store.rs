//! Postgres `MarketStore` backed by SeaORM

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseBackend, DatabaseConnection,
    EntityTrait, FromQueryResult, QueryFilter, QuerySelect, Set, Statement, TransactionTrait,
};
use std::collections::HashMap;

use crate::entities::{
    market_data_emdrstats, market_data_itemregionstat, market_data_itemregionstathistory,
    market_data_orderhistory, market_data_orders, prelude::*,
};
use crate::error::StoreError;
use crate::models::history::{HistoryRecord, HistoryUpsertCounts};
use crate::models::order::{OrderQuote, OrderRecord, OrderUpsertCounts, RegionType};
use crate::models::region_stat::RegionItemStat;
use crate::models::status::StatusCode;
use crate::services::anomaly::ComparisonStats;
use crate::services::market_store::{update_window_start, MarketStore};

#[derive(Clone)]
pub struct PgStore {
    db: DatabaseConnection,
}

impl PgStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[derive(Debug, FromQueryResult)]
struct ComparisonRow {
    count: i64,
    mean: Option<f64>,
    std_dev: Option<f64>,
}

#[derive(Debug, FromQueryResult)]
struct QuoteRow {
    price: Decimal,
    is_bid: bool,
    volume_remaining: i64,
}

fn new_order(order: &OrderRecord) -> market_data_orders::ActiveModel {
    market_data_orders::ActiveModel {
        id: Set(order.order_id),
        generated_at: Set(order.generated_at.fixed_offset()),
        price: Set(order.price),
        volume_remaining: Set(order.volume_remaining),
        volume_entered: Set(order.volume_entered),
        minimum_volume: Set(order.min_volume),
        order_range: Set(order.range),
        is_bid: Set(order.is_bid),
        issue_date: Set(order.issue_date.fixed_offset()),
        duration: Set(order.duration),
        is_suspicious: Set(order.is_suspicious),
        message_key: Set(String::new()),
        uploader_ip_hash: Set(order.uploader_hash.clone()),
        mapregion_id: Set(order.region_id),
        invtype_id: Set(order.type_id),
        stastation_id: Set(order.station_id),
        mapsolarsystem_id: Set(order.solar_system_id),
        is_active: Set(true),
    }
}

fn new_region_stat(stat: &RegionItemStat) -> market_data_itemregionstat::ActiveModel {
    market_data_itemregionstat::ActiveModel {
        mapregion_id: Set(stat.region_type.region_id),
        invtype_id: Set(stat.region_type.type_id),
        buymean: Set(stat.bid.mean),
        buyavg: Set(stat.bid.weighted_average),
        buymedian: Set(stat.bid.median),
        sellmean: Set(stat.ask.mean),
        sellavg: Set(stat.ask.weighted_average),
        sellmedian: Set(stat.ask.median),
        buyvolume: Set(stat.bid.volume),
        sellvolume: Set(stat.ask.volume),
        buy_95_percentile: Set(stat.bid.percentile_95),
        sell_95_percentile: Set(stat.ask.percentile_95),
        buy_std_dev: Set(stat.bid.std_dev),
        sell_std_dev: Set(stat.ask.std_dev),
        ..Default::default()
    }
}

fn set_stat_history(
    row: &mut market_data_itemregionstathistory::ActiveModel,
    stat: &RegionItemStat,
) {
    row.buymean = Set(stat.bid.mean);
    row.buyavg = Set(stat.bid.weighted_average);
    row.buymedian = Set(stat.bid.median);
    row.sellmean = Set(stat.ask.mean);
    row.sellavg = Set(stat.ask.weighted_average);
    row.sellmedian = Set(stat.ask.median);
    row.buyvolume = Set(stat.bid.volume);
    row.sellvolume = Set(stat.ask.volume);
    row.buy_95_percentile = Set(stat.bid.percentile_95);
    row.sell_95_percentile = Set(stat.ask.percentile_95);
    row.buy_std_dev = Set(stat.bid.std_dev);
    row.sell_std_dev = Set(stat.ask.std_dev);
}

fn set_history(row: &mut market_data_orderhistory::ActiveModel, record: &HistoryRecord) {
    row.numorders = Set(record.num_orders);
    row.low = Set(record.low);
    row.high = Set(record.high);
    row.mean = Set(record.average);
    row.quantity = Set(record.quantity);
}

/// Advisory lock key for one dated bucket of `table`
pub fn bucket_lock_key(table: &str, pair: RegionType, date: DateTime<Utc>) -> String {
    format!(
        "{}:{}:{}:{}",
        table,
        pair.region_id,
        pair.type_id,
        date.timestamp()
    )
}

/// Serialise writers of one dated bucket until the transaction ends.
/// The history tables have no unique key, so the lookup and the insert
/// must not interleave with another writer of the same bucket.
async fn lock_bucket<C: ConnectionTrait>(
    conn: &C,
    table: &str,
    pair: RegionType,
    date: DateTime<Utc>,
) -> Result<(), StoreError> {
    conn.execute(Statement::from_sql_and_values(
        DatabaseBackend::Postgres,
        "SELECT pg_advisory_xact_lock(hashtextextended($1, 0))",
        vec![bucket_lock_key(table, pair, date).into()],
    ))
    .await?;
    Ok(())
}

#[async_trait]
impl MarketStore for PgStore {
    async fn comparison_stats(&self, pair: RegionType) -> Result<ComparisonStats, StoreError> {
        let row = ComparisonRow::find_by_statement(Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            r#"
            SELECT
                COUNT(id) AS count,
                AVG(price)::float8 AS mean,
                STDDEV(price)::float8 AS std_dev
            FROM market_data_orders
            WHERE invtype_id = $1
              AND mapregion_id = $2
              AND is_active = TRUE
              AND is_suspicious = FALSE
            "#,
            vec![pair.type_id.into(), pair.region_id.into()],
        ))
        .one(&self.db)
        .await?;

        Ok(row
            .map(|r| ComparisonStats {
                count: r.count,
                mean: r.mean,
                std_dev: r.std_dev,
            })
            .unwrap_or_default())
    }

    async fn upsert_orders(
        &self,
        pair: RegionType,
        orders: &[OrderRecord],
    ) -> Result<OrderUpsertCounts, StoreError> {
        let mut counts = OrderUpsertCounts::default();
        if orders.is_empty() {
            return Ok(counts);
        }

        let txn = self.db.begin().await?;

        let ids: Vec<i64> = orders.iter().map(|o| o.order_id).collect();
        let stored: HashMap<i64, DateTime<Utc>> = MarketDataOrders::find()
            .filter(market_data_orders::Column::Id.is_in(ids))
            .all(&txn)
            .await?
            .into_iter()
            .map(|m| (m.id, m.generated_at.with_timezone(&Utc)))
            .collect();

        let mut fresh = Vec::new();
        for order in orders {
            match stored.get(&order.order_id) {
                Some(stored_at) if *stored_at < order.generated_at => {
                    // Guarded again in SQL in case a concurrent batch got there first
                    let result = MarketDataOrders::update_many()
                        .col_expr(market_data_orders::Column::Price, Expr::value(order.price))
                        .col_expr(
                            market_data_orders::Column::VolumeRemaining,
                            Expr::value(order.volume_remaining),
                        )
                        .col_expr(
                            market_data_orders::Column::GeneratedAt,
                            Expr::value(order.generated_at.fixed_offset()),
                        )
                        .col_expr(
                            market_data_orders::Column::IssueDate,
                            Expr::value(order.issue_date.fixed_offset()),
                        )
                        .col_expr(
                            market_data_orders::Column::IsSuspicious,
                            Expr::value(order.is_suspicious),
                        )
                        .col_expr(
                            market_data_orders::Column::UploaderIpHash,
                            Expr::value(order.uploader_hash.clone()),
                        )
                        .col_expr(market_data_orders::Column::IsActive, Expr::value(true))
                        .filter(market_data_orders::Column::Id.eq(order.order_id))
                        .filter(
                            market_data_orders::Column::GeneratedAt
                                .lt(order.generated_at.fixed_offset()),
                        )
                        .exec(&txn)
                        .await?;

                    if result.rows_affected > 0 {
                        counts.updated += 1;
                    } else {
                        counts.stale += 1;
                    }
                }
                Some(_) => counts.stale += 1,
                None => fresh.push(new_order(order)),
            }
        }

        if !fresh.is_empty() {
            let attempted = fresh.len() as u64;
            let inserted = MarketDataOrders::insert_many(fresh)
                .on_conflict(
                    OnConflict::column(market_data_orders::Column::Id)
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(&txn)
                .await?;
            counts.inserted += inserted;
            counts.stale += attempted.saturating_sub(inserted);
        }

        txn.commit().await?;

        tracing::trace!(
            region_id = pair.region_id,
            type_id = pair.type_id,
            inserted = counts.inserted,
            updated = counts.updated,
            stale = counts.stale,
            "Upserted orders"
        );

        Ok(counts)
    }

    async fn deactivate_missing(
        &self,
        pair: RegionType,
        keep_ids: &[i64],
    ) -> Result<u64, StoreError> {
        let result = MarketDataOrders::update_many()
            .col_expr(market_data_orders::Column::IsActive, Expr::value(false))
            .filter(market_data_orders::Column::MapregionId.eq(pair.region_id))
            .filter(market_data_orders::Column::InvtypeId.eq(pair.type_id))
            .filter(market_data_orders::Column::IsActive.eq(true))
            .filter(market_data_orders::Column::Id.is_not_in(keep_ids.iter().copied()))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }

    async fn active_order_quotes(&self, pair: RegionType) -> Result<Vec<OrderQuote>, StoreError> {
        let rows = MarketDataOrders::find()
            .select_only()
            .column(market_data_orders::Column::Price)
            .column(market_data_orders::Column::IsBid)
            .column(market_data_orders::Column::VolumeRemaining)
            .filter(market_data_orders::Column::MapregionId.eq(pair.region_id))
            .filter(market_data_orders::Column::InvtypeId.eq(pair.type_id))
            .filter(market_data_orders::Column::IsActive.eq(true))
            .into_model::<QuoteRow>()
            .all(&self.db)
            .await?;

        rows.into_iter()
            .map(|r| {
                let price = r.price.to_f64().ok_or_else(|| {
                    StoreError::Conversion(format!("price {} does not fit in f64", r.price))
                })?;
                Ok(OrderQuote {
                    price,
                    is_bid: r.is_bid,
                    volume_remaining: r.volume_remaining,
                })
            })
            .collect()
    }

    async fn upsert_history(
        &self,
        rows: &[HistoryRecord],
        now: DateTime<Utc>,
    ) -> Result<HistoryUpsertCounts, StoreError> {
        let mut counts = HistoryUpsertCounts::default();
        let window_start = update_window_start(now).fixed_offset();

        // Locks are taken in key order so concurrent batches cannot deadlock
        let mut ordered: Vec<&HistoryRecord> = rows.iter().collect();
        ordered.sort_by_key(|r| (r.region_id, r.type_id, r.date));

        let txn = self.db.begin().await?;

        for record in ordered {
            lock_bucket(
                &txn,
                "market_data_orderhistory",
                record.region_type(),
                record.date,
            )
            .await?;

            let date = record.date.fixed_offset();
            let existing = MarketDataOrderhistory::find()
                .filter(market_data_orderhistory::Column::MapregionId.eq(record.region_id))
                .filter(market_data_orderhistory::Column::InvtypeId.eq(record.type_id))
                .filter(market_data_orderhistory::Column::Date.eq(date))
                .filter(market_data_orderhistory::Column::Date.gte(window_start))
                .one(&txn)
                .await?;

            match existing {
                Some(model) => {
                    let mut row: market_data_orderhistory::ActiveModel = model.into();
                    set_history(&mut row, record);
                    row.update(&txn).await?;
                    counts.updated += 1;
                }
                None => {
                    let mut row = market_data_orderhistory::ActiveModel {
                        mapregion_id: Set(record.region_id),
                        invtype_id: Set(record.type_id),
                        date: Set(date),
                        ..Default::default()
                    };
                    set_history(&mut row, record);
                    row.insert(&txn).await?;
                    counts.inserted += 1;
                }
            }
        }

        txn.commit().await?;
        Ok(counts)
    }

    async fn upsert_region_stat(&self, stat: &RegionItemStat) -> Result<(), StoreError> {
        use market_data_itemregionstat::Column;

        MarketDataItemregionstat::insert(new_region_stat(stat))
            .on_conflict(
                OnConflict::columns([Column::MapregionId, Column::InvtypeId])
                    .update_columns([
                        Column::Buymean,
                        Column::Buyavg,
                        Column::Buymedian,
                        Column::Sellmean,
                        Column::Sellavg,
                        Column::Sellmedian,
                        Column::Buyvolume,
                        Column::Sellvolume,
                        Column::Buy95Percentile,
                        Column::Sell95Percentile,
                        Column::BuyStdDev,
                        Column::SellStdDev,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        Ok(())
    }

    async fn upsert_region_stat_history(
        &self,
        stat: &RegionItemStat,
        date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        use market_data_itemregionstathistory::Column;

        let txn = self.db.begin().await?;
        lock_bucket(
            &txn,
            "market_data_itemregionstathistory",
            stat.region_type,
            date,
        )
        .await?;

        let date = date.fixed_offset();
        let existing = MarketDataItemregionstathistory::find()
            .filter(Column::MapregionId.eq(stat.region_type.region_id))
            .filter(Column::InvtypeId.eq(stat.region_type.type_id))
            .filter(Column::Date.eq(date))
            .filter(Column::Date.gte(update_window_start(now).fixed_offset()))
            .one(&txn)
            .await?;

        match existing {
            Some(model) => {
                let mut row: market_data_itemregionstathistory::ActiveModel = model.into();
                set_stat_history(&mut row, stat);
                row.update(&txn).await?;
            }
            None => {
                let mut row = market_data_itemregionstathistory::ActiveModel {
                    mapregion_id: Set(stat.region_type.region_id),
                    invtype_id: Set(stat.region_type.type_id),
                    date: Set(date),
                    ..Default::default()
                };
                set_stat_history(&mut row, stat);
                row.insert(&txn).await?;
            }
        }

        txn.commit().await?;
        Ok(())
    }

    async fn insert_status_count(
        &self,
        status: StatusCode,
        count: u64,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let status_count = i64::try_from(count)
            .map_err(|_| StoreError::Conversion(format!("status count {} overflows", count)))?;

        market_data_emdrstats::ActiveModel {
            status_type: Set(status.code()),
            status_count: Set(status_count),
            message_timestamp: Set(at.fixed_offset()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        Ok(())
    }
}
