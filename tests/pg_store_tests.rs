mod common;

use chrono::{DateTime, Duration, Utc};
use emdr_consumer::entities::{market_data_itemregionstathistory, market_data_orderhistory};
use emdr_consumer::models::order::RegionType;
use emdr_consumer::models::region_stat::{RegionItemStat, SideStat};
use emdr_consumer::models::status::StatusCode;
use emdr_consumer::services::market_store::MarketStore;
use emdr_consumer::services::pg_store::PgStore;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use sea_orm_migration::MigratorTrait;

use crate::common::{history, order, setup_test_db};

#[tokio::test]
#[ignore] // needs TEST_DATABASE_URL
async fn test_pg_store_order_lifecycle() {
    let db = setup_test_db().await.expect("Failed to connect to test DB");
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    let store = PgStore::new(db);

    // Unique keys so reruns never collide
    let base = Utc::now().timestamp_micros();
    let pair = RegionType::new(base, 34);
    // Whole seconds, timestamptz keeps only microseconds
    let t0 = DateTime::from_timestamp(Utc::now().timestamp() - 600, 0).unwrap();

    let orders = vec![
        order(pair, base, dec!(5.00), true, t0),
        order(pair, base + 1, dec!(5.50), false, t0),
    ];

    let first = store.upsert_orders(pair, &orders).await.unwrap();
    assert_eq!(first.inserted, 2);

    let again = store.upsert_orders(pair, &orders).await.unwrap();
    assert_eq!(again.inserted, 0);
    assert_eq!(again.stale, 2);

    let mut newer = orders[0].clone();
    newer.generated_at = t0 + Duration::minutes(5);
    newer.price = dec!(5.10);
    let updated = store.upsert_orders(pair, &[newer]).await.unwrap();
    assert_eq!(updated.updated, 1);

    let stats = store.comparison_stats(pair).await.unwrap();
    assert_eq!(stats.count, 2);
    assert!(stats.std_dev.is_some());

    let retired = store.deactivate_missing(pair, &[base]).await.unwrap();
    assert_eq!(retired, 1);

    let quotes = store.active_order_quotes(pair).await.unwrap();
    assert_eq!(quotes.len(), 1);
    assert_eq!(quotes[0].price, 5.1);
}

#[tokio::test]
#[ignore] // needs TEST_DATABASE_URL
async fn test_pg_store_history_and_status() {
    let db = setup_test_db().await.expect("Failed to connect to test DB");
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    let store = PgStore::new(db);

    let now = Utc::now();
    let pair = RegionType::new(now.timestamp_micros(), 35);
    let today = emdr_consumer::services::market_store::day_bucket(now);

    let first = store
        .upsert_history(&[history(pair, today, dec!(7.00))], now)
        .await
        .unwrap();
    assert_eq!(first.inserted, 1);

    let second = store
        .upsert_history(&[history(pair, today, dec!(7.25))], now)
        .await
        .unwrap();
    assert_eq!(second.updated, 1);
    assert_eq!(second.inserted, 0);

    store
        .insert_status_count(StatusCode::OrderMessages, 42, now)
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore] // needs TEST_DATABASE_URL
async fn test_pg_store_concurrent_writers_share_one_bucket() {
    let db = setup_test_db().await.expect("Failed to connect to test DB");
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    let store = PgStore::new(db.clone());

    let now = Utc::now();
    let pair = RegionType::new(now.timestamp_micros(), 36);
    let today = emdr_consumer::services::market_store::day_bucket(now);
    let side = SideStat {
        mean: 5.0,
        weighted_average: 5.0,
        median: 5.0,
        std_dev: 0.1,
        percentile_95: 5.2,
        volume: 1000,
    };
    let stat = RegionItemStat {
        region_type: pair,
        bid: side,
        ask: side,
    };

    let mut tasks = Vec::new();
    for i in 0..8 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            store
                .upsert_region_stat_history(&stat, today, now)
                .await
                .unwrap();
            let average = dec!(7.00) + Decimal::from(i);
            store
                .upsert_history(&[history(pair, today, average)], now)
                .await
                .unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let stat_rows = market_data_itemregionstathistory::Entity::find()
        .filter(market_data_itemregionstathistory::Column::MapregionId.eq(pair.region_id))
        .filter(market_data_itemregionstathistory::Column::InvtypeId.eq(pair.type_id))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(stat_rows, 1);

    let history_rows = market_data_orderhistory::Entity::find()
        .filter(market_data_orderhistory::Column::MapregionId.eq(pair.region_id))
        .filter(market_data_orderhistory::Column::InvtypeId.eq(pair.type_id))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(history_rows, 1);
}
