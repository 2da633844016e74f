// src/lib.rs

pub mod config;
pub mod error;

pub mod entities {
    pub mod prelude;
    pub mod market_data_orders;
    pub mod market_data_orderhistory;
    pub mod market_data_itemregionstat;
    pub mod market_data_itemregionstathistory;
    pub mod market_data_emdrstats;
}

pub mod services {
    pub mod decoder;
    pub mod anomaly;
    pub mod market_store;
    pub mod pg_store;
    pub mod memory_store;
    pub mod order_merge;
    pub mod history_merge;
    pub mod price_stats;
    pub mod region_stats;
    pub mod emdr_metrics;
    pub mod throughput;
    pub mod backlog;
    pub mod dispatcher;
    pub mod relay_feed;
}

pub mod models;
pub mod jobs;
