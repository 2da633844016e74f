pub mod emdr_stats_flush;
pub mod status_report;
