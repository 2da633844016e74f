pub mod batch;
pub mod history;
pub mod order;
pub mod region_stat;
pub mod status;
