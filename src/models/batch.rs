use super::history::HistoryRecord;
use super::order::{OrderRecord, RegionType};

/// A decoded upload, classified by its result type
#[derive(Debug, Clone, PartialEq)]
pub enum MarketBatch {
    Orders(OrderBatch),
    History(Vec<HistoryRecord>),
    /// Unrecognised result type, kept for diagnostics only
    Ignored(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderBatch {
    pub orders: Vec<OrderRecord>,
    region_types: Vec<RegionType>,
}

impl OrderBatch {
    pub fn new(orders: Vec<OrderRecord>) -> Self {
        let mut region_types: Vec<RegionType> = Vec::new();
        for order in &orders {
            let pair = order.region_type();
            if !region_types.contains(&pair) {
                region_types.push(pair);
            }
        }

        Self {
            orders,
            region_types,
        }
    }

    /// Distinct region/type pairs in first-seen order
    pub fn region_types(&self) -> &[RegionType] {
        &self.region_types
    }

    pub fn group(&self, pair: RegionType) -> Vec<OrderRecord> {
        self.orders
            .iter()
            .filter(|o| o.region_type() == pair)
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}
