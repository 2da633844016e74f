//! Status codes written to market_data_emdrstats

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusCode {
    EmptyOrderMessages = 0,
    OrderInserts = 1,
    /// Stored order superseded by a newer snapshot
    OrderUpdates = 2,
    /// Received order that was not newer than the stored one
    OrderStaleUpdates = 3,
    HistoryMessages = 4,
    OrderMessages = 5,
    HistoryUpdates = 6,
}

impl StatusCode {
    pub const ALL: [StatusCode; 7] = [
        StatusCode::EmptyOrderMessages,
        StatusCode::OrderInserts,
        StatusCode::OrderUpdates,
        StatusCode::OrderStaleUpdates,
        StatusCode::HistoryMessages,
        StatusCode::OrderMessages,
        StatusCode::HistoryUpdates,
    ];

    pub fn code(self) -> i16 {
        self as i16
    }

    pub fn index(self) -> usize {
        self as usize
    }
}
