pub mod daily_bar;
pub mod data_gap;
pub mod date_range;
pub mod indicators;
pub mod stock_basic;
pub mod stock_code;

pub use daily_bar::{BarMetrics, BarValidationError, DailyBar};
pub use data_gap::{detect_gaps, DataGap};
pub use date_range::{format_compact, parse_compact, parse_flexible, DateRange, DateRangeError};
pub use indicators::{compute_indicators, BarIndicators};
pub use stock_basic::StockBasic;
pub use stock_code::{Board, Exchange, StockCode, StockCodeError};
