pub mod mock;
pub mod tushare;

pub use mock::MockMarketDataGateway;
pub use tushare::{TushareConfig, TushareGateway, TushareGatewayParameters};
