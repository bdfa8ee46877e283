// 외부에서 사용하는 모듈
pub mod models;
pub mod errors;
pub mod scrapers;
pub mod services;
pub mod server;
pub mod config;

#[doc(hidden)]
pub mod util;

// 자주 쓰는 타입 재노출
pub use config::Config;
pub use errors::{ReportFailure, Result, StocksError};
pub use models::stock::{Fundamentals, KrxDailyBar, PriceBar, TickerDirectory, TickerMatch, TrendPoint, TrendSummary};
pub use scrapers::base::{GlobalMarketData, KrxMarketData};
pub use server::McpServer;
pub use services::context::RequestContext;
pub use services::report_service::ReportService;
