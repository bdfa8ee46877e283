use crate::models::stock::{Fundamentals, KrxDailyBar, PriceBar, TickerDirectory};
use crate::errors::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Global (non-KRX) market data source
#[async_trait]
pub trait GlobalMarketData {
    /// Provider name used in log lines
    fn provider_name(&self) -> &'static str;

    /// Latest traded price, `None` when the provider has no price for the symbol
    async fn fetch_live_price(&self, symbol: &str) -> Result<Option<f64>>;

    /// Daily bars for a period keyword such as `1mo` or `ytd`, oldest first
    async fn fetch_history(&self, symbol: &str, period: &str) -> Result<Vec<PriceBar>>;

    /// Daily bars between two dates (both inclusive), oldest first
    async fn fetch_history_range(&self, symbol: &str, start: &NaiveDate, end: &NaiveDate) -> Result<Vec<PriceBar>>;

    /// Financial statement figures and key statistics
    async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals>;
}

/// KRX (domestic) market data source
#[async_trait]
pub trait KrxMarketData {
    /// All listed tickers with their display names
    async fn fetch_ticker_directory(&self) -> Result<TickerDirectory>;

    /// Daily bar of one ticker on the given trading date, `None` if it did not trade
    async fn fetch_daily_bar(&self, code: &str, date: &NaiveDate) -> Result<Option<KrxDailyBar>>;
}
