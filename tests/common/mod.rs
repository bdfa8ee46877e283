#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use stocks_mcp_server::{
    Fundamentals, GlobalMarketData, KrxDailyBar, KrxMarketData, PriceBar, ReportService, Result, StocksError,
    TickerDirectory,
};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn close_bar(d: NaiveDate, close: Option<f64>) -> PriceBar {
    PriceBar { date: d, close, adj_close: None }
}

pub fn trading_day() -> NaiveDate {
    date(2024, 1, 5)
}

/// 메모리 안에서 동작하는 해외 시세 소스
#[derive(Default)]
pub struct FakeGlobal {
    prices: HashMap<String, f64>,
    failing: HashSet<String>,
    history: HashMap<String, Vec<PriceBar>>,
    fundamentals: HashMap<String, Fundamentals>,
    pub price_requests: Mutex<Vec<String>>,
}

impl FakeGlobal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, symbol: &str, price: f64) -> Self {
        self.prices.insert(symbol.to_string(), price);
        self
    }

    pub fn with_failure(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_string());
        self
    }

    pub fn with_history(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.history.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_fundamentals(mut self, symbol: &str, fundamentals: Fundamentals) -> Self {
        self.fundamentals.insert(symbol.to_string(), fundamentals);
        self
    }

    fn check(&self, symbol: &str) -> Result<()> {
        if self.failing.contains(symbol) {
            return Err(StocksError::UpstreamError(format!("simulated outage for {}", symbol)));
        }
        Ok(())
    }
}

#[async_trait]
impl GlobalMarketData for FakeGlobal {
    fn provider_name(&self) -> &'static str {
        "fake"
    }

    async fn fetch_live_price(&self, symbol: &str) -> Result<Option<f64>> {
        self.price_requests.lock().unwrap().push(symbol.to_string());
        self.check(symbol)?;
        Ok(self.prices.get(symbol).copied())
    }

    async fn fetch_history(&self, symbol: &str, _period: &str) -> Result<Vec<PriceBar>> {
        self.check(symbol)?;
        Ok(self.history.get(symbol).cloned().unwrap_or_default())
    }

    async fn fetch_history_range(&self, symbol: &str, start: &NaiveDate, end: &NaiveDate) -> Result<Vec<PriceBar>> {
        self.check(symbol)?;
        Ok(self
            .history
            .get(symbol)
            .map(|bars| bars.iter().filter(|b| b.date >= *start && b.date <= *end).cloned().collect())
            .unwrap_or_default())
    }

    async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals> {
        self.check(symbol)?;
        Ok(self.fundamentals.get(symbol).cloned().unwrap_or_default())
    }
}

/// 메모리 안에서 동작하는 KRX 소스
#[derive(Default)]
pub struct FakeKrx {
    directory: TickerDirectory,
    bars: HashMap<String, KrxDailyBar>,
    failing: bool,
    pub requested_dates: Mutex<Vec<NaiveDate>>,
}

impl FakeKrx {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listing(mut self, code: &str, name: &str) -> Self {
        self.directory.insert(code, name);
        self
    }

    pub fn with_bar(mut self, code: &str, close: i64, volume: i64) -> Self {
        let name = self.directory.name(code).unwrap_or_default().to_string();
        self.bars.insert(code.to_string(), KrxDailyBar { code: code.to_string(), name, close, volume });
        self
    }

    pub fn failing() -> Self {
        Self { failing: true, ..Self::default() }
    }

    /// 삼성전자/삼성전자우/SK하이닉스 세 종목이 상장된 기본 시장
    pub fn sample() -> Self {
        Self::new()
            .with_listing("005930", "삼성전자")
            .with_listing("005935", "삼성전자우")
            .with_listing("000660", "SK하이닉스")
            .with_bar("005930", 71000, 12345678)
            .with_bar("005935", 59000, 456789)
            .with_bar("000660", 131000, 2000000)
    }
}

#[async_trait]
impl KrxMarketData for FakeKrx {
    async fn fetch_ticker_directory(&self) -> Result<TickerDirectory> {
        if self.failing {
            return Err(StocksError::UpstreamError("KRX unreachable".to_string()));
        }
        Ok(self.directory.clone())
    }

    async fn fetch_daily_bar(&self, code: &str, date: &NaiveDate) -> Result<Option<KrxDailyBar>> {
        self.requested_dates.lock().unwrap().push(*date);
        Ok(self.bars.get(code).cloned())
    }
}

pub fn service(global: FakeGlobal, krx: FakeKrx) -> ReportService {
    ReportService::new(Arc::new(global), Arc::new(krx)).with_today(trading_day)
}

/// 시작일~종료일 예제 데이터: 1/2 10.00, 1/3 11.00, 1/4 결측, 1/5 9.50
pub fn abcd_history() -> Vec<PriceBar> {
    vec![
        close_bar(date(2024, 1, 2), Some(10.0)),
        close_bar(date(2024, 1, 3), Some(11.0)),
        close_bar(date(2024, 1, 4), None),
        close_bar(date(2024, 1, 5), Some(9.5)),
    ]
}
