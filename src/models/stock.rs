use chrono::NaiveDate;
use std::collections::BTreeMap;

/// 해외 종목 일봉 한 줄
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub close: Option<f64>,
    pub adj_close: Option<f64>,
}

/// KRX 종목 하루치 시세
#[derive(Debug, Clone, PartialEq)]
pub struct KrxDailyBar {
    pub code: String,
    pub name: String,
    pub close: i64,
    pub volume: i64,
}

/// Ticker resolution result
#[derive(Debug, Clone, PartialEq)]
pub struct TickerMatch {
    pub code: String,
    pub name: String,
    pub last_close: i64,
    pub volume: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub close_price: f64,
}

impl TrendPoint {
    /// 수정 종가를 우선 사용하고, 없으면 종가, 둘 다 없으면 버린다
    pub fn from_bar(bar: &PriceBar) -> Option<Self> {
        bar.adj_close
            .filter(|price| price.is_finite())
            .or(bar.close.filter(|price| price.is_finite()))
            .map(|close_price| Self { date: bar.date, close_price })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Unchanged,
}

impl Direction {
    pub fn label(&self) -> &'static str {
        match self {
            Direction::Up => "상승",
            Direction::Down => "하락",
            Direction::Unchanged => "보합",
        }
    }
}

/// 기간 시작/끝 가격 요약. 값은 반올림하지 않은 원본 그대로 보관한다.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendSummary {
    pub start: f64,
    pub end: f64,
    pub change: f64,
    /// 시작가가 0이면 None
    pub change_pct: Option<f64>,
    pub direction: Direction,
}

impl TrendSummary {
    pub fn from_points(points: &[TrendPoint]) -> Option<Self> {
        let start = points.first()?.close_price;
        let end = points.last()?.close_price;
        let change = end - start;
        let change_pct = (start != 0.0).then(|| change / start * 100.0);

        let direction = if end > start {
            Direction::Up
        } else if end < start {
            Direction::Down
        } else {
            Direction::Unchanged
        };

        Some(Self { start, end, change, change_pct, direction })
    }
}

/// KRX 상장 종목 전체 목록 (코드 -> 종목명), 코드 오름차순
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickerDirectory {
    names: BTreeMap<String, String>,
}

impl TickerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, code: &str, name: &str) {
        self.names.insert(code.to_string(), name.to_string());
    }

    pub fn contains(&self, code: &str) -> bool {
        self.names.contains_key(code)
    }

    pub fn name(&self, code: &str) -> Option<&str> {
        self.names.get(code).map(String::as_str)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }

    /// (code, name) pairs in code order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names.iter().map(|(code, name)| (code.as_str(), name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for TickerDirectory {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut directory = Self::new();
        for (code, name) in iter {
            directory.insert(code, name);
        }
        directory
    }
}

/// quoteSummary 응답에서 뽑아낸 재무/지표 값. 빠진 필드는 None.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fundamentals {
    pub long_business_summary: Option<String>,
    pub total_revenue: Option<f64>,
    pub gross_profit: Option<f64>,
    pub net_income: Option<f64>,

    pub market_cap: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub forward_pe: Option<f64>,
    pub price_to_book: Option<f64>,
    pub peg_ratio: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub dividend_rate: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub payout_ratio: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub return_on_assets: Option<f64>,
    pub profit_margins: Option<f64>,
    pub short_ratio: Option<f64>,
}
