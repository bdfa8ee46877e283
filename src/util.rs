use chrono::{NaiveDate, Utc};
use chrono_tz::Asia::Seoul;
use crate::errors::{Result, StocksError};

/// 값이 없을 때 출력하는 자리표시자
pub const NOT_AVAILABLE: &str = "N/A";

/// Yahoo chart `range` 파라미터로 허용되는 기간
pub const VALID_PERIODS: [&str; 11] = ["1d", "5d", "1mo", "3mo", "6mo", "1y", "2y", "5y", "10y", "ytd", "max"];

pub fn is_valid_period(period: &str) -> bool {
    VALID_PERIODS.contains(&period)
}

// 한국 거래일 기준 오늘 날짜
pub fn today_in_seoul() -> NaiveDate {
    Utc::now().with_timezone(&Seoul).date_naive()
}

pub fn parse_iso_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(StocksError::from)
}

/// 값이 있으면 `format`으로 렌더링하고, 없으면 N/A
pub fn format_or_placeholder<T>(value: Option<T>, format: impl FnOnce(T) -> String) -> String {
    value.map(format).unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

pub fn format_price(value: f64) -> String {
    format!("{:.2}", value)
}

/// 0.0052 -> "0.52%"
pub fn format_ratio_as_percent(ratio: f64) -> String {
    format!("{:.2}%", ratio * 100.0)
}

/// 매출/이익처럼 큰 금액은 소수점 없이 출력
pub fn format_amount(value: f64) -> String {
    format!("{:.0}", value)
}
