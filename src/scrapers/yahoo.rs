use crate::config::Config;
use crate::errors::{Result, StocksError};
use crate::models::stock::{Fundamentals, PriceBar};
use crate::scrapers::base::GlobalMarketData;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use log::{debug, info, warn};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tokio::sync::Mutex;

const SUMMARY_MODULES: &str =
    "summaryProfile,incomeStatementHistory,summaryDetail,defaultKeyStatistics,financialData";

/// Yahoo Finance 클라이언트.
///
/// 시세와 일봉은 v8 chart, 재무 정보는 v10 quoteSummary 엔드포인트를 쓴다.
/// quoteSummary는 쿠키 + crumb 인증이 필요하다.
pub struct YahooScraper {
    client: Client,
    base_url: String,
    cookie_url: String,
    crumb: Mutex<Option<String>>,
}

impl YahooScraper {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.as_str())
            .cookie_store(true)
            .build()
            .map_err(StocksError::RequestError)?;

        Ok(Self {
            client,
            base_url: config.yahoo_base_url.clone(),
            cookie_url: config.yahoo_cookie_url.clone(),
            crumb: Mutex::new(None),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| StocksError::DataError(format!("Invalid Yahoo base URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| StocksError::DataError(format!("Yahoo base URL cannot take a path: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn fetch_chart(&self, symbol: &str, query: &[(&str, String)]) -> Result<Option<String>> {
        let url = self.endpoint(&["v8", "finance", "chart", symbol])?;
        debug!("Yahoo chart 요청: {} {:?}", url, query);

        let response = self.client.get(url).query(query).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(StocksError::UpstreamError(format!("Yahoo chart returned status {} for {}", status, symbol)));
        }

        Ok(Some(response.text().await?))
    }

    async fn crumb(&self) -> Result<String> {
        let mut cached = self.crumb.lock().await;
        if let Some(crumb) = cached.as_ref() {
            return Ok(crumb.clone());
        }

        // 세션 쿠키만 필요하므로 응답 코드는 보지 않는다
        if let Err(e) = self.client.get(&self.cookie_url).send().await {
            warn!("Yahoo 쿠키 요청 실패: {}", e);
        }

        let url = self.endpoint(&["v1", "test", "getcrumb"])?;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        let crumb = body.trim();

        if !status.is_success() || crumb.is_empty() || crumb.contains(' ') || crumb.contains('<') {
            return Err(StocksError::UpstreamError(format!("Yahoo crumb unavailable (status {})", status)));
        }

        info!("Yahoo crumb 갱신 완료");
        *cached = Some(crumb.to_string());
        Ok(crumb.to_string())
    }

    async fn invalidate_crumb(&self) {
        *self.crumb.lock().await = None;
    }

    async fn request_summary(&self, symbol: &str) -> Result<(StatusCode, String)> {
        let crumb = self.crumb().await?;
        let url = self.endpoint(&["v10", "finance", "quoteSummary", symbol])?;
        let response = self.client
            .get(url)
            .query(&[("modules", SUMMARY_MODULES), ("crumb", crumb.as_str())])
            .send()
            .await?;
        let status = response.status();
        Ok((status, response.text().await?))
    }
}

#[async_trait]
impl GlobalMarketData for YahooScraper {
    fn provider_name(&self) -> &'static str {
        "yahoo"
    }

    async fn fetch_live_price(&self, symbol: &str) -> Result<Option<f64>> {
        let query = [("range", "1d".to_string()), ("interval", "1d".to_string())];
        match self.fetch_chart(symbol, &query).await? {
            Some(body) => parse_live_price(&body),
            None => Ok(None),
        }
    }

    async fn fetch_history(&self, symbol: &str, period: &str) -> Result<Vec<PriceBar>> {
        info!("Yahoo 일봉 조회: {} ({})", symbol, period);
        let query = [
            ("range", period.to_string()),
            ("interval", "1d".to_string()),
            ("includeAdjustedClose", "true".to_string()),
        ];
        match self.fetch_chart(symbol, &query).await? {
            Some(body) => parse_chart_bars(&body),
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_history_range(&self, symbol: &str, start: &NaiveDate, end: &NaiveDate) -> Result<Vec<PriceBar>> {
        info!("Yahoo 기간 일봉 조회: {} {} ~ {}", symbol, start, end);
        // period2는 배타적이므로 종료일 다음 날 0시로 둔다
        let period1 = start.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp());
        let period2 = end.succ_opt().and_then(|next| next.and_hms_opt(0, 0, 0)).map(|dt| dt.and_utc().timestamp());
        let (Some(period1), Some(period2)) = (period1, period2) else {
            return Err(StocksError::DataError(format!("Invalid date range {} ~ {}", start, end)));
        };

        let query = [
            ("period1", period1.to_string()),
            ("period2", period2.to_string()),
            ("interval", "1d".to_string()),
            ("includeAdjustedClose", "true".to_string()),
        ];
        let bars = match self.fetch_chart(symbol, &query).await? {
            Some(body) => parse_chart_bars(&body)?,
            None => Vec::new(),
        };

        Ok(bars.into_iter().filter(|bar| bar.date >= *start && bar.date <= *end).collect())
    }

    async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals> {
        info!("Yahoo 재무 정보 조회: {}", symbol);
        let (mut status, mut body) = self.request_summary(symbol).await?;

        // crumb 만료 시 한 번만 재인증
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!("Yahoo crumb 만료 (status {}), 재인증", status);
            self.invalidate_crumb().await;
            (status, body) = self.request_summary(symbol).await?;
        }

        if !status.is_success() {
            return Err(StocksError::UpstreamError(format!("Yahoo quoteSummary returned status {} for {}", status, symbol)));
        }

        parse_fundamentals(&body)
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
struct YahooApiError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteIndicator>,
    #[serde(default)]
    adjclose: Vec<AdjCloseIndicator>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteIndicator {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Default, Deserialize)]
struct AdjCloseIndicator {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

fn chart_result(body: &str) -> Result<Option<ChartResult>> {
    let response: ChartResponse = serde_json::from_str(body)?;

    if let Some(error) = response.chart.error {
        if error.code.eq_ignore_ascii_case("Not Found") {
            return Ok(None);
        }
        return Err(StocksError::UpstreamError(format!(
            "{}: {}",
            error.code,
            error.description.unwrap_or_default()
        )));
    }

    Ok(response.chart.result.and_then(|results| results.into_iter().next()))
}

pub(crate) fn parse_live_price(body: &str) -> Result<Option<f64>> {
    Ok(chart_result(body)?.and_then(|result| result.meta.regular_market_price))
}

/// chart 응답을 일봉 목록으로 변환. 날짜는 거래소 현지 기준.
pub(crate) fn parse_chart_bars(body: &str) -> Result<Vec<PriceBar>> {
    let Some(result) = chart_result(body)? else {
        return Ok(Vec::new());
    };

    let closes = result.indicators.quote.first().map(|q| q.close.as_slice()).unwrap_or_default();
    let adj_closes = result.indicators.adjclose.first().map(|a| a.adjclose.as_slice()).unwrap_or_default();

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, ts) in result.timestamp.iter().enumerate() {
        let Some(local) = DateTime::from_timestamp(ts + result.meta.gmtoffset, 0) else {
            warn!("잘못된 timestamp 건너뜀: {}", ts);
            continue;
        };

        bars.push(PriceBar {
            date: local.date_naive(),
            close: closes.get(i).copied().flatten(),
            adj_close: adj_closes.get(i).copied().flatten(),
        });
    }

    Ok(bars)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResponse {
    quote_summary: SummaryBody,
}

#[derive(Debug, Deserialize)]
struct SummaryBody {
    result: Option<Vec<SummaryResult>>,
    error: Option<YahooApiError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResult {
    summary_profile: Option<SummaryProfile>,
    income_statement_history: Option<IncomeStatementHistory>,
    summary_detail: Option<SummaryDetail>,
    default_key_statistics: Option<KeyStatistics>,
    financial_data: Option<FinancialData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryProfile {
    long_business_summary: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IncomeStatementHistory {
    #[serde(default)]
    income_statement_history: Vec<IncomeStatement>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IncomeStatement {
    total_revenue: Option<YahooNumber>,
    gross_profit: Option<YahooNumber>,
    net_income: Option<YahooNumber>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDetail {
    market_cap: Option<YahooNumber>,
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<YahooNumber>,
    #[serde(rename = "forwardPE")]
    forward_pe: Option<YahooNumber>,
    fifty_two_week_high: Option<YahooNumber>,
    fifty_two_week_low: Option<YahooNumber>,
    dividend_rate: Option<YahooNumber>,
    dividend_yield: Option<YahooNumber>,
    payout_ratio: Option<YahooNumber>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyStatistics {
    price_to_book: Option<YahooNumber>,
    peg_ratio: Option<YahooNumber>,
    short_ratio: Option<YahooNumber>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinancialData {
    return_on_equity: Option<YahooNumber>,
    return_on_assets: Option<YahooNumber>,
    profit_margins: Option<YahooNumber>,
}

/// quoteSummary 숫자는 `{"raw": 1.5, "fmt": "1.50"}` 또는 빈 객체로 온다
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum YahooNumber {
    Plain(f64),
    Wrapped { raw: Option<f64> },
}

impl YahooNumber {
    fn value(&self) -> Option<f64> {
        match self {
            YahooNumber::Plain(v) => Some(*v),
            YahooNumber::Wrapped { raw } => *raw,
        }
    }
}

fn num(field: &Option<YahooNumber>) -> Option<f64> {
    field.as_ref().and_then(YahooNumber::value)
}

pub(crate) fn parse_fundamentals(body: &str) -> Result<Fundamentals> {
    let response: SummaryResponse = serde_json::from_str(body)?;

    if let Some(error) = response.quote_summary.error {
        return Err(StocksError::UpstreamError(format!(
            "{}: {}",
            error.code,
            error.description.unwrap_or_default()
        )));
    }

    let result = response
        .quote_summary
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| StocksError::DataError("quoteSummary returned no result".to_string()))?;

    let income = result
        .income_statement_history
        .and_then(|h| h.income_statement_history.into_iter().next())
        .unwrap_or_default();
    let detail = result.summary_detail.unwrap_or_default();
    let stats = result.default_key_statistics.unwrap_or_default();
    let financial = result.financial_data.unwrap_or_default();

    Ok(Fundamentals {
        long_business_summary: result
            .summary_profile
            .and_then(|p| p.long_business_summary)
            .filter(|s| !s.trim().is_empty()),
        total_revenue: num(&income.total_revenue),
        gross_profit: num(&income.gross_profit),
        net_income: num(&income.net_income),
        market_cap: num(&detail.market_cap),
        trailing_pe: num(&detail.trailing_pe),
        forward_pe: num(&detail.forward_pe),
        price_to_book: num(&stats.price_to_book),
        peg_ratio: num(&stats.peg_ratio),
        fifty_two_week_high: num(&detail.fifty_two_week_high),
        fifty_two_week_low: num(&detail.fifty_two_week_low),
        dividend_rate: num(&detail.dividend_rate),
        dividend_yield: num(&detail.dividend_yield),
        payout_ratio: num(&detail.payout_ratio),
        return_on_equity: num(&financial.return_on_equity),
        return_on_assets: num(&financial.return_on_assets),
        profit_margins: num(&financial.profit_margins),
        short_ratio: num(&stats.short_ratio),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHART: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"currency": "USD", "symbol": "ABCD", "regularMarketPrice": 9.5, "gmtoffset": -18000},
                "timestamp": [1704205800, 1704292200, 1704378600, 1704465000],
                "indicators": {
                    "quote": [{"close": [10.0, 11.0, null, 9.5], "open": [9.9, 10.5, 10.8, 9.7]}],
                    "adjclose": [{"adjclose": [10.0, 11.0, null, 9.5]}]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn chart_bars_use_exchange_local_dates() {
        let bars = parse_chart_bars(CHART).unwrap();
        assert_eq!(bars.len(), 4);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bars[3].date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(bars[1].close, Some(11.0));
        assert_eq!(bars[2].close, None);
        assert_eq!(bars[2].adj_close, None);
    }

    #[test]
    fn live_price_comes_from_meta() {
        assert_eq!(parse_live_price(CHART).unwrap(), Some(9.5));
    }

    #[test]
    fn not_found_chart_is_not_an_error() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        assert_eq!(parse_live_price(body).unwrap(), None);
        assert!(parse_chart_bars(body).unwrap().is_empty());
    }

    #[test]
    fn other_chart_errors_surface() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid input"}}}"#;
        assert!(matches!(parse_live_price(body), Err(StocksError::UpstreamError(_))));
    }

    #[test]
    fn fundamentals_tolerate_missing_modules() {
        let body = r#"{
            "quoteSummary": {
                "result": [{
                    "summaryProfile": {"longBusinessSummary": "Makes widgets."},
                    "incomeStatementHistory": {"incomeStatementHistory": [
                        {"totalRevenue": {"raw": 383285000000, "fmt": "383.29B"}, "grossProfit": {}, "netIncome": {"raw": 96995000000}}
                    ]},
                    "summaryDetail": {"trailingPE": {"raw": 29.5}, "forwardPE": {}, "dividendYield": {"raw": 0.0052}}
                }],
                "error": null
            }
        }"#;

        let fundamentals = parse_fundamentals(body).unwrap();
        assert_eq!(fundamentals.long_business_summary.as_deref(), Some("Makes widgets."));
        assert_eq!(fundamentals.total_revenue, Some(383285000000.0));
        assert_eq!(fundamentals.gross_profit, None);
        assert_eq!(fundamentals.net_income, Some(96995000000.0));
        assert_eq!(fundamentals.trailing_pe, Some(29.5));
        assert_eq!(fundamentals.forward_pe, None);
        assert_eq!(fundamentals.dividend_yield, Some(0.0052));
        assert_eq!(fundamentals.price_to_book, None);
        assert_eq!(fundamentals.short_ratio, None);
    }

    #[test]
    fn fundamentals_error_payload_is_upstream_error() {
        let body = r#"{"quoteSummary":{"result":null,"error":{"code":"Not Found","description":"Quote not found for symbol: ZZZZ"}}}"#;
        assert!(matches!(parse_fundamentals(body), Err(StocksError::UpstreamError(_))));
    }
}
