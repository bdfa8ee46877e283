use crate::errors::ReportFailure;
use crate::models::stock::{Fundamentals, TickerMatch, TrendPoint, TrendSummary};
use crate::scrapers::base::{GlobalMarketData, KrxMarketData};
use crate::services::context::RequestContext;
use crate::services::ticker_resolver::{ResolveError, TickerResolver};
use crate::util::{self, format_amount, format_or_placeholder, format_price, format_ratio_as_percent};
use chrono::NaiveDate;
use log::{error, info, warn};
use std::fmt::Write as _;
use std::sync::Arc;

pub type ReportResult = std::result::Result<String, ReportFailure>;

/// 최근 종가 출력 개수
const HISTORY_TAIL_LEN: usize = 5;

const NO_COMPANY_INFO: &str = "회사 정보가 없습니다.";
const SNAPSHOT_LINE_FAILED: &str = "데이터를 가져올 수 없습니다";

struct SnapshotItem {
    label: &'static str,
    symbol: &'static str,
    scale: f64,
    unit: &'static str,
}

const SNAPSHOT_ITEMS: [SnapshotItem; 7] = [
    SnapshotItem { label: "S&P 500", symbol: "^GSPC", scale: 1.0, unit: "" },
    SnapshotItem { label: "다우존스", symbol: "^DJI", scale: 1.0, unit: "" },
    SnapshotItem { label: "나스닥", symbol: "^IXIC", scale: 1.0, unit: "" },
    SnapshotItem { label: "코스피", symbol: "^KS11", scale: 1.0, unit: "" },
    SnapshotItem { label: "코스닥", symbol: "^KQ11", scale: 1.0, unit: "" },
    SnapshotItem { label: "원/달러 환율", symbol: "KRW=X", scale: 1.0, unit: "원" },
    // 엔화는 100엔 단위로 고시한다
    SnapshotItem { label: "원/엔 환율 (100엔)", symbol: "JPYKRW=X", scale: 100.0, unit: "원" },
];

/// 도구 요청을 받아 시세 데이터를 조회하고 한국어 텍스트 리포트로 만든다.
///
/// 각 메서드는 서로 상태를 공유하지 않으며, 실패는 `ReportFailure`로 분류해서
/// 돌려준다. 메시지 렌더링은 `ReportFailure`의 `Display`가 담당한다.
pub struct ReportService {
    global: Arc<dyn GlobalMarketData + Send + Sync>,
    resolver: TickerResolver,
    today: fn() -> NaiveDate,
}

impl ReportService {
    pub fn new(global: Arc<dyn GlobalMarketData + Send + Sync>, krx: Arc<dyn KrxMarketData + Send + Sync>) -> Self {
        Self {
            global,
            resolver: TickerResolver::new(krx),
            today: util::today_in_seoul,
        }
    }

    /// KRX 조회 기준일을 정하는 함수를 바꾼다
    pub fn with_today(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// 해외 종목 현재가
    pub async fn stock_price(&self, ctx: &RequestContext, symbol: &str) -> ReportResult {
        let symbol = symbol.trim();
        info!("[{}] {} 현재가 조회 ({})", ctx, symbol, self.global.provider_name());

        match self.global.fetch_live_price(symbol).await {
            Ok(Some(price)) => Ok(format!("{}의 현재 주가는 ${}입니다.", symbol, format_price(price))),
            Ok(None) => {
                warn!("[{}] {} 가격 정보 없음", ctx, symbol);
                Err(ReportFailure::PriceUnavailable { symbol: symbol.to_string() })
            }
            Err(e) => {
                error!("[{}] {} 가격 조회 실패: {}", ctx, symbol, e);
                Err(ReportFailure::PriceFetchFailed { symbol: symbol.to_string() })
            }
        }
    }

    /// KRX 종목 현재가. 앞뒤 공백은 무시한다.
    pub async fn krx_price(&self, ctx: &RequestContext, symbol: &str) -> ReportResult {
        let symbol = symbol.trim();
        info!("[{}] KRX 종목 조회: {}", ctx, symbol);

        let found = self.resolve_krx(ctx, symbol).await?;
        Ok(format!("{}의 현재 주가는 {}원입니다.", symbol, found.last_close))
    }

    /// ASCII 심볼은 해외 종목 재무 분석, 그 외(한글 종목명 등)는 KRX 기본 정보
    pub async fn analyze_stock(&self, ctx: &RequestContext, symbol: &str, last_years_profit: &str, company_info: &str) -> ReportResult {
        let symbol = symbol.trim();
        let mut report = if symbol.is_ascii() {
            self.analyze_global(ctx, symbol).await?
        } else {
            self.analyze_krx(ctx, symbol).await?
        };

        let notes = caller_notes(last_years_profit, company_info);
        if !notes.is_empty() {
            report.push_str("\n\n");
            report.push_str(&notes);
        }
        Ok(report)
    }

    async fn analyze_global(&self, ctx: &RequestContext, symbol: &str) -> ReportResult {
        info!("[{}] 해외 종목 분석: {}", ctx, symbol);
        let fundamentals = self.global.fetch_fundamentals(symbol).await.map_err(|e| {
            error!("[{}] {} 재무 정보 조회 실패: {}", ctx, symbol, e);
            ReportFailure::AnalysisFailed { symbol: symbol.to_string() }
        })?;

        Ok(render_global_analysis(symbol, &fundamentals))
    }

    async fn analyze_krx(&self, ctx: &RequestContext, symbol: &str) -> ReportResult {
        info!("[{}] KRX 종목 분석: {}", ctx, symbol);
        let found = self.resolve_krx(ctx, symbol).await?;
        Ok(render_krx_analysis(symbol, &found))
    }

    /// 최근 5거래일 종가
    pub async fn stock_history(&self, ctx: &RequestContext, symbol: &str, period: &str) -> ReportResult {
        let symbol = symbol.trim();
        let period = period.trim();
        if !util::is_valid_period(period) {
            warn!("[{}] 잘못된 기간 키워드: {}", ctx, period);
            return Err(ReportFailure::InvalidPeriod {
                period: period.to_string(),
                allowed: util::VALID_PERIODS.join(", "),
            });
        }

        let bars = self.global.fetch_history(symbol, period).await.map_err(|e| {
            error!("[{}] {} ({}) 일봉 조회 실패: {}", ctx, symbol, period, e);
            ReportFailure::HistoryFailed { symbol: symbol.to_string() }
        })?;

        let closes: Vec<(NaiveDate, f64)> = bars
            .iter()
            .filter_map(|bar| bar.close.filter(|c| c.is_finite()).map(|c| (bar.date, c)))
            .collect();
        if closes.is_empty() {
            warn!("[{}] {} ({}) 일봉 없음", ctx, symbol, period);
            return Err(ReportFailure::HistoryEmpty {
                symbol: symbol.to_string(),
                period: period.to_string(),
            });
        }

        let tail = &closes[closes.len().saturating_sub(HISTORY_TAIL_LEN)..];
        let mut report = format!("[{} 최근 종가 ({})]", symbol, period);
        for (date, close) in tail {
            let _ = write!(report, "\n{}: {}", date.format("%Y-%m-%d"), format_price(*close));
        }
        Ok(report)
    }

    /// 투자 지표 14종
    pub async fn stock_indicators(&self, ctx: &RequestContext, symbol: &str) -> ReportResult {
        let symbol = symbol.trim();
        info!("[{}] {} 투자 지표 조회", ctx, symbol);

        let fundamentals = self.global.fetch_fundamentals(symbol).await.map_err(|e| {
            error!("[{}] {} 투자 지표 조회 실패: {}", ctx, symbol, e);
            ReportFailure::IndicatorsFailed { symbol: symbol.to_string() }
        })?;

        Ok(render_indicators(symbol, &fundamentals))
    }

    /// 주요 지수와 환율. 한 종목 조회가 실패해도 해당 줄만 실패로 표시한다.
    pub async fn market_snapshot(&self, ctx: &RequestContext) -> String {
        info!("[{}] 시장 현황 조회", ctx);

        let mut report = String::from("[글로벌 시장 현황]");
        for item in &SNAPSHOT_ITEMS {
            let value = match self.global.fetch_live_price(item.symbol).await {
                Ok(Some(price)) => format!("{}{}", format_price(price * item.scale), item.unit),
                Ok(None) => {
                    warn!("[{}] {} 가격 정보 없음", ctx, item.symbol);
                    SNAPSHOT_LINE_FAILED.to_string()
                }
                Err(e) => {
                    error!("[{}] {} 조회 실패: {}", ctx, item.symbol, e);
                    SNAPSHOT_LINE_FAILED.to_string()
                }
            };
            let _ = write!(report, "\n- {}: {}", item.label, value);
        }
        report
    }

    /// 기간 내 일별 종가와 시작/종료 대비 등락
    pub async fn market_trend(&self, ctx: &RequestContext, ticker: &str, start_date: &str, end_date: &str) -> ReportResult {
        let ticker = ticker.trim();
        let start = parse_date_arg(ctx, start_date)?;
        let end = parse_date_arg(ctx, end_date)?;
        if start > end {
            return Err(ReportFailure::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }

        info!("[{}] {} 추이 조회: {} ~ {}", ctx, ticker, start, end);
        let bars = self.global.fetch_history_range(ticker, &start, &end).await.map_err(|e| {
            error!("[{}] {} {} ~ {} 조회 실패: {}", ctx, ticker, start, end, e);
            ReportFailure::TrendFailed {
                ticker: ticker.to_string(),
                start: start.to_string(),
                end: end.to_string(),
            }
        })?;

        let points: Vec<TrendPoint> = bars.iter().filter_map(TrendPoint::from_bar).collect();
        let Some(summary) = TrendSummary::from_points(&points) else {
            warn!("[{}] {} {} ~ {} 데이터 없음", ctx, ticker, start, end);
            return Err(ReportFailure::TrendNoData {
                ticker: ticker.to_string(),
                start: start.to_string(),
                end: end.to_string(),
            });
        };

        Ok(render_trend(ticker, &start, &end, &points, &summary))
    }

    async fn resolve_krx(&self, ctx: &RequestContext, query: &str) -> Result<TickerMatch, ReportFailure> {
        let today = (self.today)();
        self.resolver.resolve(ctx, query, &today).await.map_err(|e| {
            match &e {
                ResolveError::Upstream(inner) => error!("[{}] '{}' KRX 조회 실패: {}", ctx, query, inner),
                other => warn!("[{}] '{}' 조회 결과 없음: {}", ctx, query, other),
            }
            ReportFailure::KrxNotFound { query: query.to_string() }
        })
    }
}

fn parse_date_arg(ctx: &RequestContext, input: &str) -> Result<NaiveDate, ReportFailure> {
    util::parse_iso_date(input).map_err(|e| {
        warn!("[{}] 날짜 파싱 실패 '{}': {}", ctx, input, e);
        ReportFailure::InvalidDate { input: input.to_string() }
    })
}

fn caller_notes(last_years_profit: &str, company_info: &str) -> String {
    let mut lines = Vec::new();
    if !last_years_profit.trim().is_empty() {
        lines.push(format!("- 지난해 수익: {}", last_years_profit.trim()));
    }
    if !company_info.trim().is_empty() {
        lines.push(format!("- 회사 정보: {}", company_info.trim()));
    }

    if lines.is_empty() {
        String::new()
    } else {
        format!("참고 정보 (요청자 제공):\n{}", lines.join("\n"))
    }
}

fn render_global_analysis(symbol: &str, f: &Fundamentals) -> String {
    format!(
        "[{symbol}의 주식 분석]\n\n\
         회사 정보:\n{summary}\n\n\
         재무 정보:\n\
         - 수익 (지난해): {revenue}\n\
         - 총 이익: {gross}\n\
         - 순이익: {net}\n\n\
         추천:\n재무 데이터와 회사 정보를 바탕으로 주식을 매수, 매도 또는 보유할지를 결정하십시오.",
        symbol = symbol,
        summary = f.long_business_summary.as_deref().unwrap_or(NO_COMPANY_INFO),
        revenue = format_or_placeholder(f.total_revenue, format_amount),
        gross = format_or_placeholder(f.gross_profit, format_amount),
        net = format_or_placeholder(f.net_income, format_amount),
    )
}

fn render_krx_analysis(symbol: &str, found: &TickerMatch) -> String {
    format!(
        "[KRX 종목 분석: {}]\n\n\
         종목명: {}\n\
         종가: {}원\n\
         거래량: {}\n\
         종목코드: {}\n\n\
         추천:\n이 기본 데이터를 바탕으로 추가적인 재무 분석이나 차트 패턴을 고려해 보세요.",
        symbol, found.name, found.last_close, found.volume, found.code
    )
}

fn render_indicators(symbol: &str, f: &Fundamentals) -> String {
    let rows = [
        ("시가총액", format_or_placeholder(f.market_cap, format_amount)),
        ("PER (trailing)", format_or_placeholder(f.trailing_pe, format_price)),
        ("PER (forward)", format_or_placeholder(f.forward_pe, format_price)),
        ("PBR", format_or_placeholder(f.price_to_book, format_price)),
        ("PEG", format_or_placeholder(f.peg_ratio, format_price)),
        ("52주 최고가", format_or_placeholder(f.fifty_two_week_high, format_price)),
        ("52주 최저가", format_or_placeholder(f.fifty_two_week_low, format_price)),
        ("주당 배당금", format_or_placeholder(f.dividend_rate, format_price)),
        ("배당수익률", format_or_placeholder(f.dividend_yield, format_ratio_as_percent)),
        ("배당성향", format_or_placeholder(f.payout_ratio, format_ratio_as_percent)),
        ("ROE", format_or_placeholder(f.return_on_equity, format_ratio_as_percent)),
        ("ROA", format_or_placeholder(f.return_on_assets, format_ratio_as_percent)),
        ("순이익률", format_or_placeholder(f.profit_margins, format_ratio_as_percent)),
        ("공매도 비율 (Short Ratio)", format_or_placeholder(f.short_ratio, format_price)),
    ];

    let mut report = format!("[{} 투자 지표]", symbol);
    for (label, value) in rows {
        let _ = write!(report, "\n- {}: {}", label, value);
    }
    report
}

fn render_trend(ticker: &str, start: &NaiveDate, end: &NaiveDate, points: &[TrendPoint], summary: &TrendSummary) -> String {
    let mut report = format!("[{} 주가 추이: {} ~ {}]", ticker, start, end);
    for point in points {
        let _ = write!(report, "\n{}: {}", point.date.format("%Y-%m-%d"), format_price(point.close_price));
    }

    let _ = write!(
        report,
        "\n\n시작가: {}\n종료가: {}\n변동폭: {}\n변동률: {}\n추세: {}",
        format_price(summary.start),
        format_price(summary.end),
        format_price(summary.change),
        format_or_placeholder(summary.change_pct, |pct| format!("{:.2}%", pct)),
        summary.direction.label(),
    );
    report
}
