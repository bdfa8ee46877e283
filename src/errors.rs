use thiserror::Error;

#[derive(Error, Debug)]
pub enum StocksError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Date parsing error: {0}")]
    DateError(#[from] chrono::ParseError),

    #[error("Upstream error: {0}")]
    UpstreamError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

pub type Result<T> = std::result::Result<T, StocksError>;

// 문자열에서 에러 생성
impl From<String> for StocksError {
    fn from(s: String) -> Self {
        StocksError::Unknown(s)
    }
}

impl From<&str> for StocksError {
    fn from(s: &str) -> Self {
        StocksError::Unknown(s.to_string())
    }
}

/// 리포트 핸들러가 돌려주는 실패 사유.
///
/// `Display` 출력이 곧 사용자에게 보여지는 한국어 메시지다. 핸들러는
/// 실패를 분류만 하고, 문자열 렌더링은 여기서 한 번에 처리한다.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReportFailure {
    #[error("주식 기호 {symbol}에 대한 가격을 가져올 수 없습니다.")]
    PriceUnavailable { symbol: String },

    #[error("{symbol}의 주식 가격을 가져오는 데 실패했습니다.")]
    PriceFetchFailed { symbol: String },

    #[error("한국 종목명 '{query}'을(를) 찾을 수 없습니다.")]
    KrxNotFound { query: String },

    #[error("{symbol}의 주식 분석에 실패했습니다.")]
    AnalysisFailed { symbol: String },

    #[error("지원하지 않는 조회 기간입니다: '{period}' (사용 가능: {allowed})")]
    InvalidPeriod { period: String, allowed: String },

    #[error("{symbol}의 {period} 기간 주가 데이터가 없습니다.")]
    HistoryEmpty { symbol: String, period: String },

    #[error("{symbol}의 주가 이력을 가져오는 데 실패했습니다.")]
    HistoryFailed { symbol: String },

    #[error("{symbol}의 투자 지표를 가져오는 데 실패했습니다.")]
    IndicatorsFailed { symbol: String },

    #[error("날짜 형식이 올바르지 않습니다: '{input}' (YYYY-MM-DD 형식으로 입력하세요)")]
    InvalidDate { input: String },

    #[error("시작일({start})이 종료일({end})보다 늦습니다.")]
    InvalidDateRange { start: String, end: String },

    #[error("{ticker}의 {start} ~ {end} 기간 데이터가 없습니다.")]
    TrendNoData { ticker: String, start: String, end: String },

    #[error("{ticker}의 {start} ~ {end} 기간 주가 추이를 가져오는 데 실패했습니다.")]
    TrendFailed { ticker: String, start: String, end: String },
}
