use crate::config::Config;
use crate::errors::{Result, StocksError};
use crate::models::stock::{KrxDailyBar, TickerDirectory};
use crate::scrapers::base::KrxMarketData;
use async_trait::async_trait;
use chrono::NaiveDate;
use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// 전종목 기본정보
const BLD_TICKER_LIST: &str = "dbms/MDC/STAT/standard/MDCSTAT01901";
/// 전종목 시세 (일자별)
const BLD_DAILY_PRICES: &str = "dbms/MDC/STAT/standard/MDCSTAT01501";

/// KRX 정보데이터시스템 스크래퍼
pub struct KrxScraper {
    client: Client,
    base_url: String,
    request_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl KrxScraper {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(StocksError::RequestError)?;

        Ok(Self {
            client,
            base_url: config.krx_base_url.clone(),
            request_interval: config.krx_request_interval(),
            last_request: Mutex::new(None),
        })
    }

    // KRX는 짧은 간격의 연속 요청을 차단한다
    async fn wait_for_rate_limit(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(time) = *last {
            let elapsed = time.elapsed();
            if elapsed < self.request_interval {
                let wait = self.request_interval - elapsed;
                debug!("KRX 요청 간격 유지를 위해 {:?} 대기", wait);
                tokio::time::sleep(wait).await;
            }
        }

        *last = Some(Instant::now());
    }

    async fn request<T: for<'de> Deserialize<'de>>(&self, bld: &str, params: &[(&str, &str)]) -> Result<Vec<T>> {
        self.wait_for_rate_limit().await;

        let mut form: Vec<(&str, &str)> = vec![("bld", bld), ("locale", "ko_KR")];
        form.extend_from_slice(params);

        let url = format!("{}/comm/bldAttendant/getJsonData.cmd", self.base_url);
        debug!("KRX 요청: {} {:?}", bld, params);

        let response = self.client
            .post(&url)
            .header("Referer", format!("{}/contents/MDC/MDI/mdiLoader/index.cmd", self.base_url))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StocksError::UpstreamError(format!("KRX {} returned status {}", bld, status)));
        }

        let body = response.text().await?;
        parse_out_block(&body)
    }
}

#[async_trait]
impl KrxMarketData for KrxScraper {
    async fn fetch_ticker_directory(&self) -> Result<TickerDirectory> {
        #[derive(Deserialize)]
        struct RawListing {
            #[serde(rename = "ISU_SRT_CD")]
            code: String,
            #[serde(rename = "ISU_ABBRV")]
            name: String,
        }

        let rows: Vec<RawListing> = self
            .request(BLD_TICKER_LIST, &[("mktId", "ALL"), ("share", "1"), ("csvxls_isNo", "false")])
            .await?;

        let directory: TickerDirectory = rows.iter().map(|r| (r.code.as_str(), r.name.as_str())).collect();
        info!("KRX 종목 목록 {}건 조회", directory.len());
        Ok(directory)
    }

    async fn fetch_daily_bar(&self, code: &str, date: &NaiveDate) -> Result<Option<KrxDailyBar>> {
        let trade_date = date.format("%Y%m%d").to_string();
        let rows: Vec<RawDailyPrice> = self
            .request(
                BLD_DAILY_PRICES,
                &[("mktId", "ALL"), ("trdDd", trade_date.as_str()), ("share", "1"), ("money", "1"), ("csvxls_isNo", "false")],
            )
            .await?;

        Ok(find_daily_bar(rows, code))
    }
}

#[derive(Debug, Deserialize)]
struct OutBlock<T> {
    #[serde(rename = "OutBlock_1", alias = "output", default = "Vec::new")]
    rows: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct RawDailyPrice {
    #[serde(rename = "ISU_SRT_CD")]
    code: String,
    #[serde(rename = "ISU_ABBRV", default)]
    name: String,
    #[serde(rename = "TDD_CLSPRC", default)]
    close: Option<String>,
    #[serde(rename = "ACC_TRDVOL", default)]
    volume: Option<String>,
}

fn parse_out_block<T: for<'de> Deserialize<'de>>(body: &str) -> Result<Vec<T>> {
    let block: OutBlock<T> = serde_json::from_str(body)?;
    Ok(block.rows)
}

/// "71,000" 형태의 KRX 숫자 문자열 파싱. "-" 나 빈 값은 None.
fn parse_krx_number(value: &Option<String>) -> Option<i64> {
    let cleaned = value.as_ref()?.replace(',', "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    cleaned.parse::<i64>().ok()
}

// 휴장일이면 목록이 비거나 가격이 "-"로 온다
fn find_daily_bar(rows: Vec<RawDailyPrice>, code: &str) -> Option<KrxDailyBar> {
    let row = rows.into_iter().find(|r| r.code == code)?;
    let close = parse_krx_number(&row.close)?;
    let volume = parse_krx_number(&row.volume).unwrap_or(0);

    Some(KrxDailyBar {
        code: row.code,
        name: row.name,
        close,
        volume,
    })
}
