use crate::errors::StocksError;
use crate::models::stock::TickerMatch;
use crate::scrapers::base::KrxMarketData;
use crate::services::context::RequestContext;
use chrono::NaiveDate;
use log::{debug, info, warn};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("no ticker matches '{query}'")]
    NoMatch { query: String },

    #[error("ticker {code} has no daily bar on {date}")]
    NoTradingData { code: String, date: NaiveDate },

    #[error("KRX lookup failed: {0}")]
    Upstream(#[from] StocksError),
}

/// 종목명 또는 종목코드로 KRX 종목을 찾는다
pub struct TickerResolver {
    krx: Arc<dyn KrxMarketData + Send + Sync>,
}

impl TickerResolver {
    pub fn new(krx: Arc<dyn KrxMarketData + Send + Sync>) -> Self {
        Self { krx }
    }

    /// `query`가 유효한 종목코드면 바로 사용하고, 아니면 종목명 부분 일치로 찾는다.
    ///
    /// 여러 종목이 일치하면 코드가 가장 작은 종목을 고른다. `date`에 일봉이
    /// 없으면(휴장, 거래정지) 이전 데이터를 쓰지 않고 `NoTradingData`를 돌려준다.
    pub async fn resolve(&self, ctx: &RequestContext, query: &str, date: &NaiveDate) -> Result<TickerMatch, ResolveError> {
        if query.is_empty() {
            return Err(ResolveError::NoMatch { query: query.to_string() });
        }

        let directory = self.krx.fetch_ticker_directory().await?;

        let (code, name) = match directory.name(query) {
            Some(name) => {
                debug!("[{}] '{}'는 종목코드로 바로 조회", ctx, query);
                (query.to_string(), name.to_string())
            }
            None => {
                let matches: Vec<(&str, &str)> = directory.entries().filter(|(_, name)| name.contains(query)).collect();
                let Some((code, name)) = matches.first() else {
                    warn!("[{}] '{}'와 일치하는 종목 없음", ctx, query);
                    return Err(ResolveError::NoMatch { query: query.to_string() });
                };
                if matches.len() > 1 {
                    info!("[{}] '{}' 일치 종목 {}건, {} ({}) 선택", ctx, query, matches.len(), name, code);
                }
                (code.to_string(), name.to_string())
            }
        };

        let bar = self.krx.fetch_daily_bar(&code, date).await?.ok_or_else(|| {
            warn!("[{}] {} ({}) {} 일봉 없음", ctx, name, code, date);
            ResolveError::NoTradingData { code: code.clone(), date: *date }
        })?;

        Ok(TickerMatch {
            code,
            name,
            last_close: bar.close,
            volume: bar.volume,
        })
    }
}
