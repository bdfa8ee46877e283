use std::time::Duration;

pub struct Config {
    pub server_name: String,
    pub yahoo_base_url: String,
    pub yahoo_cookie_url: String,
    pub krx_base_url: String,
    pub request_timeout_secs: u64,
    pub krx_request_interval_ms: u64,
    pub user_agent: String,
}

impl Config {
    pub fn new() -> Self {
        Self {
            server_name: "StocksMCPServer".to_string(),
            yahoo_base_url: "https://query1.finance.yahoo.com".to_string(),
            yahoo_cookie_url: "https://fc.yahoo.com".to_string(),
            krx_base_url: "http://data.krx.co.kr".to_string(),
            request_timeout_secs: 30,
            krx_request_interval_ms: 500,
            // Yahoo/KRX 모두 기본 reqwest UA는 거부한다
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".to_string(),
        }
    }

    pub fn with_yahoo_base_url(mut self, url: &str) -> Self {
        self.yahoo_base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_yahoo_cookie_url(mut self, url: &str) -> Self {
        self.yahoo_cookie_url = url.to_string();
        self
    }

    pub fn with_krx_base_url(mut self, url: &str) -> Self {
        self.krx_base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    pub fn with_krx_request_interval_ms(mut self, ms: u64) -> Self {
        self.krx_request_interval_ms = ms;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn krx_request_interval(&self) -> Duration {
        Duration::from_millis(self.krx_request_interval_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = Config::new()
            .with_yahoo_base_url("http://127.0.0.1:1234/")
            .with_krx_base_url("http://127.0.0.1:5678")
            .with_request_timeout_secs(5)
            .with_krx_request_interval_ms(0);

        assert_eq!(config.yahoo_base_url, "http://127.0.0.1:1234");
        assert_eq!(config.krx_base_url, "http://127.0.0.1:5678");
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.krx_request_interval(), Duration::ZERO);
        assert_eq!(config.server_name, "StocksMCPServer");
    }
}
