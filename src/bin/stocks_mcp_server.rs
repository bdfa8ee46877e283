use stocks_mcp_server::scrapers::krx::KrxScraper;
use stocks_mcp_server::scrapers::yahoo::YahooScraper;
use stocks_mcp_server::{Config, McpServer, ReportService};

use anyhow::Context;
use clap::{App, Arg};
use log::info;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout은 프로토콜 전용이므로 로그는 stderr로만 보낸다
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = App::new("StocksMCPServer")
        .version(env!("CARGO_PKG_VERSION"))
        .about("MCP server exposing global and KRX stock lookup tools over stdio")
        .arg(
            Arg::with_name("yahoo-url")
                .long("yahoo-url")
                .value_name("URL")
                .help("Yahoo Finance API base URL")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("yahoo-cookie-url")
                .long("yahoo-cookie-url")
                .value_name("URL")
                .help("URL visited to obtain a Yahoo session cookie")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("krx-url")
                .long("krx-url")
                .value_name("URL")
                .help("KRX data system base URL")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("timeout")
                .long("timeout")
                .value_name("SECONDS")
                .help("Timeout for each outbound HTTP request")
                .takes_value(true)
                .default_value("30"),
        )
        .arg(
            Arg::with_name("krx-interval-ms")
                .long("krx-interval-ms")
                .value_name("MILLIS")
                .help("Minimum interval between KRX requests")
                .takes_value(true)
                .default_value("500"),
        )
        .get_matches();

    let timeout = matches.value_of("timeout")
        .unwrap_or("30")
        .parse::<u64>()
        .context("--timeout must be a whole number of seconds")?;
    let krx_interval = matches.value_of("krx-interval-ms")
        .unwrap_or("500")
        .parse::<u64>()
        .context("--krx-interval-ms must be a whole number of milliseconds")?;

    let mut config = Config::new()
        .with_request_timeout_secs(timeout)
        .with_krx_request_interval_ms(krx_interval);
    if let Some(url) = matches.value_of("yahoo-url") {
        config = config.with_yahoo_base_url(url);
    }
    if let Some(url) = matches.value_of("yahoo-cookie-url") {
        config = config.with_yahoo_cookie_url(url);
    }
    if let Some(url) = matches.value_of("krx-url") {
        config = config.with_krx_base_url(url);
    }

    let global = Arc::new(YahooScraper::new(&config)?);
    let krx = Arc::new(KrxScraper::new(&config)?);
    let reports = ReportService::new(global, krx);
    let server = McpServer::new(&config, reports);

    info!("MCP server start ({})", config.server_name);
    server.run_stdio().await?;
    info!("MCP server stopped");

    Ok(())
}
