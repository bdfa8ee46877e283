use serde::Deserialize;
use serde_json::{json, Value};

/// 노출하는 도구 이름
pub const TOOL_NAMES: [&str; 6] = [
    "get_stock_price",
    "get_krx_price",
    "analyze_stock",
    "get_stock_history",
    "get_stock_indicators",
    "get_market_trend",
];

pub const MARKET_STATE_URI: &str = "market://state";

fn default_period() -> String {
    "1mo".to_string()
}

/// `tools/call` 의 `{name, arguments}` 를 타입으로 옮긴 것
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "name", content = "arguments", rename_all = "snake_case")]
pub enum ToolCall {
    GetStockPrice {
        symbol: String,
    },
    GetKrxPrice {
        symbol: String,
    },
    AnalyzeStock {
        symbol: String,
        #[serde(default)]
        last_years_profit: String,
        #[serde(default)]
        company_info: String,
    },
    GetStockHistory {
        symbol: String,
        #[serde(default = "default_period")]
        period: String,
    },
    GetStockIndicators {
        symbol: String,
    },
    GetMarketTrend {
        ticker: String,
        start_date: String,
        end_date: String,
    },
}

impl ToolCall {
    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::GetStockPrice { .. } => "get_stock_price",
            ToolCall::GetKrxPrice { .. } => "get_krx_price",
            ToolCall::AnalyzeStock { .. } => "analyze_stock",
            ToolCall::GetStockHistory { .. } => "get_stock_history",
            ToolCall::GetStockIndicators { .. } => "get_stock_indicators",
            ToolCall::GetMarketTrend { .. } => "get_market_trend",
        }
    }

    /// Parse `tools/call` params. Unknown tools and bad arguments are reported separately.
    pub fn from_params(params: Option<Value>) -> Result<Self, String> {
        #[derive(Deserialize)]
        struct CallParams {
            name: String,
            #[serde(default)]
            arguments: Option<Value>,
        }

        let params = params.ok_or_else(|| "tools/call requires params".to_string())?;
        let call: CallParams = serde_json::from_value(params).map_err(|e| format!("invalid tools/call params: {e}"))?;

        if !TOOL_NAMES.contains(&call.name.as_str()) {
            return Err(format!("Unknown tool: {}", call.name));
        }

        let arguments = call.arguments.unwrap_or_else(|| json!({}));
        serde_json::from_value(json!({ "name": call.name, "arguments": arguments }))
            .map_err(|e| format!("invalid arguments for {}: {e}", call.name))
    }
}

fn symbol_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "symbol": { "type": "string", "description": description }
        },
        "required": ["symbol"]
    })
}

/// `tools/list` 응답에 들어가는 도구 정의
pub fn tool_definitions() -> Vec<Value> {
    vec![
        json!({
            "name": "get_stock_price",
            "description": "해외 주식의 현재 주가를 조회합니다. (예: AAPL, TSLA)",
            "inputSchema": symbol_schema("Yahoo Finance 종목 기호")
        }),
        json!({
            "name": "get_krx_price",
            "description": "한국 주식의 현재 주가를 종목명 또는 종목코드로 조회합니다. (예: 삼성전자, 005930)",
            "inputSchema": symbol_schema("KRX 종목명 또는 6자리 종목코드")
        }),
        json!({
            "name": "analyze_stock",
            "description": "종목 기본 분석. 영문 기호는 재무 정보와 회사 개요, 한글 종목명은 KRX 시세 정보를 제공합니다.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "symbol": { "type": "string", "description": "종목 기호 또는 KRX 종목명" },
                    "last_years_profit": { "type": "string", "description": "참고할 지난해 수익 정보 (선택)", "default": "" },
                    "company_info": { "type": "string", "description": "참고할 회사 정보 (선택)", "default": "" }
                },
                "required": ["symbol"]
            }
        }),
        json!({
            "name": "get_stock_history",
            "description": "지정한 기간의 일봉 중 최근 5거래일 종가를 조회합니다.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "symbol": { "type": "string", "description": "Yahoo Finance 종목 기호" },
                    "period": {
                        "type": "string",
                        "description": "조회 기간",
                        "enum": crate::util::VALID_PERIODS,
                        "default": "1mo"
                    }
                },
                "required": ["symbol"]
            }
        }),
        json!({
            "name": "get_stock_indicators",
            "description": "PER, PBR, 52주 범위, 배당, ROE 등 주요 투자 지표를 조회합니다.",
            "inputSchema": symbol_schema("Yahoo Finance 종목 기호")
        }),
        json!({
            "name": "get_market_trend",
            "description": "시작일과 종료일 사이의 일별 종가와 등락률을 조회합니다.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "ticker": { "type": "string", "description": "Yahoo Finance 종목 기호" },
                    "start_date": { "type": "string", "description": "시작일 (YYYY-MM-DD)" },
                    "end_date": { "type": "string", "description": "종료일 (YYYY-MM-DD)" }
                },
                "required": ["ticker", "start_date", "end_date"]
            }
        }),
    ]
}

pub fn resource_definitions() -> Vec<Value> {
    vec![json!({
        "uri": MARKET_STATE_URI,
        "name": "market_state",
        "description": "주요 지수와 환율 현황",
        "mimeType": "text/plain"
    })]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definitions_match_dispatchable_names() {
        let names: Vec<String> = tool_definitions()
            .iter()
            .map(|tool| tool["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, TOOL_NAMES.map(String::from).to_vec());
    }

    #[test]
    fn optional_arguments_take_defaults() {
        let call = ToolCall::from_params(Some(json!({"name": "get_stock_history", "arguments": {"symbol": "AAPL"}}))).unwrap();
        assert_eq!(call, ToolCall::GetStockHistory { symbol: "AAPL".to_string(), period: "1mo".to_string() });

        let call = ToolCall::from_params(Some(json!({"name": "analyze_stock", "arguments": {"symbol": "삼성전자"}}))).unwrap();
        assert_eq!(
            call,
            ToolCall::AnalyzeStock {
                symbol: "삼성전자".to_string(),
                last_years_profit: String::new(),
                company_info: String::new(),
            }
        );
        assert_eq!(call.name(), "analyze_stock");
    }

    #[test]
    fn rejects_unknown_tools_and_missing_arguments() {
        let err = ToolCall::from_params(Some(json!({"name": "drop_tables", "arguments": {}}))).unwrap_err();
        assert!(err.contains("Unknown tool"));

        let err = ToolCall::from_params(Some(json!({"name": "get_market_trend", "arguments": {"ticker": "AAPL"}}))).unwrap_err();
        assert!(err.contains("get_market_trend"));

        assert!(ToolCall::from_params(None).is_err());
    }
}
