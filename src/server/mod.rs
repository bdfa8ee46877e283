//! MCP server over newline-delimited JSON-RPC on stdin/stdout.
//!
//! Each line on the input stream is one request or notification; each
//! response is written as one line. Logging never touches stdout.

pub mod protocol;
pub mod tools;

use crate::config::Config;
use crate::errors::Result;
use crate::services::context::RequestContext;
use crate::services::report_service::ReportService;
use log::{debug, info, warn};
use protocol::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, ResourceContents, ToolResult, INTERNAL_ERROR, INVALID_REQUEST,
    MCP_PROTOCOL_VERSION, PARSE_ERROR, RESOURCE_NOT_FOUND,
};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tools::{ToolCall, MARKET_STATE_URI};

pub struct McpServer {
    name: String,
    version: String,
    reports: ReportService,
}

impl McpServer {
    pub fn new(config: &Config, reports: ReportService) -> Self {
        Self {
            name: config.server_name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            reports,
        }
    }

    /// stdin을 닫을 때까지 요청을 처리한다
    pub async fn run_stdio(&self) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            if let Some(response) = self.handle_line(&line).await {
                let mut frame = serde_json::to_string(&response)?;
                frame.push('\n');
                writer.write_all(frame.as_bytes()).await?;
                writer.flush().await?;
            }
        }

        info!("입력 스트림 종료");
        Ok(())
    }

    /// 한 줄을 처리한다. 알림(notification)이면 `None`.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!("JSON 파싱 실패: {}", e);
                return Some(JsonRpcResponse::failure(Value::Null, JsonRpcError::new(PARSE_ERROR, format!("Parse error: {e}"))));
            }
        };

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => Some(JsonRpcResponse::failure(id, JsonRpcError::new(INVALID_REQUEST, format!("Invalid request: {e}")))),
        }
    }

    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            debug!("알림 수신: {}", request.method);
            return None;
        }
        let id = request.id.clone().unwrap_or(Value::Null);
        if !request.has_valid_version() {
            warn!("지원하지 않는 jsonrpc 버전: '{}'", request.jsonrpc);
            return Some(JsonRpcResponse::failure(
                id,
                JsonRpcError::new(INVALID_REQUEST, format!("Unsupported jsonrpc version: '{}'", request.jsonrpc)),
            ));
        }

        let ctx = RequestContext::new(request_id(&id), request.method.as_str());
        let outcome = match request.method.as_str() {
            "initialize" => Ok(self.initialize_result()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": tools::tool_definitions() })),
            "tools/call" => self.call_tool(&ctx, request.params).await,
            "resources/list" => Ok(json!({ "resources": tools::resource_definitions() })),
            "resources/read" => self.read_resource(&ctx, request.params).await,
            other => {
                warn!("[{}] 지원하지 않는 메서드: {}", ctx, other);
                Err(JsonRpcError::method_not_found(other))
            }
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::failure(id, error),
        })
    }

    fn initialize_result(&self) -> Value {
        info!("MCP 클라이언트 초기화");
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {
                "tools": {},
                "resources": {}
            },
            "serverInfo": {
                "name": self.name,
                "version": self.version
            }
        })
    }

    async fn call_tool(&self, ctx: &RequestContext, params: Option<Value>) -> std::result::Result<Value, JsonRpcError> {
        let call = ToolCall::from_params(params).map_err(|message| {
            warn!("[{}] {}", ctx, message);
            JsonRpcError::invalid_params(message)
        })?;

        let ctx = RequestContext::new(ctx.request_id(), call.name());
        let reports = &self.reports;
        let outcome = match &call {
            ToolCall::GetStockPrice { symbol } => reports.stock_price(&ctx, symbol).await,
            ToolCall::GetKrxPrice { symbol } => reports.krx_price(&ctx, symbol).await,
            ToolCall::AnalyzeStock { symbol, last_years_profit, company_info } => {
                reports.analyze_stock(&ctx, symbol, last_years_profit, company_info).await
            }
            ToolCall::GetStockHistory { symbol, period } => reports.stock_history(&ctx, symbol, period).await,
            ToolCall::GetStockIndicators { symbol } => reports.stock_indicators(&ctx, symbol).await,
            ToolCall::GetMarketTrend { ticker, start_date, end_date } => {
                reports.market_trend(&ctx, ticker, start_date, end_date).await
            }
        };

        let result = match outcome {
            Ok(text) => ToolResult::text(text),
            Err(failure) => ToolResult::error(failure.to_string()),
        };
        serde_json::to_value(result).map_err(|e| JsonRpcError::new(INTERNAL_ERROR, e.to_string()))
    }

    async fn read_resource(&self, ctx: &RequestContext, params: Option<Value>) -> std::result::Result<Value, JsonRpcError> {
        let uri = params
            .as_ref()
            .and_then(|p| p.get("uri"))
            .and_then(Value::as_str)
            .ok_or_else(|| JsonRpcError::invalid_params("resources/read requires a uri"))?;

        if uri != MARKET_STATE_URI {
            warn!("[{}] 알 수 없는 리소스: {}", ctx, uri);
            return Err(JsonRpcError::new(RESOURCE_NOT_FOUND, format!("Resource not found: {uri}")));
        }

        let text = self.reports.market_snapshot(ctx).await;
        let contents = ResourceContents {
            uri: uri.to_string(),
            mime_type: "text/plain",
            text,
        };
        Ok(json!({ "contents": [contents] }))
    }
}

fn request_id(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
