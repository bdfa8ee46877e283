use std::fmt;

/// 요청 하나에 대한 로깅 컨텍스트. 서버가 만들어 각 핸들러에 넘긴다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    request_id: String,
    operation: String,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            operation: operation.into(),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.operation, self.request_id)
    }
}
