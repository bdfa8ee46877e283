pub mod context;
pub mod report_service;
pub mod ticker_resolver;
