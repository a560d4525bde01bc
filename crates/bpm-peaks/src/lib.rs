// Library root: exposes the season pipeline so the binary and the
// integration tests share one API.

pub mod app;
pub mod config;
pub mod fetch;
pub mod report;
pub mod source;
pub mod valuation;
