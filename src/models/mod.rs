//! Data models for monitor configuration and HTTP exchanges.

pub mod monitor;
pub mod request;
pub mod response;

pub use monitor::MonitorDefinition;
pub use request::{ExtractionRule, ExtractionSource, HttpMethod, RequestSpec};
pub use response::HttpResponse;
