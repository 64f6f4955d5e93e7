//! HTTP Monitor
//!
//! Periodically executes chains of HTTP requests and reports whether each
//! chain succeeded. Values pulled out of one response (a token header, an
//! id in a JSON body) feed later requests of the same chain through
//! `{{name}}` placeholders.
//!
//! # Architecture
//!
//! - **models**: request specs, response snapshots and monitor definitions
//! - **variables**: the per-run variable store, built-in variables,
//!   placeholder substitution and response extraction
//! - **executor**: executes one request spec against a store
//! - **runner**: runs a monitoring chain and its cleanup chain
//! - **scheduler**: runs a monitor's chains on a fixed period in the background
//! - **config**: loads and validates the service configuration file
//!
//! # Tick lifecycle
//!
//! Every period, a running monitor:
//! 1. Seeds a fresh store with the built-in variables and its own variables
//! 2. Executes the monitoring chain in order, stopping at the first failure
//! 3. Executes the whole cleanup chain from the store the monitoring chain
//!    ended with, logging failures and continuing
//!
//! # Example
//!
//! ```no_run
//! use http_monitor::{Monitor, MonitorClient, MonitorDefinition, RequestSpec, HttpMethod};
//! use std::time::Duration;
//!
//! # async fn run() {
//! let definition = MonitorDefinition::new("health", Duration::from_secs(30))
//!     .with_variable("base", "https://api.example.com")
//!     .with_request(RequestSpec::new("ping", HttpMethod::GET, "{{base}}/health"));
//!
//! let mut monitor = Monitor::new(definition, MonitorClient::default()).expect("valid definition");
//! monitor.start();
//! // ...
//! monitor.stop().await;
//! # }
//! ```

pub mod config;
pub mod executor;
pub mod models;
pub mod runner;
pub mod scheduler;
pub mod variables;

pub use config::{load_config, ConfigError, ServiceConfig};
pub use executor::{execute, ExecutionError, MonitorClient};
pub use models::{
    ExtractionRule, ExtractionSource, HttpMethod, HttpResponse, MonitorDefinition, RequestSpec,
};
pub use runner::{run_chain, run_tick, seed_store, ChainKind, ChainOutcome, TickReport};
pub use scheduler::{Monitor, MonitorSet};
pub use variables::{Variable, VariableOrigin, VariableStore};
