pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use config::AppConfig;
pub use core::{
    gateway::{handle, HttpEvent, HttpResponse},
    orchestrator::ProfileOrchestrator,
    service::ProxyService,
    token_broker::TokenBroker,
};
pub use utils::error::{AstroError, Result};
