pub mod gateway;
pub mod orchestrator;
pub mod query;
pub mod service;
pub mod token_broker;

pub use crate::domain::model::{AnalysisReport, BirthQuery, MergedProfile};
pub use crate::domain::ports::{Clock, InsightProvider, TokenStore};
pub use crate::utils::error::Result;
