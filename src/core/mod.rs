//! Core business logic abstractions

pub mod allocation;
pub mod analytics;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod holding;
pub mod log;
pub mod portfolio;
pub mod price;
pub mod refresh;

// Re-export main types for cleaner imports
pub use error::FetchError;
pub use holding::{Holding, HoldingKey};
pub use price::{Fundamentals, FundamentalsProvider, Quote, QuoteProvider, Snapshot};
