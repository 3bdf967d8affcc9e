//! Shared types, error model, and configuration for contextual enrichment.
//!
//! This crate is the foundation depended on by all other crates in the workspace.
//! It provides:
//! - [`ContextualError`] — the unified error type
//! - Domain types ([`BidRequest`], [`Site`], [`Content`], [`ClassificationRecord`])
//! - Configuration ([`GlobalConfig`], [`AccountConfig`], harness config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AccountConfig, AccountDefaults, AppConfig, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT_MS,
    GlobalConfig, ResponseFraming, SILO_PLACEHOLDER, config_dir, config_file_path, init_config,
    load_config, load_config_from,
};
pub use error::{ContextualError, DecodeFailure, Result};
pub use types::{
    BidRequest, ClassificationRecord, CodeGroup, Content, Data, PROVIDER_NAME, SEGTAX, Segment,
    Site,
};
