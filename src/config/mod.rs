// src/config/mod.rs
pub mod service;

pub use service::{
    LogFormat, LoggingConfig, ProvidersConfig, ServiceConfig, StorageBackend, StorageConfig,
};
